// This file is part of deformable_mirror.
//
// Developed for the Vera Rubin Observatory Systems.
// This product includes software developed by the LSST Project
// (https://www.lsst.org).
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::cell::Cell;
use std::rc::Rc;
use strum_macros::AsRefStr;

use crate::constants::NUM_ZERNIKE_MODE;
use crate::driver::{check_pattern_length, DeviceInformation, MirrorDriver, SessionHandle};
use crate::enums::RelaxPart;
use crate::error::{MirrorError, MirrorResult};
use crate::mock::mock_constants::{
    MOCK_DEVICE_RESOURCE_NAME, MOCK_NUM_SEGMENT, MOCK_NUM_TILT, MOCK_RELAX_STEPS,
    MOCK_SESSION_HANDLE,
};

/// Call received by the mock driver.
#[derive(Debug, PartialEq, Clone, AsRefStr)]
pub enum DriverCall {
    GetDeviceCount,
    GetDeviceInformation(u32),
    GetSegmentCount(SessionHandle),
    GetTiltCount(SessionHandle),
    SetSegmentVoltages(Vec<f64>),
    SetTiltVoltages(Vec<f64>),
    Init {
        resource_name: String,
        exclusive: bool,
        reserved: bool,
    },
    Relax {
        part: RelaxPart,
        is_first_step: bool,
        reload: bool,
    },
    CalculateSingleZernikePattern {
        mode_bit: u32,
        amplitude: f64,
    },
    CalculateZernikePattern {
        mode_mask: u32,
        amplitudes: Vec<f64>,
    },
    Close(SessionHandle),
}

pub struct MockDriver {
    // Number of the attached devices.
    pub device_count: u32,
    // Number of the mirror segments.
    pub segment_count: u32,
    // Number of the tilt arms.
    pub tilt_count: u32,
    // Status returned by the initialization.
    pub init_status: i32,
    // Remaining steps reported by the first relax step. Each following step
    // decreases it by 1.
    pub relax_steps: i32,
    // The relax steps never decrease the remaining steps.
    pub is_relax_stalled: bool,
    // Function that fails with a driver status error.
    pub failed_function: Option<&'static str>,
    // Received calls in order.
    pub calls: Vec<DriverCall>,
    // Number of the close calls. It is shared so that it can be checked
    // after the driver is dropped.
    pub count_close: Rc<Cell<usize>>,
    _remaining_steps: i32,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MockDriver {
    /// Create a new mock driver.
    ///
    /// # Arguments
    /// * `device_count` - Number of the attached devices.
    ///
    /// # Returns
    /// A new mock driver.
    pub fn new(device_count: u32) -> Self {
        Self {
            device_count: device_count,
            segment_count: MOCK_NUM_SEGMENT,
            tilt_count: MOCK_NUM_TILT,
            init_status: 0,
            relax_steps: MOCK_RELAX_STEPS,
            is_relax_stalled: false,
            failed_function: None,
            calls: Vec::new(),
            count_close: Rc::new(Cell::new(0)),
            _remaining_steps: 0,
        }
    }

    /// Count the received calls of the function.
    ///
    /// # Arguments
    /// * `name` - Name of the call (e.g. "SetSegmentVoltages").
    ///
    /// # Returns
    /// Number of the calls.
    pub fn count_calls(&self, name: &str) -> usize {
        self.calls.iter().filter(|call| call.as_ref() == name).count()
    }

    /// Get the last call of the function.
    ///
    /// # Arguments
    /// * `name` - Name of the call.
    ///
    /// # Returns
    /// Last call if any.
    pub fn last_call(&self, name: &str) -> Option<&DriverCall> {
        self.calls.iter().rev().find(|call| call.as_ref() == name)
    }

    /// Get the mirror pattern of a single Zernike mode. The value grows with
    /// the segment index.
    ///
    /// # Arguments
    /// * `mode_bit` - Bit value of the mode.
    /// * `amplitude` - Amplitude.
    /// * `segment_count` - Number of the segments.
    ///
    /// # Returns
    /// Mirror pattern.
    pub fn single_zernike_pattern(mode_bit: u32, amplitude: f64, segment_count: usize) -> Vec<f64> {
        (0..segment_count)
            .map(|idx| amplitude * (mode_bit.trailing_zeros() + 1) as f64 * (idx + 1) as f64)
            .collect()
    }

    /// Get the mirror pattern of the combined Zernike modes.
    ///
    /// # Arguments
    /// * `mode_mask` - Mode mask.
    /// * `amplitudes` - Amplitudes of all the modes.
    /// * `segment_count` - Number of the segments.
    ///
    /// # Returns
    /// Mirror pattern.
    pub fn zernike_pattern(mode_mask: u32, amplitudes: &[f64], segment_count: usize) -> Vec<f64> {
        let mut pattern = vec![0.0; segment_count];
        amplitudes
            .iter()
            .enumerate()
            .filter(|(idx, _)| mode_mask & (1 << idx) != 0)
            .for_each(|(idx, amplitude)| {
                let single = Self::single_zernike_pattern(1 << idx, *amplitude, segment_count);
                pattern
                    .iter_mut()
                    .zip(single.iter())
                    .for_each(|(value, delta)| *value += delta);
            });

        pattern
    }

    /// Get the relax pattern of the remaining steps. The sign alternates
    /// between the neighbors and the magnitude decays to 0.
    ///
    /// # Arguments
    /// * `remaining_steps` - Remaining steps.
    /// * `count` - Number of the values.
    ///
    /// # Returns
    /// Relax pattern.
    pub fn relax_pattern(remaining_steps: i32, count: usize) -> Vec<f64> {
        (0..count)
            .map(|idx| {
                let sign = if idx % 2 == 0 { 1.0 } else { -1.0 };
                sign * remaining_steps as f64
            })
            .collect()
    }

    /// Record the call and fail if requested.
    ///
    /// # Arguments
    /// * `call` - Received call.
    /// * `function` - Name of the vendor function.
    fn record(&mut self, call: DriverCall, function: &str) -> MirrorResult<()> {
        self.calls.push(call);

        if self.failed_function == Some(function) {
            return Err(MirrorError::driver_status(function, -1));
        }

        Ok(())
    }
}

impl MirrorDriver for MockDriver {
    fn get_device_count(&mut self) -> MirrorResult<u32> {
        self.record(DriverCall::GetDeviceCount, "TLDFM_get_device_count")?;

        Ok(self.device_count)
    }

    fn get_device_information(&mut self, index: u32) -> MirrorResult<DeviceInformation> {
        self.record(
            DriverCall::GetDeviceInformation(index),
            "TLDFM_get_device_information",
        )?;

        if index >= self.device_count {
            return Err(MirrorError::driver_status(
                "TLDFM_get_device_information",
                -1,
            ));
        }

        Ok(DeviceInformation {
            manufacturer: String::from("Thorlabs GmbH"),
            instrument_name: String::from("DMP40"),
            serial_number: format!("M0000{index}"),
            is_available: true,
            resource_name: String::from(MOCK_DEVICE_RESOURCE_NAME),
        })
    }

    fn get_segment_count(&mut self, session: SessionHandle) -> MirrorResult<u32> {
        self.record(
            DriverCall::GetSegmentCount(session),
            "TLDFM_get_segment_count",
        )?;

        Ok(self.segment_count)
    }

    fn get_tilt_count(&mut self, session: SessionHandle) -> MirrorResult<u32> {
        self.record(DriverCall::GetTiltCount(session), "TLDFM_get_tilt_count")?;

        Ok(self.tilt_count)
    }

    fn set_segment_voltages(
        &mut self,
        _session: SessionHandle,
        pattern: &[f64],
    ) -> MirrorResult<()> {
        check_pattern_length(
            "TLDFM_set_segment_voltages",
            self.segment_count as usize,
            pattern.len(),
        )?;

        self.record(
            DriverCall::SetSegmentVoltages(pattern.to_vec()),
            "TLDFM_set_segment_voltages",
        )
    }

    fn set_tilt_voltages(&mut self, _session: SessionHandle, pattern: &[f64]) -> MirrorResult<()> {
        check_pattern_length(
            "TLDFM_set_tilt_voltages",
            self.tilt_count as usize,
            pattern.len(),
        )?;

        self.record(
            DriverCall::SetTiltVoltages(pattern.to_vec()),
            "TLDFM_set_tilt_voltages",
        )
    }

    fn init(
        &mut self,
        resource_name: &str,
        exclusive: bool,
        reserved: bool,
    ) -> MirrorResult<SessionHandle> {
        self.record(
            DriverCall::Init {
                resource_name: String::from(resource_name),
                exclusive: exclusive,
                reserved: reserved,
            },
            "TLDFMX_init",
        )?;

        if self.init_status != 0 {
            return Err(MirrorError::driver_status("TLDFMX_init", self.init_status));
        }

        Ok(SessionHandle(MOCK_SESSION_HANDLE))
    }

    fn relax(
        &mut self,
        _session: SessionHandle,
        part: RelaxPart,
        is_first_step: bool,
        reload: bool,
        mirror_pattern: &mut [f64],
        arm_pattern: &mut [f64],
    ) -> MirrorResult<i32> {
        check_pattern_length(
            "TLDFMX_relax",
            self.segment_count as usize,
            mirror_pattern.len(),
        )?;
        check_pattern_length("TLDFMX_relax", self.tilt_count as usize, arm_pattern.len())?;

        self.record(
            DriverCall::Relax {
                part: part,
                is_first_step: is_first_step,
                reload: reload,
            },
            "TLDFMX_relax",
        )?;

        if is_first_step {
            self._remaining_steps = self.relax_steps;
        } else if (!self.is_relax_stalled) && (self._remaining_steps > 0) {
            self._remaining_steps -= 1;
        }

        mirror_pattern.copy_from_slice(&Self::relax_pattern(
            self._remaining_steps,
            mirror_pattern.len(),
        ));
        arm_pattern.copy_from_slice(&Self::relax_pattern(
            self._remaining_steps,
            arm_pattern.len(),
        ));

        Ok(self._remaining_steps)
    }

    fn calculate_single_zernike_pattern(
        &mut self,
        _session: SessionHandle,
        mode_bit: u32,
        amplitude: f64,
        mirror_pattern: &mut [f64],
    ) -> MirrorResult<()> {
        check_pattern_length(
            "TLDFMX_calculate_single_zernike_pattern",
            self.segment_count as usize,
            mirror_pattern.len(),
        )?;

        self.record(
            DriverCall::CalculateSingleZernikePattern {
                mode_bit: mode_bit,
                amplitude: amplitude,
            },
            "TLDFMX_calculate_single_zernike_pattern",
        )?;

        mirror_pattern.copy_from_slice(&Self::single_zernike_pattern(
            mode_bit,
            amplitude,
            mirror_pattern.len(),
        ));

        Ok(())
    }

    fn calculate_zernike_pattern(
        &mut self,
        _session: SessionHandle,
        mode_mask: u32,
        amplitudes: &[f64],
        mirror_pattern: &mut [f64],
    ) -> MirrorResult<()> {
        if amplitudes.len() != NUM_ZERNIKE_MODE {
            return Err(MirrorError::AmplitudeLength(amplitudes.len()));
        }
        check_pattern_length(
            "TLDFMX_calculate_zernike_pattern",
            self.segment_count as usize,
            mirror_pattern.len(),
        )?;

        self.record(
            DriverCall::CalculateZernikePattern {
                mode_mask: mode_mask,
                amplitudes: amplitudes.to_vec(),
            },
            "TLDFMX_calculate_zernike_pattern",
        )?;

        mirror_pattern.copy_from_slice(&Self::zernike_pattern(
            mode_mask,
            amplitudes,
            mirror_pattern.len(),
        ));

        Ok(())
    }

    fn close(&mut self, session: SessionHandle) -> MirrorResult<()> {
        self.count_close.set(self.count_close.get() + 1);

        self.record(DriverCall::Close(session), "TLDFMX_close")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_new() {
        let driver = MockDriver::new(2);

        assert_eq!(driver.device_count, 2);
        assert_eq!(driver.segment_count, MOCK_NUM_SEGMENT);
        assert_eq!(driver.tilt_count, MOCK_NUM_TILT);
        assert!(driver.calls.is_empty());
    }

    #[test]
    fn test_count_calls() {
        let mut driver = MockDriver::default();

        driver.get_device_count().unwrap();
        driver.get_device_count().unwrap();
        driver.get_device_information(0).unwrap();

        assert_eq!(driver.count_calls("GetDeviceCount"), 2);
        assert_eq!(driver.count_calls("GetDeviceInformation"), 1);
        assert_eq!(driver.count_calls("Close"), 0);

        assert_eq!(
            driver.last_call("GetDeviceInformation"),
            Some(&DriverCall::GetDeviceInformation(0))
        );
    }

    #[test]
    fn test_failed_function() {
        let mut driver = MockDriver::default();
        driver.failed_function = Some("TLDFM_get_device_count");

        assert!(matches!(
            driver.get_device_count(),
            Err(MirrorError::DriverStatus { .. })
        ));
        assert_eq!(driver.count_calls("GetDeviceCount"), 1);
    }

    #[test]
    fn test_get_device_information() {
        let mut driver = MockDriver::default();

        let information = driver.get_device_information(0).unwrap();
        assert_eq!(information.resource_name, MOCK_DEVICE_RESOURCE_NAME);
        assert!(information.is_available);

        assert!(driver.get_device_information(1).is_err());
    }

    #[test]
    fn test_init() {
        let mut driver = MockDriver::default();

        assert_eq!(
            driver.init(MOCK_DEVICE_RESOURCE_NAME, true, false).unwrap(),
            SessionHandle(MOCK_SESSION_HANDLE)
        );

        driver.init_status = -1;
        assert!(driver.init(MOCK_DEVICE_RESOURCE_NAME, true, false).is_err());
    }

    #[test]
    fn test_relax() {
        let mut driver = MockDriver::default();
        driver.relax_steps = 2;
        driver.segment_count = 4;
        driver.tilt_count = 3;

        let session = SessionHandle(MOCK_SESSION_HANDLE);
        let mut mirror_pattern = vec![0.0; 4];
        let mut arm_pattern = vec![0.0; 3];

        let remaining_steps = driver
            .relax(
                session,
                RelaxPart::Both,
                true,
                false,
                &mut mirror_pattern,
                &mut arm_pattern,
            )
            .unwrap();
        assert_eq!(remaining_steps, 2);
        assert_eq!(mirror_pattern, vec![2.0, -2.0, 2.0, -2.0]);
        assert_eq!(arm_pattern, vec![2.0, -2.0, 2.0]);

        for expected in [1, 0, 0] {
            let remaining_steps = driver
                .relax(
                    session,
                    RelaxPart::Both,
                    false,
                    false,
                    &mut mirror_pattern,
                    &mut arm_pattern,
                )
                .unwrap();
            assert_eq!(remaining_steps, expected);
        }

        assert_eq!(mirror_pattern, vec![0.0; 4]);
    }

    #[test]
    fn test_relax_stalled() {
        let mut driver = MockDriver::default();
        driver.relax_steps = 1;
        driver.is_relax_stalled = true;
        driver.segment_count = 2;
        driver.tilt_count = 1;

        let session = SessionHandle(MOCK_SESSION_HANDLE);
        let mut mirror_pattern = vec![0.0; 2];
        let mut arm_pattern = vec![0.0; 1];

        for is_first_step in [true, false, false] {
            let remaining_steps = driver
                .relax(
                    session,
                    RelaxPart::MirrorOnly,
                    is_first_step,
                    false,
                    &mut mirror_pattern,
                    &mut arm_pattern,
                )
                .unwrap();
            assert_eq!(remaining_steps, 1);
        }
    }

    #[test]
    fn test_pattern_length() {
        let mut driver = MockDriver::default();
        let session = SessionHandle(MOCK_SESSION_HANDLE);

        assert!(matches!(
            driver.set_segment_voltages(session, &[]),
            Err(MirrorError::PatternLength {
                expected: 40,
                actual: 0
            })
        ));
        assert!(matches!(
            driver.set_tilt_voltages(session, &[0.0; 4]),
            Err(MirrorError::PatternLength {
                expected: 3,
                actual: 4
            })
        ));

        let mut mirror_pattern = vec![0.0; 39];
        let mut arm_pattern = vec![0.0; 3];
        assert!(matches!(
            driver.relax(
                session,
                RelaxPart::Both,
                true,
                false,
                &mut mirror_pattern,
                &mut arm_pattern
            ),
            Err(MirrorError::PatternLength { .. })
        ));
        assert!(matches!(
            driver.calculate_single_zernike_pattern(session, 0x002, 0.5, &mut mirror_pattern),
            Err(MirrorError::PatternLength { .. })
        ));
        assert!(matches!(
            driver.calculate_zernike_pattern(session, 0x002, &[0.0; 11], &mut arm_pattern),
            Err(MirrorError::AmplitudeLength(11))
        ));

        // Nothing reaches the device
        assert!(driver.calls.is_empty());

        let mut mirror_pattern = vec![0.0; MOCK_NUM_SEGMENT as usize];
        assert!(driver
            .calculate_zernike_pattern(session, 0x002, &[0.5; 12], &mut mirror_pattern)
            .is_ok());
        assert!(driver.set_segment_voltages(session, &mirror_pattern).is_ok());
    }

    #[test]
    fn test_single_zernike_pattern() {
        // Defocus is the bit 1
        let pattern = MockDriver::single_zernike_pattern(0x002, 0.5, 3);

        assert_relative_eq!(pattern[0], 1.0, epsilon = EPSILON);
        assert_relative_eq!(pattern[1], 2.0, epsilon = EPSILON);
        assert_relative_eq!(pattern[2], 3.0, epsilon = EPSILON);
    }

    #[test]
    fn test_zernike_pattern() {
        let mut amplitudes = vec![0.0; 12];
        amplitudes[0] = 1.0;
        amplitudes[1] = 0.5;
        amplitudes[11] = -1.0;

        // Only the first two modes are selected
        let pattern = MockDriver::zernike_pattern(0x003, &amplitudes, 2);

        assert_relative_eq!(pattern[0], 2.0, epsilon = EPSILON);
        assert_relative_eq!(pattern[1], 4.0, epsilon = EPSILON);

        // All modes
        let pattern = MockDriver::zernike_pattern(0xFFF, &amplitudes, 1);

        assert_relative_eq!(pattern[0], -10.0, epsilon = EPSILON);
    }
}
