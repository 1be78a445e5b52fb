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

pub mod native;

use serde::{Deserialize, Serialize};

use log::error;

use crate::enums::RelaxPart;
use crate::error::{MirrorError, MirrorResult};

/// Session handle returned by the initialization of the driver.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct SessionHandle(pub u32);

/// Information of an attached device.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct DeviceInformation {
    pub manufacturer: String,
    pub instrument_name: String,
    pub serial_number: String,
    // Device is not used by another application.
    pub is_available: bool,
    // Resource name used to initialize the device.
    pub resource_name: String,
}

/// Check the length of a pattern passed to the driver function. The vendor
/// functions read and write as many values as the device reports, so a
/// shorter or longer buffer must never reach them.
///
/// # Arguments
/// * `function` - Name of the driver function.
/// * `expected` - Number of the values reported by the device.
/// * `actual` - Length of the pattern.
///
/// # Errors
/// If the lengths differ.
pub fn check_pattern_length(function: &str, expected: usize, actual: usize) -> MirrorResult<()> {
    if expected != actual {
        error!("Pattern of {function} has {actual} values, expected {expected}.");
        return Err(MirrorError::PatternLength {
            expected: expected,
            actual: actual,
        });
    }

    Ok(())
}

/// Operations of the vendor driver used by the mirror controller. The core
/// functions query the device and apply the voltages, the extended functions
/// manage the session and calculate the voltage patterns.
///
/// Every function returns an error if the driver reports a nonzero status.
/// The functions with a pattern return `MirrorError::PatternLength` if the
/// pattern does not have the length of the segment or tilt count of the
/// session.
pub trait MirrorDriver {
    /// Get the number of the attached devices.
    fn get_device_count(&mut self) -> MirrorResult<u32>;

    /// Get the information of the device.
    ///
    /// # Arguments
    /// * `index` - 0-based device index.
    fn get_device_information(&mut self, index: u32) -> MirrorResult<DeviceInformation>;

    /// Get the number of the mirror segments.
    fn get_segment_count(&mut self, session: SessionHandle) -> MirrorResult<u32>;

    /// Get the number of the tilt arms.
    fn get_tilt_count(&mut self, session: SessionHandle) -> MirrorResult<u32>;

    /// Apply the voltages of the mirror segments.
    fn set_segment_voltages(&mut self, session: SessionHandle, pattern: &[f64])
        -> MirrorResult<()>;

    /// Apply the voltages of the tilt arms.
    fn set_tilt_voltages(&mut self, session: SessionHandle, pattern: &[f64]) -> MirrorResult<()>;

    /// Initialize the device with the extended function set.
    ///
    /// # Arguments
    /// * `resource_name` - Resource name from the device information.
    /// * `exclusive` - Request the exclusive access.
    /// * `reserved` - Reserved flag of the driver, always false.
    ///
    /// # Returns
    /// Session handle.
    fn init(
        &mut self,
        resource_name: &str,
        exclusive: bool,
        reserved: bool,
    ) -> MirrorResult<SessionHandle>;

    /// Do one relax step. The patterns are written into the buffers, which
    /// must have the length of the segment and tilt counts.
    ///
    /// # Returns
    /// Remaining steps.
    fn relax(
        &mut self,
        session: SessionHandle,
        part: RelaxPart,
        is_first_step: bool,
        reload: bool,
        mirror_pattern: &mut [f64],
        arm_pattern: &mut [f64],
    ) -> MirrorResult<i32>;

    /// Calculate the mirror pattern of a single Zernike mode.
    fn calculate_single_zernike_pattern(
        &mut self,
        session: SessionHandle,
        mode_bit: u32,
        amplitude: f64,
        mirror_pattern: &mut [f64],
    ) -> MirrorResult<()>;

    /// Calculate the mirror pattern of the combined Zernike modes. The
    /// amplitude index i belongs to the mode bit i.
    fn calculate_zernike_pattern(
        &mut self,
        session: SessionHandle,
        mode_mask: u32,
        amplitudes: &[f64],
        mirror_pattern: &mut [f64],
    ) -> MirrorResult<()>;

    /// Close the session.
    fn close(&mut self, session: SessionHandle) -> MirrorResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pattern_length() {
        assert!(check_pattern_length("TLDFM_set_segment_voltages", 40, 40).is_ok());

        match check_pattern_length("TLDFM_set_segment_voltages", 40, 0) {
            Err(MirrorError::PatternLength { expected, actual }) => {
                assert_eq!(expected, 40);
                assert_eq!(actual, 0);
            }
            _ => panic!("Should reject the empty pattern"),
        }

        assert!(check_pattern_length("TLDFM_set_tilt_voltages", 3, 4).is_err());
    }
}
