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

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::constants::{MAX_AMPLITUDE, MIN_AMPLITUDE, NUM_ZERNIKE_MODE};
use crate::driver::{native::NativeDriver, MirrorDriver, SessionHandle};
use crate::enums::{BitEnum, ControllerState, RelaxPart, ZernikeMode};
use crate::error::{MirrorError, MirrorResult};
use crate::event::Event;
use crate::event_queue::EventQueue;

/// Session of the connected device.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeviceSession {
    // Handle returned by the driver initialization.
    pub handle: SessionHandle,
    // Number of the mirror segments.
    pub segment_count: u32,
    // Number of the tilt arms.
    pub tilt_count: u32,
    // Last applied voltages of the segments.
    pub mirror_pattern: Vec<f64>,
    // Last applied voltages of the tilt arms.
    pub arm_pattern: Vec<f64>,
}

/// Snapshot of the applied voltages.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MirrorState {
    pub segment_count: u32,
    pub tilt_count: u32,
    pub segment_voltages: Vec<f64>,
    pub tilt_voltages: Vec<f64>,
}

pub struct MirrorController<D: MirrorDriver> {
    // Configuration.
    pub config: ControllerConfig,
    // Events to publish.
    pub event_queue: EventQueue,
    // Driver of the device.
    _driver: D,
    // Controller state.
    _state: ControllerState,
    // Number of the devices detected at the construction.
    _device_count: u32,
    // Device session.
    _session: DeviceSession,
}

impl MirrorController<NativeDriver> {
    /// Load the vendor driver libraries and create the controller.
    ///
    /// # Arguments
    /// * `config` - Configuration.
    ///
    /// # Returns
    /// A new controller.
    ///
    /// # Errors
    /// If the driver libraries are missing.
    pub fn discover(config: &ControllerConfig) -> MirrorResult<Self> {
        let driver = NativeDriver::load(config).map_err(|error| {
            error!("Missing library files: {error}");
            error
        })?;

        Ok(Self::new(driver, config.clone()))
    }
}

impl<D: MirrorDriver> MirrorController<D> {
    /// Create a new controller and check the attached devices. A failure of
    /// the check leaves the controller without device.
    ///
    /// # Arguments
    /// * `driver` - Driver of the device.
    /// * `config` - Configuration.
    ///
    /// # Returns
    /// A new controller.
    pub fn new(mut driver: D, config: ControllerConfig) -> Self {
        let device_count = match driver.get_device_count() {
            Ok(0) => {
                warn!("No deformable mirror devices found.");
                0
            }
            Ok(count) => {
                info!("Found {count} deformable mirror device(s).");
                count
            }
            Err(error) => {
                warn!("Failed to get the device count: {error}");
                0
            }
        };

        let mut event_queue = EventQueue::new();
        event_queue.add_event(Event::get_message_controller_state(
            ControllerState::Uninitialized,
        ));

        Self {
            config: config,
            event_queue: event_queue,

            _driver: driver,
            _state: ControllerState::Uninitialized,
            _device_count: device_count,
            _session: DeviceSession::default(),
        }
    }

    /// Get the controller state.
    pub fn state(&self) -> ControllerState {
        self._state
    }

    /// Is initialized or not.
    pub fn is_initialized(&self) -> bool {
        self._state == ControllerState::Initialized
    }

    /// Get the number of the devices detected at the construction.
    pub fn device_count(&self) -> u32 {
        self._device_count
    }

    /// Get the device session.
    pub fn session(&self) -> &DeviceSession {
        &self._session
    }

    /// Get the driver.
    pub fn driver(&self) -> &D {
        &self._driver
    }

    /// Get the mutable driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self._driver
    }

    /// Check the controller is initialized.
    ///
    /// # Arguments
    /// * `action` - Action to do, used in the log message.
    ///
    /// # Errors
    /// If the controller is not initialized or is disconnected.
    fn check_initialized(&self, action: &str) -> MirrorResult<()> {
        match self._state {
            ControllerState::Initialized => Ok(()),
            ControllerState::Uninitialized => {
                error!("Cannot {action}. Device must first be initialized.");
                Err(MirrorError::NotInitialized)
            }
            ControllerState::Disconnected => {
                error!("Cannot {action}. Device is disconnected.");
                Err(MirrorError::Disconnected)
            }
        }
    }

    /// Check the segment count of the device is known. It is unknown if the
    /// relaxation failed before the counts were read.
    ///
    /// # Arguments
    /// * `action` - Action to do, used in the log message.
    ///
    /// # Errors
    /// If the segment count is 0.
    fn check_relaxed(&self, action: &str) -> MirrorResult<()> {
        if self._session.segment_count == 0 {
            error!("Cannot {action}. Segment count is unknown, relax the device first.");
            return Err(MirrorError::NotRelaxed);
        }

        Ok(())
    }

    /// Transition to the new state.
    ///
    /// # Arguments
    /// * `state` - New state.
    fn set_state(&mut self, state: ControllerState) {
        info!(
            "Controller state: {} -> {}.",
            self._state.as_ref(),
            state.as_ref()
        );

        self._state = state;
        self.event_queue
            .add_event(Event::get_message_controller_state(state));
    }

    /// Initialize the device with the extended function set and relax it.
    ///
    /// # Errors
    /// If there is no device, the controller was initialized already, or the
    /// driver fails. The controller is still initialized if only the
    /// relaxation fails, and the shape commands are rejected until a later
    /// `relax()` reads the segment count.
    pub fn initialize(&mut self) -> MirrorResult<()> {
        match self._state {
            ControllerState::Uninitialized => {}
            ControllerState::Initialized => {
                error!("Cannot initialize the device. Device is already initialized.");
                return Err(MirrorError::AlreadyInitialized);
            }
            ControllerState::Disconnected => {
                error!("Cannot initialize the device. Device is disconnected.");
                return Err(MirrorError::Disconnected);
            }
        }

        let index = self.config.device_index;
        if index >= self._device_count {
            error!(
                "No deformable mirror device found at index {index} ({} detected).",
                self._device_count
            );
            return Err(MirrorError::NoDevice);
        }

        let information = self
            ._driver
            .get_device_information(index)
            .map_err(|error| {
                error!("Failed to get the device information: {error}");
                error
            })?;
        self.event_queue
            .add_event(Event::get_message_device_information(index, &information));

        let handle = self
            ._driver
            .init(
                &information.resource_name,
                self.config.exclusive_access,
                false,
            )
            .map_err(|error| {
                error!("Error with initialization: {error}");
                error
            })?;

        info!(
            "Initialized the device {} ({}).",
            information.resource_name, information.serial_number
        );

        self._session.handle = handle;
        self.set_state(ControllerState::Initialized);

        self.relax(RelaxPart::Both)
    }

    /// Relax the device. The relax steps are repeated until the driver
    /// reports no remaining step, and the voltages are applied after every
    /// step.
    ///
    /// # Arguments
    /// * `part` - Part of the device to relax.
    ///
    /// # Errors
    /// If the controller is not initialized, the driver fails, or the
    /// relaxation needs more steps than the configured maximum.
    pub fn relax(&mut self, part: RelaxPart) -> MirrorResult<()> {
        self.check_initialized("relax the device")?;

        let handle = self._session.handle;
        let segment_count = self._driver.get_segment_count(handle)?;
        let tilt_count = self._driver.get_tilt_count(handle)?;

        let mut mirror_pattern = vec![0.0; segment_count as usize];
        let mut arm_pattern = vec![0.0; tilt_count as usize];

        self._session.segment_count = segment_count;
        self._session.tilt_count = tilt_count;
        self._session.mirror_pattern = mirror_pattern.clone();
        self._session.arm_pattern = arm_pattern.clone();

        info!("Relaxing the deformable mirror ({}).", part.as_ref());

        let mut remaining_steps =
            self.relax_step(part, true, &mut mirror_pattern, &mut arm_pattern)?;
        let mut steps: u32 = 1;

        while remaining_steps > 0 {
            if (steps - 1) >= self.config.max_relax_steps {
                error!(
                    "Relaxing did not complete in {steps} steps, {remaining_steps} steps remain."
                );
                return Err(MirrorError::RelaxNotConverged { steps: steps });
            }

            remaining_steps =
                self.relax_step(part, false, &mut mirror_pattern, &mut arm_pattern)?;
            steps += 1;
        }

        info!("Relaxing completed in {steps} steps.");

        self.event_queue.add_event(Event::get_message_relaxed(
            part,
            steps,
            segment_count,
            tilt_count,
        ));

        Ok(())
    }

    /// Do one relax step and apply the returned voltages.
    ///
    /// # Arguments
    /// * `part` - Part of the device to relax.
    /// * `is_first_step` - Is the first step or not.
    /// * `mirror_pattern` - Buffer of the segment voltages.
    /// * `arm_pattern` - Buffer of the tilt arm voltages.
    ///
    /// # Returns
    /// Remaining steps.
    fn relax_step(
        &mut self,
        part: RelaxPart,
        is_first_step: bool,
        mirror_pattern: &mut [f64],
        arm_pattern: &mut [f64],
    ) -> MirrorResult<i32> {
        let handle = self._session.handle;

        let remaining_steps = self._driver.relax(
            handle,
            part,
            is_first_step,
            false,
            mirror_pattern,
            arm_pattern,
        )?;

        self._driver.set_segment_voltages(handle, mirror_pattern)?;
        self._session.mirror_pattern = mirror_pattern.to_vec();

        self._driver.set_tilt_voltages(handle, arm_pattern)?;
        self._session.arm_pattern = arm_pattern.to_vec();

        debug!("Relax step is applied. Remaining steps: {remaining_steps}.");

        Ok(remaining_steps)
    }

    /// Check the amplitude is in the range of [-1.0, 1.0].
    ///
    /// # Arguments
    /// * `amplitude` - Amplitude to check.
    ///
    /// # Errors
    /// If the amplitude is out of range or NaN.
    fn check_amplitude(amplitude: f64) -> MirrorResult<()> {
        if !(MIN_AMPLITUDE..=MAX_AMPLITUDE).contains(&amplitude) {
            error!("Amplitude {amplitude} must be in the range [{MIN_AMPLITUDE}, {MAX_AMPLITUDE}].");
            return Err(MirrorError::AmplitudeOutOfRange(amplitude));
        }

        Ok(())
    }

    /// Apply the segment voltages and keep them in the session.
    ///
    /// # Arguments
    /// * `mirror_pattern` - Segment voltages.
    fn apply_mirror_pattern(&mut self, mirror_pattern: Vec<f64>) -> MirrorResult<()> {
        self._driver
            .set_segment_voltages(self._session.handle, &mirror_pattern)?;
        self._session.mirror_pattern = mirror_pattern;

        Ok(())
    }

    /// Set the strength of a single Zernike mode.
    ///
    /// # Arguments
    /// * `mode` - Zernike mode.
    /// * `amplitude` - Amplitude in the range of [-1.0, 1.0].
    /// * `verbose` - Log the segment voltages afterwards or not.
    ///
    /// # Errors
    /// If the controller is not initialized, the segment count is unknown,
    /// the amplitude is out of range, or the driver fails.
    pub fn set_single_zernike_strength(
        &mut self,
        mode: ZernikeMode,
        amplitude: f64,
        verbose: bool,
    ) -> MirrorResult<()> {
        self.check_initialized("set the Zernike strength")?;
        self.check_relaxed("set the Zernike strength")?;
        Self::check_amplitude(amplitude)?;

        info!("Setting {} to {amplitude}.", mode.name());

        let mut mirror_pattern = vec![0.0; self._session.segment_count as usize];
        self._driver.calculate_single_zernike_pattern(
            self._session.handle,
            mode.bit_value(),
            amplitude,
            &mut mirror_pattern,
        )?;
        self.apply_mirror_pattern(mirror_pattern)?;

        self.event_queue
            .add_event(Event::get_message_zernike_applied(
                mode.bit_value(),
                &[amplitude],
            ));

        if verbose {
            self.get_state()?;
        }

        Ok(())
    }

    /// Set the strengths of multiple Zernike modes at once.
    ///
    /// # Arguments
    /// * `mode_mask` - Mask of the active modes. The bit i selects the
    /// amplitude i.
    /// * `amplitudes` - Amplitudes of all 12 modes in the order of the bits.
    /// Each is in the range of [-1.0, 1.0].
    /// * `verbose` - Log the segment voltages afterwards or not.
    ///
    /// # Errors
    /// If the controller is not initialized, the amplitudes or the mask are
    /// invalid, or the driver fails.
    pub fn set_zernike_strength(
        &mut self,
        mode_mask: u32,
        amplitudes: &[f64],
        verbose: bool,
    ) -> MirrorResult<()> {
        self.check_initialized("set the Zernike strengths")?;
        self.check_relaxed("set the Zernike strengths")?;

        if amplitudes.len() != NUM_ZERNIKE_MODE {
            error!(
                "Amplitude list length must be {NUM_ZERNIKE_MODE}, got {}.",
                amplitudes.len()
            );
            return Err(MirrorError::AmplitudeLength(amplitudes.len()));
        }

        for amplitude in amplitudes {
            Self::check_amplitude(*amplitude)?;
        }

        if mode_mask & !ZernikeMode::ALL_MASK != 0 {
            error!("Zernike mode mask {mode_mask:#X} selects undefined modes.");
            return Err(MirrorError::InvalidModeMask(mode_mask));
        }

        info!("Setting the following amplitudes (in order): {amplitudes:?}.");
        debug!(
            "Active Zernike modes: {:?}.",
            ZernikeMode::from_mask(mode_mask)
                .iter()
                .map(|mode| mode.name())
                .collect::<Vec<_>>()
        );

        let mut mirror_pattern = vec![0.0; self._session.segment_count as usize];
        self._driver.calculate_zernike_pattern(
            self._session.handle,
            mode_mask,
            amplitudes,
            &mut mirror_pattern,
        )?;
        self.apply_mirror_pattern(mirror_pattern)?;

        self.event_queue
            .add_event(Event::get_message_zernike_applied(mode_mask, amplitudes));

        if verbose {
            self.get_state()?;
        }

        Ok(())
    }

    /// Set the strengths of the listed Zernike modes. The other modes are
    /// not selected.
    ///
    /// # Arguments
    /// * `modes` - Zernike modes and their amplitudes. A repeated mode uses
    /// the last amplitude.
    /// * `verbose` - Log the segment voltages afterwards or not.
    ///
    /// # Errors
    /// Same as the `set_zernike_strength()`.
    pub fn set_zernike_modes(
        &mut self,
        modes: &[(ZernikeMode, f64)],
        verbose: bool,
    ) -> MirrorResult<()> {
        let mut amplitudes = [0.0; NUM_ZERNIKE_MODE];
        modes.iter().for_each(|(mode, amplitude)| {
            amplitudes[mode.value() as usize] = *amplitude;
        });

        let selected: Vec<ZernikeMode> = modes.iter().map(|(mode, _)| *mode).collect();

        self.set_zernike_strength(ZernikeMode::mask(&selected), &amplitudes, verbose)
    }

    /// Get the last applied voltages and log the segment voltages. There is
    /// no call to the driver.
    ///
    /// # Returns
    /// Applied voltages.
    ///
    /// # Errors
    /// If the controller is not initialized.
    pub fn get_state(&self) -> MirrorResult<MirrorState> {
        self.check_initialized("get the state")?;

        self._session
            .mirror_pattern
            .iter()
            .enumerate()
            .for_each(|(idx, voltage)| {
                info!("Segment voltage in segment {}: {voltage}.", idx + 1);
            });

        Ok(MirrorState {
            segment_count: self._session.segment_count,
            tilt_count: self._session.tilt_count,
            segment_voltages: self._session.mirror_pattern.clone(),
            tilt_voltages: self._session.arm_pattern.clone(),
        })
    }

    /// Close the session. The controller can not be used afterwards.
    ///
    /// # Errors
    /// If the controller is not initialized or the driver fails to close the
    /// session. The controller is disconnected in the latter case as well.
    pub fn disconnect(&mut self) -> MirrorResult<()> {
        self.check_initialized("disconnect")?;

        let result = self._driver.close(self._session.handle);
        self.set_state(ControllerState::Disconnected);

        if let Err(error) = &result {
            error!("Failed to close the session: {error}");
        }

        result
    }
}

impl<D: MirrorDriver> Drop for MirrorController<D> {
    fn drop(&mut self) {
        if self._state != ControllerState::Initialized {
            return;
        }

        info!("Close the session of the dropped controller.");
        if let Err(error) = self._driver.close(self._session.handle) {
            error!("Failed to close the session: {error}");
        }
    }
}
