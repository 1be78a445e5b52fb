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

//! Binding of the vendor driver libraries.
//!
//! The core library (TLDFM) and the extended library (TLDFMX) are loaded at
//! run time and the used functions are resolved once. The functions follow
//! the VISA instrument driver conventions: a negative status is an error and
//! a positive status is a warning.
//!
//! The counts of the session are queried before every call with a pattern,
//! and a pattern of another length is rejected before it reaches the driver.

use libloading::Library;
use log::{debug, warn};
use std::ffi::{c_char, CStr, CString};
use std::path::Path;

use crate::config::ControllerConfig;
use crate::constants::{DRIVER_BUFFER_SIZE, NUM_ZERNIKE_MODE};
use crate::driver::{check_pattern_length, DeviceInformation, MirrorDriver, SessionHandle};
use crate::enums::RelaxPart;
use crate::error::{MirrorError, MirrorResult};

type ViStatus = i32;
type ViSession = u32;
type ViBoolean = u16;

const VI_NULL: ViSession = 0;
const VI_TRUE: ViBoolean = 1;
const VI_FALSE: ViBoolean = 0;
const VI_ERROR_INV_RSRC_NAME: ViStatus = 0xBFFF0012_u32 as i32;

type FnGetDeviceCount = unsafe extern "system" fn(ViSession, *mut u32) -> ViStatus;
type FnGetDeviceInformation = unsafe extern "system" fn(
    ViSession,
    u32,
    *mut c_char,
    *mut c_char,
    *mut c_char,
    *mut ViBoolean,
    *mut c_char,
) -> ViStatus;
type FnGetCount = unsafe extern "system" fn(ViSession, *mut u32) -> ViStatus;
type FnSetVoltages = unsafe extern "system" fn(ViSession, *const f64) -> ViStatus;
type FnInit =
    unsafe extern "system" fn(*const c_char, ViBoolean, ViBoolean, *mut ViSession) -> ViStatus;
type FnRelax = unsafe extern "system" fn(
    ViSession,
    u32,
    ViBoolean,
    ViBoolean,
    *mut f64,
    *mut f64,
    *mut i32,
) -> ViStatus;
type FnCalculateSingleZernikePattern =
    unsafe extern "system" fn(ViSession, u32, f64, *mut f64) -> ViStatus;
type FnCalculateZernikePattern =
    unsafe extern "system" fn(ViSession, u32, *const f64, *mut f64) -> ViStatus;
type FnClose = unsafe extern "system" fn(ViSession) -> ViStatus;

pub struct NativeDriver {
    // Resolved functions. They are valid as long as the libraries are loaded.
    _get_device_count: FnGetDeviceCount,
    _get_device_information: FnGetDeviceInformation,
    _get_segment_count: FnGetCount,
    _get_tilt_count: FnGetCount,
    _set_segment_voltages: FnSetVoltages,
    _set_tilt_voltages: FnSetVoltages,
    _init: FnInit,
    _relax: FnRelax,
    _calculate_single_zernike_pattern: FnCalculateSingleZernikePattern,
    _calculate_zernike_pattern: FnCalculateZernikePattern,
    _close: FnClose,
    // Loaded libraries, dropped after the functions above.
    _library_core: Library,
    _library_extended: Library,
}

impl NativeDriver {
    /// Load the driver libraries.
    ///
    /// # Arguments
    /// * `config` - Configuration with the library paths.
    ///
    /// # Returns
    /// Native driver.
    ///
    /// # Errors
    /// If a library or one of the used functions is missing.
    pub fn load(config: &ControllerConfig) -> MirrorResult<Self> {
        let library_core = Self::load_library(&config.library_core)?;
        let library_extended = Self::load_library(&config.library_extended)?;

        Ok(Self {
            _get_device_count: get_function(&library_core, "TLDFM_get_device_count")?,
            _get_device_information: get_function(
                &library_core,
                "TLDFM_get_device_information",
            )?,
            _get_segment_count: get_function(&library_core, "TLDFM_get_segment_count")?,
            _get_tilt_count: get_function(&library_core, "TLDFM_get_tilt_count")?,
            _set_segment_voltages: get_function(&library_core, "TLDFM_set_segment_voltages")?,
            _set_tilt_voltages: get_function(&library_core, "TLDFM_set_tilt_voltages")?,
            _init: get_function(&library_extended, "TLDFMX_init")?,
            _relax: get_function(&library_extended, "TLDFMX_relax")?,
            _calculate_single_zernike_pattern: get_function(
                &library_extended,
                "TLDFMX_calculate_single_zernike_pattern",
            )?,
            _calculate_zernike_pattern: get_function(
                &library_extended,
                "TLDFMX_calculate_zernike_pattern",
            )?,
            _close: get_function(&library_extended, "TLDFMX_close")?,

            _library_core: library_core,
            _library_extended: library_extended,
        })
    }

    /// Load the library.
    ///
    /// # Arguments
    /// * `filepath` - Path to the library.
    ///
    /// # Returns
    /// Library.
    fn load_library(filepath: &Path) -> MirrorResult<Library> {
        debug!("Load the driver library: {:?}.", filepath);

        // SAFETY: The vendor libraries have no initialization routines that
        // depend on the state of this process.
        unsafe { Library::new(filepath) }.map_err(|error| MirrorError::LibraryNotFound {
            path: filepath.to_path_buf(),
            reason: error.to_string(),
        })
    }
}

/// Resolve the function in the library.
///
/// # Arguments
/// * `library` - Loaded library.
/// * `name` - Name of the function.
///
/// # Returns
/// Function pointer.
fn get_function<T: Copy>(library: &Library, name: &str) -> MirrorResult<T> {
    // SAFETY: The type aliases above follow the prototypes in the vendor
    // headers.
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|error| MirrorError::SymbolNotFound {
            symbol: String::from(name),
            reason: error.to_string(),
        })
}

/// Check the status returned by the driver function.
///
/// # Arguments
/// * `function` - Name of the function.
/// * `status` - Returned status.
///
/// # Errors
/// If the status is negative.
fn check_status(function: &str, status: ViStatus) -> MirrorResult<()> {
    if status < 0 {
        return Err(MirrorError::driver_status(function, status));
    }

    if status > 0 {
        warn!("Driver function {function} returned the warning {status:#X}.");
    }

    Ok(())
}

/// Convert the boolean to the VISA boolean.
fn to_vi_boolean(value: bool) -> ViBoolean {
    if value {
        VI_TRUE
    } else {
        VI_FALSE
    }
}

/// Convert the null-terminated buffer to a string.
fn buffer_to_string(buffer: &[u8]) -> String {
    match CStr::from_bytes_until_nul(buffer) {
        Ok(value) => value.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(buffer).into_owned(),
    }
}

impl MirrorDriver for NativeDriver {
    fn get_device_count(&mut self) -> MirrorResult<u32> {
        let mut count: u32 = 0;

        // SAFETY: The pointer is valid during the call.
        let status = unsafe { (self._get_device_count)(VI_NULL, &mut count) };
        check_status("TLDFM_get_device_count", status)?;

        Ok(count)
    }

    fn get_device_information(&mut self, index: u32) -> MirrorResult<DeviceInformation> {
        let mut manufacturer = vec![0_u8; DRIVER_BUFFER_SIZE];
        let mut instrument_name = vec![0_u8; DRIVER_BUFFER_SIZE];
        let mut serial_number = vec![0_u8; DRIVER_BUFFER_SIZE];
        let mut is_available: ViBoolean = VI_FALSE;
        let mut resource_name = vec![0_u8; DRIVER_BUFFER_SIZE];

        // SAFETY: The buffers have the size required by the driver.
        let status = unsafe {
            (self._get_device_information)(
                VI_NULL,
                index,
                manufacturer.as_mut_ptr() as *mut c_char,
                instrument_name.as_mut_ptr() as *mut c_char,
                serial_number.as_mut_ptr() as *mut c_char,
                &mut is_available,
                resource_name.as_mut_ptr() as *mut c_char,
            )
        };
        check_status("TLDFM_get_device_information", status)?;

        Ok(DeviceInformation {
            manufacturer: buffer_to_string(&manufacturer),
            instrument_name: buffer_to_string(&instrument_name),
            serial_number: buffer_to_string(&serial_number),
            is_available: is_available != VI_FALSE,
            resource_name: buffer_to_string(&resource_name),
        })
    }

    fn get_segment_count(&mut self, session: SessionHandle) -> MirrorResult<u32> {
        let mut count: u32 = 0;

        // SAFETY: The pointer is valid during the call.
        let status = unsafe { (self._get_segment_count)(session.0, &mut count) };
        check_status("TLDFM_get_segment_count", status)?;

        Ok(count)
    }

    fn get_tilt_count(&mut self, session: SessionHandle) -> MirrorResult<u32> {
        let mut count: u32 = 0;

        // SAFETY: The pointer is valid during the call.
        let status = unsafe { (self._get_tilt_count)(session.0, &mut count) };
        check_status("TLDFM_get_tilt_count", status)?;

        Ok(count)
    }

    fn set_segment_voltages(
        &mut self,
        session: SessionHandle,
        pattern: &[f64],
    ) -> MirrorResult<()> {
        let segment_count = self.get_segment_count(session)?;
        check_pattern_length(
            "TLDFM_set_segment_voltages",
            segment_count as usize,
            pattern.len(),
        )?;

        // SAFETY: The pattern has the length of the segment count.
        let status = unsafe { (self._set_segment_voltages)(session.0, pattern.as_ptr()) };
        check_status("TLDFM_set_segment_voltages", status)
    }

    fn set_tilt_voltages(&mut self, session: SessionHandle, pattern: &[f64]) -> MirrorResult<()> {
        let tilt_count = self.get_tilt_count(session)?;
        check_pattern_length(
            "TLDFM_set_tilt_voltages",
            tilt_count as usize,
            pattern.len(),
        )?;

        // SAFETY: The pattern has the length of the tilt count.
        let status = unsafe { (self._set_tilt_voltages)(session.0, pattern.as_ptr()) };
        check_status("TLDFM_set_tilt_voltages", status)
    }

    fn init(
        &mut self,
        resource_name: &str,
        exclusive: bool,
        reserved: bool,
    ) -> MirrorResult<SessionHandle> {
        let resource = CString::new(resource_name)
            .map_err(|_| MirrorError::driver_status("TLDFMX_init", VI_ERROR_INV_RSRC_NAME))?;
        let mut handle: ViSession = VI_NULL;

        // SAFETY: The resource name is null-terminated and the handle pointer
        // is valid during the call.
        let status = unsafe {
            (self._init)(
                resource.as_ptr(),
                to_vi_boolean(exclusive),
                to_vi_boolean(reserved),
                &mut handle,
            )
        };

        // Any warning of the initialization is treated as a failure.
        if status != 0 {
            return Err(MirrorError::driver_status("TLDFMX_init", status));
        }

        Ok(SessionHandle(handle))
    }

    fn relax(
        &mut self,
        session: SessionHandle,
        part: RelaxPart,
        is_first_step: bool,
        reload: bool,
        mirror_pattern: &mut [f64],
        arm_pattern: &mut [f64],
    ) -> MirrorResult<i32> {
        let segment_count = self.get_segment_count(session)?;
        check_pattern_length("TLDFMX_relax", segment_count as usize, mirror_pattern.len())?;

        let tilt_count = self.get_tilt_count(session)?;
        check_pattern_length("TLDFMX_relax", tilt_count as usize, arm_pattern.len())?;

        let mut remaining_steps: i32 = 0;

        // SAFETY: The patterns have the lengths of the segment and tilt
        // counts.
        let status = unsafe {
            (self._relax)(
                session.0,
                part as u32,
                to_vi_boolean(is_first_step),
                to_vi_boolean(reload),
                mirror_pattern.as_mut_ptr(),
                arm_pattern.as_mut_ptr(),
                &mut remaining_steps,
            )
        };
        check_status("TLDFMX_relax", status)?;

        Ok(remaining_steps)
    }

    fn calculate_single_zernike_pattern(
        &mut self,
        session: SessionHandle,
        mode_bit: u32,
        amplitude: f64,
        mirror_pattern: &mut [f64],
    ) -> MirrorResult<()> {
        let segment_count = self.get_segment_count(session)?;
        check_pattern_length(
            "TLDFMX_calculate_single_zernike_pattern",
            segment_count as usize,
            mirror_pattern.len(),
        )?;

        // SAFETY: The pattern has the length of the segment count.
        let status = unsafe {
            (self._calculate_single_zernike_pattern)(
                session.0,
                mode_bit,
                amplitude,
                mirror_pattern.as_mut_ptr(),
            )
        };
        check_status("TLDFMX_calculate_single_zernike_pattern", status)
    }

    fn calculate_zernike_pattern(
        &mut self,
        session: SessionHandle,
        mode_mask: u32,
        amplitudes: &[f64],
        mirror_pattern: &mut [f64],
    ) -> MirrorResult<()> {
        if amplitudes.len() != NUM_ZERNIKE_MODE {
            return Err(MirrorError::AmplitudeLength(amplitudes.len()));
        }

        let segment_count = self.get_segment_count(session)?;
        check_pattern_length(
            "TLDFMX_calculate_zernike_pattern",
            segment_count as usize,
            mirror_pattern.len(),
        )?;

        // SAFETY: The amplitudes have one value per Zernike mode and the
        // pattern has the length of the segment count.
        let status = unsafe {
            (self._calculate_zernike_pattern)(
                session.0,
                mode_mask,
                amplitudes.as_ptr(),
                mirror_pattern.as_mut_ptr(),
            )
        };
        check_status("TLDFMX_calculate_zernike_pattern", status)
    }

    fn close(&mut self, session: SessionHandle) -> MirrorResult<()> {
        // SAFETY: The handle comes from the initialization.
        let status = unsafe { (self._close)(session.0) };
        check_status("TLDFMX_close", status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    #[test]
    fn test_load_missing_library() {
        let config = ControllerConfig {
            library_core: PathBuf::from("/not/exist/libTLDFM.so"),
            ..ControllerConfig::default()
        };

        match NativeDriver::load(&config) {
            Err(MirrorError::LibraryNotFound { path, .. }) => {
                assert_eq!(path, PathBuf::from("/not/exist/libTLDFM.so"));
            }
            _ => panic!("Should fail to load the library"),
        }
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("TLDFM_get_segment_count", 0).is_ok());
        assert!(check_status("TLDFM_get_segment_count", 0x3FFC0801).is_ok());

        assert!(matches!(
            check_status("TLDFM_get_segment_count", VI_ERROR_INV_RSRC_NAME),
            Err(MirrorError::DriverStatus { .. })
        ));
    }

    #[test]
    fn test_to_vi_boolean() {
        assert_eq!(to_vi_boolean(true), VI_TRUE);
        assert_eq!(to_vi_boolean(false), VI_FALSE);
    }

    #[test]
    fn test_buffer_to_string() {
        let mut buffer = vec![0_u8; DRIVER_BUFFER_SIZE];
        buffer[..5].copy_from_slice(b"DMP40");

        assert_eq!(buffer_to_string(&buffer), "DMP40");
        assert_eq!(buffer_to_string(b"no terminator"), "no terminator");
    }
}
