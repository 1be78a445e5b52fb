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

//! Errors reported by the mirror controller and the drivers.
//!
//! The variants follow the kinds of failure a session can run into: the
//! environment (vendor libraries), the absence of a device, an operation
//! called in the wrong state, an invalid command, and a failure reported by
//! the driver itself.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the mirror error type.
pub type MirrorResult<T> = std::result::Result<T, MirrorError>;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Missing library file {path:?}: {reason}.")]
    LibraryNotFound { path: PathBuf, reason: String },

    #[error("Missing symbol {symbol} in the driver library: {reason}.")]
    SymbolNotFound { symbol: String, reason: String },

    #[error("No deformable mirror device found.")]
    NoDevice,

    #[error("Device must first be initialized.")]
    NotInitialized,

    #[error("Device is already initialized.")]
    AlreadyInitialized,

    #[error("Device is disconnected.")]
    Disconnected,

    #[error("Segment count of the device is unknown. Relax the device first.")]
    NotRelaxed,

    #[error("Amplitude {0} must be in the range [-1.0, 1.0].")]
    AmplitudeOutOfRange(f64),

    #[error("Amplitude list length must be 12, got {0}.")]
    AmplitudeLength(usize),

    #[error("Zernike mode mask {0:#X} selects undefined modes.")]
    InvalidModeMask(u32),

    #[error("Driver function {function} returned the status {status:#X}.")]
    DriverStatus { function: String, status: i32 },

    #[error("Driver pattern has {actual} values, expected {expected}.")]
    PatternLength { expected: usize, actual: usize },

    #[error("Relaxation did not complete within {steps} steps.")]
    RelaxNotConverged { steps: u32 },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl MirrorError {
    /// Create the driver status error.
    ///
    /// # Arguments
    /// * `function` - Name of the driver function.
    /// * `status` - Returned status.
    ///
    /// # Returns
    /// Driver status error.
    pub fn driver_status(function: &str, status: i32) -> Self {
        MirrorError::DriverStatus {
            function: String::from(function),
            status: status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_status() {
        let error = MirrorError::driver_status("TLDFMX_init", -1074001917);

        assert_eq!(
            error.to_string(),
            "Driver function TLDFMX_init returned the status 0xBFFC0803."
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            MirrorError::AmplitudeLength(3).to_string(),
            "Amplitude list length must be 12, got 3."
        );
        assert_eq!(
            MirrorError::InvalidModeMask(0x1000).to_string(),
            "Zernike mode mask 0x1000 selects undefined modes."
        );
        assert_eq!(
            MirrorError::PatternLength {
                expected: 40,
                actual: 0
            }
            .to_string(),
            "Driver pattern has 0 values, expected 40."
        );
    }
}
