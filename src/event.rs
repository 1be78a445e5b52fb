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

use serde_json::{json, Value};

use crate::driver::DeviceInformation;
use crate::enums::{ControllerState, RelaxPart};

pub struct Event;
impl Event {
    /// Get the message of the controller state.
    ///
    /// # Arguments
    /// * `state` - Controller state.
    ///
    /// # Returns
    /// The message of the controller state.
    pub fn get_message_controller_state(state: ControllerState) -> Value {
        json!({
            "id": "controllerState",
            "state": state as u8,
        })
    }

    /// Get the message of the device information.
    ///
    /// # Arguments
    /// * `index` - 0-based device index.
    /// * `information` - Device information.
    ///
    /// # Returns
    /// The message of the device information.
    pub fn get_message_device_information(index: u32, information: &DeviceInformation) -> Value {
        json!({
            "id": "deviceInformation",
            "index": index,
            "manufacturer": information.manufacturer,
            "instrumentName": information.instrument_name,
            "serialNumber": information.serial_number,
            "resourceName": information.resource_name,
        })
    }

    /// Get the message that the relaxation is done.
    ///
    /// # Arguments
    /// * `part` - Relaxed part of the device.
    /// * `steps` - Total number of the relax steps.
    /// * `segment_count` - Number of the segments.
    /// * `tilt_count` - Number of the tilt arms.
    ///
    /// # Returns
    /// The message that the relaxation is done.
    pub fn get_message_relaxed(
        part: RelaxPart,
        steps: u32,
        segment_count: u32,
        tilt_count: u32,
    ) -> Value {
        json!({
            "id": "relaxed",
            "part": part as u32,
            "steps": steps,
            "segmentCount": segment_count,
            "tiltCount": tilt_count,
        })
    }

    /// Get the message of the applied Zernike modes.
    ///
    /// # Arguments
    /// * `mode_mask` - Mode mask.
    /// * `amplitudes` - Amplitudes. For a single mode, it has only one value.
    ///
    /// # Returns
    /// The message of the applied Zernike modes.
    pub fn get_message_zernike_applied(mode_mask: u32, amplitudes: &[f64]) -> Value {
        json!({
            "id": "zernikeApplied",
            "mask": mode_mask,
            "amplitudes": amplitudes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_message_controller_state() {
        assert_eq!(
            Event::get_message_controller_state(ControllerState::Initialized),
            json!({
                "id": "controllerState",
                "state": 2,
            })
        );
    }

    #[test]
    fn test_get_message_device_information() {
        let information = DeviceInformation {
            manufacturer: String::from("Thorlabs GmbH"),
            instrument_name: String::from("DMP40"),
            serial_number: String::from("M00000001"),
            is_available: true,
            resource_name: String::from("USB0::0x1313::0x8070::M00000001::INSTR"),
        };

        assert_eq!(
            Event::get_message_device_information(0, &information),
            json!({
                "id": "deviceInformation",
                "index": 0,
                "manufacturer": "Thorlabs GmbH",
                "instrumentName": "DMP40",
                "serialNumber": "M00000001",
                "resourceName": "USB0::0x1313::0x8070::M00000001::INSTR",
            })
        );
    }

    #[test]
    fn test_get_message_relaxed() {
        assert_eq!(
            Event::get_message_relaxed(RelaxPart::Both, 6, 40, 3),
            json!({
                "id": "relaxed",
                "part": 2,
                "steps": 6,
                "segmentCount": 40,
                "tiltCount": 3,
            })
        );
    }

    #[test]
    fn test_get_message_zernike_applied() {
        assert_eq!(
            Event::get_message_zernike_applied(0x002, &[0.5]),
            json!({
                "id": "zernikeApplied",
                "mask": 2,
                "amplitudes": [0.5],
            })
        );
    }
}
