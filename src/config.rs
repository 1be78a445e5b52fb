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

use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_LIBRARY_CORE, DEFAULT_LIBRARY_EXTENDED, DEFAULT_MAX_RELAX_STEPS};
use crate::error::MirrorResult;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ControllerConfig {
    // Path to the core driver library (TLDFM).
    pub library_core: PathBuf,
    // Path to the extended driver library (TLDFMX).
    pub library_extended: PathBuf,
    // 0-based index of the device to initialize.
    pub device_index: u32,
    // Request the exclusive access to the device in the initialization.
    pub exclusive_access: bool,
    // Maximum number of the relax steps after the first one.
    pub max_relax_steps: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            library_core: PathBuf::from(DEFAULT_LIBRARY_CORE),
            library_extended: PathBuf::from(DEFAULT_LIBRARY_EXTENDED),
            device_index: 0,
            exclusive_access: true,
            max_relax_steps: DEFAULT_MAX_RELAX_STEPS,
        }
    }
}

impl ControllerConfig {
    /// Read the configuration from the file. The missing keys use the default
    /// values.
    ///
    /// # Arguments
    /// * `filepath` - Path to the configuration file.
    ///
    /// # Returns
    /// Configuration.
    ///
    /// # Errors
    /// If the file can not be read or a value has the wrong type.
    pub fn from_file(filepath: &Path) -> MirrorResult<Self> {
        let default = Self::default();

        let config = Config::builder()
            .set_default(
                "library_core",
                default.library_core.to_string_lossy().into_owned(),
            )?
            .set_default(
                "library_extended",
                default.library_extended.to_string_lossy().into_owned(),
            )?
            .set_default("device_index", default.device_index as i64)?
            .set_default("exclusive_access", default.exclusive_access)?
            .set_default("max_relax_steps", default.max_relax_steps as i64)?
            .add_source(File::from(filepath))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use tempfile::Builder;

    fn create_config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Should create the temporary file");
        file.write_all(content.as_bytes())
            .expect("Should write the temporary file");

        file
    }

    #[test]
    fn test_default() {
        let config = ControllerConfig::default();

        assert_eq!(config.library_core, PathBuf::from(DEFAULT_LIBRARY_CORE));
        assert_eq!(config.device_index, 0);
        assert!(config.exclusive_access);
        assert_eq!(config.max_relax_steps, DEFAULT_MAX_RELAX_STEPS);
    }

    #[test]
    fn test_from_file() {
        let config = ControllerConfig::from_file(Path::new("config/parameters_mirror.yaml"))
            .expect("Should read the configuration");

        assert_eq!(config.device_index, 0);
        assert!(config.exclusive_access);
        assert_eq!(config.max_relax_steps, 1000);
    }

    #[test]
    fn test_from_file_partial() {
        let file = create_config_file(
            "library_core: /opt/thorlabs/libTLDFM.so\nmax_relax_steps: 20\n",
        );

        let config = ControllerConfig::from_file(file.path()).unwrap();

        assert_eq!(
            config.library_core,
            PathBuf::from("/opt/thorlabs/libTLDFM.so")
        );
        assert_eq!(
            config.library_extended,
            PathBuf::from(DEFAULT_LIBRARY_EXTENDED)
        );
        assert_eq!(config.max_relax_steps, 20);
        assert_eq!(config.device_index, 0);
    }

    #[test]
    fn test_from_file_error() {
        let file = create_config_file("max_relax_steps: many\n");

        assert!(ControllerConfig::from_file(file.path()).is_err());
        assert!(ControllerConfig::from_file(Path::new("config/not_exist.yaml")).is_err());
    }
}
