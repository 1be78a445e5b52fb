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

use log::SetLoggerError;
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger,
    TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::Path;

/// Get the log filter.
///
/// # Arguments
/// * `log_level` - Log level: 0 (Off), 1 (Error), 2 (Warn), 3 (Info), 4
/// (Debug), 5 (Trace).
///
/// # Returns
/// Log filter. The default is Info.
pub fn get_log_filter(log_level: Option<u32>) -> LevelFilter {
    match log_level {
        Some(0) => LevelFilter::Off,
        Some(1) => LevelFilter::Error,
        Some(2) => LevelFilter::Warn,
        Some(4) => LevelFilter::Debug,
        Some(5) => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initiate the logger of the terminal and the optional log file. The
/// controller logs the driver calls at the debug level.
///
/// # Arguments
/// * `level` - Log level.
/// * `filepath` - Log file path. Put None to log to the terminal only.
///
/// # Errors
/// If a global logger was set already.
pub fn initiate_logger(level: LevelFilter, filepath: Option<&Path>) -> Result<(), SetLoggerError> {
    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]/[month]/[day] [hour]:[minute]:[second].[subsecond]"
        ))
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));

    if let Some(filepath) = filepath {
        match File::create(filepath) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(error) => eprintln!("Failed to create the log file {:?}: {error}.", filepath),
        }
    }

    CombinedLogger::init(loggers)
}

#[cfg(test)]
mod tests {
    use super::*;

    use log::info;
    use std::fs::read_to_string;
    use tempfile::tempdir;

    #[test]
    fn test_get_log_filter() {
        assert_eq!(get_log_filter(Some(0)), LevelFilter::Off);
        assert_eq!(get_log_filter(Some(1)), LevelFilter::Error);
        assert_eq!(get_log_filter(Some(2)), LevelFilter::Warn);
        assert_eq!(get_log_filter(Some(3)), LevelFilter::Info);
        assert_eq!(get_log_filter(Some(4)), LevelFilter::Debug);
        assert_eq!(get_log_filter(Some(5)), LevelFilter::Trace);

        assert_eq!(get_log_filter(Some(6)), LevelFilter::Info);

        assert_eq!(get_log_filter(None), LevelFilter::Info);
    }

    #[test]
    fn test_initiate_logger() {
        let dir = tempdir().unwrap();
        let filepath = dir.path().join("mirror.log");

        assert!(initiate_logger(LevelFilter::Info, Some(&filepath)).is_ok());

        info!("Relaxing the deformable mirror (Both).");

        let content = read_to_string(&filepath).unwrap();
        assert!(content.contains("Relaxing the deformable mirror (Both)."));

        // Only one global logger
        assert!(initiate_logger(LevelFilter::Info, None).is_err());
    }
}
