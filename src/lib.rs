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

//! # Deformable Mirror Control
//!
//! This library controls a segmented deformable mirror through the vendor
//! driver. The mirror is initialized with the extended function set, relaxed
//! to the neutral state, and shaped with the Zernike modes.
//!
//! ```no_run
//! use deformable_mirror::config::ControllerConfig;
//! use deformable_mirror::controller::MirrorController;
//! use deformable_mirror::enums::ZernikeMode;
//!
//! let config = ControllerConfig::default();
//! let mut controller = MirrorController::discover(&config)?;
//! controller.initialize()?;
//! controller.set_single_zernike_strength(ZernikeMode::Defocus, 0.5, false)?;
//! controller.disconnect()?;
//! # Ok::<(), deformable_mirror::error::MirrorError>(())
//! ```
pub mod config;
pub mod constants;
pub mod controller;
pub mod driver;
pub mod enums;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod logger;
pub mod mock;
