// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Catalog samples and their decoded buffers.
//!
//! This module provides:
//! - Static sample descriptors addressed by catalog index
//! - Background loading into per-index buffer slots
//! - Synchronous readiness queries for the playback path

mod library;
mod loader;

pub use library::{NotReady, Readiness, SampleDescriptor, SampleLibrary};
pub use loader::{DecodedBuffer, SampleLoader};
