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

//! The sample library: one buffer slot per catalog entry, filled in the background.
//!
//! Playback never waits on a load. A slot is queried synchronously and anything short
//! of `Ready` is reported as [`NotReady`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::loader::{DecodedBuffer, SampleLoader};
use crate::audio::decode::DecodeError;

/// A catalog entry. The index is the entry's position in the catalog and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescriptor {
    index: usize,
    source_locator: String,
}

impl SampleDescriptor {
    /// Creates a new descriptor.
    pub fn new(index: usize, source_locator: &str) -> SampleDescriptor {
        SampleDescriptor {
            index,
            source_locator: source_locator.to_string(),
        }
    }

    /// Returns the catalog index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns where the sample data lives.
    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }
}

/// The load state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Absent,
    Loading,
    Ready,
    /// The load failed. The slot stays unusable for the rest of the run.
    Failed,
}

/// Why a sample can't be handed out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotReady {
    #[error("sample {index} is outside the catalog of {len} samples")]
    OutOfBounds { index: usize, len: usize },

    #[error("sample {0} has not been loaded")]
    Absent(usize),

    #[error("sample {0} is still loading")]
    Loading(usize),

    #[error("sample {0} failed to load")]
    Failed(usize),
}

enum Slot {
    Absent,
    Loading,
    Ready(Arc<DecodedBuffer>),
    Failed,
}

/// Holds the decoded buffers for every catalog entry.
pub struct SampleLibrary {
    loader: SampleLoader,
    base_path: PathBuf,
    slots: Vec<RwLock<Slot>>,
}

impl SampleLibrary {
    /// Creates a library with `len` empty slots. Relative locators are resolved against
    /// `base_path`, and every buffer is transcoded to `target_sample_rate`.
    pub fn new(len: usize, target_sample_rate: u32, base_path: &Path) -> SampleLibrary {
        SampleLibrary {
            loader: SampleLoader::new(target_sample_rate),
            base_path: base_path.to_path_buf(),
            slots: (0..len).map(|_| RwLock::new(Slot::Absent)).collect(),
        }
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the library has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the load state of a slot, or None if the index is out of bounds.
    pub fn readiness(&self, index: usize) -> Option<Readiness> {
        self.slots.get(index).map(|slot| match *slot.read() {
            Slot::Absent => Readiness::Absent,
            Slot::Loading => Readiness::Loading,
            Slot::Ready(_) => Readiness::Ready,
            Slot::Failed => Readiness::Failed,
        })
    }

    /// Returns the buffer for the given index if it's ready.
    pub fn get(&self, index: usize) -> Result<Arc<DecodedBuffer>, NotReady> {
        let slot = self.slots.get(index).ok_or(NotReady::OutOfBounds {
            index,
            len: self.slots.len(),
        })?;

        match &*slot.read() {
            Slot::Ready(buffer) => Ok(buffer.clone()),
            Slot::Absent => Err(NotReady::Absent(index)),
            Slot::Loading => Err(NotReady::Loading(index)),
            Slot::Failed => Err(NotReady::Failed(index)),
        }
    }

    /// Stores a decoded buffer. A ready slot is immutable, so this returns false if the
    /// slot is already ready or the index is out of bounds.
    pub fn store(&self, index: usize, buffer: DecodedBuffer) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };

        let mut slot = slot.write();
        if matches!(*slot, Slot::Ready(_)) {
            return false;
        }
        *slot = Slot::Ready(Arc::new(buffer));
        true
    }

    /// Starts loading every catalog entry. Each entry loads on its own blocking task, so
    /// one failure never holds up the others. The returned handles may be dropped.
    pub fn load(self: &Arc<Self>, catalog: &[SampleDescriptor]) -> Vec<JoinHandle<()>> {
        info!(samples = catalog.len(), "Loading sample catalog");

        catalog
            .iter()
            .cloned()
            .map(|descriptor| {
                let library = self.clone();
                tokio::task::spawn_blocking(move || {
                    // Failures are logged inside; the slot records them.
                    let _ = library.load_blocking(&descriptor);
                })
            })
            .collect()
    }

    /// Loads a single entry on the current thread. Only an absent slot is loaded; a slot
    /// that is loading, ready or failed is left as it is.
    pub fn load_blocking(&self, descriptor: &SampleDescriptor) -> Result<(), DecodeError> {
        let index = descriptor.index();
        let Some(slot) = self.slots.get(index) else {
            warn!(
                index,
                len = self.slots.len(),
                "Catalog entry outside the library, skipping"
            );
            return Ok(());
        };

        {
            let mut slot = slot.write();
            if !matches!(*slot, Slot::Absent) {
                debug!(index, "Sample already loading or loaded");
                return Ok(());
            }
            *slot = Slot::Loading;
        }

        let path = self.resolve(descriptor.source_locator());
        match self.loader.load(&path) {
            Ok(buffer) => {
                *slot.write() = Slot::Ready(Arc::new(buffer));
                debug!(index, "Sample ready");
                Ok(())
            }
            Err(e) => {
                warn!(index, path = ?path, error = %e, "Failed to load sample");
                *slot.write() = Slot::Failed;
                Err(e)
            }
        }
    }

    /// Returns the total memory used by ready buffers.
    pub fn memory_usage(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| match &*slot.read() {
                Slot::Ready(buffer) => buffer.memory_size(),
                _ => 0,
            })
            .sum()
    }

    fn resolve(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl std::fmt::Debug for SampleLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLibrary")
            .field("slots", &self.slots.len())
            .field("base_path", &self.base_path)
            .field("memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}
