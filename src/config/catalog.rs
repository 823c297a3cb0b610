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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::samples::SampleDescriptor;

/// The static, ordered list of samples. An entry's position is its index.
#[derive(Deserialize, Clone, Debug)]
pub struct Catalog {
    /// Directory the sample locators are relative to. Itself relative to the config
    /// file's directory.
    base_path: Option<PathBuf>,

    /// Sample file locators, in index order.
    samples: Vec<String>,
}

impl Catalog {
    /// Creates a new catalog configuration.
    pub fn new(base_path: Option<PathBuf>, samples: &[&str]) -> Catalog {
        Catalog {
            base_path,
            samples: samples.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the catalog has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the descriptors, in index order.
    pub fn descriptors(&self) -> Vec<SampleDescriptor> {
        self.samples
            .iter()
            .enumerate()
            .map(|(index, locator)| SampleDescriptor::new(index, locator))
            .collect()
    }

    /// Resolves the base path against the directory holding the config file.
    pub fn base_path(&self, config_dir: &Path) -> PathBuf {
        match &self.base_path {
            Some(base_path) => config_dir.join(base_path),
            None => config_dir.to_path_buf(),
        }
    }
}
