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

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::processor::FeedbackSounds;

mod audio;
mod catalog;
mod error;
mod feedback;

pub use self::audio::Audio;
pub use self::catalog::Catalog;
pub use self::error::ConfigError;
pub use self::feedback::Feedback;

/// Prefix for environment overrides, e.g. MESHTONE__AUDIO__DEVICE=mock.
const ENV_PREFIX: &str = "MESHTONE";

/// Which network collaborator the node talks to.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Collaborator {
    /// Line-delimited JSON over stdin/stdout.
    #[default]
    Stdio,
    /// In-process echo of every publish.
    Loopback,
}

/// The node configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Node {
    #[serde(default)]
    audio: Audio,

    catalog: Catalog,

    #[serde(default)]
    feedback: Feedback,

    #[serde(default)]
    collaborator: Collaborator,

    /// The directory of the file this was loaded from.
    #[serde(skip)]
    config_dir: PathBuf,
}

impl Node {
    /// Loads and validates the configuration at the given path. Environment variables
    /// prefixed with MESHTONE__ override file values.
    pub fn deserialize(path: &Path) -> Result<Node, ConfigError> {
        let builder = Config::builder().add_source(File::from(path)).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let config_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Node::build(builder.build()?, config_dir)
    }

    fn build(config: Config, config_dir: PathBuf) -> Result<Node, ConfigError> {
        let mut node = config.try_deserialize::<Node>()?;
        node.config_dir = config_dir;
        node.validate()?;
        Ok(node)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        self.feedback_sounds().map(|_| ())
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the sample catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the directory sample locators resolve against.
    pub fn sample_base_path(&self) -> PathBuf {
        self.catalog.base_path(&self.config_dir)
    }

    /// Returns the feedback role bindings.
    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    /// Returns the validated feedback sounds for the processor.
    pub fn feedback_sounds(&self) -> Result<FeedbackSounds, ConfigError> {
        self.feedback.to_sounds(self.catalog.len())
    }

    /// Returns the configured collaborator.
    pub fn collaborator(&self) -> Collaborator {
        self.collaborator
    }
}
