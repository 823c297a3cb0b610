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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::playback::PlayOptions;
use crate::processor::FeedbackSounds;

/// Binds the fixed feedback roles to catalog indices. Every binding defaults to its
/// position in the role list.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Feedback {
    discovery: Option<usize>,
    joined: Option<usize>,
    neighbor_up: Option<usize>,
    neighbor_down: Option<usize>,
    sync_started: Option<usize>,
    sync_failed: Option<usize>,

    /// Upper bound for fire-and-forget feedback sounds, e.g. "2s".
    duration: Option<String>,

    /// Whether the sync sound repeats until the sync ends (default: true).
    sync_loop: Option<bool>,

    /// Upper bound for a sync session, e.g. "30s".
    sync_max_duration: Option<String>,

    /// Whether SyncFailed also ends the peer's oldest sync (default: false).
    stop_sync_on_failure: Option<bool>,
}

impl Feedback {
    /// Returns the role bindings as (role name, index) pairs.
    pub fn roles(&self) -> [(&'static str, usize); 6] {
        [
            ("discovery", self.discovery.unwrap_or(0)),
            ("joined", self.joined.unwrap_or(1)),
            ("neighbor_up", self.neighbor_up.unwrap_or(2)),
            ("neighbor_down", self.neighbor_down.unwrap_or(3)),
            ("sync_started", self.sync_started.unwrap_or(4)),
            ("sync_failed", self.sync_failed.unwrap_or(5)),
        ]
    }

    /// Validates the bindings against the catalog size and builds the processor's view.
    pub fn to_sounds(&self, catalog_len: usize) -> Result<FeedbackSounds, ConfigError> {
        let roles = self.roles();
        for (i, &(role, index)) in roles.iter().enumerate() {
            if index >= catalog_len {
                return Err(ConfigError::RoleOutOfBounds {
                    role,
                    index,
                    len: catalog_len,
                });
            }
            if let Some(&(first, _)) = roles[..i].iter().find(|&&(_, other)| other == index) {
                return Err(ConfigError::DuplicateRole {
                    first,
                    second: role,
                    index,
                });
            }
        }

        Ok(FeedbackSounds {
            discovery: roles[0].1,
            joined: roles[1].1,
            neighbor_up: roles[2].1,
            neighbor_down: roles[3].1,
            sync_started: roles[4].1,
            sync_failed: roles[5].1,
            feedback: PlayOptions {
                duration: parse_duration("duration", &self.duration)?,
                ..Default::default()
            },
            sync: PlayOptions {
                duration: parse_duration("sync_max_duration", &self.sync_max_duration)?,
                looping: self.sync_loop.unwrap_or(true),
                ..Default::default()
            },
            stop_sync_on_failure: self.stop_sync_on_failure.unwrap_or(false),
        })
    }
}

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.clone())
            .map(|duration| Some(duration.into()))
            .map_err(|e| ConfigError::Duration {
                field,
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}
