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
/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from an invalid feedback binding without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("catalog has no samples")]
    EmptyCatalog,

    #[error("feedback role {role} is bound to index {index}, but the catalog has {len} samples")]
    RoleOutOfBounds {
        role: &'static str,
        index: usize,
        len: usize,
    },

    #[error("feedback roles {first} and {second} are both bound to index {index}")]
    DuplicateRole {
        first: &'static str,
        second: &'static str,
        index: usize,
    },

    #[error("invalid duration for {field}: {message}")]
    Duration {
        field: &'static str,
        message: String,
    },
}
