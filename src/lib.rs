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

//! Sonifies the lifecycle of a peer-to-peer overlay network: discovery, gossip and sync
//! events received from a network collaborator are mapped to sounds on a shared output
//! device.

pub mod audio;
pub mod collaborator;
pub mod config;
pub mod events;
pub mod node;
pub mod peers;
pub mod playback;
pub mod playsync;
pub mod processor;
pub mod publish;
pub mod samples;
pub mod trigger;

#[cfg(test)]
mod testutil;
