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

//! The boundary to the network collaborator.

use std::error::Error;
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::events::ChannelMessage;
use crate::publish::Publish;

pub mod loopback;
pub mod stdio;

/// Error returned when a publish couldn't be handed to the collaborator.
pub type SendError = Box<dyn Error + Send + Sync>;

/// The network side of a node. It emits inbound messages and accepts publishes.
pub trait Collaborator: Send + Sync + 'static {
    /// Hands the inbound channel to the collaborator. Nothing is emitted before this is
    /// called. The returned task ends when the collaborator has no more messages.
    fn attach(&self, events_tx: Sender<ChannelMessage>) -> JoinHandle<Result<(), io::Error>>;

    /// Sends a publish command to the network.
    fn publish(&self, message: Publish) -> Result<(), SendError>;

    /// Stops emitting messages. Collaborators that end on their own may ignore this.
    fn close(&self) {}
}
