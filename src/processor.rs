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

//! The event-to-audio state machine.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::events::{ChannelMessage, SystemEventData, SystemEventKind};
use crate::peers::PeerRegistry;
use crate::playback::{PlayOptions, PlaybackEngine};

/// Catalog indices reserved for the fixed feedback roles, and how those sounds play.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSounds {
    pub discovery: usize,
    pub joined: usize,
    pub neighbor_up: usize,
    pub neighbor_down: usize,
    pub sync_started: usize,
    pub sync_failed: usize,
    /// Options for fire-and-forget feedback sounds.
    pub feedback: PlayOptions,
    /// Options for sync sessions.
    pub sync: PlayOptions,
    /// Whether SyncFailed also ends the peer's oldest sync.
    pub stop_sync_on_failure: bool,
}

impl Default for FeedbackSounds {
    fn default() -> Self {
        FeedbackSounds {
            discovery: 0,
            joined: 1,
            neighbor_up: 2,
            neighbor_down: 3,
            sync_started: 4,
            sync_failed: 5,
            feedback: PlayOptions::default(),
            sync: PlayOptions {
                looping: true,
                ..Default::default()
            },
            stop_sync_on_failure: false,
        }
    }
}

/// Consumes inbound messages one at a time, updating peer state and driving playback.
/// Never fails: anything malformed or out of order is logged and absorbed.
pub struct EventProcessor {
    registry: PeerRegistry,
    engine: Arc<PlaybackEngine>,
    sounds: FeedbackSounds,
}

impl EventProcessor {
    /// Creates a processor with an empty peer registry.
    pub fn new(engine: Arc<PlaybackEngine>, sounds: FeedbackSounds) -> EventProcessor {
        EventProcessor {
            registry: PeerRegistry::new(),
            engine,
            sounds,
        }
    }

    /// Returns the peer registry.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Handles a single message to completion.
    pub fn handle(&mut self, message: ChannelMessage) {
        match message {
            ChannelMessage::SamplePlayed {
                index,
                timestamp,
                public_key,
            } => {
                debug!(index, ?timestamp, ?public_key, "Sample played");
                self.engine.play(index);
            }
            ChannelMessage::SystemEvent { data } => self.handle_system_event(data),
            ChannelMessage::Unknown => warn!("Ignoring message of unknown type"),
        }
    }

    fn handle_system_event(&mut self, data: SystemEventData) {
        let Some(kind) = data.event_kind() else {
            warn!(kind = %data.kind, "Ignoring unknown system event");
            return;
        };

        match kind {
            SystemEventKind::GossipJoined => {
                info!(topic_id = ?data.topic_id, peers = ?data.peers, "Joined gossip");
                self.play_feedback(self.sounds.joined);
            }
            SystemEventKind::GossipLeft => debug!("Left gossip"),
            SystemEventKind::GossipNeighborUp => {
                debug!(peer = ?data.peer, "Neighbor up");
                self.play_feedback(self.sounds.neighbor_up);
            }
            SystemEventKind::GossipNeighborDown => {
                debug!(peer = ?data.peer, "Neighbor down");
                self.play_feedback(self.sounds.neighbor_down);
            }
            SystemEventKind::PeerDiscovered => {
                let Some(peer) = peer_of(kind, &data) else {
                    return;
                };
                if self.registry.discover(peer) {
                    info!(peer, "Peer discovered");
                    self.play_feedback(self.sounds.discovery);
                }
            }
            SystemEventKind::SyncStarted => {
                let Some(peer) = peer_of(kind, &data) else {
                    return;
                };
                if !data.has_topic() {
                    debug!(peer, "Sync started without a topic, ignoring");
                    return;
                }
                let session = self
                    .engine
                    .play_with(self.sounds.sync_started, self.sounds.sync);
                debug!(peer, session = session.id(), topic = ?data.topic, "Sync started");
                self.registry.begin_sync(peer, session);
            }
            SystemEventKind::SyncDone => {
                let Some(peer) = peer_of(kind, &data) else {
                    return;
                };
                self.end_sync(peer);
            }
            SystemEventKind::SyncFailed => {
                warn!(peer = ?data.peer, topic = ?data.topic, "Sync failed");
                self.play_feedback(self.sounds.sync_failed);
                if self.sounds.stop_sync_on_failure {
                    if let Some(peer) = data.peer.as_deref() {
                        self.end_sync(peer);
                    }
                }
            }
        }
    }

    fn end_sync(&mut self, peer: &str) {
        match self.registry.end_sync(peer) {
            Some(mut session) => {
                debug!(peer, session = session.id(), "Sync ended");
                self.engine.stop(&mut session);
            }
            None => debug!(peer, "No outstanding sync for peer"),
        }
    }

    fn play_feedback(&self, index: usize) {
        self.engine.play_with(index, self.sounds.feedback);
    }

    /// Stops every outstanding sync session. Returns how many were stopped.
    pub fn shutdown(&mut self) -> usize {
        let sessions = self.registry.drain_syncs();
        let count = sessions.len();
        for mut session in sessions {
            self.engine.stop(&mut session);
        }
        info!(stopped = count, peers = self.registry.len(), "Event processor shut down");
        count
    }
}

/// Returns the event's peer, logging when a peer-scoped event arrives without one.
fn peer_of(kind: SystemEventKind, data: &SystemEventData) -> Option<&str> {
    let peer = data.peer.as_deref();
    if peer.is_none() {
        warn!(%kind, "Ignoring system event without a peer");
    }
    peer
}
