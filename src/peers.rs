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

//! Per-peer discovery and sync bookkeeping.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::playback::PlaybackSession;

/// What is known about one remote peer.
#[derive(Debug, Default)]
pub struct PeerRecord {
    /// Set by the first discovery. Never cleared.
    discovered: bool,
    /// Sessions for syncs that have started but not finished, oldest first.
    sync_queue: VecDeque<PlaybackSession>,
}

impl PeerRecord {
    /// Returns true once the peer has been discovered.
    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    /// Returns the outstanding sync sessions, oldest first.
    pub fn pending_syncs(&self) -> impl Iterator<Item = &PlaybackSession> {
        self.sync_queue.iter()
    }
}

/// Peer state keyed by peer identity. Owned by a single event processor.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<String, PeerRecord>,
}

impl PeerRegistry {
    /// Creates an empty registry.
    pub fn new() -> PeerRegistry {
        PeerRegistry::default()
    }

    /// Records a discovery. Returns true only the first time a peer is discovered.
    ///
    /// A record created implicitly by an early sync still counts as undiscovered, so its
    /// first discovery returns true.
    pub fn discover(&mut self, peer: &str) -> bool {
        let record = self.peers.entry(peer.to_string()).or_default();
        if record.discovered {
            return false;
        }
        record.discovered = true;
        true
    }

    /// Appends a sync session to the tail of the peer's queue, creating the record if
    /// the peer hasn't been discovered yet.
    pub fn begin_sync(&mut self, peer: &str, session: PlaybackSession) {
        if !self.peers.contains_key(peer) {
            debug!(peer, "Sync started before discovery, creating peer record");
        }
        self.peers
            .entry(peer.to_string())
            .or_default()
            .sync_queue
            .push_back(session);
    }

    /// Removes and returns the oldest outstanding sync session for the peer.
    pub fn end_sync(&mut self, peer: &str) -> Option<PlaybackSession> {
        self.peers
            .get_mut(peer)
            .and_then(|record| record.sync_queue.pop_front())
    }

    /// Returns the record for the given peer.
    pub fn get(&self, peer: &str) -> Option<&PeerRecord> {
        self.peers.get(peer)
    }

    /// Returns the number of outstanding syncs for the peer.
    pub fn pending_syncs(&self, peer: &str) -> usize {
        self.peers
            .get(peer)
            .map(|record| record.sync_queue.len())
            .unwrap_or(0)
    }

    /// Returns the number of known peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns true if no peer is known.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Removes every outstanding sync session from every peer. Records are kept.
    pub fn drain_syncs(&mut self) -> Vec<PlaybackSession> {
        self.peers
            .values_mut()
            .flat_map(|record| record.sync_queue.drain(..))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::audio::mock;
    use crate::playback::PlaybackEngine;
    use crate::samples::{DecodedBuffer, SampleLibrary};

    fn engine() -> PlaybackEngine {
        let library = Arc::new(SampleLibrary::new(2, 1000, Path::new(".")));
        library.store(0, DecodedBuffer::new(vec![0.5; 100], 1, 1000));
        library.store(1, DecodedBuffer::new(vec![0.5; 100], 1, 1000));
        PlaybackEngine::new(library, Arc::new(mock::Device::with_format("mock", 1, 1000)))
    }

    #[test]
    fn test_discover_dedups() {
        let mut registry = PeerRegistry::new();

        assert!(registry.discover("alice"));
        assert!(!registry.discover("alice"));
        assert!(registry.discover("bob"));
        assert!(!registry.discover("alice"));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("alice").unwrap().is_discovered());
    }

    #[test]
    fn test_sync_queue_is_fifo() {
        let engine = engine();
        let mut registry = PeerRegistry::new();
        registry.discover("alice");

        let first = engine.play(0);
        let second = engine.play(1);
        let (first_id, second_id) = (first.id(), second.id());
        registry.begin_sync("alice", first);
        registry.begin_sync("alice", second);
        assert_eq!(registry.pending_syncs("alice"), 2);

        assert_eq!(registry.end_sync("alice").unwrap().id(), first_id);
        assert_eq!(registry.end_sync("alice").unwrap().id(), second_id);
        assert!(registry.end_sync("alice").is_none());
    }

    #[test]
    fn test_end_sync_without_record() {
        let mut registry = PeerRegistry::new();
        assert!(registry.end_sync("nobody").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sync_before_discovery_creates_record() {
        let engine = engine();
        let mut registry = PeerRegistry::new();

        registry.begin_sync("carol", engine.play(0));
        assert_eq!(registry.pending_syncs("carol"), 1);
        assert!(!registry.get("carol").unwrap().is_discovered());

        // The implicit record doesn't swallow the first real discovery.
        assert!(registry.discover("carol"));
        assert!(!registry.discover("carol"));
        assert_eq!(registry.pending_syncs("carol"), 1);
    }

    #[test]
    fn test_queues_are_scoped_per_peer() {
        let engine = engine();
        let mut registry = PeerRegistry::new();

        let alice = engine.play(0);
        let alice_id = alice.id();
        registry.begin_sync("alice", alice);
        registry.begin_sync("bob", engine.play(1));

        assert_eq!(registry.end_sync("alice").unwrap().id(), alice_id);
        assert_eq!(registry.pending_syncs("bob"), 1);
        assert_eq!(registry.drain_syncs().len(), 1);
        assert_eq!(registry.pending_syncs("bob"), 0);
        assert_eq!(registry.len(), 2);
    }
}
