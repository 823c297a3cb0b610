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

//! Messages delivered by the network collaborator over the inbound channel.
//!
//! ```json
//! {"type": "SamplePlayed", "index": 3}
//! {"type": "SystemEvent", "data": {"type": "SyncStarted", "peer": "ab12..", "topic": [1, 1]}}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An inbound channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelMessage {
    /// A participant, possibly this node, triggered a sample.
    SamplePlayed {
        index: usize,
        /// Milliseconds since the epoch at publish time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
        /// The publishing peer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key: Option<String>,
    },

    /// A discovery, gossip or sync notification from the overlay network.
    SystemEvent { data: SystemEventData },

    /// Any message type this build doesn't know about.
    #[serde(other)]
    Unknown,
}

impl ChannelMessage {
    /// Parses a single JSON message.
    pub fn parse(json: &str) -> Result<ChannelMessage, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Creates a bare SamplePlayed message.
    pub fn sample_played(index: usize) -> ChannelMessage {
        ChannelMessage::SamplePlayed {
            index,
            timestamp: None,
            public_key: None,
        }
    }

    /// Creates a system event message.
    pub fn system(kind: SystemEventKind, peer: Option<&str>, topic: Option<&str>) -> ChannelMessage {
        ChannelMessage::SystemEvent {
            data: SystemEventData {
                kind: kind.as_str().to_string(),
                peer: peer.map(str::to_string),
                topic: topic.map(|topic| serde_json::Value::String(topic.to_string())),
                ..Default::default()
            },
        }
    }
}

/// The payload of a system event. The kind is kept as a string so that kinds added by
/// newer collaborators still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemEventData {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,

    /// The sync topic. Any JSON value; null counts as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<serde_json::Value>,

    /// The gossip topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<serde_json::Value>,

    /// Peers already in the gossip overlay when it was joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<String>>,
}

impl SystemEventData {
    /// Returns the known kind, or None for a kind this build doesn't handle.
    pub fn event_kind(&self) -> Option<SystemEventKind> {
        self.kind.parse().ok()
    }

    /// Returns true if the event names a topic.
    pub fn has_topic(&self) -> bool {
        self.topic.is_some()
    }
}

/// The system event kinds the processor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEventKind {
    GossipJoined,
    GossipLeft,
    GossipNeighborUp,
    GossipNeighborDown,
    PeerDiscovered,
    SyncStarted,
    SyncFailed,
    SyncDone,
}

impl SystemEventKind {
    /// Returns the wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            SystemEventKind::GossipJoined => "GossipJoined",
            SystemEventKind::GossipLeft => "GossipLeft",
            SystemEventKind::GossipNeighborUp => "GossipNeighborUp",
            SystemEventKind::GossipNeighborDown => "GossipNeighborDown",
            SystemEventKind::PeerDiscovered => "PeerDiscovered",
            SystemEventKind::SyncStarted => "SyncStarted",
            SystemEventKind::SyncFailed => "SyncFailed",
            SystemEventKind::SyncDone => "SyncDone",
        }
    }
}

/// Returned when a kind name isn't recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown system event kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for SystemEventKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GossipJoined" => Ok(SystemEventKind::GossipJoined),
            "GossipLeft" => Ok(SystemEventKind::GossipLeft),
            "GossipNeighborUp" => Ok(SystemEventKind::GossipNeighborUp),
            "GossipNeighborDown" => Ok(SystemEventKind::GossipNeighborDown),
            "PeerDiscovered" => Ok(SystemEventKind::PeerDiscovered),
            "SyncStarted" => Ok(SystemEventKind::SyncStarted),
            "SyncFailed" => Ok(SystemEventKind::SyncFailed),
            "SyncDone" => Ok(SystemEventKind::SyncDone),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for SystemEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_played() {
        let message = ChannelMessage::parse(r#"{"type":"SamplePlayed","index":3}"#).unwrap();
        assert_eq!(message, ChannelMessage::sample_played(3));

        let message = ChannelMessage::parse(
            r#"{"type":"SamplePlayed","index":7,"timestamp":1700000000000,"public_key":"ab"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            ChannelMessage::SamplePlayed {
                index: 7,
                timestamp: Some(1700000000000),
                public_key: Some("ab".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_system_event() {
        let message = ChannelMessage::parse(
            r#"{"type":"SystemEvent","data":{"type":"SyncStarted","peer":"p1","topic":[1,1,1]}}"#,
        )
        .unwrap();

        let ChannelMessage::SystemEvent { data } = message else {
            panic!("expected a system event");
        };
        assert_eq!(data.event_kind(), Some(SystemEventKind::SyncStarted));
        assert_eq!(data.peer.as_deref(), Some("p1"));
        assert!(data.has_topic());
    }

    #[test]
    fn test_null_topic_is_absent() {
        let message = ChannelMessage::parse(
            r#"{"type":"SystemEvent","data":{"type":"SyncStarted","peer":"p1","topic":null}}"#,
        )
        .unwrap();

        let ChannelMessage::SystemEvent { data } = message else {
            panic!("expected a system event");
        };
        assert!(!data.has_topic());
    }

    #[test]
    fn test_gossip_joined_metadata() {
        let message = ChannelMessage::parse(
            r#"{"type":"SystemEvent","data":{"type":"GossipJoined","topic_id":[0,1],"peers":["a","b"]}}"#,
        )
        .unwrap();

        let ChannelMessage::SystemEvent { data } = message else {
            panic!("expected a system event");
        };
        assert_eq!(data.event_kind(), Some(SystemEventKind::GossipJoined));
        assert_eq!(data.peers, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(data.peer.is_none());
    }

    #[test]
    fn test_unknown_kinds_still_decode() {
        let message = ChannelMessage::parse(
            r#"{"type":"SystemEvent","data":{"type":"PeerVanished","peer":"p1"}}"#,
        )
        .unwrap();
        let ChannelMessage::SystemEvent { data } = message else {
            panic!("expected a system event");
        };
        assert_eq!(data.event_kind(), None);

        let message = ChannelMessage::parse(r#"{"type":"Heartbeat"}"#).unwrap();
        assert_eq!(message, ChannelMessage::Unknown);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            SystemEventKind::GossipJoined,
            SystemEventKind::GossipLeft,
            SystemEventKind::GossipNeighborUp,
            SystemEventKind::GossipNeighborDown,
            SystemEventKind::PeerDiscovered,
            SystemEventKind::SyncStarted,
            SystemEventKind::SyncFailed,
            SystemEventKind::SyncDone,
        ] {
            assert_eq!(kind.to_string().parse::<SystemEventKind>(), Ok(kind));
        }
        assert_eq!(
            "Nope".parse::<SystemEventKind>(),
            Err(UnknownKind("Nope".to_string()))
        );
    }

    #[test]
    fn test_malformed_messages_fail() {
        assert!(ChannelMessage::parse("not json").is_err());
        assert!(ChannelMessage::parse(r#"{"type":"SamplePlayed","index":-1}"#).is_err());
    }
}
