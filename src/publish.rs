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
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::collaborator::Collaborator;

/// The outbound publish command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publish {
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    pub index: usize,
}

impl Publish {
    /// Creates a publish command stamped with the current time.
    pub fn now(index: usize) -> Publish {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Publish { timestamp, index }
    }
}

/// Forwards local play actions to the network collaborator. Nothing is played here: the
/// collaborator echoes a SamplePlayed back through the inbound channel and that echo is
/// what gets played, on every node alike.
pub struct PublishGateway {
    collaborator: Arc<dyn Collaborator>,
}

impl PublishGateway {
    /// Creates a gateway to the given collaborator.
    pub fn new(collaborator: Arc<dyn Collaborator>) -> PublishGateway {
        PublishGateway { collaborator }
    }

    /// Publishes a play of the given catalog index.
    pub fn publish(&self, index: usize) {
        let message = Publish::now(index);
        debug!(index, timestamp = message.timestamp, "Publishing sample");
        if let Err(e) = self.collaborator.publish(message) {
            error!(index, err = %e, "Failed to publish sample");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use parking_lot::Mutex;
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::*;
    use crate::collaborator::SendError;
    use crate::events::ChannelMessage;

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<Publish>>,
        fail: bool,
    }

    impl Collaborator for Recorder {
        fn attach(&self, _: Sender<ChannelMessage>) -> JoinHandle<Result<(), io::Error>> {
            tokio::spawn(async { Ok(()) })
        }

        fn publish(&self, message: Publish) -> Result<(), SendError> {
            if self.fail {
                return Err("collaborator gone".into());
            }
            self.published.lock().push(message);
            Ok(())
        }
    }

    #[test]
    fn test_publish_forwards_timestamped_index() {
        let recorder = Arc::new(Recorder::default());
        let gateway = PublishGateway::new(recorder.clone());

        let before = Publish::now(0).timestamp;
        gateway.publish(3);
        gateway.publish(8);

        let published = recorder.published.lock();
        assert_eq!(
            published.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![3, 8]
        );
        assert!(published[0].timestamp >= before);
    }

    #[test]
    fn test_publish_failure_is_absorbed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        PublishGateway::new(recorder.clone()).publish(3);
        assert!(recorder.published.lock().is_empty());
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&Publish {
            timestamp: 1700000000000,
            index: 3,
        })
        .unwrap();
        assert_eq!(json, r#"{"timestamp":1700000000000,"index":3}"#);
    }
}
