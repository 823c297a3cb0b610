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
use std::io;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, Sender, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

use super::SendError;
use crate::events::ChannelMessage;
use crate::publish::Publish;

/// An in-process collaborator that echoes every publish back as a SamplePlayed.
/// Publishes issued before attach are held and delivered once attached.
pub struct Driver {
    publish_tx: Mutex<Option<UnboundedSender<Publish>>>,
    publish_rx: Mutex<Option<UnboundedReceiver<Publish>>>,
}

impl Driver {
    pub fn new() -> Driver {
        let (publish_tx, publish_rx) = mpsc::unbounded_channel();
        Driver {
            publish_tx: Mutex::new(Some(publish_tx)),
            publish_rx: Mutex::new(Some(publish_rx)),
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Collaborator for Driver {
    fn attach(&self, events_tx: Sender<ChannelMessage>) -> JoinHandle<Result<(), io::Error>> {
        let publish_rx = self.publish_rx.lock().take();
        tokio::spawn(
            async move {
                let Some(mut publish_rx) = publish_rx else {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "loopback collaborator already attached",
                    ));
                };

                info!("Loopback collaborator started.");
                while let Some(publish) = publish_rx.recv().await {
                    let echo = ChannelMessage::SamplePlayed {
                        index: publish.index,
                        timestamp: Some(publish.timestamp),
                        public_key: None,
                    };
                    if events_tx.send(echo).await.is_err() {
                        debug!("Inbound channel closed");
                        break;
                    }
                }
                info!("Loopback collaborator closed.");
                Ok(())
            }
            .instrument(tracing::info_span!("loopback collaborator")),
        )
    }

    fn publish(&self, message: Publish) -> Result<(), SendError> {
        match self.publish_tx.lock().as_ref() {
            Some(publish_tx) => Ok(publish_tx.send(message)?),
            None => Err("loopback collaborator closed".into()),
        }
    }

    fn close(&self) {
        self.publish_tx.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::Collaborator;

    #[tokio::test]
    async fn test_publishes_are_echoed() {
        let driver = Driver::new();
        let (sender, mut receiver) = mpsc::channel(16);
        let handle = driver.attach(sender);

        driver
            .publish(Publish {
                timestamp: 42,
                index: 3,
            })
            .unwrap();

        assert_eq!(
            receiver.recv().await,
            Some(ChannelMessage::SamplePlayed {
                index: 3,
                timestamp: Some(42),
                public_key: None,
            })
        );

        driver.close();
        assert_eq!(receiver.recv().await, None);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_publishes_before_attach_are_held() {
        let driver = Driver::new();
        driver.publish(Publish::now(1)).unwrap();
        driver.publish(Publish::now(2)).unwrap();

        let (sender, mut receiver) = mpsc::channel(16);
        let _handle = driver.attach(sender);

        for expected in [1, 2] {
            match receiver.recv().await {
                Some(ChannelMessage::SamplePlayed { index, .. }) => assert_eq!(index, expected),
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_publish_after_close_fails() {
        let driver = Driver::new();
        driver.close();
        assert!(driver.publish(Publish::now(1)).is_err());
    }
}
