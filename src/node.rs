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
use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, Instrument};

use crate::collaborator::Collaborator;
use crate::events::ChannelMessage;
use crate::processor::EventProcessor;
use crate::publish::PublishGateway;

/// How many inbound messages may wait for the processor.
const EVENT_QUEUE_SIZE: usize = 64;

/// A running node: the collaborator feeding a single processing task.
pub struct Node {
    handle: JoinHandle<()>,
    gateway: Arc<PublishGateway>,
    collaborator: Arc<dyn Collaborator>,
}

impl Node {
    /// Creates the inbound channel, attaches the collaborator to it and starts consuming
    /// messages. Must be called from within a tokio runtime.
    pub fn start(processor: EventProcessor, collaborator: Arc<dyn Collaborator>) -> Node {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let monitor = collaborator.attach(events_tx);

        let handle = tokio::spawn(
            Node::process_events(processor, events_rx, monitor)
                .instrument(tracing::info_span!("node")),
        );
        Node {
            handle,
            gateway: Arc::new(PublishGateway::new(collaborator.clone())),
            collaborator,
        }
    }

    /// Returns the gateway for local play actions.
    pub fn gateway(&self) -> Arc<PublishGateway> {
        self.gateway.clone()
    }

    /// Asks the collaborator to stop emitting. The node stops once the inbound channel
    /// drains.
    pub fn close(&self) {
        self.collaborator.close();
    }

    /// Join will block until the node finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Handles messages in delivery order, each to completion, until every sender is gone.
    async fn process_events(
        mut processor: EventProcessor,
        mut events_rx: Receiver<ChannelMessage>,
        monitor: JoinHandle<Result<(), io::Error>>,
    ) {
        info!("Node started.");
        while let Some(message) = events_rx.recv().await {
            debug!(?message, "Received message");
            processor.handle(message);
        }

        info!("Inbound channel closed.");
        processor.shutdown();
        match monitor.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(err = %e, "Collaborator failed"),
            Err(e) => error!(err = %e, "Error waiting for collaborator to stop"),
        }
    }
}
