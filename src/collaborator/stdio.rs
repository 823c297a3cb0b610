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
use std::io::{self, BufRead, Write};

use parking_lot::Mutex;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info, span, warn, Level};

use super::SendError;
use crate::events::ChannelMessage;
use crate::publish::Publish;

type Input = Box<dyn BufRead + Send>;
type Output = Box<dyn Write + Send>;

/// A collaborator that speaks line-delimited JSON: inbound messages on the input,
/// publish commands on the output.
pub struct Driver {
    input: Mutex<Option<Input>>,
    output: Mutex<Output>,
}

impl Driver {
    /// Creates a driver on stdin and stdout.
    pub fn new() -> Driver {
        Driver::with_io(io::BufReader::new(io::stdin()), io::stdout())
    }

    /// Creates a driver on the given reader and writer.
    pub fn with_io<R, W>(reader: R, writer: W) -> Driver
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        Driver {
            input: Mutex::new(Some(Box::new(reader))),
            output: Mutex::new(Box::new(writer)),
        }
    }

    /// Forwards every decodable line until the input ends or the channel closes. Lines
    /// that aren't UTF-8 or JSON are skipped; only read errors end the loop.
    fn read_events<R>(
        events_tx: &Sender<ChannelMessage>,
        mut reader: R,
    ) -> Result<(), io::Error>
    where
        R: BufRead,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(err = %e, "Skipping line that isn't valid UTF-8");
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let message = match ChannelMessage::parse(line) {
                Ok(message) => message,
                Err(e) => {
                    warn!(line, err = %e, "Skipping undecodable message");
                    continue;
                }
            };
            if events_tx.blocking_send(message).is_err() {
                debug!("Inbound channel closed");
                return Ok(());
            }
        }

        info!("Input closed");
        Ok(())
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Collaborator for Driver {
    fn attach(&self, events_tx: Sender<ChannelMessage>) -> JoinHandle<Result<(), io::Error>> {
        let input = self.input.lock().take();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "stdio collaborator");
            let _enter = span.enter();

            let Some(input) = input else {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "stdio collaborator already attached",
                ));
            };

            info!("Stdio collaborator started.");
            Driver::read_events(&events_tx, input)
        })
    }

    fn publish(&self, message: Publish) -> Result<(), SendError> {
        let line = serde_json::to_string(&message)?;
        let mut output = self.output.lock();
        writeln!(output, "{}", line)?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::collaborator::Collaborator;

    /// A writer whose contents can be read back.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn read_all(input: &str) -> Vec<ChannelMessage> {
        let (sender, mut receiver) = mpsc::channel(16);
        Driver::read_events(&sender, Cursor::new(input.to_string())).unwrap();
        drop(sender);

        let mut messages = Vec::new();
        while let Some(message) = receiver.blocking_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn test_read_events() {
        let messages = read_all(concat!(
            "{\"type\":\"SamplePlayed\",\"index\":3}\n",
            "\n",
            "garbage\n",
            "{\"type\":\"SystemEvent\",\"data\":{\"type\":\"GossipJoined\"}}\n",
        ));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChannelMessage::sample_played(3));
        assert!(matches!(messages[1], ChannelMessage::SystemEvent { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let (sender, mut receiver) = mpsc::channel(16);
        let mut input = b"{\"type\":\"SamplePlayed\",\"index\":1}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe\n");
        input.extend_from_slice(b"{\"type\":\"SamplePlayed\",\"index\":2}\n");

        let result = Driver::read_events(&sender, Cursor::new(input));
        drop(sender);

        assert!(result.is_ok());
        assert_eq!(receiver.blocking_recv(), Some(ChannelMessage::sample_played(1)));
        assert_eq!(receiver.blocking_recv(), Some(ChannelMessage::sample_played(2)));
        assert_eq!(receiver.blocking_recv(), None);
    }

    #[test]
    fn test_read_stops_when_channel_closes() {
        let (sender, receiver) = mpsc::channel(16);
        drop(receiver);
        let result = Driver::read_events(
            &sender,
            Cursor::new("{\"type\":\"SamplePlayed\",\"index\":3}\n".to_string()),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_publish_writes_json_lines() {
        let output = SharedBuffer::default();
        let driver = Driver::with_io(Cursor::new(Vec::new()), output.clone());

        driver
            .publish(Publish {
                timestamp: 10,
                index: 3,
            })
            .unwrap();
        driver
            .publish(Publish {
                timestamp: 11,
                index: 4,
            })
            .unwrap();

        let written = String::from_utf8(output.0.lock().clone()).unwrap();
        assert_eq!(
            written,
            "{\"timestamp\":10,\"index\":3}\n{\"timestamp\":11,\"index\":4}\n"
        );
    }

    #[tokio::test]
    async fn test_attach_forwards_until_eof() {
        let driver = Driver::with_io(
            Cursor::new(b"{\"type\":\"SamplePlayed\",\"index\":1}\n".to_vec()),
            io::sink(),
        );
        let (sender, mut receiver) = mpsc::channel(16);

        let handle = driver.attach(sender);
        assert_eq!(receiver.recv().await, Some(ChannelMessage::sample_played(1)));
        assert_eq!(receiver.recv().await, None);
        assert!(handle.await.unwrap().is_ok());

        // The input can only be attached once.
        let (sender, _receiver) = mpsc::channel(16);
        assert!(driver.attach(sender).await.unwrap().is_err());
    }
}
