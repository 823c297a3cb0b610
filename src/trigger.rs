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

//! Local play triggers.

use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, span, warn, Level};

use crate::publish::PublishGateway;

const PLAY: &str = "play";
const QUIT: &str = "quit";

/// A trigger that reads play commands from the keyboard and publishes them.
pub struct Keyboard {
    gateway: Arc<PublishGateway>,
}

impl Keyboard {
    pub fn new(gateway: Arc<PublishGateway>) -> Keyboard {
        Keyboard { gateway }
    }

    /// Reads commands from stdin until it closes or "quit" is entered.
    pub fn start(self) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard trigger");
            let _enter = span.enter();

            info!("Keyboard trigger started.");
            while self.monitor_io(io::stdin().lock(), io::stdout())? {}
            info!("Keyboard trigger stopped.");
            Ok(())
        })
    }

    /// Handles one command. Returns false once there is nothing more to read.
    fn monitor_io<R, W>(&self, mut reader: R, mut writer: W) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Command ({} <index>, {}): ", PLAY, QUIT)?;
        writer.flush()?;
        let mut input = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let mut words = input.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (None, _, _) => {}
            (Some(QUIT), None, _) => return Ok(false),
            (Some(PLAY), Some(index), None) => match index.parse::<usize>() {
                Ok(index) => self.gateway.publish(index),
                Err(_) => warn!(input = input.trim(), "Invalid sample index"),
            },
            _ => warn!(input = input.trim(), "Unrecognized input"),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor};

    use parking_lot::Mutex;
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::*;
    use crate::collaborator::{Collaborator, SendError};
    use crate::events::ChannelMessage;
    use crate::publish::Publish;

    #[derive(Default)]
    struct Recorder {
        indices: Mutex<Vec<usize>>,
    }

    impl Collaborator for Recorder {
        fn attach(&self, _: Sender<ChannelMessage>) -> JoinHandle<Result<(), io::Error>> {
            tokio::spawn(async { Ok(()) })
        }

        fn publish(&self, message: Publish) -> Result<(), SendError> {
            self.indices.lock().push(message.index);
            Ok(())
        }
    }

    fn run(input: &str) -> (Vec<bool>, Vec<usize>) {
        let recorder = Arc::new(Recorder::default());
        let keyboard = Keyboard::new(Arc::new(PublishGateway::new(recorder.clone())));

        let mut reader = BufReader::new(Cursor::new(input.as_bytes().to_vec()));
        let mut results = Vec::new();
        loop {
            let more = keyboard.monitor_io(&mut reader, io::sink()).unwrap();
            results.push(more);
            if !more {
                break;
            }
        }
        let indices = recorder.indices.lock().clone();
        (results, indices)
    }

    #[test]
    fn test_play_commands() {
        let (results, indices) = run("play 3\nplay 7\n\nplay\nplay x\nstop\nplay 1 2\n");
        assert_eq!(indices, vec![3, 7]);
        assert_eq!(results.len(), 8);
        assert_eq!(results.last(), Some(&false));
    }

    #[test]
    fn test_quit() {
        let (results, indices) = run("play 6\nquit\nplay 7\n");
        assert_eq!(results, vec![true, false]);
        assert_eq!(indices, vec![6]);
    }
}
