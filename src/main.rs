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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meshtone::audio;
use meshtone::collaborator::{loopback, stdio, Collaborator};
use meshtone::config::{self, Collaborator as CollaboratorKind};
use meshtone::node::Node;
use meshtone::playback::PlaybackEngine;
use meshtone::processor::EventProcessor;
use meshtone::samples::SampleLibrary;
use meshtone::trigger::Keyboard;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays the sounds of a peer-to-peer network."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads every sample in the catalog and reports its status.
    Catalog {
        /// The path to the node config.
        config_path: String,
    },
    /// Start will start the node and run until the network collaborator closes.
    Start {
        /// The path to the node config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries publish commands for the stdio collaborator.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Catalog { config_path } => {
            let config = config::Node::deserialize(&PathBuf::from(config_path))?;
            let catalog = config.catalog();
            let library = SampleLibrary::new(
                catalog.len(),
                config.audio().sample_rate(),
                &config.sample_base_path(),
            );
            let roles = config.feedback().roles();

            let mut failed = 0;
            println!("Samples (count: {}):", catalog.len());
            for descriptor in catalog.descriptors() {
                let role = roles
                    .iter()
                    .find(|(_, index)| *index == descriptor.index())
                    .map(|(role, _)| *role)
                    .unwrap_or("app");
                let status = match library.load_blocking(&descriptor) {
                    Ok(()) => "ok".to_string(),
                    Err(e) => {
                        failed += 1;
                        format!("failed: {}", e)
                    }
                };
                println!(
                    "- {}: {} [{}] {}",
                    descriptor.index(),
                    descriptor.source_locator(),
                    role,
                    status
                );
            }
            println!("\nMemory: {} KiB", library.memory_usage() / 1024);

            if failed > 0 {
                return Err(format!("{} samples failed to load", failed).into());
            }
        }
        Commands::Start { config_path } => {
            let config = config::Node::deserialize(&PathBuf::from(config_path))?;
            let device = audio::get_device(config.audio())?;
            info!(device = device.to_string(), "Using output device");

            let library = Arc::new(SampleLibrary::new(
                config.catalog().len(),
                device.sample_rate(),
                &config.sample_base_path(),
            ));
            // Loads finish in the background; unready samples are skipped until then.
            drop(library.load(&config.catalog().descriptors()));

            let engine = Arc::new(PlaybackEngine::new(library, device));
            let processor = EventProcessor::new(engine, config.feedback_sounds()?);
            let collaborator: Arc<dyn Collaborator> = match config.collaborator() {
                CollaboratorKind::Stdio => Arc::new(stdio::Driver::new()),
                CollaboratorKind::Loopback => Arc::new(loopback::Driver::new()),
            };

            let mut node = Node::start(processor, collaborator);
            if config.collaborator() == CollaboratorKind::Loopback {
                match Keyboard::new(node.gateway()).start().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(err = %e, "Keyboard trigger failed"),
                    Err(e) => error!(err = %e, "Error waiting for keyboard trigger"),
                }
                node.close();
            }
            node.join().await?;
        }
    }

    Ok(())
}
