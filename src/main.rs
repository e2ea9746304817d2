// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wuerfelspiel::audio;
use wuerfelspiel::config::Settings;
use wuerfelspiel::dice::Dice;
use wuerfelspiel::fragments::DirectoryResolver;
use wuerfelspiel::measures::{select_measures, Composition, Measure};
use wuerfelspiel::playsync::CancelHandle;
use wuerfelspiel::renderer::{render_composition, render_to_file, WaltzRenderer};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Composes waltzes with Mozart's musical dice game."
)]
struct Cli {
    /// The path to a YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rolls the dice and prints the selected measures.
    Compose {
        /// Seeds the dice so the same waltz is produced every time.
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Rolls the dice and plays the waltz through the audio device.
    Play {
        /// The device name to play through.
        #[arg(short, long)]
        device: Option<String>,
        /// The directory holding the measure fragments.
        #[arg(short, long)]
        fragments: Option<String>,
        /// Seeds the dice so the same waltz is produced every time.
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Rolls the dice and writes the waltz to a WAV file.
    Save {
        /// The file to write. Defaults to Waltz_<unix time>.wav.
        destination: Option<PathBuf>,
        /// The directory holding the measure fragments.
        #[arg(short, long)]
        fragments: Option<String>,
        /// Seeds the dice so the same waltz is produced every time.
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Joins the given audio files, in order, into one WAV file.
    Concat {
        /// The file to write.
        destination: PathBuf,
        /// The files to join.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
}

fn compose(settings: &Settings) -> Composition {
    let composition = match settings.seed() {
        Some(seed) => select_measures(&mut Dice::seeded(seed)),
        None => select_measures(&mut Dice::thread()),
    };
    info!(
        seed = settings.seed(),
        composition = %composition,
        "Composed waltz."
    );
    composition
}

fn default_destination() -> Result<PathBuf, Box<dyn Error>> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(PathBuf::from(format!("Waltz_{}.wav", now.as_secs())))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compose { seed } => {
            if let Some(seed) = seed {
                settings.set_seed(seed);
            }
            let composition = compose(&settings);
            println!("Minuet: {}", join(composition.minuet()));
            println!("Trio:   {}", join(composition.trio()));
        }
        Commands::Play {
            device,
            fragments,
            seed,
        } => {
            if let Some(device) = device {
                settings.set_device(&device);
            }
            if let Some(fragments) = fragments {
                settings.set_fragments(&fragments);
            }
            if let Some(seed) = seed {
                settings.set_seed(seed);
            }

            let device = audio::get_device(&settings.audio())?;
            let renderer = WaltzRenderer::new(
                DirectoryResolver::new(settings.fragments(), settings.extension()),
                device,
                settings.render_settings()?,
            );
            let composition = compose(&settings);
            println!("{}", composition);
            renderer.play_composition(&composition, &CancelHandle::new())?;
        }
        Commands::Save {
            destination,
            fragments,
            seed,
        } => {
            if let Some(fragments) = fragments {
                settings.set_fragments(&fragments);
            }
            if let Some(seed) = seed {
                settings.set_seed(seed);
            }
            let destination = match destination {
                Some(destination) => destination,
                None => default_destination()?,
            };

            let resolver = DirectoryResolver::new(settings.fragments(), settings.extension());
            let composition = compose(&settings);
            let summary = render_composition(
                &resolver,
                &composition,
                &destination,
                settings.render_settings()?.tail_trim_frames,
            )?;
            println!("{}: {}", destination.display(), summary);
        }
        Commands::Concat { destination, files } => {
            let summary = render_to_file(
                &files,
                &destination,
                settings.render_settings()?.tail_trim_frames,
            )?;
            println!("{}: {}", destination.display(), summary);
        }
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
    }

    Ok(())
}

fn join(measures: &[Measure]) -> String {
    measures
        .iter()
        .map(|measure| measure.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}
