// Copyright (C) 2019 Philipp Wolfer <ph.wolfer@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use image_id::{identify, DiscId, Error, ImageLoader, LibDiscId};

const COPYRIGHT: &str = "Copyright (C) 2019 Philipp Wolfer";

#[derive(Parser)]
#[command(name = "image-id", version)]
#[command(about = "Calculate MusicBrainz disc IDs from CD images", long_about = None)]
struct Cli {
    /// CD image, followed by any further files the image consists of
    #[arg(value_name = "CD-IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Print progress messages
    #[arg(short, long)]
    verbose: bool,

    /// Print the session and track layout of the disc
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    print_version();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                eprint!("{}", e.render());
                process::exit(1);
            }
        },
    };
    init_logging(&cli);

    if let Err(e) = run(&cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    debug!("using {}", DiscId::get_version_string());
    let disc = ImageLoader::default().load(&cli.images)?;
    let report = identify(&disc, &LibDiscId)?;
    print!("{}", report);
    Ok(())
}

fn init_logging(cli: &Cli) {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_version() {
    eprintln!("{} {}\n{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), COPYRIGHT);
}
