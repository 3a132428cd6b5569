use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

mod bag;
mod cli;
mod convert;
mod decode;
mod error;
mod pcd;
mod sync;

use cli::{Cli, Commands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { bag } => bag::inspect_bag(&bag),
        Commands::Convert {
            bag,
            out,
            no_progress,
            verify_images,
        } => {
            let options = convert::ConvertOptions {
                bag_path: bag,
                output_path: out,
                show_progress: !no_progress,
                verify_images,
            };
            convert::convert(&options)
        }
    }
}
