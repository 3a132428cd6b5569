use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bag2dataset",
    about = "Convert ROS1 bag files into per-sensor camera/lidar/radar datasets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List topics, types, message counts and time span of a bag
    Inspect {
        /// Path to the .bag file
        bag: String,
    },

    /// Convert a bag (or a directory of bags) into jpg/pcd files plus a
    /// synchronized.json manifest
    Convert {
        /// Path to a .bag file or a directory containing .bag files
        bag: String,
        /// Output directory root; one subdirectory is created per bag
        out: String,
        /// Disable the progress bars (they are shown by default)
        #[arg(long = "no-progress", action = ArgAction::SetTrue)]
        no_progress: bool,
        /// Decode each camera payload to verify it is a valid image
        #[arg(long = "verify-images")]
        verify_images: bool,
    },
}
