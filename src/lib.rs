//! bag2dataset - Convert ROS1 .bag files into per-sensor datasets
//!
//! This library converts ROS1 bag files recorded from a camera, a spinning
//! lidar, and a scanning radar into per-sensor files plus a cross-sensor
//! synchronization manifest:
//!
//! - **Camera**: `sensor_msgs/CompressedImage` payloads written through as
//!   `camera/<timestamp_ns>.jpg`
//! - **Lidar**: `sensor_msgs/PointCloud2` decoded to (x, y, z, intensity)
//!   and written as ASCII PCD under `lidar/<timestamp_ns>.pcd`
//! - **Radar**: `ti_mmwave_rospkg/RadarScan` per-point messages reassembled
//!   into sweeps and written as (x, y, z, velocity) PCD under
//!   `radar/<frame_start_timestamp_ns>.pcd`
//! - **Synchronization**: the smallest frame stream anchors a
//!   nearest-timestamp alignment (binary search over sorted frame indexes),
//!   emitted as `synchronized.json`
//! - **Parallel processing**: sensor pipelines and whole bags run on rayon
//!   workers
//!
//! # Example
//!
//! ```rust,no_run
//! use bag2dataset::{convert, ConvertOptions};
//!
//! let options = ConvertOptions {
//!     bag_path: "recordings/".to_string(),
//!     output_path: "converted/".to_string(),
//!     show_progress: true,
//!     verify_images: false,
//! };
//!
//! convert(&options)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bag;
pub mod cli;
pub mod convert;
pub mod decode;
pub mod error;
pub mod pcd;
pub mod sync;

// Re-export main types for convenience
pub use bag::{BagReader, RawRecord, RecordSource, inspect_bag};
pub use convert::{ConvertOptions, convert, convert_bag, convert_records};
pub use error::ConvertError;
pub use sync::{FrameIndex, SyncTriple, synchronize};
