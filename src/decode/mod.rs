//! Per-sensor payload decoders and the radar frame assembler.

pub mod image;
pub mod pointcloud;
pub mod radar;
pub mod wire;
