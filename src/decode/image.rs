//! `sensor_msgs/CompressedImage` → pass-through image frames.
//!
//! The camera publishes already-compressed JPEG payloads; the core hands the
//! bytes through untouched. Decoding is only performed on request, to verify
//! a payload is a valid image.

use anyhow::Result;

use crate::bag::RawRecord;
use crate::decode::wire::{read_string, read_u32_le, skip_header};
use crate::error::ConvertError;

#[derive(Debug, Clone, Copy)]
pub struct ImageFrame<'a> {
    pub timestamp: u64,
    pub data: &'a [u8],
}

pub fn extract_compressed<'a>(record: &RawRecord<'a>) -> Result<ImageFrame<'a>, ConvertError> {
    parse_compressed(record.data)
        .map(|data| ImageFrame {
            timestamp: record.time,
            data,
        })
        .map_err(|e| ConvertError::malformed(record, e.to_string()))
}

fn parse_compressed(payload: &[u8]) -> Result<&[u8]> {
    let mut cursor = 0;
    skip_header(payload, &mut cursor)?;
    let _format = read_string(payload, &mut cursor)?;

    let data_len = read_u32_le(payload, &mut cursor)? as usize;
    if payload.len() < cursor + data_len {
        return Err(anyhow::anyhow!("payload too short for image data"));
    }
    Ok(&payload[cursor..cursor + data_len])
}

/// Best-effort sanity check that a compressed payload decodes. Failures are
/// reported to the caller as a boolean; a corrupt image is still written
/// out, just flagged.
pub fn decodes_as_image(data: &[u8]) -> bool {
    image::load_from_memory(data).is_ok()
}
