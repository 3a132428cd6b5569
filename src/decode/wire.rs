//! Little-endian cursor readers for ROS1 message payloads.
//!
//! ROS1 serialization is flat little-endian with length-prefixed strings and
//! arrays; every message starts with a `std_msgs/Header`.

use anyhow::Result;

pub fn read_u8(payload: &[u8], cursor: &mut usize) -> Result<u8> {
    if *cursor + 1 > payload.len() {
        return Err(anyhow::anyhow!("payload too short"));
    }
    let val = payload[*cursor];
    *cursor += 1;
    Ok(val)
}

pub fn read_u16_le(payload: &[u8], cursor: &mut usize) -> Result<u16> {
    if *cursor + 2 > payload.len() {
        return Err(anyhow::anyhow!("payload too short"));
    }
    let val = u16::from_le_bytes([payload[*cursor], payload[*cursor + 1]]);
    *cursor += 2;
    Ok(val)
}

pub fn read_u32_le(payload: &[u8], cursor: &mut usize) -> Result<u32> {
    if *cursor + 4 > payload.len() {
        return Err(anyhow::anyhow!("payload too short"));
    }
    let val = u32::from_le_bytes([
        payload[*cursor],
        payload[*cursor + 1],
        payload[*cursor + 2],
        payload[*cursor + 3],
    ]);
    *cursor += 4;
    Ok(val)
}

pub fn read_f32_le(payload: &[u8], cursor: &mut usize) -> Result<f32> {
    let bits = read_u32_le(payload, cursor)?;
    Ok(f32::from_bits(bits))
}

pub fn read_bool(payload: &[u8], cursor: &mut usize) -> Result<bool> {
    let val = read_u8(payload, cursor)?;
    Ok(val != 0)
}

pub fn read_string(payload: &[u8], cursor: &mut usize) -> Result<String> {
    let len = read_u32_le(payload, cursor)? as usize;
    if *cursor + len > payload.len() {
        return Err(anyhow::anyhow!("payload too short for string"));
    }
    let s = String::from_utf8_lossy(&payload[*cursor..*cursor + len]).to_string();
    *cursor += len;
    Ok(s)
}

/// Skip a `std_msgs/Header`: seq (u32), stamp (u32 sec + u32 nsec), frame_id
/// (length-prefixed string).
pub fn skip_header(payload: &[u8], cursor: &mut usize) -> Result<()> {
    *cursor += 12;
    let len = read_u32_le(payload, cursor)? as usize;
    if *cursor + len > payload.len() {
        return Err(anyhow::anyhow!("payload too short for frame_id"));
    }
    *cursor += len;
    Ok(())
}

pub fn read_f32_le_at(data: &[u8], off: usize) -> Result<f32> {
    if off + 4 > data.len() {
        return Err(anyhow::anyhow!("data too short"));
    }
    let bytes = [data[off], data[off + 1], data[off + 2], data[off + 3]];
    Ok(f32::from_le_bytes(bytes))
}

#[cfg(test)]
pub mod testutil {
    /// Append a serialized `std_msgs/Header` with an empty frame_id.
    pub fn push_header(buf: &mut Vec<u8>) {
        buf.extend_from_slice(&0u32.to_le_bytes()); // seq
        buf.extend_from_slice(&0u32.to_le_bytes()); // stamp sec
        buf.extend_from_slice(&0u32.to_le_bytes()); // stamp nsec
        buf.extend_from_slice(&0u32.to_le_bytes()); // frame_id len
    }

    pub fn push_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_header_with_frame_id() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        testutil::push_string(&mut buf, "base_link");
        buf.extend_from_slice(&42u16.to_le_bytes());

        let mut cursor = 0;
        skip_header(&buf, &mut cursor).unwrap();
        assert_eq!(read_u16_le(&buf, &mut cursor).unwrap(), 42);
        assert_eq!(cursor, buf.len());
    }

    #[test]
    fn test_short_reads_fail() {
        let buf = [0u8; 3];
        let mut cursor = 0;
        assert!(read_u32_le(&buf, &mut cursor).is_err());
        assert!(read_f32_le_at(&buf, 0).is_err());
    }
}
