//! `sensor_msgs/PointCloud2` → structured (x, y, z, intensity) frames.

use anyhow::Result;

use crate::bag::RawRecord;
use crate::decode::wire::{read_bool, read_f32_le_at, read_string, read_u8, read_u32_le, skip_header};
use crate::error::ConvertError;

/// One decoded lidar sweep: `width * height` points in slot order, each
/// `[x, y, z, intensity]`.
#[derive(Debug, Clone)]
pub struct PointCloudFrame {
    pub timestamp: u64,
    pub points: Vec<[f32; 4]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

/// The resolved point layout for one lidar session.
///
/// Every record carries its own field table, but in practice the layout is
/// constant for a session, so the `intensity` offset is resolved once and
/// only re-resolved when a record's table differs from the cached one.
#[derive(Debug, Default)]
pub struct SchemaCache {
    resolved: Option<(Vec<PointField>, usize)>,
}

impl SchemaCache {
    pub fn new() -> Self {
        SchemaCache::default()
    }

    fn intensity_offset(
        &mut self,
        fields: &[PointField],
        point_step: usize,
    ) -> Result<usize, ConvertError> {
        if let Some((cached_fields, offset)) = &self.resolved
            && cached_fields.as_slice() == fields
        {
            return Ok(*offset);
        }

        let offset = fields
            .iter()
            .find(|f| f.name == "intensity")
            .map(|f| f.offset as usize)
            .ok_or_else(|| ConvertError::MissingField("intensity".to_string()))?;
        if offset + 4 > point_step {
            return Err(ConvertError::MissingField("intensity".to_string()));
        }

        self.resolved = Some((fields.to_vec(), offset));
        Ok(offset)
    }
}

struct CloudGeometry<'a> {
    width: usize,
    height: usize,
    point_step: usize,
    fields: Vec<PointField>,
    data: &'a [u8],
}

/// Decode one lidar record into a frame.
///
/// Geometry mismatches yield [`ConvertError::MalformedRecord`] (the caller
/// skips the record); a schema without an `intensity` field yields
/// [`ConvertError::MissingField`] (the caller abandons the topic).
pub fn decode_pointcloud(
    record: &RawRecord<'_>,
    cache: &mut SchemaCache,
) -> Result<PointCloudFrame, ConvertError> {
    let cloud =
        parse_cloud(record.data).map_err(|e| ConvertError::malformed(record, e.to_string()))?;

    let expected_len = cloud
        .width
        .checked_mul(cloud.height)
        .and_then(|total| total.checked_mul(cloud.point_step));
    let Some(expected_len) = expected_len else {
        return Err(ConvertError::malformed(
            record,
            format!(
                "geometry {}x{} with stride {} overflows",
                cloud.width, cloud.height, cloud.point_step
            ),
        ));
    };
    if cloud.data.len() != expected_len {
        return Err(ConvertError::malformed(
            record,
            format!(
                "payload is {} bytes, geometry {}x{} with stride {} needs {}",
                cloud.data.len(),
                cloud.width,
                cloud.height,
                cloud.point_step,
                expected_len
            ),
        ));
    }
    let total_points = cloud.width * cloud.height;

    let intensity_offset = cache.intensity_offset(&cloud.fields, cloud.point_step)?;

    // x, y, z sit at the start of every slot; only intensity floats around.
    let mut points = Vec::with_capacity(total_points);
    for slot in cloud.data.chunks_exact(cloud.point_step) {
        let x = read_f32_le_at(slot, 0).map_err(|e| ConvertError::malformed(record, e.to_string()))?;
        let y = read_f32_le_at(slot, 4).map_err(|e| ConvertError::malformed(record, e.to_string()))?;
        let z = read_f32_le_at(slot, 8).map_err(|e| ConvertError::malformed(record, e.to_string()))?;
        let intensity = read_f32_le_at(slot, intensity_offset)
            .map_err(|e| ConvertError::malformed(record, e.to_string()))?;
        points.push([x, y, z, intensity]);
    }

    Ok(PointCloudFrame {
        timestamp: record.time,
        points,
    })
}

fn parse_cloud(payload: &[u8]) -> Result<CloudGeometry<'_>> {
    let mut cursor = 0;
    skip_header(payload, &mut cursor)?;

    let height = read_u32_le(payload, &mut cursor)? as usize;
    let width = read_u32_le(payload, &mut cursor)? as usize;

    let fields = parse_fields(payload, &mut cursor)?;

    let is_bigendian = read_bool(payload, &mut cursor)?;
    if is_bigendian {
        return Err(anyhow::anyhow!("big-endian point data not supported"));
    }

    let point_step = read_u32_le(payload, &mut cursor)? as usize;
    if point_step < 12 {
        return Err(anyhow::anyhow!("point_step {} too small for x/y/z", point_step));
    }
    let _row_step = read_u32_le(payload, &mut cursor)?;

    let data_len = read_u32_le(payload, &mut cursor)? as usize;
    if payload.len() < cursor + data_len {
        return Err(anyhow::anyhow!("payload too short for point data"));
    }
    let data = &payload[cursor..cursor + data_len];
    // is_dense trails the data array; nothing in it we need.

    Ok(CloudGeometry {
        width,
        height,
        point_step,
        fields,
        data,
    })
}

fn parse_fields(payload: &[u8], cursor: &mut usize) -> Result<Vec<PointField>> {
    let len = read_u32_le(payload, cursor)? as usize;
    let mut fields = Vec::with_capacity(len);
    for _ in 0..len {
        let name = read_string(payload, cursor)?;
        let offset = read_u32_le(payload, cursor)?;
        let datatype = read_u8(payload, cursor)?;
        let count = read_u32_le(payload, cursor)?;
        fields.push(PointField {
            name,
            offset,
            datatype,
            count,
        });
    }
    Ok(fields)
}
