//! `ti_mmwave_rospkg/RadarScan` decoding and scan-frame reassembly.
//!
//! The radar publishes one message per detected point; a sweep is delimited
//! by `point_id` wrapping back to 0. The assembler stitches the per-point
//! stream back into discrete frames.

use anyhow::Result;

use crate::bag::RawRecord;
use crate::decode::wire::{read_f32_le, read_u16_le, skip_header};
use crate::error::ConvertError;

/// One detected radar point. The wire message also carries range, doppler
/// bin, bearing and intensity; the dataset keeps position and velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarPoint {
    pub point_id: u16,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub velocity: f32,
}

/// One reassembled radar sweep, identified by its first point's arrival
/// timestamp. Always holds at least one point.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarFrame {
    pub start_time: u64,
    pub points: Vec<RadarPoint>,
}

impl RadarFrame {
    pub fn to_rows(&self) -> Vec<[f32; 4]> {
        self.points
            .iter()
            .map(|p| [p.x, p.y, p.z, p.velocity])
            .collect()
    }
}

/// Decode one per-point radar record.
///
/// Wire layout after the header: point_id (u16), then x, y, z, range,
/// velocity, doppler_bin, bearing, intensity as f32. Everything past
/// velocity is ignored.
pub fn decode_radar_point(record: &RawRecord<'_>) -> Result<RadarPoint, ConvertError> {
    parse_point(record.data).map_err(|e| ConvertError::malformed(record, e.to_string()))
}

fn parse_point(payload: &[u8]) -> Result<RadarPoint> {
    let mut cursor = 0;
    skip_header(payload, &mut cursor)?;

    let point_id = read_u16_le(payload, &mut cursor)?;
    let x = read_f32_le(payload, &mut cursor)?;
    let y = read_f32_le(payload, &mut cursor)?;
    let z = read_f32_le(payload, &mut cursor)?;
    let _range = read_f32_le(payload, &mut cursor)?;
    let velocity = read_f32_le(payload, &mut cursor)?;

    Ok(RadarPoint {
        point_id,
        x,
        y,
        z,
        velocity,
    })
}

#[derive(Debug)]
enum AssemblerState {
    NoFrame,
    InFrame(RadarFrame),
}

/// Two-state machine turning the per-point stream into frames.
///
/// `point_id == 0` closes the current frame (if any) and opens the next one,
/// stamped with that point's arrival time. A nonzero id before the first
/// frame boundary means the recording started mid-sweep; those points have
/// no valid frame and are dropped with a warning.
#[derive(Debug)]
pub struct RadarFrameAssembler {
    state: AssemblerState,
    dropped_leading: u64,
}

impl Default for RadarFrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl RadarFrameAssembler {
    pub fn new() -> Self {
        RadarFrameAssembler {
            state: AssemblerState::NoFrame,
            dropped_leading: 0,
        }
    }

    /// Feed one point; returns the completed frame when `point` starts a new
    /// sweep while one was being accumulated.
    pub fn push(&mut self, point: RadarPoint, time_ns: u64) -> Option<RadarFrame> {
        if point.point_id == 0 {
            let fresh = AssemblerState::InFrame(RadarFrame {
                start_time: time_ns,
                points: vec![point],
            });
            match std::mem::replace(&mut self.state, fresh) {
                AssemblerState::InFrame(done) => Some(done),
                AssemblerState::NoFrame => None,
            }
        } else {
            match &mut self.state {
                AssemblerState::InFrame(frame) => {
                    frame.points.push(point);
                    None
                }
                AssemblerState::NoFrame => {
                    tracing::warn!(
                        point_id = point.point_id,
                        time_ns,
                        "radar stream starts mid-sweep; dropping point"
                    );
                    self.dropped_leading += 1;
                    None
                }
            }
        }
    }

    /// Emit the trailing frame once the stream is drained.
    pub fn finish(self) -> Option<RadarFrame> {
        match self.state {
            AssemblerState::InFrame(frame) => Some(frame),
            AssemblerState::NoFrame => None,
        }
    }

    pub fn dropped_leading(&self) -> u64 {
        self.dropped_leading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::wire::testutil::push_header;

    fn pt(point_id: u16) -> RadarPoint {
        RadarPoint {
            point_id,
            x: point_id as f32,
            y: 0.0,
            z: 0.0,
            velocity: 1.5,
        }
    }

    fn drain(assembler: RadarFrameAssembler, stream: &[(u16, u64)]) -> Vec<RadarFrame> {
        let mut assembler = assembler;
        let mut frames = Vec::new();
        for &(id, t) in stream {
            if let Some(frame) = assembler.push(pt(id), t) {
                frames.push(frame);
            }
        }
        if let Some(frame) = assembler.finish() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_decode_radar_point_wire() {
        let mut buf = Vec::new();
        push_header(&mut buf);
        buf.extend_from_slice(&3u16.to_le_bytes()); // point_id
        for v in [1.0f32, -2.0, 0.5, 9.9, -0.25, 0.0, 0.0, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        let record = RawRecord {
            topic: "/ti_mmwave/radar_scan",
            time: 5,
            data: &buf,
        };
        let point = decode_radar_point(&record).unwrap();
        assert_eq!(point.point_id, 3);
        assert_eq!(point.x, 1.0);
        assert_eq!(point.y, -2.0);
        assert_eq!(point.z, 0.5);
        assert_eq!(point.velocity, -0.25);
    }

    #[test]
    fn test_truncated_radar_record() {
        let mut buf = Vec::new();
        push_header(&mut buf);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&1.0f32.to_le_bytes()); // x only

        let record = RawRecord {
            topic: "/ti_mmwave/radar_scan",
            time: 5,
            data: &buf,
        };
        let err = decode_radar_point(&record).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedRecord { .. }));
    }

    #[test]
    fn test_frames_split_on_zero_id() {
        let frames = drain(
            RadarFrameAssembler::new(),
            &[(0, 10), (1, 11), (2, 12), (0, 20), (1, 21), (0, 30)],
        );
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].start_time, 10);
        assert_eq!(frames[0].points.len(), 3);
        assert_eq!(frames[1].start_time, 20);
        assert_eq!(frames[1].points.len(), 2);
        assert_eq!(frames[2].start_time, 30);
        assert_eq!(frames[2].points.len(), 1);

        // Concatenation preserves input order.
        let ids: Vec<u16> = frames
            .iter()
            .flat_map(|f| f.points.iter().map(|p| p.point_id))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 0, 1, 0]);
        for frame in &frames {
            assert_eq!(frame.points[0].point_id, 0);
        }
    }

    #[test]
    fn test_leading_points_without_frame_start_dropped() {
        let mut assembler = RadarFrameAssembler::new();
        assert!(assembler.push(pt(5), 1).is_none());
        assert!(assembler.push(pt(6), 2).is_none());
        assert_eq!(assembler.dropped_leading(), 2);
        assert!(assembler.push(pt(0), 3).is_none());
        let frame = assembler.finish().unwrap();
        assert_eq!(frame.start_time, 3);
        assert_eq!(frame.points.len(), 1);
    }

    #[test]
    fn test_producer_never_splitting_yields_one_frame() {
        let frames = drain(
            RadarFrameAssembler::new(),
            &[(0, 10), (1, 11), (2, 12), (3, 13), (4, 14)],
        );
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].points.len(), 5);
    }

    #[test]
    fn test_empty_stream_yields_no_frames() {
        let frames = drain(RadarFrameAssembler::new(), &[]);
        assert!(frames.is_empty());
    }
}
