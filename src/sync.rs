//! Cross-sensor temporal alignment.
//!
//! After all three sensor streams are drained, their frame indexes are
//! matched into one triple per anchor frame. The anchor is the non-empty
//! stream with the fewest frames (ties: camera, then radar, then lidar);
//! the other streams contribute their nearest-timestamp frame, found by
//! binary search over the timestamp-sorted index.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Timestamp-ordered `(timestamp_ns, filename)` pairs for one sensor, built
/// incrementally as frames are written and read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct FrameIndex {
    entries: Vec<(u64, String)>,
}

impl FrameIndex {
    pub fn new() -> Self {
        FrameIndex::default()
    }

    /// Record one written frame. Per-topic arrival order is non-decreasing,
    /// so appends keep the index sorted.
    pub fn push(&mut self, timestamp: u64, filename: String) {
        debug_assert!(
            self.entries.last().is_none_or(|(last, _)| *last <= timestamp),
            "frame timestamps must be non-decreasing"
        );
        self.entries.push((timestamp, filename));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.entries.iter().map(|(t, name)| (*t, name.as_str()))
    }

    /// The entry whose timestamp minimizes `|timestamp - t|`; on a tie the
    /// earlier entry wins. Only the insertion point and its left neighbor
    /// are examined.
    fn nearest(&self, t: u64) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let i = self.entries.partition_point(|(ts, _)| *ts < t);
        let pick = if i == 0 {
            0
        } else if i == self.entries.len() {
            i - 1
        } else {
            let left_diff = t - self.entries[i - 1].0;
            let right_diff = self.entries[i].0 - t;
            if left_diff <= right_diff { i - 1 } else { i }
        };
        Some(self.entries[pick].1.as_str())
    }
}

/// One row of `synchronized.json`. An empty string marks a sensor that was
/// absent or produced no frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTriple {
    pub camera: String,
    pub lidar: String,
    pub radar: String,
}

/// Align the three frame indexes into one triple per anchor frame.
///
/// Fails with [`ConvertError::AllStreamsEmpty`] when no stream has frames;
/// an empty non-anchor stream degrades to empty references instead.
pub fn synchronize(
    camera: &FrameIndex,
    lidar: &FrameIndex,
    radar: &FrameIndex,
) -> Result<Vec<SyncTriple>, ConvertError> {
    #[derive(Clone, Copy)]
    enum Sensor {
        Camera,
        Radar,
        Lidar,
    }

    // Candidate order encodes the tie-break priority; a later stream only
    // takes over when strictly smaller.
    let mut anchor: Option<(Sensor, &FrameIndex)> = None;
    for (sensor, index) in [
        (Sensor::Camera, camera),
        (Sensor::Radar, radar),
        (Sensor::Lidar, lidar),
    ] {
        if index.is_empty() {
            continue;
        }
        match &anchor {
            Some((_, best)) if best.len() <= index.len() => {}
            _ => anchor = Some((sensor, index)),
        }
    }
    let (anchor_sensor, anchor_index) = anchor.ok_or(ConvertError::AllStreamsEmpty)?;
    let empty_or_nearest =
        |index: &FrameIndex, t: u64| index.nearest(t).unwrap_or("").to_string();

    let mut matches = Vec::with_capacity(anchor_index.len());
    for (t, filename) in anchor_index.iter() {
        let triple = match anchor_sensor {
            Sensor::Camera => SyncTriple {
                camera: filename.to_string(),
                lidar: empty_or_nearest(lidar, t),
                radar: empty_or_nearest(radar, t),
            },
            Sensor::Radar => SyncTriple {
                camera: empty_or_nearest(camera, t),
                lidar: empty_or_nearest(lidar, t),
                radar: filename.to_string(),
            },
            Sensor::Lidar => SyncTriple {
                camera: empty_or_nearest(camera, t),
                lidar: filename.to_string(),
                radar: empty_or_nearest(radar, t),
            },
        };
        matches.push(triple);
    }

    Ok(matches)
}

/// Write the alignment manifest as 2-space-indented JSON.
pub fn write_manifest(path: &Path, matches: &[SyncTriple]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), matches)
        .with_context(|| format!("failed to write manifest {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(timestamps: &[u64], ext: &str) -> FrameIndex {
        let mut index = FrameIndex::new();
        for &t in timestamps {
            index.push(t, format!("{t}.{ext}"));
        }
        index
    }

    #[test]
    fn test_smallest_stream_is_anchor() {
        let camera = index(&[10, 20, 30], "jpg");
        let lidar = index(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10], "pcd");
        let radar = index(&[21], "pcd");

        let matches = synchronize(&camera, &lidar, &radar).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].radar, "21.pcd");
        assert_eq!(matches[0].camera, "20.jpg");
        assert_eq!(matches[0].lidar, "10.pcd");
    }

    #[test]
    fn test_nearest_picks_literal_minimum() {
        let camera = index(&[90, 140], "jpg");
        let lidar = index(&[100], "pcd");
        let radar = index(&[100, 101], "pcd");

        // Lidar is the single-frame anchor at t=100; camera 90 (diff 10)
        // beats 140 (diff 40).
        let matches = synchronize(&camera, &lidar, &radar).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].camera, "90.jpg");
        assert_eq!(matches[0].lidar, "100.pcd");
        assert_eq!(matches[0].radar, "100.pcd");
    }

    #[test]
    fn test_equidistant_tie_prefers_earlier() {
        let candidates = index(&[90, 110], "pcd");
        assert_eq!(candidates.nearest(100), Some("90.pcd"));
    }

    #[test]
    fn test_nearest_at_boundaries() {
        let candidates = index(&[100, 200, 300], "pcd");
        assert_eq!(candidates.nearest(5), Some("100.pcd"));
        assert_eq!(candidates.nearest(1000), Some("300.pcd"));
        assert_eq!(candidates.nearest(200), Some("200.pcd"));
        assert_eq!(candidates.nearest(249), Some("200.pcd"));
        assert_eq!(candidates.nearest(251), Some("300.pcd"));
    }

    #[test]
    fn test_anchor_tie_prefers_camera_then_radar() {
        let camera = index(&[10, 20], "jpg");
        let lidar = index(&[10, 20], "pcd");
        let radar = index(&[10, 20], "pcd");
        let matches = synchronize(&camera, &lidar, &radar).unwrap();
        // Equal sizes: camera drives and keeps its own filenames verbatim.
        assert_eq!(matches[0].camera, "10.jpg");

        let camera = FrameIndex::new();
        let matches = synchronize(&camera, &lidar, &radar).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].radar, "10.pcd");
        assert_eq!(matches[0].camera, "");
    }

    #[test]
    fn test_empty_non_anchor_degrades_to_empty_reference() {
        let camera = index(&[10], "jpg");
        let lidar = FrameIndex::new();
        let radar = FrameIndex::new();

        let matches = synchronize(&camera, &lidar, &radar).unwrap();
        assert_eq!(
            matches,
            vec![SyncTriple {
                camera: "10.jpg".to_string(),
                lidar: String::new(),
                radar: String::new(),
            }]
        );
    }

    #[test]
    fn test_all_streams_empty_is_fatal() {
        let empty = FrameIndex::new();
        let err = synchronize(&empty, &empty, &empty).unwrap_err();
        assert!(matches!(err, ConvertError::AllStreamsEmpty));
    }

    #[test]
    fn test_manifest_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synchronized.json");
        let matches = vec![SyncTriple {
            camera: "1.jpg".to_string(),
            lidar: "2.pcd".to_string(),
            radar: String::new(),
        }];
        write_manifest(&path, &matches).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<SyncTriple> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, matches);
        // 2-space indentation, keys in struct order.
        assert!(contents.contains("  {\n    \"camera\": \"1.jpg\""));
    }
}
