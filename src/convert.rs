//! Per-bag conversion pipeline: stream each sensor topic, write its frames,
//! then synchronize the three frame indexes into `synchronized.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::bag::{BagReader, RecordSource};
use crate::decode::image::{decodes_as_image, extract_compressed};
use crate::decode::pointcloud::{SchemaCache, decode_pointcloud};
use crate::decode::radar::{RadarFrame, RadarFrameAssembler, decode_radar_point};
use crate::error::ConvertError;
use crate::pcd::write_ascii_pcd;
use crate::sync::{FrameIndex, synchronize, write_manifest};

/// Fixed input topics of the recording rig.
pub const CAMERA_TOPIC: &str = "/usb_cam/image_raw/compressed";
pub const LIDAR_TOPIC: &str = "/hesai/pandar";
pub const RADAR_TOPIC: &str = "/ti_mmwave/radar_scan";

/// Options for converting a bag (or a directory of bags) into per-sensor
/// datasets.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Path to a .bag file or a directory of .bag files
    pub bag_path: String,
    /// Root output directory; each bag gets a subdirectory named after it
    pub output_path: String,
    /// Show progress bars
    pub show_progress: bool,
    /// Decode each camera payload to verify it is a valid image
    pub verify_images: bool,
}

/// Convert `options.bag_path` — a single bag, or every `*.bag` in a
/// directory, bags converted in parallel.
pub fn convert(options: &ConvertOptions) -> Result<()> {
    let input = Path::new(&options.bag_path);
    if input.is_dir() {
        let mut bags: Vec<PathBuf> = fs::read_dir(input)
            .with_context(|| format!("failed to read bag directory: {}", options.bag_path))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("bag"))
            .collect();
        bags.sort();
        if bags.is_empty() {
            bail!("no .bag files in {}", options.bag_path);
        }

        // Bags share no state; one rayon task each.
        bags.par_iter().try_for_each(|bag| {
            convert_bag(bag, Path::new(&options.output_path), options)
                .with_context(|| format!("failed to convert {}", bag.display()))
        })
    } else {
        convert_bag(input, Path::new(&options.output_path), options)
            .with_context(|| format!("failed to convert {}", options.bag_path))
    }
}

/// Convert one bag into `<out_root>/<bag_stem>/`.
pub fn convert_bag(bag_path: &Path, out_root: &Path, options: &ConvertOptions) -> Result<()> {
    let reader = BagReader::open(&bag_path.to_string_lossy())?;

    let stem = bag_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bag");
    convert_records(&reader, &out_root.join(stem), options)
}

/// Convert one record source into `output_dir`: sensor subdirectories for
/// the topics present, one file per frame, and `synchronized.json`.
pub fn convert_records<R: RecordSource + Sync>(
    reader: &R,
    output_dir: &Path,
    options: &ConvertOptions,
) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| ConvertError::io(output_dir, e))?;

    let has_camera = reader.has_topic(CAMERA_TOPIC);
    let has_lidar = reader.has_topic(LIDAR_TOPIC);
    let has_radar = reader.has_topic(RADAR_TOPIC);
    tracing::info!(
        out = %output_dir.display(),
        has_camera,
        has_lidar,
        has_radar,
        "converting records"
    );

    let progress = MultiProgress::new();
    let bar = |label: &str, topic: &str, present: bool| {
        if present && options.show_progress {
            let pb = progress.add(ProgressBar::new(reader.message_count(topic)));
            pb.set_style(
                ProgressStyle::with_template("{prefix:>7} [{bar:40}] {pos}/{len}").unwrap(),
            );
            pb.set_prefix(label.to_string());
            pb
        } else {
            ProgressBar::hidden()
        }
    };
    let camera_pb = bar("camera", CAMERA_TOPIC, has_camera);
    let lidar_pb = bar("lidar", LIDAR_TOPIC, has_lidar);
    let radar_pb = bar("radar", RADAR_TOPIC, has_radar);

    // The three sensor pipelines read disjoint topics and write disjoint
    // directories; each privately owns its FrameIndex until the join.
    let (camera_res, (lidar_res, radar_res)) = rayon::join(
        || {
            has_camera
                .then(|| convert_camera(reader, &output_dir.join("camera"), &camera_pb, options))
                .transpose()
        },
        || {
            rayon::join(
                || {
                    has_lidar
                        .then(|| convert_lidar(reader, &output_dir.join("lidar"), &lidar_pb))
                        .transpose()
                },
                || {
                    has_radar
                        .then(|| convert_radar(reader, &output_dir.join("radar"), &radar_pb))
                        .transpose()
                },
            )
        },
    );
    camera_pb.finish_and_clear();
    lidar_pb.finish_and_clear();
    radar_pb.finish_and_clear();

    let camera = settle("camera", camera_res)?;
    let lidar = settle("lidar", lidar_res)?;
    let radar = settle("radar", radar_res)?;

    // Barrier passed: all three indexes are final.
    let matches = match synchronize(&camera, &lidar, &radar) {
        Ok(matches) => matches,
        Err(ConvertError::AllStreamsEmpty) => {
            tracing::info!(out = %output_dir.display(), "no frames on any sensor; writing empty manifest");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    write_manifest(&output_dir.join("synchronized.json"), &matches)?;

    tracing::info!(
        out = %output_dir.display(),
        camera_frames = camera.len(),
        lidar_frames = lidar.len(),
        radar_frames = radar.len(),
        matches = matches.len(),
        "conversion and synchronization finished"
    );
    Ok(())
}

/// Apply the per-topic failure policy: a missing required field abandons
/// that sensor but leaves its siblings alone; I/O and bag-level errors
/// abort the bag.
fn settle(sensor: &str, result: Result<Option<FrameIndex>>) -> Result<FrameIndex> {
    match result {
        Ok(Some(index)) => Ok(index),
        Ok(None) => Ok(FrameIndex::new()),
        Err(err) => match err.downcast_ref::<ConvertError>() {
            Some(ConvertError::MissingField(_)) => {
                tracing::error!(sensor, "conversion abandoned: {err:#}");
                Ok(FrameIndex::new())
            }
            _ => Err(err),
        },
    }
}

fn convert_camera<R: RecordSource>(
    reader: &R,
    dir: &Path,
    pb: &ProgressBar,
    options: &ConvertOptions,
) -> Result<FrameIndex> {
    fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;

    let mut index = FrameIndex::new();
    let mut skipped: u64 = 0;
    reader.stream(CAMERA_TOPIC, &mut |record| {
        pb.inc(1);
        let frame = match extract_compressed(&record) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("skipping camera record: {e}");
                skipped += 1;
                return Ok(());
            }
        };
        if options.verify_images && !decodes_as_image(frame.data) {
            tracing::warn!(
                timestamp = frame.timestamp,
                "camera payload does not decode as an image; writing anyway"
            );
        }
        let filename = format!("{}.jpg", frame.timestamp);
        let path = dir.join(&filename);
        fs::write(&path, frame.data).map_err(|e| ConvertError::io(&path, e))?;
        index.push(frame.timestamp, filename);
        Ok(())
    })?;

    tracing::info!(frames = index.len(), skipped, "camera conversion done");
    Ok(index)
}

fn convert_lidar<R: RecordSource>(reader: &R, dir: &Path, pb: &ProgressBar) -> Result<FrameIndex> {
    fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;

    let mut index = FrameIndex::new();
    let mut cache = SchemaCache::new();
    let mut skipped: u64 = 0;
    reader.stream(LIDAR_TOPIC, &mut |record| {
        pb.inc(1);
        let frame = match decode_pointcloud(&record, &mut cache) {
            Ok(frame) => frame,
            Err(e @ ConvertError::MalformedRecord { .. }) => {
                tracing::warn!("skipping lidar record: {e}");
                skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let filename = format!("{}.pcd", frame.timestamp);
        write_ascii_pcd(&dir.join(&filename), "intensity", &frame.points)?;
        index.push(frame.timestamp, filename);
        Ok(())
    })?;

    tracing::info!(frames = index.len(), skipped, "lidar conversion done");
    Ok(index)
}

fn convert_radar<R: RecordSource>(reader: &R, dir: &Path, pb: &ProgressBar) -> Result<FrameIndex> {
    fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;

    let mut index = FrameIndex::new();
    let mut assembler = RadarFrameAssembler::new();
    let mut skipped: u64 = 0;

    let emit = |frame: RadarFrame, index: &mut FrameIndex| -> Result<(), ConvertError> {
        let filename = format!("{}.pcd", frame.start_time);
        write_ascii_pcd(&dir.join(&filename), "velocity", &frame.to_rows())?;
        index.push(frame.start_time, filename);
        Ok(())
    };

    reader.stream(RADAR_TOPIC, &mut |record| {
        pb.inc(1);
        let point = match decode_radar_point(&record) {
            Ok(point) => point,
            Err(e) => {
                tracing::warn!("skipping radar record: {e}");
                skipped += 1;
                return Ok(());
            }
        };
        if let Some(done) = assembler.push(point, record.time) {
            emit(done, &mut index)?;
        }
        Ok(())
    })?;

    let dropped = assembler.dropped_leading();
    if let Some(last) = assembler.finish() {
        emit(last, &mut index)?;
    }

    tracing::info!(
        frames = index.len(),
        skipped,
        dropped_leading = dropped,
        "radar conversion done"
    );
    Ok(index)
}
