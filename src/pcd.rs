//! ASCII PCD serialization for lidar and radar frames.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ConvertError;

/// Write `points` as an ASCII PCD v.7 file. `fourth_field` names the fourth
/// column ("intensity" for lidar, "velocity" for radar). Values are printed
/// with 6 decimal places so output is byte-reproducible.
///
/// A failed write may leave a partial file behind; the error carries the
/// path so the caller can report it.
pub fn write_ascii_pcd(
    path: &Path,
    fourth_field: &str,
    points: &[[f32; 4]],
) -> Result<(), ConvertError> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut w = BufWriter::new(file);

    let n = points.len();
    write!(
        w,
        "VERSION .7\n\
         FIELDS x y z {fourth_field}\n\
         SIZE 4 4 4 4\n\
         TYPE F F F F\n\
         COUNT 1 1 1 1\n\
         WIDTH {n}\n\
         HEIGHT 1\n\
         VIEWPOINT 0 0 0 1 0 0 0\n\
         POINTS {n}\n\
         DATA ascii\n"
    )
    .map_err(|e| ConvertError::io(path, e))?;

    for p in points {
        writeln!(w, "{:.6} {:.6} {:.6} {:.6}", p[0], p[1], p[2], p[3])
            .map_err(|e| ConvertError::io(path, e))?;
    }

    w.flush().map_err(|e| ConvertError::io(path, e))
}
