//! Point cloud output
//!
//! One point per occupied cell: integer cell coordinates, the mean face
//! color and the label code, all stored as `f64`.

use crate::error::{Result, VoxelizeError};
use crate::raster::OccupancyGrid;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Number of `f64` values per point.
pub const POINT_STRIDE: usize = 7;

/// One emitted point, laid out as seven consecutive `f64`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct OutputPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub label: f64,
}

impl OutputPoint {
    pub fn to_array(&self) -> [f64; POINT_STRIDE] {
        [self.x, self.y, self.z, self.r, self.g, self.b, self.label]
    }
}

/// On-disk encoding for [`PointCloud::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointFormat {
    /// Little-endian `f64`, seven per point, no header
    #[default]
    Binary,
    /// One whitespace-separated point per line
    Text,
}

impl PointFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PointFormat::Binary => "bin",
            PointFormat::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    points: Box<[OutputPoint]>,
}

impl PointCloud {
    /// Emit occupied cells in grid order (z slowest, x fastest).
    pub fn emit(grid: &OccupancyGrid) -> Self {
        let mut points = Vec::with_capacity(grid.len());
        for record in grid.iter() {
            let color = record.color();
            points.push(OutputPoint {
                x: f64::from(record.cell.x),
                y: f64::from(record.cell.y),
                z: f64::from(record.cell.z),
                r: color.x,
                g: color.y,
                b: color.z,
                label: f64::from(record.label),
            });
        }
        Self {
            points: points.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[OutputPoint] {
        &self.points
    }

    /// Flat `x y z r g b label` sequence, `7 * len()` values.
    pub fn as_flat(&self) -> &[f64] {
        bytemuck::cast_slice(&self.points[..])
    }

    pub fn into_points(self) -> Box<[OutputPoint]> {
        self.points
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.as_flat().len() * 8);
        for value in self.as_flat() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn write_binary<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    pub fn write_text<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for p in self.points.iter() {
            writeln!(
                writer,
                "{} {} {} {} {} {} {}",
                p.x, p.y, p.z, p.r, p.g, p.b, p.label
            )?;
        }
        Ok(())
    }

    /// Write the cloud to `path`, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>, format: PointFormat) -> Result<()> {
        let path = path.as_ref();
        let io_err = |err| VoxelizeError::from_io(path, err);

        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        match format {
            PointFormat::Binary => self.write_binary(&mut writer),
            PointFormat::Text => self.write_text(&mut writer),
        }
        .map_err(io_err)?;
        writer.flush().map_err(io_err)
    }
}

impl From<Vec<OutputPoint>> for PointCloud {
    fn from(points: Vec<OutputPoint>) -> Self {
        Self {
            points: points.into_boxed_slice(),
        }
    }
}
