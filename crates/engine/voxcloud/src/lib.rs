//! Voxcloud - OBJ mesh to labeled voxel point cloud converter
//!
//! Rasterizes a polygon mesh into a fixed-resolution grid placed over its
//! (padded) bounding box and emits one point per occupied cell, carrying the
//! cell indices, a color and a semantic label. The output is training data for
//! point-cloud learning pipelines.
//!
//! ## Pipeline
//!
//! ```text
//! labels.txt ──> LabelTable ──┐
//!                             ├─> rasterize() ─> OccupancyGrid ─> PointCloud
//! mesh.obj ───> Mesh ─────────┘        ↑
//!                                  GridFrame (GridSpec + padded bounds)
//! ```
//!
//! Occupied cells are emitted with z slowest and x fastest. A cell touched by
//! several faces takes the mean of their colors and the label of the
//! lowest-indexed face.
//!
//! ## Quick Start
//!
//! ```no_run
//! use voxcloud::{convert, ConvertOptions, GridSpec, PointFormat};
//!
//! let grid = GridSpec::new(110, 110, 110)?;
//! let cloud = convert("scene.obj", "labels.txt", grid, &ConvertOptions::default())?;
//! println!("{} occupied voxels", cloud.len());
//! cloud.write("scene.bin", PointFormat::Binary)?;
//! # Ok::<(), voxcloud::VoxelizeError>(())
//! ```
//!
//! Many meshes are converted in parallel with [`BatchDriver`]. Enabling the
//! `ffi` feature exports the `voxcloud_get_data` / `voxcloud_free` C ABI.

pub mod batch;
pub mod config;
pub mod convert;
pub mod emit;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod grid;
pub mod labels;
pub mod mesh;
pub mod raster;

pub use batch::{BatchDriver, BatchSummary, ConversionTask, TaskOutcome};
pub use config::{CategorySource, ColorSource, ConvertOptions, DEFAULT_BOUNDARY_PADDING};
pub use convert::{convert, convert_mesh, spacing_grid};
pub use emit::{OutputPoint, PointCloud, PointFormat, POINT_STRIDE};
pub use error::{Result, VoxelizeError};
pub use grid::{GridFrame, GridSpec};
pub use labels::{LabelTable, UNKNOWN_LABEL};
pub use mesh::{Bounds, Face, Mesh};
pub use raster::{rasterize, OccupancyGrid, VoxelRecord};
