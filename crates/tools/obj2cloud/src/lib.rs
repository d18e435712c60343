//! obj2cloud - command-line front end for `voxcloud`
//!
//! Converts single OBJ meshes or whole datasets into labeled voxel point
//! clouds. Settings come from an optional TOML file, then `OBJ2CLOUD_*`
//! environment variables, then command-line flags.

pub mod config;
pub mod dataset;

pub use config::BatchConfig;
pub use dataset::{discover, output_path};
