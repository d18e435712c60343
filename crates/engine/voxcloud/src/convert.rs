//! Conversion entry points: mesh + labels + grid -> point cloud

use crate::config::ConvertOptions;
use crate::emit::PointCloud;
use crate::error::{Result, VoxelizeError};
use crate::grid::{GridFrame, GridSpec};
use crate::labels::LabelTable;
use crate::mesh::Mesh;
use crate::raster::rasterize;
use std::path::Path;
use tracing::debug;

/// Convert one OBJ file.
///
/// The label table is read before the mesh, so a missing label file fails
/// without parsing any geometry.
pub fn convert(
    mesh_path: impl AsRef<Path>,
    label_path: impl AsRef<Path>,
    grid: GridSpec,
    options: &ConvertOptions,
) -> Result<PointCloud> {
    options.validate()?;
    let labels = LabelTable::load(label_path)?.with_fallback(options.fallback_label);
    let mesh = Mesh::load(mesh_path, options)?;
    convert_mesh(&mesh, &labels, grid, options)
}

/// Convert an already loaded mesh.
///
/// A mesh without faces yields an empty cloud.
pub fn convert_mesh(
    mesh: &Mesh,
    labels: &LabelTable,
    grid: GridSpec,
    options: &ConvertOptions,
) -> Result<PointCloud> {
    options.validate()?;
    if mesh.faces().is_empty() {
        return Ok(PointCloud::default());
    }

    let bounds = mesh.bounds().ok_or_else(|| {
        VoxelizeError::InvalidGridSpec("mesh has no vertices to bound".to_string())
    })?;
    let frame = GridFrame::new(grid, bounds, options.boundary_padding)?;
    debug!(
        "Grid {} over [{}, {}], cell size {}",
        grid,
        frame.bounds().min,
        frame.bounds().max,
        frame.cell_size()
    );

    let occupancy = rasterize(mesh, &frame, labels);
    Ok(PointCloud::emit(&occupancy))
}

/// Grid for `mesh` from a cell edge length, see [`GridSpec::from_spacing`].
///
/// The box is padded the same way [`convert_mesh`] pads it.
pub fn spacing_grid(
    mesh: &Mesh,
    spacing: f64,
    max_resolution: u32,
    options: &ConvertOptions,
) -> Result<GridSpec> {
    options.validate()?;
    let bounds = mesh.bounds().ok_or_else(|| {
        VoxelizeError::InvalidGridSpec("mesh has no vertices to bound".to_string())
    })?;
    GridSpec::from_spacing(
        &bounds.padded(options.boundary_padding),
        spacing,
        max_resolution,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Face;
    use glam::DVec3;

    #[test]
    fn test_empty_face_list_yields_no_points() {
        let mesh = Mesh::from_parts(vec![DVec3::ZERO], vec![], vec![]).unwrap();
        let cloud = convert_mesh(
            &mesh,
            &LabelTable::default(),
            GridSpec::new(4, 4, 4).unwrap(),
            &ConvertOptions::default(),
        )
        .unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn test_degenerate_box_is_invalid_grid() {
        let mesh = Mesh::from_parts(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![Face::new(vec![0, 1, 2], 0)],
            vec![String::new()],
        )
        .unwrap();
        let options = ConvertOptions::default().with_boundary_padding(0.0);
        let err = convert_mesh(
            &mesh,
            &LabelTable::default(),
            GridSpec::new(2, 2, 2).unwrap(),
            &options,
        )
        .unwrap_err();
        assert!(err.is_invalid_grid());
    }

    #[test]
    fn test_fallback_label_applies_to_unmapped_faces() {
        let mesh = Mesh::from_parts(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![Face::new(vec![0, 1, 2], 0)],
            vec!["unmapped".to_string()],
        )
        .unwrap();
        let labels = LabelTable::default().with_fallback(17);
        let cloud = convert_mesh(
            &mesh,
            &labels,
            GridSpec::new(1, 1, 1).unwrap(),
            &ConvertOptions::default(),
        )
        .unwrap();
        assert_eq!(cloud.len(), 1);
        assert_eq!(cloud.points()[0].label, 17.0);
    }

    #[test]
    fn test_spacing_grid_covers_padded_box() {
        let mesh = Mesh::from_parts(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            vec![Face::new(vec![0, 1, 2], 0)],
            vec![String::new()],
        )
        .unwrap();
        let options = ConvertOptions::default();

        let grid = spacing_grid(&mesh, 0.1, 0, &options).unwrap();
        assert_eq!((grid.nx(), grid.ny(), grid.nz()), (11, 11, 1));

        let capped = spacing_grid(&mesh, 0.1, 5, &options).unwrap();
        assert_eq!((capped.nx(), capped.ny(), capped.nz()), (5, 5, 1));

        let cloud = convert_mesh(&mesh, &LabelTable::default(), grid, &options).unwrap();
        assert!(!cloud.is_empty());
    }
}
