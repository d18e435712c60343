//! Surface rasterization into a sparse occupancy grid
//!
//! A cell is occupied when at least one face's surface intersects the closed
//! cell box. Each occupied cell keeps the mean color of every face touching
//! it and the label of the lowest-indexed such face.

pub mod overlap;

use crate::grid::{GridFrame, GridSpec};
use crate::labels::LabelTable;
use crate::mesh::{normal_color, Mesh};
use glam::{DVec3, UVec3};
use std::collections::BTreeMap;
use tracing::debug;

pub use overlap::triangle_box_overlap;

/// Accumulated state of one occupied cell.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelRecord {
    pub cell: UVec3,
    color_sum: DVec3,
    contributors: u32,
    /// Label of the lowest-indexed contributing face
    pub label: u32,
    first_face: usize,
    last_face: usize,
}

impl VoxelRecord {
    fn new(cell: UVec3, face: usize, color: DVec3, label: u32) -> Self {
        Self {
            cell,
            color_sum: color,
            contributors: 1,
            label,
            first_face: face,
            last_face: face,
        }
    }

    /// Mean of the contributing face colors.
    pub fn color(&self) -> DVec3 {
        self.color_sum / f64::from(self.contributors)
    }

    /// Number of distinct faces touching the cell.
    pub fn contributors(&self) -> u32 {
        self.contributors
    }

    pub fn first_face(&self) -> usize {
        self.first_face
    }

    // Faces are visited in index order, so a repeat is always the last one
    fn add(&mut self, face: usize, color: DVec3, label: u32) {
        if face == self.last_face {
            return;
        }
        self.color_sum += color;
        self.contributors += 1;
        self.last_face = face;
        if face < self.first_face {
            self.first_face = face;
            self.label = label;
        }
    }
}

/// Map key ordering cells z slowest, x fastest. Valid for any grid size.
type CellKey = (u32, u32, u32);

#[inline]
fn cell_key(cell: UVec3) -> CellKey {
    (cell.z, cell.y, cell.x)
}

/// Occupied cells in x-fastest order.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    spec: GridSpec,
    voxels: BTreeMap<CellKey, VoxelRecord>,
}

impl OccupancyGrid {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            voxels: BTreeMap::new(),
        }
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn get(&self, cell: UVec3) -> Option<&VoxelRecord> {
        if !self.spec.contains(cell) {
            return None;
        }
        self.voxels.get(&cell_key(cell))
    }

    /// Occupied cells, z slowest and x fastest.
    pub fn iter(&self) -> impl Iterator<Item = &VoxelRecord> {
        self.voxels.values()
    }

    fn mark(&mut self, cell: UVec3, face: usize, color: DVec3, label: u32) {
        self.voxels
            .entry(cell_key(cell))
            .and_modify(|record| record.add(face, color, label))
            .or_insert_with(|| VoxelRecord::new(cell, face, color, label));
    }
}

/// Mark every cell of `frame` that a face of `mesh` touches.
pub fn rasterize(mesh: &Mesh, frame: &GridFrame, labels: &LabelTable) -> OccupancyGrid {
    let spec = frame.spec();
    let mut grid = OccupancyGrid::new(spec);

    let category_labels: Vec<u32> = mesh
        .categories()
        .iter()
        .map(|key| labels.lookup(key))
        .collect();

    let half = DVec3::splat(0.5);
    let mut tests = 0usize;

    for (face_index, face) in mesh.faces().iter().enumerate() {
        let color = face
            .color
            .unwrap_or_else(|| normal_color(mesh.face_normal(face)));
        let label = category_labels[face.category];

        for triangle in mesh.triangles(face) {
            let tri = triangle.map(|p| frame.to_grid(p));
            let lo = tri[0].min(tri[1]).min(tri[2]);
            let hi = tri[0].max(tri[1]).max(tri[2]);
            let Some((first, last)) = frame.cell_range(lo, hi) else {
                continue;
            };

            for k in first.z..=last.z {
                for j in first.y..=last.y {
                    for i in first.x..=last.x {
                        let cell = UVec3::new(i, j, k);
                        let center = cell.as_dvec3() + half;
                        tests += 1;
                        if triangle_box_overlap(&tri, center, half) {
                            grid.mark(cell, face_index, color, label);
                        }
                    }
                }
            }
        }
    }

    debug!(
        "Rasterized {} faces into {} grid: {} occupied cells ({} box tests)",
        mesh.face_count(),
        spec,
        grid.len(),
        tests
    );

    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Bounds, Face};

    fn frame(spec: GridSpec) -> GridFrame {
        GridFrame::new(spec, Bounds::new(DVec3::ZERO, DVec3::ONE), 0.0).unwrap()
    }

    fn triangle_mesh(z: f64, category: &str) -> Mesh {
        Mesh::from_parts(
            vec![
                DVec3::new(0.1, 0.1, z),
                DVec3::new(0.9, 0.1, z),
                DVec3::new(0.1, 0.9, z),
            ],
            vec![Face::new(vec![0, 1, 2], 0).with_color(DVec3::new(1.0, 0.0, 0.0))],
            vec![category.to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_single_cell_grid() {
        let mesh = triangle_mesh(0.5, "chair");
        let labels = LabelTable::from_entries([("chair", 3)]);
        let grid = rasterize(&mesh, &frame(GridSpec::new(1, 1, 1).unwrap()), &labels);

        assert_eq!(grid.len(), 1);
        let record = grid.get(UVec3::ZERO).unwrap();
        assert_eq!(record.label, 3);
        assert_eq!(record.color(), DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(record.contributors(), 1);
    }

    #[test]
    fn test_flat_triangle_stays_in_its_layer() {
        let mesh = triangle_mesh(0.3, "floor");
        let grid = rasterize(
            &mesh,
            &frame(GridSpec::new(4, 4, 4).unwrap()),
            &LabelTable::default(),
        );

        assert!(!grid.is_empty());
        assert!(grid.iter().all(|r| r.cell.z == 1));
        assert!(grid.iter().all(|r| r.label == 0));
    }

    #[test]
    fn test_face_on_cell_boundary_marks_both_sides() {
        let mesh = triangle_mesh(0.5, "wall");
        let grid = rasterize(
            &mesh,
            &frame(GridSpec::new(2, 2, 2).unwrap()),
            &LabelTable::default(),
        );

        assert!(grid.get(UVec3::new(0, 0, 0)).is_some());
        assert!(grid.get(UVec3::new(0, 0, 1)).is_some());
    }

    #[test]
    fn test_shared_cell_takes_first_label_and_mean_color() {
        let mesh = Mesh::from_parts(
            vec![
                DVec3::new(0.1, 0.1, 0.2),
                DVec3::new(0.9, 0.1, 0.2),
                DVec3::new(0.1, 0.9, 0.2),
                DVec3::new(0.1, 0.1, 0.8),
                DVec3::new(0.9, 0.1, 0.8),
                DVec3::new(0.1, 0.9, 0.8),
            ],
            vec![
                Face::new(vec![0, 1, 2], 0).with_color(DVec3::new(1.0, 0.0, 0.0)),
                Face::new(vec![3, 4, 5], 1).with_color(DVec3::new(0.0, 0.0, 1.0)),
            ],
            vec!["seat".to_string(), "lamp".to_string()],
        )
        .unwrap();
        let labels = LabelTable::from_entries([("seat", 5), ("lamp", 9)]);
        let grid = rasterize(&mesh, &frame(GridSpec::new(1, 1, 1).unwrap()), &labels);

        let record = grid.get(UVec3::ZERO).unwrap();
        assert_eq!(record.label, 5);
        assert_eq!(record.first_face(), 0);
        assert_eq!(record.contributors(), 2);
        assert_eq!(record.color(), DVec3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_quad_counted_once_per_cell() {
        let mesh = Mesh::from_parts(
            vec![
                DVec3::new(0.1, 0.1, 0.5),
                DVec3::new(0.9, 0.1, 0.5),
                DVec3::new(0.9, 0.9, 0.5),
                DVec3::new(0.1, 0.9, 0.5),
            ],
            vec![Face::new(vec![0, 1, 2, 3], 0).with_color(DVec3::new(0.2, 0.4, 0.6))],
            vec!["rug".to_string()],
        )
        .unwrap();
        let grid = rasterize(
            &mesh,
            &frame(GridSpec::new(1, 1, 1).unwrap()),
            &LabelTable::default(),
        );

        let record = grid.get(UVec3::ZERO).unwrap();
        assert_eq!(record.contributors(), 1);
        assert_eq!(record.color(), DVec3::new(0.2, 0.4, 0.6));
    }

    #[test]
    fn test_missing_color_uses_normal() {
        let mesh = Mesh::from_parts(
            vec![
                DVec3::new(0.1, 0.1, 0.5),
                DVec3::new(0.9, 0.1, 0.5),
                DVec3::new(0.1, 0.9, 0.5),
            ],
            vec![Face::new(vec![0, 1, 2], 0)],
            vec![String::new()],
        )
        .unwrap();
        let grid = rasterize(
            &mesh,
            &frame(GridSpec::new(1, 1, 1).unwrap()),
            &LabelTable::default(),
        );

        let color = grid.get(UVec3::ZERO).unwrap().color();
        assert!((color - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_iteration_is_x_fastest() {
        let mesh = triangle_mesh(0.3, "floor");
        let grid = rasterize(
            &mesh,
            &frame(GridSpec::new(4, 4, 4).unwrap()),
            &LabelTable::default(),
        );

        let spec = grid.spec();
        let order: Vec<u128> = grid.iter().map(|r| spec.linear_index(r.cell)).collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_huge_grid_keeps_distinct_corner_cells() {
        let side = 1u32 << 22;
        let eps = 1e-9;
        let mesh = Mesh::from_parts(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(eps, 0.0, 0.0),
                DVec3::new(0.0, eps, 0.0),
                DVec3::new(1.0, 1.0, 1.0),
                DVec3::new(1.0 - eps, 1.0, 1.0),
                DVec3::new(1.0, 1.0 - eps, 1.0),
            ],
            vec![Face::new(vec![0, 1, 2], 0), Face::new(vec![3, 4, 5], 0)],
            vec!["speck".to_string()],
        )
        .unwrap();
        let grid = rasterize(
            &mesh,
            &frame(GridSpec::new(side, side, side).unwrap()),
            &LabelTable::default(),
        );

        let cells: Vec<UVec3> = grid.iter().map(|r| r.cell).collect();
        assert_eq!(cells, vec![UVec3::ZERO, UVec3::splat(side - 1)]);
    }
}
