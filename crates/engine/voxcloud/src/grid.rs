//! Grid specification and its placement over a mesh bounding box

use crate::error::{Result, VoxelizeError};
use crate::mesh::Bounds;
use glam::{DVec3, UVec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Voxel counts along each axis. Every axis is > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u32; 3]", into = "[u32; 3]")]
pub struct GridSpec {
    nx: u32,
    ny: u32,
    nz: u32,
}

impl GridSpec {
    /// Resolution used by the legacy dataset scripts.
    pub const LEGACY_DEFAULT: GridSpec = GridSpec {
        nx: 110,
        ny: 110,
        nz: 110,
    };

    pub fn new(nx: u32, ny: u32, nz: u32) -> Result<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(VoxelizeError::InvalidGridSpec(format!(
                "resolution must be positive on every axis (got {nx}x{ny}x{nz})"
            )));
        }
        Ok(Self { nx, ny, nz })
    }

    /// Accept the signed integers of the legacy C interface.
    pub fn try_from_signed(nx: i64, ny: i64, nz: i64) -> Result<Self> {
        let axis = |n: i64| {
            u32::try_from(n).map_err(|_| {
                VoxelizeError::InvalidGridSpec(format!(
                    "resolution must be in 1..={} on every axis (got {nx}x{ny}x{nz})",
                    u32::MAX
                ))
            })
        };
        Self::new(axis(nx)?, axis(ny)?, axis(nz)?)
    }

    /// Derive a resolution from a cell edge length.
    ///
    /// `bounds` is the already padded box. The spacing is raised so the
    /// longest axis holds at most `max_resolution` cells (0 = unlimited); a
    /// spacing of 0 means `longest / 256`. Each axis gets
    /// `round(extent / spacing)` cells, at least one.
    pub fn from_spacing(bounds: &Bounds, spacing: f64, max_resolution: u32) -> Result<Self> {
        let extent = bounds.extent();
        if !extent.is_finite() || extent.min_element() < 0.0 {
            return Err(VoxelizeError::InvalidGridSpec(format!(
                "bounding box extent {extent} is not usable"
            )));
        }
        if !spacing.is_finite() || spacing < 0.0 {
            return Err(VoxelizeError::InvalidGridSpec(format!(
                "grid spacing must be finite and >= 0 (got {spacing})"
            )));
        }

        let diameter = bounds.longest_axis_length();
        let min_spacing = if max_resolution > 0 {
            diameter / f64::from(max_resolution)
        } else {
            f64::EPSILON
        };
        let mut spacing = if spacing == 0.0 {
            diameter / 256.0
        } else {
            spacing
        };
        if spacing < min_spacing {
            spacing = min_spacing;
        }
        if spacing <= 0.0 {
            return Err(VoxelizeError::InvalidGridSpec(
                "bounding box has zero extent".to_string(),
            ));
        }

        let cells = |length: f64| ((length / spacing + 0.5) as u32).max(1);
        Self::new(cells(extent.x), cells(extent.y), cells(extent.z))
    }

    #[inline]
    pub fn nx(&self) -> u32 {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> u32 {
        self.ny
    }

    #[inline]
    pub fn nz(&self) -> u32 {
        self.nz
    }

    #[inline]
    pub fn dims(&self) -> UVec3 {
        UVec3::new(self.nx, self.ny, self.nz)
    }

    /// Total cell count. Three `u32` axes always fit in `u128`.
    pub fn cell_count(&self) -> u128 {
        u128::from(self.nx) * u128::from(self.ny) * u128::from(self.nz)
    }

    /// Linear index with x fastest, then y, then z.
    #[inline]
    pub fn linear_index(&self, cell: UVec3) -> u128 {
        (u128::from(cell.z) * u128::from(self.ny) + u128::from(cell.y)) * u128::from(self.nx)
            + u128::from(cell.x)
    }

    #[inline]
    pub fn cell_from_linear(&self, index: u128) -> UVec3 {
        let nx = u128::from(self.nx);
        let ny = u128::from(self.ny);
        UVec3::new(
            (index % nx) as u32,
            ((index / nx) % ny) as u32,
            (index / (nx * ny)) as u32,
        )
    }

    #[inline]
    pub fn contains(&self, cell: UVec3) -> bool {
        cell.x < self.nx && cell.y < self.ny && cell.z < self.nz
    }
}

impl TryFrom<[u32; 3]> for GridSpec {
    type Error = VoxelizeError;

    fn try_from([nx, ny, nz]: [u32; 3]) -> Result<Self> {
        Self::new(nx, ny, nz)
    }
}

impl From<GridSpec> for [u32; 3] {
    fn from(spec: GridSpec) -> Self {
        [spec.nx, spec.ny, spec.nz]
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.nx, self.ny, self.nz)
    }
}

/// A grid specification placed over a (padded) bounding box.
///
/// Grid space maps cell `(i, j, k)` to the unit box `[i, i+1] x [j, j+1] x
/// [k, k+1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridFrame {
    spec: GridSpec,
    bounds: Bounds,
    cell_size: DVec3,
}

impl GridFrame {
    /// Pad `bounds` by `padding` and divide it into `spec` cells.
    pub fn new(spec: GridSpec, bounds: Bounds, padding: f64) -> Result<Self> {
        let bounds = bounds.padded(padding);
        let extent = bounds.extent();
        if !extent.is_finite() || extent.min_element() <= 0.0 {
            return Err(VoxelizeError::InvalidGridSpec(format!(
                "bounding box is degenerate (extent {extent} after padding {padding})"
            )));
        }

        Ok(Self {
            spec,
            bounds,
            cell_size: extent / spec.dims().as_dvec3(),
        })
    }

    #[inline]
    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// The padded box the grid covers.
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn cell_size(&self) -> DVec3 {
        self.cell_size
    }

    /// World position to continuous grid coordinates.
    #[inline]
    pub fn to_grid(&self, world: DVec3) -> DVec3 {
        (world - self.bounds.min) / self.cell_size
    }

    /// World-space center of a cell.
    #[inline]
    pub fn cell_center(&self, cell: UVec3) -> DVec3 {
        self.bounds.min + (cell.as_dvec3() + DVec3::splat(0.5)) * self.cell_size
    }

    /// Inclusive cell range that may touch the grid-space box `[lo, hi]`,
    /// or `None` when it lies entirely outside the grid.
    pub fn cell_range(&self, lo: DVec3, hi: DVec3) -> Option<(UVec3, UVec3)> {
        let dims = self.spec.dims().as_dvec3();
        if hi.cmplt(DVec3::ZERO).any() || lo.cmpgt(dims).any() {
            return None;
        }
        let max_cell = dims - DVec3::ONE;
        // A point on a shared face touches the cell below it too
        let first = (lo.floor() - DVec3::ONE).clamp(DVec3::ZERO, max_cell);
        let last = hi.floor().clamp(DVec3::ZERO, max_cell);
        Some((first.as_uvec3(), last.as_uvec3()))
    }
}
