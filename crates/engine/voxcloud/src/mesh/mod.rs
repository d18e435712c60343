//! Mesh model and OBJ loading

pub mod obj;

use crate::config::ConvertOptions;
use crate::error::{Result, VoxelizeError};
use glam::DVec3;
use std::path::{Path, PathBuf};

/// A planar, convex polygon referencing mesh vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Vertex indices in winding order (at least 3)
    pub vertices: Vec<u32>,
    /// Stored RGB color in [0, 1], if the source carried one
    pub color: Option<DVec3>,
    /// Index into [`Mesh::categories`]
    pub category: usize,
}

impl Face {
    pub fn new(vertices: Vec<u32>, category: usize) -> Self {
        Self {
            vertices,
            color: None,
            category,
        }
    }

    pub fn with_color(mut self, color: DVec3) -> Self {
        self.color = Some(color);
        self
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl Bounds {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    /// Grow the box by `amount` on every side.
    pub fn padded(&self, amount: f64) -> Self {
        let pad = DVec3::splat(amount);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    #[inline]
    pub fn longest_axis_length(&self) -> f64 {
        self.extent().max_element()
    }
}

/// Immutable polygon mesh: vertices, faces, and the category keys faces
/// refer to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    vertices: Vec<DVec3>,
    faces: Vec<Face>,
    categories: Vec<String>,
}

impl Mesh {
    /// Load an OBJ file (and its MTL libraries).
    pub fn load(path: impl AsRef<Path>, options: &ConvertOptions) -> Result<Self> {
        obj::load_obj(path.as_ref(), options)
    }

    /// Build a mesh from in-memory parts, checking every face reference.
    pub fn from_parts(
        vertices: Vec<DVec3>,
        faces: Vec<Face>,
        categories: Vec<String>,
    ) -> Result<Self> {
        let origin = PathBuf::from("<memory>");

        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(VoxelizeError::parse(
                &origin,
                None,
                format!("vertex {index} has a non-finite coordinate"),
            ));
        }

        for (index, face) in faces.iter().enumerate() {
            if face.vertices.len() < 3 {
                return Err(VoxelizeError::parse(
                    &origin,
                    None,
                    format!("face {index} has {} vertices (need 3)", face.vertices.len()),
                ));
            }
            if let Some(&bad) = face
                .vertices
                .iter()
                .find(|&&v| v as usize >= vertices.len())
            {
                return Err(VoxelizeError::parse(
                    &origin,
                    None,
                    format!("face {index} references missing vertex {bad}"),
                ));
            }
            if face.category >= categories.len() {
                return Err(VoxelizeError::parse(
                    &origin,
                    None,
                    format!("face {index} references missing category {}", face.category),
                ));
            }
        }

        Ok(Self {
            vertices,
            faces,
            categories,
        })
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Category key a face is labeled by.
    pub fn category_of(&self, face: &Face) -> &str {
        &self.categories[face.category]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.vertices)
    }

    /// Vertex positions of a face in winding order.
    pub fn face_positions<'a>(&'a self, face: &'a Face) -> impl Iterator<Item = DVec3> + 'a {
        face.vertices.iter().map(move |&v| self.vertices[v as usize])
    }

    /// Fan triangulation of a face around its first vertex.
    pub fn triangles<'a>(&'a self, face: &'a Face) -> impl Iterator<Item = [DVec3; 3]> + 'a {
        let apex = self.vertices[face.vertices[0] as usize];
        face.vertices.windows(2).skip(1).map(move |pair| {
            [
                apex,
                self.vertices[pair[0] as usize],
                self.vertices[pair[1] as usize],
            ]
        })
    }

    /// Unit face normal (Newell's method), or zero for a degenerate face.
    pub fn face_normal(&self, face: &Face) -> DVec3 {
        let positions: Vec<DVec3> = self.face_positions(face).collect();
        let mut normal = DVec3::ZERO;
        for (i, current) in positions.iter().enumerate() {
            let next = positions[(i + 1) % positions.len()];
            normal.x += (current.y - next.y) * (current.z + next.z);
            normal.y += (current.z - next.z) * (current.x + next.x);
            normal.z += (current.x - next.x) * (current.y + next.y);
        }
        normal.normalize_or_zero()
    }
}

/// Color derived from a face normal: `|n|` per channel.
#[inline]
pub fn normal_color(normal: DVec3) -> DVec3 {
    normal.abs()
}
