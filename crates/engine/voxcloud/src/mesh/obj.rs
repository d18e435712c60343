//! OBJ/MTL loading via `tobj`
//!
//! Faces are kept as polygons (no triangulation at load time). Points and
//! lines are dropped. Comment lines and directives `tobj` does not know are
//! skipped by the parser itself.

use super::{Face, Mesh};
use crate::config::{CategorySource, ColorSource, ConvertOptions};
use crate::error::{Result, VoxelizeError};
use glam::DVec3;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Name `tobj` gives geometry with no `o`/`g` line or an empty one.
const TOBJ_UNNAMED: &str = "unnamed_object";

pub(crate) fn load_obj(path: &Path, options: &ConvertOptions) -> Result<Mesh> {
    let metadata = fs::metadata(path).map_err(|err| VoxelizeError::from_io(path, err))?;
    if !metadata.is_file() {
        return Err(VoxelizeError::Io {
            path: path.to_path_buf(),
            message: "not a regular file".to_string(),
        });
    }

    let load_options = tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };

    let (models, materials) = tobj::load_obj(path, &load_options)
        .map_err(|err| VoxelizeError::parse(path, None, err.to_string()))?;

    let materials = materials.unwrap_or_else(|err| {
        warn!(
            "Material library for {} could not be loaded ({}); using vertex or normal colors",
            path.display(),
            err
        );
        Vec::new()
    });

    let mut builder = ObjMeshBuilder::new(path, options, &materials);
    for model in &models {
        builder.add_model(model)?;
    }
    let mesh = builder.finish()?;

    debug!(
        "Loaded {}: {} vertices, {} faces, {} categories, {} materials",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count(),
        mesh.categories().len(),
        materials.len()
    );

    Ok(mesh)
}

/// Accumulates `tobj` models into one global vertex/face list.
struct ObjMeshBuilder<'a> {
    path: &'a Path,
    options: &'a ConvertOptions,
    materials: &'a [tobj::Material],
    vertices: Vec<DVec3>,
    faces: Vec<Face>,
    categories: Vec<String>,
    category_index: HashMap<String, usize>,
    clamped_faces: usize,
}

impl<'a> ObjMeshBuilder<'a> {
    fn new(path: &'a Path, options: &'a ConvertOptions, materials: &'a [tobj::Material]) -> Self {
        Self {
            path,
            options,
            materials,
            vertices: Vec::new(),
            faces: Vec::new(),
            categories: Vec::new(),
            category_index: HashMap::new(),
            clamped_faces: 0,
        }
    }

    fn add_model(&mut self, model: &tobj::Model) -> Result<()> {
        let mesh = &model.mesh;
        let base = self.vertices.len();

        for (i, p) in mesh.positions.chunks_exact(3).enumerate() {
            let v = DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
            if !v.is_finite() {
                return Err(VoxelizeError::parse(
                    self.path,
                    None,
                    format!("object '{}' vertex {} is not finite", model.name, i),
                ));
            }
            self.vertices.push(v);
        }

        let local_count = self.vertices.len() - base;
        let vertex_colors: Vec<DVec3> = if mesh.vertex_color.len() == local_count * 3 {
            mesh.vertex_color
                .chunks_exact(3)
                .map(|c| DVec3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2])))
                .collect()
        } else {
            Vec::new()
        };

        let material = mesh.material_id.and_then(|id| self.materials.get(id));
        let material_color = material.and_then(|m| self.material_color(m));
        let key = match self.options.category_source {
            CategorySource::Object if model.name == TOBJ_UNNAMED => String::new(),
            CategorySource::Object => model.name.clone(),
            CategorySource::Material => material.map(|m| m.name.clone()).unwrap_or_default(),
        };
        let category = self.intern(key);

        let arities: Vec<usize> = if mesh.face_arities.is_empty() {
            vec![3; mesh.indices.len() / 3]
        } else {
            mesh.face_arities.iter().map(|&a| a as usize).collect()
        };

        let mut offset = 0;
        for arity in arities {
            let end = offset + arity;
            let Some(local) = mesh.indices.get(offset..end) else {
                return Err(VoxelizeError::parse(
                    self.path,
                    None,
                    format!("object '{}' has truncated face index data", model.name),
                ));
            };
            offset = end;

            if arity < 3 {
                continue;
            }
            if let Some(&bad) = local.iter().find(|&&i| i as usize >= local_count) {
                return Err(VoxelizeError::parse(
                    self.path,
                    None,
                    format!("object '{}' face references missing vertex {}", model.name, bad),
                ));
            }

            let color = material_color.or_else(|| {
                if vertex_colors.is_empty() {
                    None
                } else {
                    let sum: DVec3 = local.iter().map(|&i| vertex_colors[i as usize]).sum();
                    Some(sum / local.len() as f64)
                }
            });

            let color = color.map(|c| {
                let clamped = c.clamp(DVec3::ZERO, DVec3::ONE);
                if clamped != c {
                    self.clamped_faces += 1;
                }
                clamped
            });

            let vertices = local.iter().map(|&i| (base + i as usize) as u32).collect();
            self.faces.push(Face {
                vertices,
                color,
                category,
            });
        }

        Ok(())
    }

    fn material_color(&self, material: &tobj::Material) -> Option<DVec3> {
        let to_color = |c: [f32; 3]| DVec3::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2]));
        match self.options.color_source {
            ColorSource::Ambient => material.ambient.or(material.diffuse).map(to_color),
            ColorSource::Diffuse => material.diffuse.or(material.ambient).map(to_color),
            ColorSource::Normal => None,
        }
    }

    fn intern(&mut self, key: String) -> usize {
        if let Some(&index) = self.category_index.get(&key) {
            return index;
        }
        let index = self.categories.len();
        self.categories.push(key.clone());
        self.category_index.insert(key, index);
        index
    }

    fn finish(self) -> Result<Mesh> {
        if self.vertices.is_empty() || self.faces.is_empty() {
            return Err(VoxelizeError::EmptyMesh {
                path: self.path.to_path_buf(),
            });
        }
        if self.clamped_faces > 0 {
            warn!(
                "{}: {} face colors outside [0, 1] were clamped",
                self.path.display(),
                self.clamped_faces
            );
        }
        Ok(Mesh {
            vertices: self.vertices,
            faces: self.faces,
            categories: self.categories,
        })
    }
}
