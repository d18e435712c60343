//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary dataset directory holding OBJ, MTL and label files.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn labels(&self, contents: &str) -> PathBuf {
        self.write("labels.txt", contents)
    }
}

/// One red triangle in object `chair`, material color via `Ka`.
pub const RED_TRIANGLE_MTL: &str = "newmtl red\nKa 1.0 0.0 0.0\n";

pub const RED_TRIANGLE_OBJ: &str = "\
mtllib tri.mtl
o chair
v 0 0 0
v 1 0 0
v 0 1 0
usemtl red
f 1 2 3
";

/// Two stacked triangles of different objects and colors, both inside a
/// single cell of a 1x1x1 grid.
pub const TWO_CATEGORY_MTL: &str = "\
newmtl red
Ka 1.0 0.0 0.0
newmtl blue
Ka 0.0 0.0 1.0
";

pub const TWO_CATEGORY_OBJ: &str = "\
mtllib two.mtl
o seat
v 0 0 0
v 1 0 0
v 0 1 0
usemtl red
f 1 2 3
o lamp
v 0 0 1
v 1 0 1
v 0 1 1
usemtl blue
f 4 5 6
";

/// Axis-aligned unit cube made of six quads, one object per side.
pub fn cube_obj() -> String {
    let mut obj = String::from(
        "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0 0 1\nv 1 0 1\nv 1 1 1\nv 0 1 1\n",
    );
    let sides = [
        ("bottom", [1, 4, 3, 2]),
        ("top", [5, 6, 7, 8]),
        ("front", [1, 2, 6, 5]),
        ("back", [4, 8, 7, 3]),
        ("left", [1, 5, 8, 4]),
        ("right", [2, 3, 7, 6]),
    ];
    for (name, [a, b, c, d]) in sides {
        obj.push_str(&format!("o {name}\nf {a} {b} {c} {d}\n"));
    }
    obj
}

/// UV sphere with `rings` latitude bands and `segments` longitude slices.
pub fn sphere_obj(rings: usize, segments: usize) -> String {
    let mut obj = String::from("o sphere\n");
    for ring in 0..=rings {
        let theta = std::f64::consts::PI * ring as f64 / rings as f64;
        for segment in 0..segments {
            let phi = std::f64::consts::TAU * segment as f64 / segments as f64;
            obj.push_str(&format!(
                "v {} {} {}\n",
                theta.sin() * phi.cos(),
                theta.sin() * phi.sin(),
                theta.cos()
            ));
        }
    }
    for ring in 0..rings {
        for segment in 0..segments {
            let next = (segment + 1) % segments;
            let a = ring * segments + segment + 1;
            let b = ring * segments + next + 1;
            let c = (ring + 1) * segments + next + 1;
            let d = (ring + 1) * segments + segment + 1;
            obj.push_str(&format!("f {a} {b} {c} {d}\n"));
        }
    }
    obj
}
