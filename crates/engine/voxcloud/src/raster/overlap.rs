//! Exact triangle / axis-aligned box overlap
//!
//! Separating axis test over the 13 candidate axes: the three box normals,
//! the triangle normal, and the nine edge cross products. Boxes are closed,
//! so a triangle touching a face, edge or corner counts as overlapping.

use glam::DVec3;

/// Relative slack applied to every axis comparison
const EPSILON: f64 = 1e-9;

/// Does triangle `tri` intersect the closed box `center +- half`?
pub fn triangle_box_overlap(tri: &[DVec3; 3], center: DVec3, half: DVec3) -> bool {
    let v0 = tri[0] - center;
    let v1 = tri[1] - center;
    let v2 = tri[2] - center;

    // Box normals: the triangle's own AABB against the box
    let lo = v0.min(v1).min(v2);
    let hi = v0.max(v1).max(v2);
    let slack = half * EPSILON + DVec3::splat(EPSILON);
    if lo.cmpgt(half + slack).any() || hi.cmplt(-half - slack).any() {
        return false;
    }

    let edges = [v1 - v0, v2 - v1, v0 - v2];

    // Edge cross products
    for edge in edges {
        for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
            let a = axis.cross(edge);
            if a == DVec3::ZERO {
                continue;
            }
            if separated(a, [v0, v1, v2], half) {
                return false;
            }
        }
    }

    // Triangle plane; a degenerate triangle has no plane to test
    let normal = edges[0].cross(edges[1]);
    if normal == DVec3::ZERO {
        return true;
    }
    plane_box_overlap(normal, v0, half)
}

fn separated(axis: DVec3, verts: [DVec3; 3], half: DVec3) -> bool {
    let p0 = axis.dot(verts[0]);
    let p1 = axis.dot(verts[1]);
    let p2 = axis.dot(verts[2]);
    let radius = half.dot(axis.abs());
    let tol = EPSILON * (radius + 1.0);
    p0.min(p1).min(p2) > radius + tol || p0.max(p1).max(p2) < -radius - tol
}

/// Does the plane through `point` with `normal` touch the box `+-half`
/// centered at the origin?
fn plane_box_overlap(normal: DVec3, point: DVec3, half: DVec3) -> bool {
    let mut vmin = DVec3::ZERO;
    let mut vmax = DVec3::ZERO;
    for axis in 0..3 {
        if normal[axis] > 0.0 {
            vmin[axis] = -half[axis] - point[axis];
            vmax[axis] = half[axis] - point[axis];
        } else {
            vmin[axis] = half[axis] - point[axis];
            vmax[axis] = -half[axis] - point[axis];
        }
    }
    let tol = EPSILON * (normal.abs().dot(half + point.abs()) + 1.0);
    normal.dot(vmin) <= tol && normal.dot(vmax) >= -tol
}
