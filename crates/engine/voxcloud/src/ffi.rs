//! C interface matching the legacy `get_data` entry point.
//!
//! The returned buffer holds `7 * count` doubles (`x y z r g b label` per
//! point) and belongs to the caller until passed to [`voxcloud_free`].

use crate::config::ConvertOptions;
use crate::convert::convert;
use crate::emit::POINT_STRIDE;
use crate::grid::GridSpec;
use std::ffi::{c_char, c_int, CStr};
use std::path::Path;
use std::ptr;
use tracing::warn;

/// Convert `mesh_path` with the labels in `label_path` on an `nx * ny * nz`
/// grid.
///
/// Writes the point count to `count_out` and returns the point buffer. On
/// failure returns null and writes 0.
///
/// # Safety
///
/// `mesh_path` and `label_path` must be null or valid NUL-terminated strings
/// and `count_out` must be null or point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn voxcloud_get_data(
    mesh_path: *const c_char,
    count_out: *mut c_int,
    nx: c_int,
    ny: c_int,
    nz: c_int,
    label_path: *const c_char,
) -> *mut f64 {
    let (buffer, count) = match get_data(mesh_path, nx, ny, nz, label_path) {
        Ok(result) => result,
        Err(message) => {
            warn!("voxcloud_get_data failed: {message}");
            (ptr::null_mut(), 0)
        }
    };
    if !count_out.is_null() {
        *count_out = count;
    }
    buffer
}

/// Release a buffer returned by [`voxcloud_get_data`].
///
/// # Safety
///
/// `points` must be null or a pointer returned by `voxcloud_get_data` with the
/// `count` it reported, and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn voxcloud_free(points: *mut f64, count: c_int) {
    if points.is_null() {
        return;
    }
    let len = usize::try_from(count).unwrap_or(0) * POINT_STRIDE;
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(points, len)));
}

unsafe fn get_data(
    mesh_path: *const c_char,
    nx: c_int,
    ny: c_int,
    nz: c_int,
    label_path: *const c_char,
) -> std::result::Result<(*mut f64, c_int), String> {
    let mesh_path = path_arg(mesh_path, "mesh path")?;
    let label_path = path_arg(label_path, "label path")?;

    let grid = GridSpec::try_from_signed(nx.into(), ny.into(), nz.into())
        .map_err(|err| err.to_string())?;
    let cloud = convert(mesh_path, label_path, grid, &ConvertOptions::default())
        .map_err(|err| err.to_string())?;

    let count = c_int::try_from(cloud.len())
        .map_err(|_| format!("{} points do not fit the count type", cloud.len()))?;
    let buffer: Box<[f64]> = cloud.as_flat().into();
    Ok((Box::into_raw(buffer) as *mut f64, count))
}

unsafe fn path_arg<'a>(
    raw: *const c_char,
    what: &str,
) -> std::result::Result<&'a Path, String> {
    if raw.is_null() {
        return Err(format!("{what} is null"));
    }
    CStr::from_ptr(raw)
        .to_str()
        .map(Path::new)
        .map_err(|_| format!("{what} is not valid UTF-8"))
}
