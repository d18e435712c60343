//! Dataset discovery: turn a list file or a directory into conversion tasks

use anyhow::{bail, Context};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use voxcloud::{ConversionTask, GridSpec, PointFormat};

/// Build the task list for `input`.
///
/// A directory yields one task per `*.obj` file directly inside it and one
/// per `<id>/<id>.obj` subdirectory. A file is read as a list of mesh ids,
/// one per line (`#` comments and blank lines skipped), resolved under
/// `root` (default: the list file's directory) as `<root>/<id>/<id>.obj`.
///
/// Ids name output files, so only the first task per id is kept. In a
/// directory holding both `<id>.obj` and `<id>/<id>.obj` the nested mesh wins.
pub fn discover(
    input: &Path,
    root: Option<&Path>,
    labels: &Path,
    grid: GridSpec,
) -> anyhow::Result<Vec<ConversionTask>> {
    let metadata =
        fs::metadata(input).with_context(|| format!("Cannot access {}", input.display()))?;

    let tasks = if metadata.is_dir() {
        scan_directory(input, labels, grid)?
    } else {
        let root = root
            .map(Path::to_path_buf)
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        read_list(input, &root, labels, grid)?
    };
    let tasks = drop_duplicate_ids(tasks);

    if tasks.is_empty() {
        bail!("No meshes found in {}", input.display());
    }
    debug!("Discovered {} meshes in {}", tasks.len(), input.display());
    Ok(tasks)
}

fn read_list(
    list: &Path,
    root: &Path,
    labels: &Path,
    grid: GridSpec,
) -> anyhow::Result<Vec<ConversionTask>> {
    let text = fs::read_to_string(list)
        .with_context(|| format!("Failed to read mesh list {}", list.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|id| ConversionTask::from_legacy_layout(root, id, labels, grid))
        .collect())
}

fn scan_directory(
    dir: &Path,
    labels: &Path,
    grid: GridSpec,
) -> anyhow::Result<Vec<ConversionTask>> {
    let mut tasks = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        if path.is_dir() {
            let nested = path.join(format!("{id}.obj"));
            if nested.is_file() {
                tasks.push(ConversionTask::new(id, nested, labels, grid));
            }
        } else if is_obj(&path) {
            tasks.push(ConversionTask::new(id, path, labels, grid));
        }
    }

    tasks.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.mesh_path.cmp(&b.mesh_path)));
    Ok(tasks)
}

fn drop_duplicate_ids(tasks: Vec<ConversionTask>) -> Vec<ConversionTask> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            let first = seen.insert(task.id.clone());
            if !first {
                warn!(
                    "Skipping {}: id '{}' is already taken",
                    task.mesh_path.display(),
                    task.id
                );
            }
            first
        })
        .collect()
}

fn is_obj(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
}

/// Output file for task `id`: `<dir>/<id>.<bin|txt>`.
pub fn output_path(dir: &Path, id: &str, format: PointFormat) -> PathBuf {
    dir.join(format!("{id}.{}", format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn grid() -> GridSpec {
        GridSpec::new(8, 8, 8).unwrap()
    }

    #[test]
    fn test_list_file_uses_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("train.txt");
        fs::write(&list, "# training split\nscene0001\n\n  scene0002  \n").unwrap();

        let tasks = discover(&list, None, Path::new("labels.txt"), grid()).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "scene0001");
        assert_eq!(
            tasks[1].mesh_path,
            dir.path().join("scene0002").join("scene0002.obj")
        );
    }

    #[test]
    fn test_list_file_with_explicit_root() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("val.txt");
        fs::write(&list, "a\n").unwrap();

        let tasks = discover(&list, Some(Path::new("/data")), Path::new("l.txt"), grid()).unwrap();
        assert_eq!(tasks[0].mesh_path, PathBuf::from("/data/a/a.obj"));
    }

    #[test]
    fn test_directory_scan() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.obj"), "").unwrap();
        fs::write(dir.path().join("a.OBJ"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();
        fs::write(dir.path().join("c").join("c.obj"), "").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let tasks = discover(dir.path(), None, Path::new("labels.txt"), grid()).unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_repeated_list_id_is_converted_once() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("train.txt");
        fs::write(&list, "a\nb\na\n").unwrap();

        let tasks = discover(&list, None, Path::new("labels.txt"), grid()).unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_directory_id_clash_keeps_nested_mesh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.obj"), "").unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a").join("a.obj"), "").unwrap();

        let tasks = discover(dir.path(), None, Path::new("labels.txt"), grid()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].mesh_path, dir.path().join("a").join("a.obj"));
    }

    #[test]
    fn test_empty_input_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path(), None, Path::new("labels.txt"), grid()).is_err());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("out"), "scene0001", PointFormat::Text),
            PathBuf::from("out/scene0001.txt")
        );
    }
}
