//! Capability-based filesystem helpers for the citydb workspace.
//!
//! Paths are UTF-8 throughout. Every helper resolves an ambient base
//! directory first and then operates relative to it through `cap-std`.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open a UTF-8 file path for reading.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Create `dir` and any missing ancestors.
pub fn ensure_dir(dir: &Utf8Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_ambient(dir)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Ensure the directory that will contain `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if parent != Utf8Path::new("/") => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Whether `path` names an existing regular file.
///
/// A missing file yields `Ok(false)`; other lookup failures are returned.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let parent = if parent.as_os_str().is_empty() {
        Utf8Path::new(".")
    } else {
        parent
    };
    let Some(name) = path.file_name() else {
        return Ok(false);
    };
    let dir = match fs_utf8::Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Split a path into an ambient base directory and the remaining relative
/// suffix. Absolute paths are anchored at their root (or Windows prefix),
/// relative paths at the current directory.
pub fn split_ambient(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();

    let (base, relative) = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_path.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_path
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_path.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative =
        Utf8PathBuf::from_path_buf(relative).map_err(|_| io::Error::other("non-UTF-8 path"))?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        (dir, path)
    }

    #[rstest]
    fn ensure_dir_creates_nested_directories(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let nested = root.join("a").join("b").join("c");
        ensure_dir(&nested).expect("create nested dirs");
        assert!(nested.is_dir());
        ensure_dir(&nested).expect("second call is a no-op");
    }

    #[rstest]
    fn ensure_parent_dir_creates_only_the_parent(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let db = root.join("out").join("city.db");
        ensure_parent_dir(&db).expect("create parent");
        assert!(root.join("out").is_dir());
        assert!(!db.exists());
    }

    #[rstest]
    fn is_regular_file_distinguishes_files_and_directories(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let file = root.join("features.jsonl");
        std::fs::write(&file, b"{}").expect("write file");
        assert!(is_regular_file(&file).expect("stat file"));
        assert!(!is_regular_file(&root).expect("stat dir"));
        assert!(!is_regular_file(&root.join("missing.jsonl")).expect("stat missing"));
        assert!(!is_regular_file(&root.join("gone").join("x")).expect("stat missing dir"));
    }

    #[rstest]
    fn open_utf8_file_reads_existing_file(scratch: (TempDir, Utf8PathBuf)) {
        use std::io::Read;
        let (_guard, root) = scratch;
        let file = root.join("input.json");
        std::fs::write(&file, b"[]").expect("write file");
        let mut contents = String::new();
        open_utf8_file(&file)
            .expect("open file")
            .read_to_string(&mut contents)
            .expect("read file");
        assert_eq!(contents, "[]");
    }
}
