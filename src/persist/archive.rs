//! Zip archival of a mirrored tree.

use crate::error::Result;
use crate::utils::normalize_path;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Package every file under `root` into an in-memory zip.
///
/// Entry names are relative to `root` and slash-separated; entries are added
/// in sorted order so the same tree always yields the same listing.
pub fn archive(root: &Path) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name().into_iter() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = normalize_path(rel.to_string_lossy().as_ref());
        let content = fs::read(entry.path())?;
        zip.start_file(name, options)?;
        zip.write_all(&content)?;
        files += 1;
    }

    let cursor = zip.finish()?;
    tracing::info!("archived {} file(s) from {}", files, root.display());
    Ok(cursor.into_inner())
}

/// `<root>.zip`, colocated with `root`.
///
/// `root` is resolved first, so `.` or `out/..` name the directory itself and
/// the archive never lands inside the tree it packages.
pub fn sibling_archive_path(root: &Path) -> Result<PathBuf> {
    let resolved = fs::canonicalize(root)?;
    let (Some(parent), Some(dir_name)) = (resolved.parent(), resolved.file_name()) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot place an archive beside {}", resolved.display()),
        )
        .into());
    };
    let mut name = dir_name.to_os_string();
    name.push(".zip");
    Ok(parent.join(name))
}

/// Write the archive of `root` to `<root>.zip` and return its path.
pub fn archive_to_sibling(root: &Path) -> Result<PathBuf> {
    let target = sibling_archive_path(root)?;
    let bytes = archive(root)?;
    fs::write(&target, bytes)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn archive_uses_root_relative_names() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path().join("repo");
        fs::create_dir_all(root.join("src")).expect("mkdir");
        fs::write(root.join("README.md"), "Hi").expect("write readme");
        fs::write(root.join("src/main.py"), "print(1)").expect("write main");

        let bytes = archive(&root).expect("archive");
        let mut zip = ZipArchive::new(Cursor::new(bytes)).expect("readable zip");
        assert_eq!(zip.len(), 2);

        let mut readme = String::new();
        zip.by_name("README.md").expect("readme entry").read_to_string(&mut readme).expect("read");
        assert_eq!(readme, "Hi");
        assert!(zip.by_name("src/main.py").is_ok());
    }

    #[test]
    fn sibling_archive_lands_next_to_root() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path().join("mirror");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(root.join("a.txt"), "a").expect("write");

        let path = archive_to_sibling(&root).expect("archive");
        let parent = fs::canonicalize(tmp.path()).expect("canonical tmp");
        assert_eq!(path, parent.join("mirror.zip"));
        assert!(path.is_file());
    }

    #[test]
    fn dot_segments_resolve_to_the_named_directory() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path().join("out");
        fs::create_dir_all(root.join("src")).expect("mkdir");
        let parent = fs::canonicalize(tmp.path()).expect("canonical tmp");

        assert_eq!(sibling_archive_path(&root.join(".")).expect("dot"), parent.join("out.zip"));
        assert_eq!(
            sibling_archive_path(&root.join("src").join("..")).expect("dotdot"),
            parent.join("out.zip")
        );
    }

    #[test]
    fn archiving_twice_never_nests_the_previous_zip() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path().join("out");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(root.join("a.py"), "a = 1").expect("write");

        archive_to_sibling(&root.join(".")).expect("first");
        let path = archive_to_sibling(&root.join(".")).expect("second");
        let zip = ZipArchive::new(Cursor::new(fs::read(path).expect("read"))).expect("zip");
        assert_eq!(zip.len(), 1);
        assert!(!root.join("archive.zip").exists());
    }
}
