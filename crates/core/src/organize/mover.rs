//! Collision-safe file relocation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error("Failed to create destination folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No free file name for {name} in {dir} after {attempts} attempts")]
    NoFreeName { dir: PathBuf, name: String, attempts: u32 },
}

/// First non-existing path for `file_name` in `dir`: the name itself, then
/// `stem_1.ext`, `stem_2.ext`, ...
pub fn unique_destination(
    dir: &Path,
    file_name: &str,
    max_attempts: u32,
) -> Result<PathBuf, OrganizationError> {
    unique_destination_with(dir, file_name, max_attempts, |_| false)
}

/// Like [`unique_destination`], but paths for which `claimed` returns true
/// count as taken even though nothing exists there yet.
pub fn unique_destination_with<F>(
    dir: &Path,
    file_name: &str,
    max_attempts: u32,
    claimed: F,
) -> Result<PathBuf, OrganizationError>
where
    F: Fn(&Path) -> bool,
{
    let taken = |path: &Path| exists(path) || claimed(path);
    let candidate = dir.join(file_name);
    if !taken(&candidate) {
        return Ok(candidate);
    }

    let (stem, ext) = split_name(file_name);
    for n in 1..=max_attempts {
        let name = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dir.join(name);
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }

    Err(OrganizationError::NoFreeName {
        dir: dir.to_path_buf(),
        name: file_name.to_string(),
        attempts: max_attempts,
    })
}

/// Move `source` into `dir` under a free name and return the final path.
///
/// A file that already sits in `dir` stays where it is. Otherwise a rename
/// is tried first; when that fails (e.g. across filesystems) the file is
/// copied, the copy's length checked, and only then the source removed.
pub fn move_into(
    source: &Path,
    dir: &Path,
    max_attempts: u32,
) -> Result<PathBuf, OrganizationError> {
    fs::create_dir_all(dir)
        .map_err(|e| OrganizationError::CreateDir { path: dir.to_path_buf(), source: e })?;

    if let Some(current) = already_in(source, dir) {
        return Ok(current);
    }

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let target = unique_destination(dir, &file_name, max_attempts)?;

    let move_err = |e: io::Error| OrganizationError::Move {
        from: source.to_path_buf(),
        to: target.clone(),
        source: e,
    };

    if fs::rename(source, &target).is_ok() {
        return Ok(target);
    }

    copy_verified(source, &target).map_err(move_err)?;
    if let Err(e) = fs::remove_file(source) {
        // Keep exactly one copy: the source stays authoritative.
        let _ = fs::remove_file(&target);
        return Err(move_err(e));
    }
    Ok(target)
}

fn copy_verified(source: &Path, target: &Path) -> io::Result<()> {
    let expected = fs::metadata(source)?.len();
    let result = fs::copy(source, target).and_then(|copied| {
        if copied == expected && fs::metadata(target)?.len() == expected {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::Other, "copied length does not match source"))
        }
    });
    if result.is_err() {
        let _ = fs::remove_file(target);
    }
    result
}

fn already_in(source: &Path, dir: &Path) -> Option<PathBuf> {
    let source = source.canonicalize().ok()?;
    let dir = dir.canonicalize().ok()?;
    (source.parent() == Some(dir.as_path())).then_some(source)
}

fn exists(path: &Path) -> bool {
    // Dangling symlinks occupy the name too.
    path.symlink_metadata().is_ok()
}

fn split_name(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => {
            (&file_name[..idx], Some(&file_name[idx + 1..]))
        }
        _ => (file_name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_keeps_dotfiles_whole() {
        assert_eq!(split_name("report.pdf"), ("report", Some("pdf")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name(".bashrc"), (".bashrc", None));
        assert_eq!(split_name("README"), ("README", None));
        assert_eq!(split_name("trailing."), ("trailing.", None));
    }

    #[test]
    fn unique_destination_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "1").unwrap();
        fs::write(dir.path().join("a_1.txt"), "2").unwrap();

        let next = unique_destination(dir.path(), "a.txt", 10).unwrap();
        assert_eq!(next, dir.path().join("a_2.txt"));
        assert_eq!(unique_destination(dir.path(), "b.txt", 10).unwrap(), dir.path().join("b.txt"));
    }

    #[test]
    fn claimed_names_count_as_taken() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.png");

        let next = unique_destination_with(dir.path(), "a.png", 10, |p| p == first).unwrap();
        assert_eq!(next, dir.path().join("a_1.png"));
    }

    #[test]
    fn file_already_in_place_is_not_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("Images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("a.png"), "png").unwrap();

        let placed = move_into(&images.join("a.png"), &images, 10).unwrap();
        assert_eq!(placed.file_name().unwrap(), "a.png");
        let names: Vec<_> =
            fs::read_dir(&images).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec!["a.png"]);
    }

    #[test]
    fn unique_destination_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        fs::write(dir.path().join("a_1"), "").unwrap();

        let err = unique_destination(dir.path(), "a", 1).unwrap_err();
        assert!(matches!(err, OrganizationError::NoFreeName { attempts: 1, .. }));
    }
}
