//! Path kind queries and canonical same-path / ancestry checks.
//!
//! Nothing here is cached: every call re-queries the filesystem.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::spec::EnumPathKind;

/// Classify `path`, following symlinks.
///
/// Existing entries that are neither directories nor regular files (devices,
/// fifos, sockets) classify as [`EnumPathKind::File`]; a dangling symlink is
/// [`EnumPathKind::Missing`].
pub fn classify<P: AsRef<Path>>(path: P) -> EnumPathKind {
    match fs::metadata(path.as_ref()) {
        Ok(meta) if meta.is_dir() => EnumPathKind::Directory,
        Ok(_) => EnumPathKind::File,
        Err(_) => EnumPathKind::Missing,
    }
}

/// Resolve `path` to an absolute path with symlinks and `.`/`..` removed.
///
/// Paths that do not exist yet are resolved through their deepest existing
/// ancestor; the missing tail is appended lexically. A dangling symlink on the
/// way is an error.
pub fn resolve_path<P: AsRef<Path>>(path: P) -> io::Result<PathBuf> {
    let path_abs = std::path::absolute(path.as_ref())?;
    let l_components: Vec<Component<'_>> = path_abs.components().collect();

    for n_prefix in (1..=l_components.len()).rev() {
        let path_prefix: PathBuf = l_components[..n_prefix].iter().collect();
        match fs::canonicalize(&path_prefix) {
            Ok(path_resolved) => {
                return Ok(_append_lexically(path_resolved, &l_components[n_prefix..]));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if fs::symlink_metadata(&path_prefix).is_ok() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Broken symlink: {}", path_prefix.display()),
                    ));
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("No existing ancestor: {}", path_abs.display()),
    ))
}

fn _append_lexically(mut path_base: PathBuf, l_tail: &[Component<'_>]) -> PathBuf {
    for component in l_tail {
        match component {
            Component::Normal(name) => path_base.push(name),
            Component::ParentDir => {
                path_base.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    path_base
}

/// `true` if `path_a` and `path_b` name the same filesystem entry.
///
/// Compares canonical forms, and on Unix also device/inode so that two hard
/// links to one file count as the same. Resolution failure answers `true`.
pub fn is_same_path<P, Q>(path_a: P, path_b: Q) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (path_a, path_b) = (path_a.as_ref(), path_b.as_ref());
    let (Ok(path_a_resolved), Ok(path_b_resolved)) = (resolve_path(path_a), resolve_path(path_b))
    else {
        log::debug!(
            "Resolution failed, treating as same path: {} <-> {}",
            path_a.display(),
            path_b.display()
        );
        return true;
    };
    if path_a_resolved == path_b_resolved {
        return true;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        if let (Ok(stat_a), Ok(stat_b)) = (fs::metadata(path_a), fs::metadata(path_b)) {
            return (stat_a.dev(), stat_a.ino()) == (stat_b.dev(), stat_b.ino());
        }
    }
    false
}

/// `true` if `path` is `candidate_ancestor` itself or nested under it.
///
/// Both sides are resolved with [`resolve_path`]. When either cannot be
/// resolved the answer is `true`, so callers refuse the operation.
pub fn is_ancestor_of<P, Q>(candidate_ancestor: P, path: Q) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (candidate_ancestor, path) = (candidate_ancestor.as_ref(), path.as_ref());
    match (resolve_path(candidate_ancestor), resolve_path(path)) {
        (Ok(path_ancestor_resolved), Ok(path_resolved)) => {
            path_resolved.starts_with(&path_ancestor_resolved)
        }
        _ => {
            log::debug!(
                "Resolution failed, treating as overlapping: {} <-> {}",
                candidate_ancestor.display(),
                path.display()
            );
            true
        }
    }
}
