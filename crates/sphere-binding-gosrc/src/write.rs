//! Target resolution and the temp-file + rename write.

use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// `<out_dir>/<file_name>`, or `None` if `file_name` climbs out of `out_dir`.
///
/// The check is lexical: `.` and `..` are folded without touching the
/// file system, so it runs before any I/O.
pub fn resolve_target(out_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let base = clean(out_dir);
    let target = clean(&base.join(file_name));
    if base.as_os_str().is_empty() || base == Path::new(".") {
        let escapes = target.is_absolute()
            || matches!(target.components().next(), Some(Component::ParentDir));
        return (!escapes).then_some(target);
    }
    target.starts_with(&base).then_some(target)
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Replace `path` with `data` so readers see either the old or the new file.
///
/// The temp file lives next to the target and is removed if any step fails.
pub fn write_file_atomic(path: &Path, data: &[u8], perms: Permissions) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(".pb.go")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), perms)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
