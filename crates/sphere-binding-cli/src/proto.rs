//! Descriptor set input: read a JSON `FileDescriptorSet`, or build one with `buf`.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Where the descriptor set comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Descriptor set JSON (`buf build --as-file-descriptor-set -o descriptor.json`).
    ///
    /// Every file in the set is treated as a unit to rewrite. Build the set
    /// with `--exclude-imports`, or select units with `--file`, when imported
    /// protos carry binding options but have no generated file under `--out`.
    #[arg(long, conflicts_with = "root")]
    pub descriptor: Option<PathBuf>,

    /// Buf module root; a descriptor set is built with `buf build` when
    /// `--descriptor` is not given
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

impl InputArgs {
    /// The descriptor set JSON text.
    pub fn read_descriptor(&self) -> Result<String> {
        if let Some(path) = &self.descriptor {
            return fs::read_to_string(path)
                .with_context(|| format!("failed to read descriptor json: {}", path.display()));
        }

        let dir = tempfile::tempdir().context("failed to create a scratch directory")?;
        let out = dir.path().join("descriptor.json");
        build_descriptor_set_json(&self.root, &out, true, true)?;
        fs::read_to_string(&out)
            .with_context(|| format!("failed to read descriptor json: {}", out.display()))
    }
}

pub(crate) fn build_descriptor_set_json(
    root: &Path,
    out: &Path,
    exclude_imports: bool,
    exclude_source_info: bool,
) -> Result<()> {
    let mut cmd = Command::new("buf");
    cmd.arg("build")
        .arg(root)
        .arg("--as-file-descriptor-set")
        .arg("-o")
        .arg(out);

    if exclude_imports {
        cmd.arg("--exclude-imports");
    }
    if exclude_source_info {
        cmd.arg("--exclude-source-info");
    }

    // Buf may not be able to write to `$HOME/.cache` in sandboxes.
    if std::env::var_os("XDG_CACHE_HOME").is_none() {
        if let Some(cache_dir) = fallback_cache_dir(&std::env::temp_dir()) {
            cmd.env("XDG_CACHE_HOME", cache_dir);
        }
    }

    tracing::debug!(root = %root.display(), out = %out.display(), "running buf build");
    let output = cmd.output().with_context(|| "failed to run `buf build`")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("buf build failed:\n{stderr}"));
    }
    Ok(())
}

/// A buf cache directory under `base`, or `None` (buf keeps its own default)
/// when it cannot be created.
fn fallback_cache_dir(base: &Path) -> Option<PathBuf> {
    let dir = base.join("sphere-binding").join("buf-cache");
    match fs::create_dir_all(&dir) {
        Ok(()) => Some(dir),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create buf cache directory");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn cache_dir_is_created_under_the_base() {
        let base = tempdir().unwrap();
        let dir = fallback_cache_dir(base.path()).expect("cache dir");
        assert!(dir.starts_with(base.path()));
        assert!(dir.is_dir());
    }

    #[test]
    fn unusable_cache_base_falls_back_to_buf_default() {
        let file = NamedTempFile::new().unwrap();
        assert_eq!(fallback_cache_dir(file.path()), None);
    }
}
