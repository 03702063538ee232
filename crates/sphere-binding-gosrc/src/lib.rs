//! Merge planned struct tags into protoc-gen-go output.
//!
//! [`rewrite_generated_file`] is the per-unit entry point: it resolves
//! `<out>/<prefix>.pb.go`, parses it with tree-sitter-go, merges the plan
//! with [`retag`], and writes the result back with a temp-file + rename,
//! keeping the original permission bits. Files whose text would not change
//! are never written.

pub mod format;
pub mod gofile;
pub mod tree;
pub mod write;

pub use format::{gofmt, FormatError};
pub use gofile::{GoFile, GoSourceError};
pub use tree::{retag, RetagError, TagTree};
pub use write::{resolve_target, write_file_atomic};

use sphere_binding_tags::StructTags;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("generated file not found: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: GoSourceError,
    },

    #[error("in {}: {source}", .path.display())]
    Retag {
        path: PathBuf,
        #[source]
        source: RetagError,
    },

    #[error("{file} resolves outside of {}", .out_dir.display())]
    PathTraversal { out_dir: PathBuf, file: String },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to format {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    pub out_dir: PathBuf,
    pub gofmt: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("api"),
            gofmt: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Nothing was planned; the target was not even looked up.
    EmptyPlan,
    Unchanged(PathBuf),
    Rewritten(PathBuf),
}

/// Apply `plan` to `<opts.out_dir>/<prefix>.pb.go`.
pub fn rewrite_generated_file(
    opts: &RewriteOptions,
    prefix: &str,
    plan: &StructTags,
) -> Result<RewriteOutcome, RewriteError> {
    if plan.is_empty() {
        tracing::debug!(%prefix, "empty plan; skipping");
        return Ok(RewriteOutcome::EmptyPlan);
    }

    let file = format!("{prefix}.pb.go");
    let path =
        resolve_target(&opts.out_dir, &file).ok_or_else(|| RewriteError::PathTraversal {
            out_dir: opts.out_dir.clone(),
            file: file.clone(),
        })?;

    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RewriteError::TargetNotFound(path));
        }
        Err(source) => return Err(RewriteError::Stat { path, source }),
    };
    let perms = meta.permissions();

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(source) => return Err(RewriteError::Read { path, source }),
    };
    let mut go = match GoFile::parse(source) {
        Ok(go) => go,
        Err(source) => return Err(RewriteError::Parse { path, source }),
    };

    let changed = match retag(&mut go, plan) {
        Ok(changed) => changed,
        Err(source) => return Err(RewriteError::Retag { path, source }),
    };
    if !changed {
        tracing::debug!(path = %path.display(), "tags already up to date");
        return Ok(RewriteOutcome::Unchanged(path));
    }

    let mut rendered = go.render();
    if opts.gofmt {
        rendered = match gofmt(&rendered) {
            Ok(formatted) => formatted,
            Err(source) => return Err(RewriteError::Format { path, source }),
        };
    }
    if let Err(source) = write_file_atomic(&path, rendered.as_bytes(), perms) {
        return Err(RewriteError::Write { path, source });
    }
    tracing::info!(path = %path.display(), "rewrote struct tags");
    Ok(RewriteOutcome::Rewritten(path))
}
