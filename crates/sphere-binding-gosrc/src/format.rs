//! Optional `gofmt` pass over rendered source.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` failed:\n{stderr}")]
    Failed { program: String, stderr: String },

    #[error("`{program}` produced non-UTF-8 output")]
    Utf8 { program: String },
}

/// Pipe `source` through `program` (normally `gofmt`) and return its stdout.
pub fn gofmt_with(program: &str, source: &str) -> Result<String, FormatError> {
    let spawn_err = |source| FormatError::Spawn {
        program: program.to_string(),
        source,
    };
    let mut child = Command::new(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    let feeder = child.stdin.take().map(|mut stdin| {
        let input = source.to_string();
        // Feed stdin from a thread so a large file can't deadlock on a full pipe.
        std::thread::spawn(move || stdin.write_all(input.as_bytes()))
    });
    let output = child.wait_with_output().map_err(spawn_err)?;
    if !output.status.success() {
        return Err(FormatError::Failed {
            program: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    if let Some(feeder) = feeder {
        feeder
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")))
            .map_err(spawn_err)?;
    }
    String::from_utf8(output.stdout).map_err(|_| FormatError::Utf8 {
        program: program.to_string(),
    })
}

pub fn gofmt(source: &str) -> Result<String, FormatError> {
    gofmt_with("gofmt", source)
}
