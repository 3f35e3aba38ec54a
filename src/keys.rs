use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

#[derive(Debug, Error)]
#[error("error opening key file {path:?}: {source}")]
pub struct KeyFileError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Lazy, single-pass reader over a file of object keys, one per line.
///
/// Line terminators (`\n` or `\r\n`) are stripped and nothing else is
/// trimmed. Empty lines are skipped and counted instead of being
/// returned as keys.
pub struct KeySource {
    lines: Lines<BufReader<File>>,
    line_number: usize,
    blank_lines: usize,
}

impl KeySource {
    pub async fn open(path: &Path) -> Result<Self, KeyFileError> {
        let file = File::open(path).await.map_err(|source| KeyFileError {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_number: 0,
            blank_lines: 0,
        })
    }

    /// Next key in file order, `Ok(None)` at end of file.
    pub async fn next_key(&mut self) -> std::io::Result<Option<String>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            if line.is_empty() {
                self.blank_lines += 1;
                tracing::debug!(line = self.line_number, "Skipping blank line");
                continue;
            }
            return Ok(Some(line));
        }
        Ok(None)
    }

    /// Lines consumed so far, blank ones included.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn blank_lines(&self) -> usize {
        self.blank_lines
    }
}
