use super::{DataSource, SourceError, SourceResult};
use crate::data::RawSample;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Reads one JSON raw sample per non-empty line of a file.
///
/// The file is opened lazily and reopened on reset.
pub struct JsonLinesSource {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line: usize,
}

impl JsonLinesSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lines: None,
            line: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for JsonLinesSource {
    type Item = RawSample;

    fn next_raw_block(&mut self) -> SourceResult<Option<RawSample>> {
        if self.lines.is_none() {
            let file = File::open(&self.path)?;
            tracing::debug!("Opened JSON-lines source {:?}", self.path);
            self.lines = Some(BufReader::new(file).lines());
        }
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        for line in lines.by_ref() {
            let line = line?;
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            let value: serde_json::Value =
                serde_json::from_str(&line).map_err(|e| SourceError::Parse {
                    line: self.line,
                    message: e.to_string(),
                })?;
            return Ok(Some(RawSample::Json(value)));
        }
        Ok(None)
    }

    fn reset(&mut self) -> SourceResult<()> {
        self.lines = None;
        self.line = 0;
        Ok(())
    }
}
