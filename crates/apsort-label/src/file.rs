//! Whole label files.

use crate::{Annotation, LabelError, Result};
use log::warn;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// A line that was not a valid annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based
    pub line_no: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelFile {
    pub annotations: Vec<Annotation>,
    pub skipped: Vec<SkippedLine>,
}

impl LabelFile {
    /// Read a label file. Invalid lines are logged and skipped.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| LabelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parsed = Self::parse(BufReader::new(file)).map_err(|source| LabelError::Io {
            path: path.display().to_string(),
            source,
        })?;

        for s in &parsed.skipped {
            warn!(
                "skipping invalid line {} in {}: {:?} ({})",
                s.line_no,
                path.display(),
                s.content,
                s.reason
            );
        }
        Ok(parsed)
    }

    /// Parse from any reader; only I/O failures are errors.
    pub fn parse<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut out = Self::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            match Annotation::parse_line(&line) {
                Ok(Some(a)) => out.annotations.push(a),
                Ok(None) => {}
                Err(e) => out.skipped.push(SkippedLine {
                    line_no: idx + 1,
                    content: line.trim().to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        Ok(out)
    }
}
