use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const MAX_LINES: usize = 1_000_000;

pub const MAX_FILE_SIZE: usize = u32::MAX as usize;

#[derive(Error, Debug)]
pub enum SourceLocationError {
    #[error("File exceeds maximum line count: {0} lines")]
    TooManyLines(usize),
    #[error("File exceeds maximum size: {0} bytes")]
    FileTooLarge(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceLocationError>;

/// Byte range of a node inside one registered source file.
///
/// Nodes synthesized by a pass inherit the span of the declaration they were
/// generated from, so diagnostics always point back at user-written text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub file_id: u32,
    pub start: u32,
    pub len: u32,
}

pub const INVALID_SPAN: SourceSpan = SourceSpan {
    file_id: u32::MAX,
    start: 0,
    len: 0,
};

impl SourceSpan {
    pub fn new(file_id: u32, start: u32, len: u32) -> Self {
        Self {
            file_id,
            start,
            len,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.file_id != u32::MAX && self.len > 0
    }

    #[inline]
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.len)
    }

    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.file_id == other.file_id && other.start >= self.start && other.end() <= self.end()
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        INVALID_SPAN
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "file {} @ {}..{}", self.file_id, self.start, self.end())
        } else {
            write!(f, "<generated>")
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceFiles {
    files: Vec<SourceFile>,
}

impl SourceFiles {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn add_file(&mut self, path: PathBuf, text: String) -> Result<u32> {
        if text.len() > MAX_FILE_SIZE {
            return Err(SourceLocationError::FileTooLarge(text.len()));
        }

        let line_starts = compute_line_starts(&text)?;
        let file_id = self.files.len() as u32;

        self.files.push(SourceFile {
            path,
            text,
            line_starts,
        });

        Ok(file_id)
    }

    pub fn load(&mut self, path: PathBuf) -> Result<u32> {
        let text = std::fs::read_to_string(&path)?;
        self.add_file(path, text)
    }

    pub fn get_file(&self, file_id: u32) -> Option<&SourceFile> {
        self.files.get(file_id as usize)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn to_line_col(&self, span: SourceSpan) -> Option<(u32, u32)> {
        if !span.is_valid() {
            return None;
        }

        let file = self.get_file(span.file_id)?;
        let start = span.start as usize;
        if start > file.text.len() {
            return None;
        }

        let line_idx = file
            .line_starts
            .partition_point(|&line_start| line_start <= start)
            .saturating_sub(1);
        let line_start = file.line_starts[line_idx];
        let boundary = find_char_boundary(file.text.as_bytes(), start);
        let column = file.text[line_start..boundary].chars().count() as u32 + 1;

        Some((line_idx as u32 + 1, column))
    }

    pub fn snippet(&self, span: SourceSpan, context_lines: usize) -> Option<String> {
        let file = self.get_file(span.file_id)?;
        let (line, _col) = self.to_line_col(span)?;

        let first = (line as usize).saturating_sub(context_lines).max(1);
        let last = (line as usize).saturating_add(context_lines);

        let mut snippet = String::new();
        for line_no in first..=last {
            if let Some(text) = file.get_line(line_no) {
                snippet.push_str(&format!("{:4} | {}\n", line_no, text));
            }
        }

        Some(snippet)
    }

    /// Renders `path:line:col`, or the raw span when it cannot be resolved.
    pub fn describe(&self, span: SourceSpan) -> String {
        match self.get_source_info(span) {
            Some(info) => format!("{}:{}:{}", info.path.display(), info.line, info.column),
            None => span.to_string(),
        }
    }

    pub fn get_source_info(&self, span: SourceSpan) -> Option<SourceInfo> {
        let (line, column) = self.to_line_col(span)?;
        let file = self.get_file(span.file_id)?;

        Some(SourceInfo {
            file_id: span.file_id,
            path: file.path.clone(),
            line,
            column,
            length: span.len,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn get_line(&self, line: usize) -> Option<&str> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.text.len());

        let bytes = self.text.as_bytes();
        let start = find_char_boundary(bytes, start);
        let end = find_char_boundary(bytes, end);

        std::str::from_utf8(&bytes[start..end])
            .ok()
            .map(|s| s.trim_end_matches(&['\r', '\n'][..]))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_id: u32,
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

fn compute_line_starts(text: &str) -> Result<Vec<usize>> {
    let mut line_starts = vec![0];
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if line_starts.len() >= MAX_LINES {
            return Err(SourceLocationError::TooManyLines(line_starts.len()));
        }

        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                i += 2;
                line_starts.push(i);
            }
            b'\r' | b'\n' => {
                i += 1;
                line_starts.push(i);
            }
            _ => i += 1,
        }
    }

    Ok(line_starts)
}

fn find_char_boundary(bytes: &[u8], mut index: usize) -> usize {
    if index >= bytes.len() {
        return bytes.len();
    }

    while index > 0 && (bytes[index] & 0b1100_0000) == 0b1000_0000 {
        index -= 1;
    }

    index
}
