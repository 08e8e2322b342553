//! Input units and chunk model
//!
//! `FileUnit`s come from an external importer and are immutable once
//! ingested. `Chunk`s are produced by the chunker and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One source file supplied by the importer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUnit {
    /// Unique within a run
    pub path: String,
    pub content: String,
    /// Best-effort language tag (usually the lowercase extension: "ts", "py", ...)
    pub language: String,
    /// Size in bytes
    pub size: usize,
}

impl FileUnit {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len(),
            content,
            language: language.into(),
        }
    }

    /// Build a unit whose language tag is derived from the path extension.
    pub fn from_path(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = language_tag(&path);
        Self::new(path, content, language)
    }

    pub fn line_count(&self) -> usize {
        line_count(&self.content)
    }
}

/// Number of `\n`-separated lines (an empty file has one empty line).
pub fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

/// Lowercase extension of `path`, or `"text"` when there is none.
pub fn language_tag(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "text".to_string(),
    }
}

/// Chunk kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// The whole file (exactly one per `FileUnit`)
    FullFile,
    /// A top-level declaration block inside a large file
    Block,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::FullFile => "full_file",
            ChunkKind::Block => "block",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contiguous slice of one file's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    /// Path of the owning `FileUnit`
    pub file_ref: String,
    pub kind: ChunkKind,
    pub content: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
}

impl Chunk {
    /// `FullFile` chunk spanning all of `file`.
    pub fn full_file(file: &FileUnit) -> Self {
        Self {
            id: format!("{}:full", file.path),
            file_ref: file.path.clone(),
            kind: ChunkKind::FullFile,
            content: file.content.clone(),
            start_line: 1,
            end_line: file.line_count(),
        }
    }

    /// `Block` chunk covering `start_line..=end_line` of `file`.
    pub fn block(file: &FileUnit, start_line: usize, end_line: usize, content: String) -> Self {
        Self {
            id: format!("{}:{}-{}", file.path, start_line, end_line),
            file_ref: file.path.clone(),
            kind: ChunkKind::Block,
            content,
            start_line,
            end_line,
        }
    }

    pub fn is_full_file(&self) -> bool {
        self.kind == ChunkKind::FullFile
    }
}
