//! Chunker
//!
//! Splits every `FileUnit` into one `FullFile` chunk plus, for large files in
//! a supported language, zero or more `Block` chunks found with a line-based
//! heuristic:
//!
//! - a line whose first word is one of the configured keywords opens a block
//! - brace depth (ignoring braces inside string literals and `//` comments)
//!   decides when the block closes
//! - a block still open at end of file is dropped
//!
//! It is not a parser. Malformed input never errors; the worst case is a
//! file with no blocks. Output is a pure function of the input.

use crate::config::ChunkerConfig;
use crate::types::{Chunk, FileUnit};
use rayon::prelude::*;
use tracing::debug;

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Chunk all files, preserving input order (file by file).
    pub fn chunk(&self, files: &[FileUnit]) -> Vec<Chunk> {
        let per_file: Vec<Vec<Chunk>> = files.par_iter().map(|f| self.chunk_file(f)).collect();
        per_file.into_iter().flatten().collect()
    }

    pub fn chunk_file(&self, file: &FileUnit) -> Vec<Chunk> {
        let mut chunks = vec![Chunk::full_file(file)];

        if self.splits_blocks(file) {
            let blocks = self.split_blocks(file);
            debug!("Chunker: {} -> {} blocks", file.path, blocks.len());
            chunks.extend(blocks);
        }

        chunks
    }

    fn splits_blocks(&self, file: &FileUnit) -> bool {
        file.line_count() > self.config.block_split_threshold_lines
            && self
                .config
                .block_split_languages
                .iter()
                .any(|lang| lang.eq_ignore_ascii_case(&file.language))
    }

    fn split_blocks(&self, file: &FileUnit) -> Vec<Chunk> {
        let lines: Vec<&str> = file.content.split('\n').collect();
        let mut blocks = Vec::new();
        let mut scanner = BraceScanner::default();
        let mut open_at: Option<usize> = None;

        for (idx, line) in lines.iter().enumerate() {
            if open_at.is_none() {
                if !self.opens_block(line) {
                    continue;
                }
                open_at = Some(idx);
                scanner = BraceScanner::default();
            }

            scanner.scan_line(line);

            if scanner.depth == 0 {
                if let Some(start) = open_at.take() {
                    let content = lines[start..=idx].join("\n");
                    blocks.push(Chunk::block(file, start + 1, idx + 1, content));
                }
            }
        }

        blocks
    }

    fn opens_block(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.config.block_start_keywords.iter().any(|keyword| {
            !keyword.is_empty()
                && trimmed.starts_with(keyword.as_str())
                && trimmed[keyword.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !is_identifier_char(c))
        })
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Brace depth tracker that skips string literals.
///
/// `"` and `'` strings end at the line break; template literals (backticks)
/// may span lines.
#[derive(Debug, Default)]
struct BraceScanner {
    depth: usize,
    in_template: bool,
}

impl BraceScanner {
    fn scan_line(&mut self, line: &str) {
        let mut quote: Option<char> = if self.in_template { Some('`') } else { None };
        let mut escaped = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }

            match c {
                '"' | '\'' | '`' => quote = Some(c),
                '/' if chars.peek() == Some(&'/') => break,
                '{' => self.depth += 1,
                '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }

        self.in_template = quote == Some('`');
    }
}
