use std::path::{Path, PathBuf};

use anyhow::Result;
use tree_sitter::Tree;

use crate::types::{ExportRecord, ImportRecord};

/// A parsed source file with its tree-sitter AST and original content.
pub struct ParsedFile {
    pub path: PathBuf,
    pub tree: Tree,
    pub content: String,
}

/// Trait that each language analyzer must implement.
pub trait LanguageAnalyzer: Send + Sync {
    /// Language name (e.g., "typescript")
    fn language(&self) -> &'static str;

    /// File extensions this analyzer handles (e.g., &["ts", "tsx"])
    fn file_extensions(&self) -> &[&str];

    /// Parse a source file into a ParsedFile. Malformed input still parses;
    /// error sites surface through `parse_errors`.
    fn parse_file(&self, path: &Path, content: &str) -> Result<ParsedFile>;

    /// Human-readable syntax errors found in the tree; empty for clean files.
    fn parse_errors(&self, parsed: &ParsedFile) -> Vec<String>;

    /// Extract import declarations (static and dynamic), unclassified.
    fn extract_imports(&self, parsed: &ParsedFile) -> Vec<ImportRecord>;

    /// Extract export declarations, including re-exports.
    fn extract_exports(&self, parsed: &ParsedFile) -> Vec<ExportRecord>;

    /// Structural complexity: base 1 plus one per control-flow construct.
    fn complexity_score(&self, parsed: &ParsedFile) -> u32;
}
