use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How safe it is to remove or rewrite an import without behavioral
/// regression. Ordered from safest to riskiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Priority of a recommendation, ordered ascending so that sorting by
/// `Reverse(priority)` yields critical-first output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// The action a recommendation proposes. Only `Remove` and `Optimize` are
/// produced by this engine; the remaining variants are part of the report
/// vocabulary consumed by downstream tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Remove,
    Preserve,
    Implement,
    Relocate,
    Optimize,
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationKind::Remove => write!(f, "remove"),
            RecommendationKind::Preserve => write!(f, "preserve"),
            RecommendationKind::Implement => write!(f, "implement"),
            RecommendationKind::Relocate => write!(f, "relocate"),
            RecommendationKind::Optimize => write!(f, "optimize"),
        }
    }
}

/// Location in source code (1-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One import declaration (static or dynamic) found in a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// File the import lives in.
    pub file: PathBuf,
    /// The specifier exactly as written (`react`, `./utils`, `@/lib/db`).
    pub import_path: String,
    /// Normalized directory-relative join, set for relative specifiers only.
    pub resolved_path: Option<PathBuf>,
    /// Imported names in declaration order; `"default"` and `"*"` are
    /// sentinels for default and namespace imports.
    pub imported_names: Vec<String>,
    pub is_type_only: bool,
    pub is_default: bool,
    pub is_namespace: bool,
    pub is_dynamic: bool,
    pub position: SourcePosition,
    pub is_framework_essential: bool,
    pub risk_level: RiskLevel,
    /// Same-file textual usage heuristic; imports with no local bindings
    /// are conservatively marked used.
    pub is_used: bool,
}

/// One export declaration found in a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub names: Vec<String>,
    pub is_default: bool,
    pub is_re_export: bool,
    /// Source specifier for re-exports (`export { x } from './x'`).
    pub source_path: Option<String>,
    pub position: SourcePosition,
    /// Conservative: no cross-file usage verification is performed.
    pub is_used_internally: bool,
}

/// Per-file analysis output. Produced once per run per file (memoized by
/// the cache on modification time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file: PathBuf,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    /// Raw relative specifiers, in import order.
    pub dependencies: Vec<String>,
    pub is_entry_point: bool,
    pub has_barrel_pattern: bool,
    pub complexity_score: u32,
    pub parse_errors: Vec<String>,
    /// On-disk size in bytes; feeds the bundle-size estimate.
    pub file_size: u64,
}

impl AnalysisResult {
    /// An empty result for `file` with the base complexity score.
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            imports: Vec::new(),
            exports: Vec::new(),
            dependencies: Vec::new(),
            is_entry_point: false,
            has_barrel_pattern: false,
            complexity_score: 1,
            parse_errors: Vec::new(),
            file_size: 0,
        }
    }
}

/// An actionable, risk-annotated recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub file: PathBuf,
    pub description: String,
    pub impact: String,
    pub automatable: bool,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_bytes: Option<u64>,
}
