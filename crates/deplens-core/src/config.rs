use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration from `.deplens.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
}

/// File discovery: which sources belong to the analyzed set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Path-prefix allowlist relative to the project root; empty means all.
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Path-prefix denylist relative to the project root.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

fn default_include_patterns() -> Vec<String> {
    vec![
        "**/*.ts".to_string(),
        "**/*.tsx".to_string(),
        "**/*.js".to_string(),
        "**/*.jsx".to_string(),
    ]
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.next/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
        "**/coverage/**".to_string(),
        "**/*.d.ts".to_string(),
        "**/*.test.*".to_string(),
        "**/*.spec.*".to_string(),
        "**/__tests__/**".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            include_patterns: default_include_patterns(),
            exclude_patterns: default_exclude_patterns(),
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
        }
    }
}

/// Batching and scoring thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Files analyzed in parallel within one batch; batches run sequentially.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Complexity score above which a file gets an optimize recommendation.
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: u32,
    /// Re-export count above which a file counts as a barrel.
    #[serde(default = "default_barrel_threshold")]
    pub barrel_export_threshold: usize,
}

fn default_batch_size() -> usize {
    10
}

fn default_complexity_threshold() -> u32 {
    15
}

fn default_barrel_threshold() -> usize {
    3
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            complexity_threshold: default_complexity_threshold(),
            barrel_export_threshold: default_barrel_threshold(),
        }
    }
}

/// Externalized classification heuristics: framework allowlist, alias
/// prefix, entry-point conventions. Rules evolve here, not in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Import paths matched by prefix or substring; never recommended for
    /// removal and always classified high-risk.
    #[serde(default = "default_framework_essentials")]
    pub framework_essentials: Vec<String>,
    /// Root-alias prefix used by the project's bundler/tsconfig.
    #[serde(default = "default_alias_prefix")]
    pub alias_prefix: String,
    /// Glob patterns for entry-point files (routes, pages, layouts, mains).
    #[serde(default = "default_entry_point_patterns")]
    pub entry_point_patterns: Vec<String>,
}

fn default_framework_essentials() -> Vec<String> {
    vec![
        "react".to_string(),
        "react-dom".to_string(),
        "next".to_string(),
        "@supabase".to_string(),
    ]
}

fn default_alias_prefix() -> String {
    "@/".to_string()
}

fn default_entry_point_patterns() -> Vec<String> {
    vec![
        "**/app/**/page.*".to_string(),
        "**/app/**/layout.*".to_string(),
        "**/app/**/route.*".to_string(),
        "**/app/api/**".to_string(),
        "**/pages/**".to_string(),
        "**/main.*".to_string(),
        "**/index.*".to_string(),
    ]
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            framework_essentials: default_framework_essentials(),
            alias_prefix: default_alias_prefix(),
            entry_point_patterns: default_entry_point_patterns(),
        }
    }
}

impl Config {
    /// Load configuration from a `.deplens.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `deplens init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.deplens.toml` in the given directory or any ancestor, or
    /// return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(".deplens.toml");
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!(
                            "Warning: failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `deplens init`.
    pub fn default_toml() -> String {
        r#"# Deplens - Import Dependency Analysis Configuration

[project]
include_patterns = ["**/*.ts", "**/*.tsx", "**/*.js", "**/*.jsx"]
exclude_patterns = [
  "**/node_modules/**",
  "**/.next/**",
  "**/dist/**",
  "**/build/**",
  "**/coverage/**",
  "**/*.d.ts",
  "**/*.test.*",
  "**/*.spec.*",
  "**/__tests__/**",
]
# Path-prefix filters relative to the project root
# include_paths = ["src/"]
# exclude_paths = ["src/generated/"]

[analysis]
# Files analyzed in parallel per batch; batches run strictly sequentially
batch_size = 10
complexity_threshold = 15
barrel_export_threshold = 3

[classification]
# Imports that must never be recommended for removal (prefix or substring match)
framework_essentials = ["react", "react-dom", "next", "@supabase"]
# Root-alias prefix from tsconfig/bundler config
alias_prefix = "@/"
# Files whose imports are entry-point wiring rather than ordinary modules
entry_point_patterns = [
  "**/app/**/page.*",
  "**/app/**/layout.*",
  "**/app/**/route.*",
  "**/app/api/**",
  "**/pages/**",
  "**/main.*",
  "**/index.*",
]
"#
        .to_string()
    }
}
