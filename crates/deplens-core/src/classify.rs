use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::{AnalysisConfig, ClassificationConfig};
use crate::graph::join_normalized;
use crate::types::{AnalysisResult, ImportRecord, RiskLevel};

/// Classifies imports into risk levels and files into entry points using
/// the externalized rules from `[classification]`.
pub struct RiskClassifier {
    framework_essentials: Vec<String>,
    alias_prefix: String,
    entry_points: GlobSet,
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder
        .build()
        .unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

impl RiskClassifier {
    pub fn new(config: &ClassificationConfig) -> Self {
        Self {
            framework_essentials: config.framework_essentials.clone(),
            alias_prefix: config.alias_prefix.clone(),
            entry_points: build_globset(&config.entry_point_patterns),
        }
    }

    /// Allowlist match by prefix or substring.
    pub fn is_framework_essential(&self, import_path: &str) -> bool {
        self.framework_essentials
            .iter()
            .any(|rule| import_path.starts_with(rule.as_str()) || import_path.contains(rule.as_str()))
    }

    /// Check a root-relative path against the entry-point conventions.
    pub fn is_entry_point(&self, rel_path: &str) -> bool {
        let normalized = rel_path.replace('\\', "/");
        self.entry_points.is_match(&normalized)
    }

    /// Deterministic risk precedence; first match wins.
    pub fn classify_import(&self, import: &ImportRecord, owner_is_entry_point: bool) -> RiskLevel {
        if import.is_dynamic {
            return RiskLevel::High;
        }
        if import.is_framework_essential {
            return RiskLevel::High;
        }
        if import.import_path.starts_with('.') && import.import_path.contains("..") {
            return RiskLevel::High;
        }
        if import.is_type_only {
            return RiskLevel::Medium;
        }
        if import.import_path.starts_with(&self.alias_prefix) {
            return RiskLevel::Medium;
        }
        if owner_is_entry_point {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }

    /// Fill in the classification fields of a freshly extracted result:
    /// entry-point flag, per-import framework/risk/resolution, dependency
    /// list, and the barrel-pattern flag.
    pub fn apply(&self, result: &mut AnalysisResult, rel_path: &str, analysis: &AnalysisConfig) {
        result.is_entry_point = self.is_entry_point(rel_path);

        let owner_dir = result.file.parent().map(|p| p.to_path_buf());
        for import in &mut result.imports {
            import.is_framework_essential = self.is_framework_essential(&import.import_path);
            if import.import_path.starts_with('.') {
                if let Some(dir) = &owner_dir {
                    import.resolved_path = Some(join_normalized(dir, &import.import_path));
                }
            }
            import.risk_level = self.classify_import(import, result.is_entry_point);
        }

        result.dependencies = result
            .imports
            .iter()
            .filter(|i| i.import_path.starts_with('.'))
            .map(|i| i.import_path.clone())
            .collect();

        let re_export_count = result.exports.iter().filter(|e| e.is_re_export).count();
        result.has_barrel_pattern = re_export_count > analysis.barrel_export_threshold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;
    use crate::types::{ExportRecord, SourcePosition};
    use std::path::PathBuf;

    fn classifier() -> RiskClassifier {
        RiskClassifier::new(&ClassificationConfig::default())
    }

    fn import(path: &str) -> ImportRecord {
        ImportRecord {
            file: PathBuf::from("/project/src/widget.ts"),
            import_path: path.to_string(),
            resolved_path: None,
            imported_names: vec!["thing".to_string()],
            is_type_only: false,
            is_default: false,
            is_namespace: false,
            is_dynamic: false,
            position: SourcePosition { line: 1, column: 1 },
            is_framework_essential: false,
            risk_level: RiskLevel::Low,
            is_used: true,
        }
    }

    fn re_export(source: &str) -> ExportRecord {
        ExportRecord {
            names: vec!["x".to_string()],
            is_default: false,
            is_re_export: true,
            source_path: Some(source.to_string()),
            position: SourcePosition { line: 1, column: 1 },
            is_used_internally: true,
        }
    }

    #[test]
    fn test_dynamic_import_is_high_risk() {
        let c = classifier();
        let mut i = import("./lazy");
        i.is_dynamic = true;
        assert_eq!(c.classify_import(&i, false), RiskLevel::High);
    }

    #[test]
    fn test_framework_essential_is_high_risk() {
        let c = classifier();
        let mut i = import("react-dom/client");
        i.is_framework_essential = true;
        assert_eq!(c.classify_import(&i, false), RiskLevel::High);
    }

    #[test]
    fn test_parent_traversal_is_high_risk() {
        let c = classifier();
        let i = import("../../shared/helpers");
        assert_eq!(c.classify_import(&i, false), RiskLevel::High);
    }

    #[test]
    fn test_type_only_is_medium_risk() {
        let c = classifier();
        let mut i = import("./types");
        i.is_type_only = true;
        assert_eq!(c.classify_import(&i, false), RiskLevel::Medium);
    }

    #[test]
    fn test_alias_prefix_is_medium_risk() {
        let c = classifier();
        let i = import("@/lib/db");
        assert_eq!(c.classify_import(&i, false), RiskLevel::Medium);
    }

    #[test]
    fn test_entry_point_owner_is_medium_risk() {
        let c = classifier();
        let i = import("./header");
        assert_eq!(c.classify_import(&i, true), RiskLevel::Medium);
    }

    #[test]
    fn test_plain_relative_import_is_low_risk() {
        let c = classifier();
        let i = import("./header");
        assert_eq!(c.classify_import(&i, false), RiskLevel::Low);
    }

    #[test]
    fn test_dynamic_wins_over_framework() {
        let c = classifier();
        let mut i = import("react");
        i.is_dynamic = true;
        i.is_framework_essential = true;
        assert_eq!(c.classify_import(&i, false), RiskLevel::High);
    }

    #[test]
    fn test_entry_point_patterns() {
        let c = classifier();
        assert!(c.is_entry_point("app/dashboard/page.tsx"));
        assert!(c.is_entry_point("src/app/api/users/route.ts"));
        assert!(c.is_entry_point("src/index.ts"));
        assert!(!c.is_entry_point("src/lib/format.ts"));
    }

    #[test]
    fn test_framework_allowlist_matches_prefix_and_substring() {
        let c = classifier();
        assert!(c.is_framework_essential("react"));
        assert!(c.is_framework_essential("next/navigation"));
        assert!(c.is_framework_essential("@supabase/supabase-js"));
        assert!(!c.is_framework_essential("lodash"));
    }

    #[test]
    fn test_apply_sets_resolution_dependencies_and_barrel() {
        let c = classifier();
        let mut result = AnalysisResult::new(PathBuf::from("/project/src/ui/index.ts"));
        result.imports = vec![import("./button"), import("lodash")];
        result.exports = vec![
            re_export("./button"),
            re_export("./card"),
            re_export("./modal"),
            re_export("./badge"),
        ];

        c.apply(&mut result, "src/ui/index.ts", &AnalysisConfig::default());

        assert!(result.is_entry_point, "index convention is an entry point");
        assert_eq!(result.dependencies, vec!["./button"]);
        assert_eq!(
            result.imports[0].resolved_path.as_deref(),
            Some(std::path::Path::new("/project/src/ui/button"))
        );
        assert!(result.imports[1].resolved_path.is_none());
        assert!(result.has_barrel_pattern, "4 re-exports exceed threshold 3");
    }
}
