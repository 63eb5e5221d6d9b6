use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;
use crate::recommend::RiskAssessment;
use crate::types::{AnalysisResult, Recommendation};

/// How many top fan-in files the metrics carry.
const MOST_DEPENDED_ON_LIMIT: usize = 5;

/// A file and how many analyzed files import it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentCount {
    pub file: PathBuf,
    pub dependents: usize,
}

/// Run-wide aggregate metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub total_files: usize,
    pub total_imports: usize,
    pub total_exports: usize,
    pub circular_dependencies: Vec<Vec<PathBuf>>,
    /// Mean complexity rounded to two decimals; 0 when no files analyzed.
    pub average_complexity: f64,
    /// Deduplicated, sorted framework-essential import paths.
    pub framework_dependencies: Vec<String>,
    /// Sum of on-disk byte sizes of analyzed files. An explicit proxy, not
    /// a bundler computation.
    pub bundle_size_estimate: u64,
    /// Imports that are neither namespace nor dynamic and bind more than
    /// one named export. A heuristic signal only.
    pub treeshaking_opportunities: usize,
    pub parse_error_count: usize,
    /// Top reverse-graph fan-in, largest first.
    pub most_depended_on: Vec<DependentCount>,
}

/// Timing and resource figures for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub elapsed_ms: u64,
    /// Best-effort resident set size; `None` where unavailable.
    pub memory_bytes: Option<u64>,
    pub files_per_second: f64,
    pub cache_hit_rate: f64,
    pub parse_error_count: usize,
}

impl PerformanceProfile {
    pub fn capture(
        elapsed: Duration,
        file_count: usize,
        cache_hit_rate: f64,
        parse_error_count: usize,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let files_per_second = if secs > 0.0 {
            file_count as f64 / secs
        } else {
            0.0
        };
        Self {
            elapsed_ms: elapsed.as_millis() as u64,
            memory_bytes: current_rss_bytes(),
            files_per_second,
            cache_hit_rate,
            parse_error_count,
        }
    }
}

/// The full report: the stable JSON contract consumed by downstream tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub project_root: PathBuf,
    /// Per-file results, sorted by path.
    pub files: Vec<AnalysisResult>,
    pub metrics: ProjectMetrics,
    pub recommendations: Vec<Recommendation>,
    pub risk: RiskAssessment,
    pub performance: PerformanceProfile,
}

/// Aggregate run-wide metrics from the complete result set and its graph.
pub fn aggregate(
    results: &BTreeMap<PathBuf, AnalysisResult>,
    graph: &DependencyGraph,
) -> ProjectMetrics {
    let total_files = results.len();
    let total_imports = results.values().map(|r| r.imports.len()).sum();
    let total_exports = results.values().map(|r| r.exports.len()).sum();
    let parse_error_count = results
        .values()
        .filter(|r| !r.parse_errors.is_empty())
        .count();

    let average_complexity = if total_files == 0 {
        0.0
    } else {
        let sum: u64 = results.values().map(|r| u64::from(r.complexity_score)).sum();
        round2(sum as f64 / total_files as f64)
    };

    let framework_dependencies: Vec<String> = results
        .values()
        .flat_map(|r| r.imports.iter())
        .filter(|i| i.is_framework_essential)
        .map(|i| i.import_path.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let bundle_size_estimate = results.values().map(|r| r.file_size).sum();

    let treeshaking_opportunities = results
        .values()
        .flat_map(|r| r.imports.iter())
        .filter(|i| !i.is_namespace && !i.is_dynamic && named_binding_count(i) > 1)
        .count();

    let mut most_depended_on: Vec<DependentCount> = graph
        .transpose()
        .into_iter()
        .map(|(file, dependents)| DependentCount {
            file,
            dependents: dependents.len(),
        })
        .collect();
    most_depended_on.sort_by(|a, b| {
        b.dependents
            .cmp(&a.dependents)
            .then_with(|| a.file.cmp(&b.file))
    });
    most_depended_on.truncate(MOST_DEPENDED_ON_LIMIT);

    ProjectMetrics {
        total_files,
        total_imports,
        total_exports,
        circular_dependencies: graph.find_cycles(),
        average_complexity,
        framework_dependencies,
        bundle_size_estimate,
        treeshaking_opportunities,
        parse_error_count,
        most_depended_on,
    }
}

fn named_binding_count(import: &crate::types::ImportRecord) -> usize {
    import
        .imported_names
        .iter()
        .filter(|n| n.as_str() != "default" && n.as_str() != "*")
        .count()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Resident set size from /proc/self/statm, assuming 4 KiB pages.
#[cfg(target_os = "linux")]
fn current_rss_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn current_rss_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImportRecord, RiskLevel, SourcePosition};
    use std::path::Path;

    fn import(file: &str, path: &str, names: &[&str]) -> ImportRecord {
        ImportRecord {
            file: PathBuf::from(file),
            import_path: path.to_string(),
            resolved_path: None,
            imported_names: names.iter().map(|n| n.to_string()).collect(),
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

    fn empty_graph() -> DependencyGraph {
        DependencyGraph::build(&BTreeMap::new())
    }

    #[test]
    fn test_aggregate_empty_run() {
        let metrics = aggregate(&BTreeMap::new(), &empty_graph());
        assert_eq!(metrics.total_files, 0);
        assert!(metrics.average_complexity.abs() < f64::EPSILON);
        assert!(metrics.circular_dependencies.is_empty());
    }

    #[test]
    fn test_average_complexity_rounds_to_two_decimals() {
        let mut results = BTreeMap::new();
        for (file, score) in [("/p/a.ts", 1), ("/p/b.ts", 2), ("/p/c.ts", 2)] {
            let mut r = AnalysisResult::new(PathBuf::from(file));
            r.complexity_score = score;
            results.insert(PathBuf::from(file), r);
        }
        let metrics = aggregate(&results, &DependencyGraph::build(&results));
        // 5/3 = 1.666... -> 1.67
        assert!((metrics.average_complexity - 1.67).abs() < f64::EPSILON);
    }

    #[test]
    fn test_treeshaking_counts_multi_named_imports_only() {
        let mut r = AnalysisResult::new(PathBuf::from("/p/a.ts"));
        r.imports = vec![
            import("/p/a.ts", "react", &["default"]),
            import("/p/a.ts", "./utils", &["formatDate", "parseDate"]),
            import("/p/a.ts", "./single", &["one"]),
        ];
        let mut ns = import("/p/a.ts", "./everything", &["*"]);
        ns.is_namespace = true;
        r.imports.push(ns);

        let mut results = BTreeMap::new();
        results.insert(PathBuf::from("/p/a.ts"), r);
        let metrics = aggregate(&results, &DependencyGraph::build(&results));
        assert_eq!(metrics.treeshaking_opportunities, 1);
    }

    #[test]
    fn test_framework_dependencies_deduplicated_and_sorted() {
        let mut a = AnalysisResult::new(PathBuf::from("/p/a.ts"));
        let mut react = import("/p/a.ts", "react", &["default"]);
        react.is_framework_essential = true;
        a.imports.push(react.clone());

        let mut b = AnalysisResult::new(PathBuf::from("/p/b.ts"));
        let mut next = import("/p/b.ts", "next/navigation", &["useRouter"]);
        next.is_framework_essential = true;
        b.imports.push(next);
        b.imports.push(react);

        let mut results = BTreeMap::new();
        results.insert(PathBuf::from("/p/a.ts"), a);
        results.insert(PathBuf::from("/p/b.ts"), b);
        let metrics = aggregate(&results, &DependencyGraph::build(&results));
        assert_eq!(
            metrics.framework_dependencies,
            vec!["next/navigation", "react"]
        );
    }

    #[test]
    fn test_bundle_size_sums_file_sizes() {
        let mut results = BTreeMap::new();
        for (file, size) in [("/p/a.ts", 100u64), ("/p/b.ts", 250u64)] {
            let mut r = AnalysisResult::new(PathBuf::from(file));
            r.file_size = size;
            results.insert(PathBuf::from(file), r);
        }
        let metrics = aggregate(&results, &DependencyGraph::build(&results));
        assert_eq!(metrics.bundle_size_estimate, 350);
    }

    #[test]
    fn test_most_depended_on_ranks_by_fan_in() {
        let mut results = BTreeMap::new();
        for (file, deps) in [
            ("/p/a.ts", vec!["./shared"]),
            ("/p/b.ts", vec!["./shared"]),
            ("/p/c.ts", vec!["./a"]),
            ("/p/shared.ts", vec![]),
        ] {
            let mut r = AnalysisResult::new(PathBuf::from(file));
            r.imports = deps.iter().map(|d| import(file, d, &["x"])).collect();
            results.insert(PathBuf::from(file), r);
        }
        let metrics = aggregate(&results, &DependencyGraph::build(&results));
        assert_eq!(metrics.most_depended_on[0].file, Path::new("/p/shared.ts"));
        assert_eq!(metrics.most_depended_on[0].dependents, 2);
    }

    #[test]
    fn test_parse_error_count_counts_files_not_messages() {
        let mut bad = AnalysisResult::new(PathBuf::from("/p/bad.ts"));
        bad.parse_errors = vec!["syntax error at 1:1".into(), "syntax error at 2:4".into()];
        let mut results = BTreeMap::new();
        results.insert(PathBuf::from("/p/bad.ts"), bad);
        results.insert(
            PathBuf::from("/p/good.ts"),
            AnalysisResult::new(PathBuf::from("/p/good.ts")),
        );
        let metrics = aggregate(&results, &DependencyGraph::build(&results));
        assert_eq!(metrics.parse_error_count, 1);
    }
}
