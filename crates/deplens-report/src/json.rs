use deplens_core::metrics::AnalysisReport;

/// Format a full analysis report as JSON. The schema is a stable contract
/// for downstream tooling; fields are only ever added.
pub fn format_report(report: &AnalysisReport, compact: bool) -> String {
    if compact {
        serde_json::to_string(report).expect("AnalysisReport should be serializable")
    } else {
        serde_json::to_string_pretty(report).expect("AnalysisReport should be serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deplens_core::metrics::{PerformanceProfile, ProjectMetrics};
    use deplens_core::recommend::RiskAssessment;
    use deplens_core::types::{
        AnalysisResult, Priority, Recommendation, RecommendationKind, RiskLevel,
    };
    use std::path::PathBuf;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            generated_at: "2024-06-01T00:00:00+00:00".to_string(),
            project_root: PathBuf::from("/project"),
            files: vec![AnalysisResult::new(PathBuf::from("/project/src/a.ts"))],
            metrics: ProjectMetrics {
                total_files: 1,
                total_imports: 3,
                total_exports: 2,
                circular_dependencies: vec![vec![
                    PathBuf::from("/project/src/a.ts"),
                    PathBuf::from("/project/src/b.ts"),
                    PathBuf::from("/project/src/a.ts"),
                ]],
                average_complexity: 4.5,
                framework_dependencies: vec!["react".to_string()],
                bundle_size_estimate: 2048,
                treeshaking_opportunities: 1,
                parse_error_count: 0,
                most_depended_on: vec![],
            },
            recommendations: vec![Recommendation {
                kind: RecommendationKind::Remove,
                priority: Priority::Medium,
                file: PathBuf::from("/project/src/a.ts"),
                description: "Remove apparently unused import './dead'".to_string(),
                impact: "Smaller module graph".to_string(),
                automatable: true,
                risk_level: RiskLevel::Low,
                estimated_savings_bytes: Some(2048),
            }],
            risk: RiskAssessment {
                overall_risk: RiskLevel::Low,
                safe_deletions: 1,
                review_required: 0,
            },
            performance: PerformanceProfile {
                elapsed_ms: 12,
                memory_bytes: None,
                files_per_second: 80.0,
                cache_hit_rate: 0.0,
                parse_error_count: 0,
            },
        }
    }

    #[test]
    fn test_format_report_valid_json() {
        let json = format_report(&sample_report(), false);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert!(parsed.get("metrics").is_some());
        assert!(parsed.get("recommendations").is_some());
        assert_eq!(parsed["metrics"]["total_files"], 1);
        assert_eq!(parsed["risk"]["overall_risk"], "low");
        assert_eq!(parsed["recommendations"][0]["kind"], "remove");
    }

    #[test]
    fn test_format_report_compact_is_single_line() {
        let json = format_report(&sample_report(), true);
        assert!(!json.contains('\n'), "compact JSON should be single line");
        let _: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
    }

    #[test]
    fn test_format_report_pretty_is_multiline() {
        let json = format_report(&sample_report(), false);
        assert!(json.contains('\n'), "pretty JSON should be multiline");
    }

    #[test]
    fn test_report_round_trips() {
        let report = sample_report();
        let json = format_report(&report, true);
        let back: AnalysisReport = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, report);
    }
}
