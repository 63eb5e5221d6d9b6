use std::path::Path;

use colored::Colorize;

use deplens_core::metrics::AnalysisReport;
use deplens_core::types::{Priority, RiskLevel};

/// Format a full analysis report for terminal output.
pub fn format_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n",
        "Deplens - Import Dependency Analysis".bold()
    ));
    out.push_str(&format!("{}\n\n", "=".repeat(44)));

    out.push_str(&format!(
        "{}: {}\n",
        "Project".bold(),
        report.project_root.display()
    ));

    let m = &report.metrics;
    out.push_str(&format!(
        "{}: {} files, {} imports, {} exports",
        "Summary".bold(),
        m.total_files,
        m.total_imports,
        m.total_exports,
    ));
    if m.parse_error_count > 0 {
        out.push_str(&format!(
            " ({})",
            format!("{} files with parse errors", m.parse_error_count).yellow()
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "  Average complexity:        {:.2}\n",
        m.average_complexity
    ));
    out.push_str(&format!(
        "  Estimated bundle size:     {}\n",
        format_bytes(m.bundle_size_estimate)
    ));
    out.push_str(&format!(
        "  Tree-shaking candidates:   {}\n",
        m.treeshaking_opportunities
    ));
    if !m.framework_dependencies.is_empty() {
        out.push_str(&format!(
            "  Framework dependencies:    {}\n",
            m.framework_dependencies.join(", ")
        ));
    }

    // Circular dependencies
    if m.circular_dependencies.is_empty() {
        out.push_str(&format!(
            "\n{}\n",
            "No circular dependencies found.".green()
        ));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            "Circular dependencies".red().bold(),
            m.circular_dependencies.len(),
            "-".repeat(44),
        ));
        for cycle in &m.circular_dependencies {
            let rendered: Vec<String> = cycle
                .iter()
                .map(|p| relative_display(p, &report.project_root))
                .collect();
            out.push_str(&format!("  {}\n", rendered.join(" -> ")));
        }
    }

    if !m.most_depended_on.is_empty() {
        out.push_str(&format!("\n{}\n", "Most depended on".bold()));
        for entry in &m.most_depended_on {
            out.push_str(&format!(
                "  {} ({} dependents)\n",
                relative_display(&entry.file, &report.project_root),
                entry.dependents,
            ));
        }
    }

    // Recommendations
    if report.recommendations.is_empty() {
        out.push_str(&format!("\n{}\n", "No recommendations.".green()));
    } else {
        out.push_str(&format!(
            "\n{} ({})\n{}\n",
            "Recommendations".bold(),
            report.recommendations.len(),
            "-".repeat(44),
        ));
        for rec in &report.recommendations {
            let priority_str = match rec.priority {
                Priority::Critical => "CRITICAL".red().bold().to_string(),
                Priority::High => "HIGH".red().to_string(),
                Priority::Medium => "MEDIUM".yellow().to_string(),
                Priority::Low => "LOW".blue().to_string(),
            };
            out.push_str(&format!(
                "\n  [{}] {} {}\n",
                priority_str,
                rec.kind,
                relative_display(&rec.file, &report.project_root),
            ));
            out.push_str(&format!("    {}\n", rec.description));
            out.push_str(&format!("    {}: {}\n", "Impact".cyan(), rec.impact));
            if let Some(savings) = rec.estimated_savings_bytes {
                out.push_str(&format!(
                    "    Estimated savings: {}\n",
                    format_bytes(savings)
                ));
            }
        }
    }

    // Risk assessment
    let risk_str = match report.risk.overall_risk {
        RiskLevel::High => "HIGH".red().bold().to_string(),
        RiskLevel::Medium => "MEDIUM".yellow().to_string(),
        RiskLevel::Low => "LOW".green().to_string(),
    };
    out.push_str(&format!(
        "\n{}: {} ({} safe deletions, {} need review)\n",
        "Overall risk".bold(),
        risk_str,
        report.risk.safe_deletions,
        report.risk.review_required,
    ));

    // Performance
    let p = &report.performance;
    out.push_str(&format!(
        "{}: {} files in {}ms ({:.0} files/s), cache hit rate {:.0}%",
        "Performance".bold(),
        m.total_files,
        p.elapsed_ms,
        p.files_per_second,
        p.cache_hit_rate * 100.0,
    ));
    if let Some(memory) = p.memory_bytes {
        out.push_str(&format!(", {} resident", format_bytes(memory)));
    }
    out.push('\n');

    out
}

fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deplens_core::metrics::{PerformanceProfile, ProjectMetrics};
    use deplens_core::recommend::RiskAssessment;
    use deplens_core::types::{
        AnalysisResult, Priority, Recommendation, RecommendationKind,
    };
    use std::path::PathBuf;

    fn sample_report(with_cycle: bool) -> AnalysisReport {
        let circular_dependencies = if with_cycle {
            vec![vec![
                PathBuf::from("/project/src/a.ts"),
                PathBuf::from("/project/src/b.ts"),
                PathBuf::from("/project/src/a.ts"),
            ]]
        } else {
            vec![]
        };
        AnalysisReport {
            generated_at: "2024-06-01T00:00:00+00:00".to_string(),
            project_root: PathBuf::from("/project"),
            files: vec![AnalysisResult::new(PathBuf::from("/project/src/a.ts"))],
            metrics: ProjectMetrics {
                total_files: 2,
                total_imports: 5,
                total_exports: 3,
                circular_dependencies,
                average_complexity: 3.25,
                framework_dependencies: vec!["react".to_string()],
                bundle_size_estimate: 4096,
                treeshaking_opportunities: 2,
                parse_error_count: 1,
                most_depended_on: vec![],
            },
            recommendations: vec![Recommendation {
                kind: RecommendationKind::Optimize,
                priority: Priority::Medium,
                file: PathBuf::from("/project/src/busy.ts"),
                description: "Complexity score 26 exceeds threshold 15".to_string(),
                impact: "Easier review".to_string(),
                automatable: false,
                risk_level: RiskLevel::Medium,
                estimated_savings_bytes: None,
            }],
            risk: RiskAssessment {
                overall_risk: RiskLevel::Low,
                safe_deletions: 0,
                review_required: 1,
            },
            performance: PerformanceProfile {
                elapsed_ms: 40,
                memory_bytes: Some(8 * 1024 * 1024),
                files_per_second: 50.0,
                cache_hit_rate: 0.5,
                parse_error_count: 1,
            },
        }
    }

    #[test]
    fn test_report_mentions_cycles() {
        let text = format_report(&sample_report(true));
        assert!(text.contains("src/a.ts -> src/b.ts -> src/a.ts"));
    }

    #[test]
    fn test_report_without_cycles_says_so() {
        let text = format_report(&sample_report(false));
        assert!(text.contains("No circular dependencies found."));
    }

    #[test]
    fn test_report_includes_summary_and_recommendations() {
        let text = format_report(&sample_report(false));
        assert!(text.contains("2 files, 5 imports, 3 exports"));
        assert!(text.contains("Complexity score 26 exceeds threshold 15"));
        assert!(text.contains("4.0 KiB"));
        assert!(text.contains("cache hit rate 50%"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(100), "100 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
