use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::types::{AnalysisResult, Priority, Recommendation, RecommendationKind, RiskLevel};

/// Fixed per-import savings placeholder; mirrors the reference estimator,
/// which never measured real module sizes.
pub const ESTIMATED_IMPORT_COST_BYTES: u64 = 2048;

/// Recommendations above this many medium-or-high risk entries push the
/// overall assessment to medium.
const REVIEW_BACKLOG_THRESHOLD: usize = 10;

/// Run-level risk summary derived from the recommendation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    /// Low-risk, automatable recommendations.
    pub safe_deletions: usize,
    /// Medium-or-high risk recommendations needing a human look.
    pub review_required: usize,
}

/// Generate recommendations over the complete result set, sorted by
/// descending priority with discovery order preserved on ties.
pub fn generate(
    results: &BTreeMap<PathBuf, AnalysisResult>,
    analysis: &AnalysisConfig,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for (path, result) in results {
        for import in &result.imports {
            let removable = import.risk_level == RiskLevel::Low
                && !import.is_framework_essential
                && !import.is_used;
            if removable {
                recommendations.push(Recommendation {
                    kind: RecommendationKind::Remove,
                    priority: Priority::Medium,
                    file: path.clone(),
                    description: format!(
                        "Remove apparently unused import '{}' (line {})",
                        import.import_path, import.position.line
                    ),
                    impact: "Smaller module graph and faster cold builds".to_string(),
                    automatable: true,
                    risk_level: RiskLevel::Low,
                    estimated_savings_bytes: Some(ESTIMATED_IMPORT_COST_BYTES),
                });
            }
        }

        if result.has_barrel_pattern {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Optimize,
                priority: Priority::Low,
                file: path.clone(),
                description: "Barrel file re-exports many modules; import from the source modules instead".to_string(),
                impact: "Better tree-shaking and fewer accidental dependency edges".to_string(),
                automatable: false,
                risk_level: RiskLevel::Low,
                estimated_savings_bytes: None,
            });
        }

        if result.complexity_score > analysis.complexity_threshold {
            recommendations.push(Recommendation {
                kind: RecommendationKind::Optimize,
                priority: Priority::Medium,
                file: path.clone(),
                description: format!(
                    "Complexity score {} exceeds threshold {}; consider splitting this module",
                    result.complexity_score, analysis.complexity_threshold
                ),
                impact: "Easier review and lower regression risk on future changes".to_string(),
                automatable: false,
                risk_level: RiskLevel::Medium,
                estimated_savings_bytes: None,
            });
        }
    }

    // Stable sort keeps discovery order within each priority band
    recommendations.sort_by_key(|r| Reverse(r.priority));
    recommendations
}

/// Derive the run-level risk assessment from the recommendation list.
pub fn assess(recommendations: &[Recommendation]) -> RiskAssessment {
    let review_required = recommendations
        .iter()
        .filter(|r| r.risk_level >= RiskLevel::Medium)
        .count();

    let overall_risk = if recommendations
        .iter()
        .any(|r| r.risk_level == RiskLevel::High)
    {
        RiskLevel::High
    } else if review_required > REVIEW_BACKLOG_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let safe_deletions = recommendations
        .iter()
        .filter(|r| r.automatable && r.risk_level == RiskLevel::Low)
        .count();

    RiskAssessment {
        overall_risk,
        safe_deletions,
        review_required,
    }
}
