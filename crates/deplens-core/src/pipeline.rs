use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::analyzer::LanguageAnalyzer;
use crate::cache::AnalysisCache;
use crate::classify::RiskClassifier;
use crate::config::Config;
use crate::error::DiscoveryError;
use crate::graph::DependencyGraph;
use crate::metrics::{self, AnalysisReport, PerformanceProfile};
use crate::recommend;
use crate::types::AnalysisResult;

/// Progress snapshot emitted after every completed batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub batch: usize,
    pub total_batches: usize,
    pub files_processed: usize,
    pub total_files: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> f64 {
        if self.total_files == 0 {
            100.0
        } else {
            self.files_processed as f64 / self.total_files as f64 * 100.0
        }
    }
}

type ProgressObserver = Box<dyn Fn(&BatchProgress) + Send + Sync>;

/// Full analysis output: the report plus the graph it was derived from.
pub struct ProjectAnalysis {
    pub report: AnalysisReport,
    pub graph: DependencyGraph,
}

/// Reusable analysis pipeline. All run state (results, cache, graph) is
/// owned by the run, never by the pipeline or a module-level singleton, so
/// runs are independently testable and composable.
pub struct AnalysisPipeline {
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
    config: Config,
    classifier: RiskClassifier,
    progress: Option<ProgressObserver>,
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

impl AnalysisPipeline {
    pub fn new(analyzers: Vec<Box<dyn LanguageAnalyzer>>, config: Config) -> Self {
        let classifier = RiskClassifier::new(&config.classification);
        Self {
            analyzers,
            config,
            classifier,
            progress: None,
        }
    }

    /// Register an observer called after every completed batch.
    pub fn with_progress(
        mut self,
        observer: impl Fn(&BatchProgress) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve include/exclude patterns and path-prefix filters into a
    /// deduplicated, sorted absolute file list. Failure to enumerate is
    /// fatal to the run.
    pub fn discover_files(&self, project_root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !project_root.exists() {
            return Err(DiscoveryError::RootNotFound(project_root.to_path_buf()));
        }
        let root = project_root
            .canonicalize()
            .map_err(|source| DiscoveryError::RootUnreadable {
                path: project_root.to_path_buf(),
                source,
            })?;

        let includes = build_globset(&self.config.project.include_patterns);
        let excludes = build_globset(&self.config.project.exclude_patterns);

        let mut files = Vec::new();
        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel = path.strip_prefix(&root).unwrap_or(path);
            let rel_str = rel.to_string_lossy().replace('\\', "/");

            if !includes.is_match(&rel_str) || excludes.is_match(&rel_str) {
                continue;
            }
            if !self.config.project.include_paths.is_empty()
                && !self
                    .config
                    .project
                    .include_paths
                    .iter()
                    .any(|prefix| rel_str.starts_with(prefix.as_str()))
            {
                continue;
            }
            if self
                .config
                .project
                .exclude_paths
                .iter()
                .any(|prefix| rel_str.starts_with(prefix.as_str()))
            {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Run a full analysis with a fresh, run-local cache.
    pub fn analyze(&self, project_root: &Path) -> Result<ProjectAnalysis> {
        let mut cache = AnalysisCache::new();
        self.analyze_with_cache(project_root, &mut cache)
    }

    /// Run a full analysis against a caller-owned cache. A warm cache plus
    /// an unchanged tree yields identical results and a 100% hit rate.
    pub fn analyze_with_cache(
        &self,
        project_root: &Path,
        cache: &mut AnalysisCache,
    ) -> Result<ProjectAnalysis> {
        let started = Instant::now();
        cache.reset_counters();

        let files = self.discover_files(project_root)?;
        let root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());

        let batch_size = self.config.analysis.batch_size.max(1);
        let total_batches = files.len().div_ceil(batch_size);
        let total_files = files.len();

        let mut results: BTreeMap<PathBuf, AnalysisResult> = BTreeMap::new();
        let mut files_processed = 0usize;

        for (batch_index, batch) in files.chunks(batch_size).enumerate() {
            // Bounded parallelism within the batch; each task owns its own
            // key, so the merge below never sees two writes to one entry.
            let batch_results: Vec<(PathBuf, Option<SystemTime>, AnalysisResult)> = {
                let shared: &AnalysisCache = cache;
                batch
                    .par_iter()
                    .map(|path| self.analyze_file(path, &root, shared))
                    .collect()
            };

            for (path, freshly_parsed_at, result) in batch_results {
                if let Some(modified) = freshly_parsed_at {
                    cache.insert(path.clone(), modified, result.clone());
                }
                results.insert(path, result);
            }

            files_processed += batch.len();
            if let Some(observer) = &self.progress {
                observer(&BatchProgress {
                    batch: batch_index + 1,
                    total_batches,
                    files_processed,
                    total_files,
                });
            }
        }

        // Graph work is single-threaded and needs the complete file set
        let graph = DependencyGraph::build(&results);
        let project_metrics = metrics::aggregate(&results, &graph);
        let recommendations = recommend::generate(&results, &self.config.analysis);
        let risk = recommend::assess(&recommendations);
        let performance = PerformanceProfile::capture(
            started.elapsed(),
            total_files,
            cache.hit_rate(),
            project_metrics.parse_error_count,
        );

        let report = AnalysisReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            project_root: root,
            files: results.into_values().collect(),
            metrics: project_metrics,
            recommendations,
            risk,
            performance,
        };

        Ok(ProjectAnalysis { report, graph })
    }

    /// Analyze one file. Returns the modification time only when the result
    /// came from a fresh parse (cache hits and unreadable files are not
    /// re-inserted). Never fails: trouble lands in `parse_errors`.
    fn analyze_file(
        &self,
        path: &Path,
        root: &Path,
        cache: &AnalysisCache,
    ) -> (PathBuf, Option<SystemTime>, AnalysisResult) {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("Warning: failed to stat {}: {e}", path.display());
                let mut result = AnalysisResult::new(path.to_path_buf());
                result
                    .parse_errors
                    .push(format!("failed to read {}: {e}", path.display()));
                return (path.to_path_buf(), None, result);
            }
        };
        let modified = metadata.modified().ok();

        if let Some(modified) = modified {
            if let Some(cached) = cache.get(path, modified) {
                return (path.to_path_buf(), None, cached.clone());
            }
        }

        let mut result = AnalysisResult::new(path.to_path_buf());
        result.file_size = metadata.len();

        match std::fs::read_to_string(path) {
            Ok(content) => match self.analyzer_for(path) {
                Some(analyzer) => match analyzer.parse_file(path, &content) {
                    Ok(parsed) => {
                        let errors = analyzer.parse_errors(&parsed);
                        if errors.is_empty() {
                            result.imports = analyzer.extract_imports(&parsed);
                            result.exports = analyzer.extract_exports(&parsed);
                            result.complexity_score = analyzer.complexity_score(&parsed);
                        } else {
                            // Malformed syntax: record the errors, keep the
                            // import/export data empty
                            result.parse_errors = errors;
                        }
                    }
                    Err(e) => result.parse_errors.push(format!("{e:#}")),
                },
                None => result
                    .parse_errors
                    .push(format!("no analyzer for {}", path.display())),
            },
            Err(e) => {
                eprintln!("Warning: failed to read {}: {e}", path.display());
                result
                    .parse_errors
                    .push(format!("failed to read {}: {e}", path.display()));
            }
        }

        let rel = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        self.classifier
            .apply(&mut result, &rel, &self.config.analysis);

        (path.to_path_buf(), modified, result)
    }

    fn analyzer_for(&self, path: &Path) -> Option<&dyn LanguageAnalyzer> {
        let ext = path.extension()?.to_str()?;
        self.analyzers
            .iter()
            .find(|a| a.file_extensions().contains(&ext))
            .map(|a| a.as_ref())
    }
}
