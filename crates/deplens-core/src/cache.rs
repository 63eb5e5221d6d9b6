use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::types::AnalysisResult;

/// One file's analysis pinned to the modification time it was produced from.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub modified: SystemTime,
    pub result: AnalysisResult,
}

/// Run-scoped memoization of per-file analysis, keyed by absolute path.
///
/// Lookups from concurrently running batch tasks go through `&self` (the
/// hit/miss counters are atomics); inserts happen in the sequential merge
/// step after each batch, so no two tasks ever write the same entry.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<PathBuf, CacheEntry>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A memoized result is returned only when the stored modification time
    /// still matches; anything else is a miss.
    pub fn get(&self, path: &Path, modified: SystemTime) -> Option<&AnalysisResult> {
        match self.entries.get(path) {
            Some(entry) if entry.modified == modified => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(&entry.result)
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&mut self, path: PathBuf, modified: SystemTime, result: AnalysisResult) {
        self.entries.insert(path, CacheEntry { modified, result });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of lookups served from the cache since the last reset.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Zero the hit/miss counters; called at the start of each run sharing
    /// this cache so the rate reflects that run alone.
    pub fn reset_counters(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Best-effort JSON snapshot at `<output_dir>/.cache/analysis-cache.json`,
    /// written for human inspection only and never read back. Returns the
    /// snapshot path on success.
    pub fn write_snapshot(&self, output_dir: &Path) -> Result<PathBuf> {
        let cache_dir = output_dir.join(".cache");
        std::fs::create_dir_all(&cache_dir).with_context(|| {
            format!("failed to create snapshot directory '{}'", cache_dir.display())
        })?;
        let snapshot_path = cache_dir.join("analysis-cache.json");

        let mut results: Vec<&AnalysisResult> =
            self.entries.values().map(|entry| &entry.result).collect();
        results.sort_by(|a, b| a.file.cmp(&b.file));

        let snapshot = Snapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            analysis_results: results,
        };
        let content = serde_json::to_string_pretty(&snapshot)
            .context("failed to serialize analysis snapshot")?;
        std::fs::write(&snapshot_path, content)
            .with_context(|| format!("failed to write '{}'", snapshot_path.display()))?;
        Ok(snapshot_path)
    }
}

/// Downstream tooling reads `analysisResults` by that exact name.
#[derive(Serialize)]
struct Snapshot<'a> {
    timestamp: String,
    #[serde(rename = "analysisResults")]
    analysis_results: Vec<&'a AnalysisResult>,
}
