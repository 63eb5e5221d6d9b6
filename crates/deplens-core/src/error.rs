use std::path::PathBuf;

use thiserror::Error;

/// Fatal, run-level discovery failures. Per-file trouble (unreadable or
/// malformed sources) is recorded on that file's `AnalysisResult` instead
/// and never surfaces here.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("project root '{0}' does not exist")]
    RootNotFound(PathBuf),

    #[error("project root '{path}' could not be read: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to enumerate source files under '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
