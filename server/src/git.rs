//! Repo acquisition for `POST /v1/ingest-repo`: a plain shallow clone via
//! `git2` into a scratch directory.

use hybridrag_core::error::{RagError, Result};
use std::path::{Path, PathBuf};

/// Clone `repo_url` into a fresh temp directory under `base_dir` and
/// return its path. A shallow clone (`depth = 1`) since the builder only
/// reads the working tree, not history.
pub fn clone_repo(repo_url: &str, base_dir: &Path) -> Result<PathBuf> {
    let dest = base_dir.join(uuid::Uuid::new_v4().to_string());
    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.depth(1);

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);

    builder
        .clone(repo_url, &dest)
        .map_err(|e| RagError::Ingest(format!("failed to clone {repo_url}: {e}")))?;

    Ok(dest)
}
