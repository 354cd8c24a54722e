//! CodeCommit bootstrap and pipeline completion wait.

use crate::config::settings::WaitPolicy;
use crate::domain::model::{CommitFile, InitialCommit};
use crate::domain::ports::{CodeCommitApi, CodePipelineApi};
use crate::utils::error::{FrameworkError, Result};
use std::path::{Path, PathBuf};

pub const INITIAL_BRANCH: &str = "mainline";
pub const AUTHOR_NAME: &str = "Compliant Framework";
pub const AUTHOR_EMAIL: &str = "compliant-framework-info@amazon.com";
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial Commit";

/// Every regular file under `source_dir`, keyed by its `/`-separated path
/// relative to `source_dir`, sorted by path.
pub fn collect_commit_files(source_dir: &Path) -> Result<Vec<CommitFile>> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = vec![source_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }

            let relative = path
                .strip_prefix(source_dir)
                .map_err(|e| FrameworkError::ConfigError {
                    message: format!("{} is outside {}: {}", path.display(), source_dir.display(), e),
                })?;
            let relative = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            files.push(CommitFile {
                path: relative,
                content: std::fs::read(&path)?,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Create the repository with an initial commit of `source_dir` on
/// `mainline`, then branch `branch_name` from it. An existing repository is
/// left untouched. Returns whether the repository was created.
pub async fn create_repository(
    codecommit: &dyn CodeCommitApi,
    repository_name: &str,
    branch_name: &str,
    source_dir: &Path,
) -> Result<bool> {
    if codecommit
        .list_repositories()
        .await?
        .iter()
        .any(|name| name == repository_name)
    {
        tracing::info!(repository = %repository_name, "Repo already exists, done");
        return Ok(false);
    }

    tracing::info!(repository = %repository_name, "Create Repository");
    codecommit.create_repository(repository_name).await?;

    let files = collect_commit_files(source_dir)?;
    tracing::info!(repository = %repository_name, files = files.len(), "Create Initial Commit");
    let commit_id = codecommit
        .create_commit(&InitialCommit {
            repository_name: repository_name.to_string(),
            branch_name: INITIAL_BRANCH.to_string(),
            author_name: AUTHOR_NAME.to_string(),
            email: AUTHOR_EMAIL.to_string(),
            message: INITIAL_COMMIT_MESSAGE.to_string(),
            files,
        })
        .await?;

    tracing::info!(repository = %repository_name, branch = %branch_name, commit_id = %commit_id, "Create Branch");
    codecommit
        .create_branch(repository_name, branch_name, &commit_id)
        .await?;
    Ok(true)
}

/// Poll until every stage's latest execution has `Succeeded`.
pub async fn wait_for_pipeline(
    codepipeline: &dyn CodePipelineApi,
    pipeline_name: &str,
    policy: WaitPolicy,
) -> Result<()> {
    for attempt in 1..=policy.max_attempts {
        let stages = codepipeline.get_pipeline_state(pipeline_name).await?;
        let pending: Vec<&str> = stages
            .iter()
            .filter(|stage| stage.latest_status.as_deref() != Some("Succeeded"))
            .map(|stage| stage.stage_name.as_str())
            .collect();

        if pending.is_empty() {
            tracing::info!(pipeline = %pipeline_name, "Pipeline execution complete");
            return Ok(());
        }

        tracing::info!(pipeline = %pipeline_name, attempt, pending = ?pending, "Waiting for pipeline to finish");
        policy.pause().await;
    }

    Err(FrameworkError::Timeout {
        operation: format!("pipeline {}", pipeline_name),
        attempts: policy.max_attempts,
    })
}
