mod common;

use common::FakeServiceProvider;
use compliant_framework::config::settings::WaitPolicy;
use compliant_framework::core::repository::{
    create_repository, wait_for_pipeline, AUTHOR_NAME, INITIAL_BRANCH,
};
use compliant_framework::FrameworkError;
use tempfile::TempDir;

fn source_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("cdk/lib")).unwrap();
    std::fs::write(dir.path().join("README.md"), b"# core").unwrap();
    std::fs::write(dir.path().join("cdk/lib/core-stack.ts"), b"export {}").unwrap();
    dir
}

#[tokio::test]
async fn test_create_repository_commits_source_and_branches() {
    let provider = FakeServiceProvider::default();
    let dir = source_dir();

    let created = create_repository(&provider.codecommit, "core", "develop", dir.path())
        .await
        .unwrap();
    assert!(created);

    let state = provider.codecommit.state.lock().unwrap();
    assert_eq!(state.repositories, vec!["core"]);

    let commit = &state.commits[0];
    assert_eq!(commit.branch_name, INITIAL_BRANCH);
    assert_eq!(commit.author_name, AUTHOR_NAME);
    let paths: Vec<&str> = commit.files.iter().map(|file| file.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "cdk/lib/core-stack.ts"]);

    assert_eq!(
        state.branches,
        vec![(
            "core".to_string(),
            "develop".to_string(),
            "commit-1".to_string()
        )]
    );
}

#[tokio::test]
async fn test_existing_repository_is_left_alone() {
    let provider = FakeServiceProvider::default();
    provider
        .codecommit
        .state
        .lock()
        .unwrap()
        .repositories
        .push("core".to_string());

    // 來源目錄不存在也不會被讀取
    let created = create_repository(
        &provider.codecommit,
        "core",
        "develop",
        std::path::Path::new("/definitely/not/here"),
    )
    .await
    .unwrap();

    assert!(!created);
    assert!(provider.codecommit.state.lock().unwrap().commits.is_empty());
}

#[tokio::test]
async fn test_wait_for_pipeline_until_all_stages_succeed() {
    let provider = FakeServiceProvider::default();
    provider
        .codepipeline
        .push_state(&[("Source", Some("Succeeded")), ("Deploy", Some("InProgress"))]);
    provider
        .codepipeline
        .push_state(&[("Source", Some("Succeeded")), ("Deploy", None)]);
    provider
        .codepipeline
        .push_state(&[("Source", Some("Succeeded")), ("Deploy", Some("Succeeded"))]);

    wait_for_pipeline(&provider.codepipeline, "core-pipeline", WaitPolicy::new(0, 5))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_for_pipeline_times_out() {
    let provider = FakeServiceProvider::default();
    provider
        .codepipeline
        .push_state(&[("Source", Some("Failed"))]);

    let err = wait_for_pipeline(&provider.codepipeline, "core-pipeline", WaitPolicy::new(0, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, FrameworkError::Timeout { attempts: 3, .. }));
}
