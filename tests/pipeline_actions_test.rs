mod common;

use common::{job_event, FakeServiceProvider, JobResult};
use compliant_framework::config::settings::FrameworkSettings;
use compliant_framework::core::actions::{
    GetSsmParametersAction, InitializeOrganizationalUnitsAction, SecurityHubInviteMembersAction,
};
use compliant_framework::core::artifacts::{
    CopyRepositoriesAction, ExpandS3SourcesAction, UpdateArtifactAclAction,
};
use compliant_framework::core::job::{run_job, CodePipelineEvent};
use compliant_framework::domain::model::{JobOutcome, SecurityHubInvitation, SecurityHubMember};
use compliant_framework::domain::ports::Scope;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

fn with_input_artifact(event: CodePipelineEvent, bucket: &str, key: &str) -> CodePipelineEvent {
    let mut event = event;
    let artifact: compliant_framework::core::job::Artifact = serde_json::from_value(json!({
        "name": "Source",
        "location": {"type": "S3", "s3Location": {"bucketName": bucket, "objectKey": key}}
    }))
    .unwrap();
    event.job.data.input_artifacts.push(artifact);
    event
}

#[tokio::test]
async fn test_get_ssm_parameters_exports_variables() {
    let provider = FakeServiceProvider::default();
    provider.ssm.put(
        "/compliant/framework/accounts/core/logging/aws-us-gov/id",
        "222222222222",
    );

    let action = GetSsmParametersAction {
        services: &provider,
    };
    let event = job_event(
        json!({"Items": [{
            "Name": "/compliant/framework/accounts/core/logging/aws-us-gov/id",
            "OutputVariable": "LoggingAccountId"
        }]}),
        None,
    );
    run_job(&provider.codepipeline, &action, &event).await.unwrap();

    assert_eq!(
        provider.codepipeline.results(),
        vec![JobResult::Success {
            job_id: "job-1".to_string(),
            continuation_token: None,
            output_variables: BTreeMap::from([(
                "LoggingAccountId".to_string(),
                "222222222222".to_string()
            )]),
        }]
    );
}

#[tokio::test]
async fn test_get_ssm_parameters_missing_parameter_fails_job() {
    let provider = FakeServiceProvider::default();
    let action = GetSsmParametersAction {
        services: &provider,
    };
    let event = job_event(
        json!({"Items": [{"Name": "/missing", "OutputVariable": "Missing"}]}),
        None,
    );

    let outcome = run_job(&provider.codepipeline, &action, &event).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Failed { ref message } if message.contains("/missing")));
}

#[tokio::test]
async fn test_initialize_organizational_units_is_idempotent() {
    let provider = FakeServiceProvider::default();
    provider.orgs.add_account("222222222222", "logging@example.com");
    provider.orgs.add_account("555555555555", "tenant@example.com");

    let action = InitializeOrganizationalUnitsAction {
        services: &provider,
    };
    let params = json!({
        "ouName": "environment-usgw1",
        "coreAccounts": ["222222222222"],
        "tenantAccounts": ["555555555555", "999999999999"]
    });

    let outcome = run_job(&provider.codepipeline, &action, &job_event(params.clone(), None))
        .await
        .unwrap();
    assert_eq!(outcome, JobOutcome::succeeded());

    let calls = provider.orgs.calls();
    assert_eq!(
        calls,
        vec![
            "CreateOrganizationalUnit:r-root:environment-usgw1",
            "CreateOrganizationalUnit:ou-1:environment-usgw1-tenants",
            "MoveAccount:222222222222:r-root:ou-1",
            "MoveAccount:555555555555:r-root:ou-2",
        ]
    );

    // 第二次執行不再建立 OU
    run_job(&provider.codepipeline, &action, &job_event(params, None))
        .await
        .unwrap();
    assert_eq!(
        provider
            .orgs
            .calls()
            .iter()
            .filter(|call| call.starts_with("CreateOrganizationalUnit"))
            .count(),
        2
    );
}

fn source_archive() -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.add_directory("templates/", SimpleFileOptions::default())
        .unwrap();
    zip.start_file("templates/core.template.json", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"{\"Resources\":{}}").unwrap();
    zip.start_file("scripts/bootstrap.sh", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"#!/bin/sh").unwrap();
    zip.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_expand_s3_sources_replaces_prefix() {
    let provider = FakeServiceProvider::default();
    provider
        .s3
        .add_object("pipeline-artifacts", "source/abc.zip", &source_archive());
    provider
        .s3
        .add_object("framework-assets", "core/stale.json", b"{}");
    provider
        .s3
        .add_object("framework-assets", "core-extra/keep.json", b"{}");

    let action = ExpandS3SourcesAction {
        services: &provider,
    };
    let event = with_input_artifact(
        job_event(
            json!({
                "bucketName": "framework-assets",
                "repositoryName": "core",
                "branchName": "mainline",
                "kmsKeyId": "arn:aws-us-gov:kms:us-gov-west-1:111111111111:key/abc"
            }),
            None,
        ),
        "pipeline-artifacts",
        "source/abc.zip",
    );

    let outcome = run_job(&provider.codepipeline, &action, &event).await.unwrap();
    assert_eq!(outcome, JobOutcome::succeeded());

    assert_eq!(
        provider.s3.keys("framework-assets"),
        vec![
            "core-extra/keep.json",
            "core/scripts/bootstrap.sh",
            "core/templates/core.template.json",
        ]
    );

    let puts = provider.s3.puts();
    assert_eq!(puts.len(), 2);
    let template = puts
        .iter()
        .find(|put| put.key == "core/templates/core.template.json")
        .unwrap();
    assert_eq!(template.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        template.kms_key_id.as_deref(),
        Some("arn:aws-us-gov:kms:us-gov-west-1:111111111111:key/abc")
    );
}

#[tokio::test]
async fn test_expand_s3_sources_without_artifact_fails_job() {
    let provider = FakeServiceProvider::default();
    let action = ExpandS3SourcesAction {
        services: &provider,
    };
    let event = job_event(
        json!({"bucketName": "framework-assets", "repositoryName": "core", "kmsKeyId": "key"}),
        None,
    );

    let outcome = run_job(&provider.codepipeline, &action, &event).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_update_artifact_acl_rewrites_in_place() {
    let provider = FakeServiceProvider::default();
    provider
        .s3
        .add_object("pipeline-artifacts", "build/out.zip", b"artifact");

    let action = UpdateArtifactAclAction {
        services: &provider,
    };
    let event = with_input_artifact(
        job_event(json!({"kmsKeyId": "key-1"}), None),
        "pipeline-artifacts",
        "build/out.zip",
    );
    run_job(&provider.codepipeline, &action, &event).await.unwrap();

    let puts = provider.s3.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].key, "build/out.zip");
    assert_eq!(puts[0].body, b"artifact".to_vec());
    assert_eq!(puts[0].kms_key_id.as_deref(), Some("key-1"));
}

#[tokio::test]
async fn test_copy_repositories_mirrors_branch_head() {
    let provider = FakeServiceProvider::default();
    provider
        .codecommit
        .add_blob("core", "README.md", b"# core");
    provider
        .codecommit
        .add_blob("core", "templates/central.json", b"{}");
    provider
        .s3
        .add_object("framework-assets", "core/removed.json", b"{}");

    let action = CopyRepositoriesAction {
        services: &provider,
    };
    let event = job_event(
        json!({
            "bucketName": "framework-assets",
            "repositoryNames": ["core"],
            "branchName": "mainline",
            "kmsKeyId": "key-1"
        }),
        None,
    );
    let outcome = run_job(&provider.codepipeline, &action, &event).await.unwrap();
    assert_eq!(outcome, JobOutcome::succeeded());

    assert_eq!(
        provider.s3.keys("framework-assets"),
        vec!["core/README.md", "core/templates/central.json"]
    );
}

fn invite_params() -> Value {
    json!({"region": "us-gov-west-1", "accountIds": ["222222222222", "333333333333"]})
}

#[tokio::test]
async fn test_security_hub_invites_and_accepts() {
    let provider = FakeServiceProvider::default();
    {
        let mut hub = provider.securityhub.state.lock().unwrap();
        hub.members.push(SecurityHubMember {
            account_id: "222222222222".to_string(),
            master_id: Some("111111111111".to_string()),
            member_status: Some("Enabled".to_string()),
        });
        hub.invitations.push(SecurityHubInvitation {
            account_id: "111111111111".to_string(),
            invitation_id: "inv-1".to_string(),
        });
    }

    let settings = FrameworkSettings::default();
    let action = SecurityHubInviteMembersAction {
        services: &provider,
        settings: &settings,
    };
    let outcome = run_job(&provider.codepipeline, &action, &job_event(invite_params(), None))
        .await
        .unwrap();
    assert_eq!(outcome, JobOutcome::succeeded());

    assert_eq!(
        provider.securityhub.calls(),
        vec![
            "CreateMembers:333333333333",
            "InviteMembers:333333333333",
            "AcceptInvitation:111111111111:inv-1",
        ]
    );
    assert_eq!(
        provider.scopes_for("securityhub"),
        vec![
            Scope::region("us-gov-west-1"),
            Scope::account("333333333333", "us-gov-west-1").with_role("SecurityHubAccessRole"),
        ]
    );
}
