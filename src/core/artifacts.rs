//! Pipeline actions that move source artifacts into the assets bucket.

use crate::core::job::{Job, PipelineAction};
use crate::domain::model::{JobOutcome, PutObject};
use crate::domain::ports::{CodeCommitApi, S3Api, Scope, ServiceProvider};
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Guess the `Content-Type` S3 should serve a file with. S3 does not sniff
/// content types, so objects without a known extension get none.
pub fn content_type_for(path: &str) -> Option<String> {
    let extension = Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())?
        .to_ascii_lowercase();

    let content_type = match extension.as_str() {
        "json" => mime::APPLICATION_JSON.to_string(),
        "js" => mime::APPLICATION_JAVASCRIPT.to_string(),
        "html" | "htm" => mime::TEXT_HTML.to_string(),
        "css" => mime::TEXT_CSS.to_string(),
        "txt" => mime::TEXT_PLAIN.to_string(),
        "csv" => mime::TEXT_CSV.to_string(),
        "xml" => mime::TEXT_XML.to_string(),
        "png" => mime::IMAGE_PNG.to_string(),
        "jpg" | "jpeg" => mime::IMAGE_JPEG.to_string(),
        "gif" => mime::IMAGE_GIF.to_string(),
        "svg" => mime::IMAGE_SVG.to_string(),
        "pdf" => mime::APPLICATION_PDF.to_string(),
        "zip" => "application/zip".to_string(),
        "yaml" | "yml" => "application/x-yaml".to_string(),
        "py" => "text/x-python".to_string(),
        "sh" => "application/x-sh".to_string(),
        _ => return None,
    };
    Some(content_type)
}

/// Every non-empty file entry of a zip archive, in archive order.
pub fn unzip_entries(archive_bytes: Vec<u8>) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(archive_bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        if content.is_empty() {
            continue;
        }
        entries.push((file.name().to_string(), content));
    }

    Ok(entries)
}

fn encrypted_object(bucket: &str, key: String, body: Vec<u8>, kms_key_id: &str) -> PutObject {
    PutObject {
        bucket: bucket.to_string(),
        content_type: content_type_for(&key),
        key,
        body,
        kms_key_id: Some(kms_key_id.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRepositoriesParams {
    pub bucket_name: String,
    pub repository_names: Vec<String>,
    pub branch_name: String,
    pub kms_key_id: String,
}

/// Mirror the head of `branch_name` of each repository into
/// `{bucket}/{repository}/...`. Returns the number of objects written.
pub async fn copy_repositories_to_s3(
    codecommit: &dyn CodeCommitApi,
    s3: &dyn S3Api,
    params: &CopyRepositoriesParams,
) -> Result<usize> {
    let mut copied = 0;

    for repository_name in &params.repository_names {
        let removed = s3
            .delete_objects_with_prefix(&params.bucket_name, repository_name)
            .await?;
        tracing::info!(repository = %repository_name, removed, "Cleared repository prefix");

        let blobs = codecommit
            .get_differences(repository_name, &params.branch_name)
            .await?;
        tracing::info!(repository = %repository_name, blobs = blobs.len(), "Copying repository to S3");

        for blob in blobs {
            let content = codecommit.get_blob(repository_name, &blob.blob_id).await?;
            let key = format!("{}/{}", repository_name, blob.path);
            s3.put_object(encrypted_object(
                &params.bucket_name,
                key,
                content,
                &params.kms_key_id,
            ))
            .await?;
            copied += 1;
        }
    }

    Ok(copied)
}

pub struct CopyRepositoriesAction<'a> {
    pub services: &'a dyn ServiceProvider,
}

#[async_trait]
impl PipelineAction for CopyRepositoriesAction<'_> {
    fn name(&self) -> &'static str {
        "copy-codecommit-repositories-to-s3"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: CopyRepositoriesParams = job.user_parameters()?;
        let scope = Scope::current();
        let codecommit = self.services.codecommit(&scope).await?;
        let s3 = self.services.s3(&scope).await?;

        let copied = copy_repositories_to_s3(codecommit.as_ref(), s3.as_ref(), &params).await?;
        tracing::info!(copied, bucket = %params.bucket_name, "Repositories copied");
        Ok(JobOutcome::succeeded())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsParams {
    pub kms_key_id: String,
}

/// Re-write every input artifact in place so the object is owned by this
/// account and encrypted with `kmsKeyId`.
pub struct UpdateArtifactAclAction<'a> {
    pub services: &'a dyn ServiceProvider,
}

#[async_trait]
impl PipelineAction for UpdateArtifactAclAction<'_> {
    fn name(&self) -> &'static str {
        "update-artifact-acl"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: KmsParams = job.user_parameters()?;
        let s3 = self.services.s3(&Scope::current()).await?;

        for artifact in &job.data.input_artifacts {
            let location = &artifact.location.s3_location;
            tracing::info!(bucket = %location.bucket_name, key = %location.object_key, "Re-writing artifact");

            let body = s3
                .get_object(&location.bucket_name, &location.object_key)
                .await?;
            s3.put_object(PutObject {
                bucket: location.bucket_name.clone(),
                key: location.object_key.clone(),
                body,
                content_type: None,
                kms_key_id: Some(params.kms_key_id.clone()),
            })
            .await?;
        }

        Ok(JobOutcome::succeeded())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandSourcesParams {
    pub bucket_name: String,
    pub repository_name: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub kms_key_id: String,
}

/// Unzip the first input artifact into `{bucketName}/{repositoryName}/...`.
pub struct ExpandS3SourcesAction<'a> {
    pub services: &'a dyn ServiceProvider,
}

#[async_trait]
impl PipelineAction for ExpandS3SourcesAction<'_> {
    fn name(&self) -> &'static str {
        "expand-s3-sources"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: ExpandSourcesParams = job.user_parameters()?;
        let artifact = job
            .data
            .input_artifacts
            .first()
            .ok_or_else(|| FrameworkError::invalid_event("Job has no input artifacts"))?;
        let location = &artifact.location.s3_location;

        let s3 = self.services.s3(&Scope::current()).await?;
        let prefix = format!("{}/", params.repository_name);
        s3.delete_objects_with_prefix(&params.bucket_name, &prefix)
            .await?;

        let archive = s3
            .get_object(&location.bucket_name, &location.object_key)
            .await?;
        // 解壓縮後逐一上傳
        let entries = unzip_entries(archive)?;
        tracing::info!(repository = %params.repository_name, branch = ?params.branch_name, files = entries.len(), "Expanding source archive");

        for (path, content) in entries {
            let key = format!("{}{}", prefix, path);
            s3.put_object(encrypted_object(
                &params.bucket_name,
                key,
                content,
                &params.kms_key_id,
            ))
            .await?;
        }

        Ok(JobOutcome::succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    #[test]
    fn test_content_type_guess() {
        assert_eq!(
            content_type_for("templates/core.template.json").as_deref(),
            Some("application/json")
        );
        assert_eq!(content_type_for("README.TXT").as_deref(), Some("text/plain"));
        assert_eq!(content_type_for("scripts/bootstrap.sh").as_deref(), Some("application/x-sh"));
        assert_eq!(content_type_for("Makefile"), None);
        assert_eq!(content_type_for("archive.unknownext"), None);
    }

    #[test]
    fn test_unzip_skips_directories_and_empty_files() {
        let archive = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            zip.add_directory::<_, ()>("templates/", FileOptions::default())
                .unwrap();
            zip.start_file::<_, ()>("templates/core.json", FileOptions::default())
                .unwrap();
            zip.write_all(b"{\"Resources\":{}}").unwrap();
            zip.start_file::<_, ()>("empty.txt", FileOptions::default())
                .unwrap();
            zip.finish().unwrap().into_inner()
        };

        let entries = unzip_entries(archive).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "templates/core.json");
        assert_eq!(entries[0].1, b"{\"Resources\":{}}".to_vec());
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let err = unzip_entries(b"not a zip".to_vec()).unwrap_err();
        assert!(matches!(err, FrameworkError::ZipError(_)));
    }
}
