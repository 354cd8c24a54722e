use super::error::{build_error, missing_field, sdk_error, FieldBytes, FieldText};
use crate::domain::model::{BlobRef, InitialCommit};
use crate::domain::ports::CodeCommitApi;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_codecommit::primitives::Blob;
use aws_sdk_codecommit::types::{FileModeTypeEnum, PutFileEntry};
use aws_sdk_codecommit::Client;

const SERVICE: &str = "CodeCommit";

pub struct CodeCommitClient {
    client: Client,
}

impl CodeCommitClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CodeCommitApi for CodeCommitClient {
    async fn list_repositories(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_repositories()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListRepositories", e))?;

            names.extend(
                output
                    .repositories()
                    .iter()
                    .filter_map(|repository| repository.repository_name().text()),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn create_repository(&self, repository_name: &str) -> Result<()> {
        self.client
            .create_repository()
            .repository_name(repository_name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateRepository", e))?;
        Ok(())
    }

    async fn create_commit(&self, commit: &InitialCommit) -> Result<String> {
        let files = commit
            .files
            .iter()
            .map(|file| {
                PutFileEntry::builder()
                    .file_path(&file.path)
                    .file_mode(FileModeTypeEnum::Normal)
                    .file_content(Blob::new(file.content.clone()))
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| build_error(SERVICE, e))?;

        let output = self
            .client
            .create_commit()
            .repository_name(&commit.repository_name)
            .branch_name(&commit.branch_name)
            .author_name(&commit.author_name)
            .email(&commit.email)
            .commit_message(&commit.message)
            .set_put_files(Some(files))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateCommit", e))?;

        output
            .commit_id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "CommitId"))
    }

    async fn create_branch(
        &self,
        repository_name: &str,
        branch_name: &str,
        commit_id: &str,
    ) -> Result<()> {
        self.client
            .create_branch()
            .repository_name(repository_name)
            .branch_name(branch_name)
            .commit_id(commit_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateBranch", e))?;
        Ok(())
    }

    async fn get_differences(
        &self,
        repository_name: &str,
        after_commit_specifier: &str,
    ) -> Result<Vec<BlobRef>> {
        let mut blobs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .get_differences()
                .repository_name(repository_name)
                .after_commit_specifier(after_commit_specifier)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "GetDifferences", e))?;

            blobs.extend(output.differences().iter().filter_map(|difference| {
                let blob = difference.after_blob()?;
                Some(BlobRef {
                    path: blob.path().text()?,
                    blob_id: blob.blob_id().text()?,
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(blobs)
    }

    async fn get_blob(&self, repository_name: &str, blob_id: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_blob()
            .repository_name(repository_name)
            .blob_id(blob_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetBlob", e))?;

        output
            .content()
            .bytes()
            .ok_or_else(|| missing_field(SERVICE, "Content"))
    }
}
