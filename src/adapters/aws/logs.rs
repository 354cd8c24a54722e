use super::error::{sdk_error, FieldText};
use crate::domain::ports::LogsApi;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Client;

const SERVICE: &str = "CloudWatchLogs";

pub struct LogsClient {
    client: Client,
}

impl LogsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogsApi for LogsClient {
    async fn describe_log_groups(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_log_groups()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "DescribeLogGroups", e))?;

            names.extend(
                output
                    .log_groups()
                    .iter()
                    .filter_map(|group| group.log_group_name().text()),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn delete_log_group(&self, log_group_name: &str) -> Result<()> {
        self.client
            .delete_log_group()
            .log_group_name(log_group_name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteLogGroup", e))?;
        Ok(())
    }
}
