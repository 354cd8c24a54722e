use super::error::{missing_field, sdk_error, FieldText};
use crate::domain::ports::SsmApi;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client;

const SERVICE: &str = "SSM";

pub struct SsmClient {
    client: Client,
}

impl SsmClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SsmApi for SsmClient {
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> Result<String> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetParameter", e))?;

        output
            .parameter()
            .and_then(|parameter| parameter.value().text())
            .ok_or_else(|| missing_field(SERVICE, "Parameter.Value"))
    }

    async fn put_parameter(&self, name: &str, value: &str) -> Result<()> {
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutParameter", e))?;
        Ok(())
    }

    async fn describe_parameters(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_parameters()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "DescribeParameters", e))?;

            names.extend(
                output
                    .parameters()
                    .iter()
                    .filter_map(|parameter| parameter.name().text()),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn delete_parameter(&self, name: &str) -> Result<()> {
        self.client
            .delete_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteParameter", e))?;
        Ok(())
    }
}
