use compliant_framework::config::lambda::{HandlerKind, LambdaConfig};
use compliant_framework::config::settings::FrameworkSettings;
use compliant_framework::core::actions::{
    GetSsmParametersAction, InitializeOrganizationalUnitsAction, SecurityHubInviteMembersAction,
};
use compliant_framework::core::artifacts::{
    CopyRepositoriesAction, ExpandS3SourcesAction, UpdateArtifactAclAction,
};
use compliant_framework::core::custom_resource::{
    run_custom_resource, CreateGovCloudAccountHandler, CustomResourceEvent, CustomResourceHandler,
    ExecuteStateMachineHandler, GetOuHandler, HttpResponseSender, InviteGovCloudAccountHandler,
    MoveAccountHandler,
};
use compliant_framework::core::installer::{
    create_accounts, initialize_organization, invite_accounts, verify_govcloud_api_keys,
    CreateAccountsInput,
};
use compliant_framework::core::job::{run_job, CodePipelineEvent, PipelineAction};
use compliant_framework::core::stack::CreateUpdateStackAction;
use compliant_framework::core::stack_set::StackSetAction;
use compliant_framework::domain::ports::{Scope, ServiceProvider};
use compliant_framework::utils::error::{FrameworkError, Result};
use compliant_framework::utils::logger;
use compliant_framework::utils::validation::{validate_required_field, Validate};
use compliant_framework::AwsServiceProvider;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::{json, Value};

struct Runtime {
    config: LambdaConfig,
    settings: FrameworkSettings,
    services: AwsServiceProvider,
    sender: HttpResponseSender,
}

impl Runtime {
    fn pipeline_action(&self) -> Option<Box<dyn PipelineAction + '_>> {
        let services: &dyn ServiceProvider = &self.services;
        let settings = &self.settings;

        let action: Box<dyn PipelineAction + '_> = match self.config.handler {
            HandlerKind::CreateUpdateStack => Box::new(CreateUpdateStackAction { services, settings }),
            HandlerKind::StackSetAction => Box::new(StackSetAction { services }),
            HandlerKind::GetSsmParameters => Box::new(GetSsmParametersAction { services }),
            HandlerKind::CopyCodeCommitRepositoriesToS3 => Box::new(CopyRepositoriesAction { services }),
            HandlerKind::UpdateArtifactAcl => Box::new(UpdateArtifactAclAction { services }),
            HandlerKind::ExpandS3Sources => Box::new(ExpandS3SourcesAction { services }),
            HandlerKind::InitializeOrganizationalUnits => {
                Box::new(InitializeOrganizationalUnitsAction { services })
            }
            HandlerKind::SecurityHubInviteMembers => {
                Box::new(SecurityHubInviteMembersAction { services, settings })
            }
            _ => return None,
        };
        Some(action)
    }

    fn custom_resource_handler(&self) -> Result<Option<Box<dyn CustomResourceHandler + '_>>> {
        let services: &dyn ServiceProvider = &self.services;
        let settings = &self.settings;

        let handler: Box<dyn CustomResourceHandler + '_> = match self.config.handler {
            HandlerKind::AvmGetOu => Box::new(GetOuHandler { services, settings }),
            HandlerKind::AvmCreateGovCloudAccount => {
                Box::new(CreateGovCloudAccountHandler { services, settings })
            }
            HandlerKind::AvmInviteGovCloudAccount => {
                Box::new(InviteGovCloudAccountHandler { services, settings })
            }
            HandlerKind::AvmMoveAccount => Box::new(MoveAccountHandler { services, settings }),
            HandlerKind::ExecuteStateMachine => {
                let state_machine_arn =
                    validate_required_field("STATE_MACHINE_ARN", &self.config.state_machine_arn)?;
                Box::new(ExecuteStateMachineHandler {
                    services,
                    state_machine_arn,
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(handler))
    }

    async fn installer_task(&self, payload: Value) -> Result<()> {
        let services: &dyn ServiceProvider = &self.services;
        match self.config.handler {
            HandlerKind::VerifyGovCloudApiKeys => verify_govcloud_api_keys(services, &self.settings).await,
            HandlerKind::InitializeOrganization => {
                initialize_organization(services, &self.settings).await?;
                Ok(())
            }
            HandlerKind::CreateAccounts => {
                let input: CreateAccountsInput = serde_json::from_value(payload)
                    .map_err(|e| FrameworkError::invalid_event(format!("Invalid create-accounts input: {}", e)))?;
                create_accounts(services, &self.settings, &input).await
            }
            HandlerKind::InviteAccounts => invite_accounts(services, &self.settings).await,
            other => Err(FrameworkError::ConfigError {
                message: format!("{} is not an installer task", other),
            }),
        }
    }

    async fn handle(&self, event: LambdaEvent<Value>) -> Result<Value> {
        let (payload, context) = event.into_parts();
        tracing::info!(handler = %self.config.handler, request_id = %context.request_id, "Invocation");

        if let Some(action) = self.pipeline_action() {
            let event = CodePipelineEvent::from_value(payload)?;
            let codepipeline = self.services.codepipeline(&Scope::current()).await?;
            run_job(codepipeline.as_ref(), action.as_ref(), &event).await?;
            return Ok(json!({}));
        }

        if let Some(handler) = self.custom_resource_handler()? {
            let event = CustomResourceEvent::from_value(payload)?;
            let response = run_custom_resource(
                &self.sender,
                handler.as_ref(),
                &event,
                &context.env_config.log_stream,
            )
            .await?;
            return Ok(serde_json::to_value(response)?);
        }

        self.installer_task(payload).await?;
        Ok(json!({}))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Error> {
    logger::init_lambda_logger();

    // 讀取環境設定
    let config = LambdaConfig::from_env()?;
    config.validate()?;
    let settings = config.load_settings()?;

    let services = AwsServiceProvider::load_in_region(&config.region, settings.roles.clone()).await;
    tracing::info!(handler = %config.handler, partition = %config.partition(), "Lambda bootstrap ready");

    let runtime = Runtime {
        config,
        settings,
        services,
        sender: HttpResponseSender::new(),
    };
    let runtime = &runtime;

    run(service_fn(move |event: LambdaEvent<Value>| async move {
        runtime.handle(event).await.map_err(|e| {
            tracing::error!(error = %e, recovery = %e.recovery_suggestion(), "Invocation failed");
            Error::from(e)
        })
    }))
    .await
}
