//! The framework configuration document written by `create-config`.

use crate::config::settings::FrameworkSettings;
use crate::domain::model::{Partition, StackDescription};
use crate::domain::ports::{Scope, ServiceProvider};
use crate::utils::error::{FrameworkError, Result};
use serde_json::{json, Map, Value};

const TRANSIT_PARAMETERS: &[(&str, &str)] = &[
    ("/compliant/framework/transit/transit-gateway/amazon-side-asn", "transitGatewayAmazonSideAsn"),
    ("/compliant/framework/transit/firewall-vpc/virtual-firewall/a/asn", "firewallAAsn"),
    ("/compliant/framework/transit/firewall-vpc/virtual-firewall/b/asn", "firewallBAsn"),
    ("/compliant/framework/transit/firewall-vpc/cidr", "firewallVpcCidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/nipr-cidr", "firewallVpcNiprCidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/instance-tenancy", "firewallVpcInstanceTenancy"),
    ("/compliant/framework/transit/firewall-vpc/external-subnet/a/cidr", "firewallVpcExternalSubnetACidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/external-subnet/b/cidr", "firewallVpcExternalSubnetBCidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/internal-subnet/a/cidr", "firewallVpcInternalSubnetACidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/internal-subnet/b/cidr", "firewallVpcInternalSubnetBCidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/management-subnet/a/cidr", "firewallVpcManagementSubnetACidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/management-subnet/b/cidr", "firewallVpcManagementSubnetBCidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/tgw-attach-subnet/a/cidr", "firewallVpcTransitGatewayAttachmentSubnetACidrBlock"),
    ("/compliant/framework/transit/firewall-vpc/tgw-attach-subnet/b/cidr", "firewallVpcTransitGatewayAttachmentSubnetBCidrBlock"),
];

const MANAGEMENT_SERVICES_PARAMETERS: &[(&str, &str)] = &[
    ("/compliant/framework/management-services/management-services-vpc/cidr", "managementServicesVpcCidrBlock"),
    ("/compliant/framework/management-services/management-services-vpc/instance-tenancy", "managementServicesVpcInstanceTenancy"),
    ("/compliant/framework/management-services/management-services-vpc/application-subnet/a/cidr", "managementServicesVpcApplicationSubnetACidrBlock"),
    ("/compliant/framework/management-services/management-services-vpc/application-subnet/b/cidr", "managementServicesVpcApplicationSubnetBCidrBlock"),
    ("/compliant/framework/management-services/management-services-vpc/data-subnet/a/cidr", "managementServicesVpcDataSubnetACidrBlock"),
    ("/compliant/framework/management-services/management-services-vpc/data-subnet/b/cidr", "managementServicesVpcDataSubnetBCidrBlock"),
    ("/compliant/framework/management-services/management-services-vpc/tgw-attach-subnet/a/cidr", "managementServicesVpcTransitGatewayAttachmentSubnetACidrBlock"),
    ("/compliant/framework/management-services/management-services-vpc/tgw-attach-subnet/b/cidr", "managementServicesVpcTransitGatewayAttachmentSubnetBCidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/cidr", "externalAccessVpcCidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/instance-tenancy", "externalAccessVpcInstanceTenancy"),
    ("/compliant/framework/management-services/external-access-vpc/public-subnet/a/cidr", "externalAccessVpcPublicSubnetACidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/public-subnet/b/cidr", "externalAccessVpcPublicSubnetBCidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/application-subnet/a/cidr", "externalAccessVpcApplicationSubnetACidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/application-subnet/b/cidr", "externalAccessVpcApplicationSubnetBCidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/tgw-attach-subnet/a/cidr", "externalAccessVpcTransitGatewayAttachmentSubnetACidrBlock"),
    ("/compliant/framework/management-services/external-access-vpc/tgw-attach-subnet/b/cidr", "externalAccessVpcTransitGatewayAttachmentSubnetBCidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/cidr", "directoryVpcCidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/instance-tenancy", "directoryVpcInstanceTenancy"),
    ("/compliant/framework/management-services/directory-vpc/application-subnet/a/cidr", "directoryVpcApplicationSubnetACidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/application-subnet/b/cidr", "directoryVpcApplicationSubnetBCidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/data-subnet/a/cidr", "directoryVpcDataSubnetACidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/data-subnet/b/cidr", "directoryVpcDataSubnetBCidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/tgw-attach-subnet/a/cidr", "directoryVpcTransitGatewayAttachmentSubnetACidrBlock"),
    ("/compliant/framework/management-services/directory-vpc/tgw-attach-subnet/b/cidr", "directoryVpcTransitGatewayAttachmentSubnetBCidrBlock"),
];

/// Account ids and organization the document points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAccounts {
    pub central_account_id: String,
    pub logging_account_id: String,
    pub transit_account_id: String,
    pub management_services_account_id: String,
    pub organization_id: String,
}

fn stack_parameter(stack: &StackDescription, key: &str) -> Result<String> {
    stack
        .parameter(key)
        .map(str::to_string)
        .ok_or_else(|| FrameworkError::not_found("StackParameter", key))
}

fn ssm_parameter_map(stack: &StackDescription, table: &[(&str, &str)]) -> Result<Map<String, Value>> {
    table
        .iter()
        .map(|(path, key)| Ok((path.to_string(), Value::String(stack_parameter(stack, key)?))))
        .collect()
}

/// Build the configuration document from the installer stack's parameters.
pub fn build_framework_config(
    stack: &StackDescription,
    accounts: &ConfigAccounts,
    settings: &FrameworkSettings,
) -> Result<Value> {
    let region = settings.regions.primary.as_str();
    let partition = Partition::from_region(region);

    let mut transit_parameters = ssm_parameter_map(stack, TRANSIT_PARAMETERS)?;
    transit_parameters.insert(
        "/compliant/framework/transit/firewall-vpc/igw/enabled".to_string(),
        Value::Bool(true),
    );
    transit_parameters.insert(
        "/compliant/framework/transit/firewall-vpc/tgw/attached".to_string(),
        Value::Bool(true),
    );
    let management_parameters = ssm_parameter_map(stack, MANAGEMENT_SERVICES_PARAMETERS)?;

    Ok(json!({
        "partition": partition.as_str(),
        "region": region,
        "complianceSet": "tbd",
        "core": {
            "notificationsEmail": stack_parameter(stack, "frameworkNotificationEmail")?,
            "primaryRegion": region
        },
        "deployToRegions": [region],
        "environments": ["default"],
        "stackSets": {
            "security-baseline": {
                "parameters": {
                    "pNotificationsEmail": stack_parameter(stack, "environmentNotificationEmail")?
                }
            },
            "backup-services": {
                "parameters": {}
            }
        },
        "federation": {
            "enabled": false
        },
        "central": {
            "accountId": accounts.central_account_id,
            "organizationId": accounts.organization_id,
            "ssmParameters": {
                "/compliant/framework/logging/account/id": accounts.logging_account_id,
                "/compliant/framework/central/service-catalog/provider-name": "Central Services",
                "/compliant/framework/central/service-catalog/access-role-name": settings.roles.account_access
            }
        },
        "logging": {
            "accountId": accounts.logging_account_id
        },
        "transit": {
            region: {
                "environments": {
                    "default": {"accountId": accounts.transit_account_id}
                },
                "enableVpcFirewall": false,
                "enableVirtualFirewall": true,
                "ssmParameters": transit_parameters
            }
        },
        "managementServices": {
            region: {
                "environments": {
                    "default": {"accountId": accounts.management_services_account_id}
                },
                "enableDirectoryVpc": true,
                "enableExternalAccessVpc": true,
                "ssmParameters": management_parameters
            }
        },
        "plugins": {}
    }))
}

/// Credentials and region of the GovCloud organization's management account.
#[derive(Debug, Clone)]
pub struct GovCloudCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
}

/// Gather everything `build_framework_config` needs from AWS.
pub async fn create_config(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
    stack_name: &str,
    govcloud: &GovCloudCredentials,
) -> Result<Value> {
    let govcloud_services = services
        .with_access_keys(
            &govcloud.access_key_id,
            &govcloud.secret_access_key,
            &govcloud.region,
        )
        .await?;
    let organization_id = govcloud_services
        .organizations(&Scope::region(&govcloud.region))
        .await?
        .describe_organization()
        .await?
        .map(|organization| organization.id)
        .ok_or_else(|| FrameworkError::not_found("Organization", &govcloud.region))?;

    let scope = Scope::current();
    let stack = services
        .cloudformation(&scope)
        .await?
        .describe_stacks(stack_name)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| FrameworkError::not_found("Stack", stack_name))?;

    let ssm = services.ssm(&scope).await?;
    let govcloud_partition = Partition::GovCloud.as_str();
    let accounts = ConfigAccounts {
        central_account_id: ssm
            .get_parameter(&settings.ssm.govcloud_central_account_id, false)
            .await?,
        logging_account_id: ssm
            .get_parameter(&settings.ssm.account_id("core", "logging", govcloud_partition), false)
            .await?,
        transit_account_id: ssm
            .get_parameter(&settings.ssm.account_id("prod", "transit", govcloud_partition), false)
            .await?,
        management_services_account_id: ssm
            .get_parameter(
                &settings
                    .ssm
                    .account_id("prod", "management-services", govcloud_partition),
                false,
            )
            .await?,
        organization_id,
    };

    build_framework_config(&stack, &accounts, settings)
}
