pub mod definition;

use crate::errors::Error;
use async_trait::async_trait;
use aws_sdk_quicksight::types::{
    AnalysisDefinition, DataSetImportMode, DataSourceParameters, DataSourceType, LogicalTable,
    PhysicalTable, ResourcePermission,
};
use aws_sdk_quicksight::Client as QuickSightClient;
use definition::{
    decode, AnalysisDefinitionTemplate, DataSourceParametersTemplate, LogicalTableTemplate,
    PhysicalTableTemplate,
};
use mockall::automock;
use serde_json::Value;
use tracing::info;

pub const DATA_SOURCE_ACTIONS: [&str; 6] = [
    "quicksight:DescribeDataSource",
    "quicksight:DescribeDataSourcePermissions",
    "quicksight:PassDataSource",
    "quicksight:UpdateDataSource",
    "quicksight:UpdateDataSourcePermissions",
    "quicksight:DeleteDataSource",
];

pub const DATA_SET_ACTIONS: [&str; 18] = [
    "quicksight:DescribeDataSet",
    "quicksight:DescribeDataSetPermissions",
    "quicksight:PassDataSet",
    "quicksight:DeleteDataSet",
    "quicksight:UpdateDataSetPermissions",
    "quicksight:PutDataSetRefreshProperties",
    "quicksight:CreateRefreshSchedule",
    "quicksight:CancelIngestion",
    "quicksight:UpdateRefreshSchedule",
    "quicksight:DeleteRefreshSchedule",
    "quicksight:ListRefreshSchedules",
    "quicksight:DescribeDataSetRefreshProperties",
    "quicksight:CreateIngestion",
    "quicksight:DescribeRefreshSchedule",
    "quicksight:ListIngestions",
    "quicksight:UpdateDataSet",
    "quicksight:DeleteDataSetRefreshProperties",
    "quicksight:DescribeIngestion",
];

pub const ANALYSIS_ACTIONS: [&str; 7] = [
    "quicksight:DescribeAnalysis",
    "quicksight:DescribeAnalysisPermissions",
    "quicksight:QueryAnalysis",
    "quicksight:UpdateAnalysis",
    "quicksight:UpdateAnalysisPermissions",
    "quicksight:DeleteAnalysis",
    "quicksight:RestoreAnalysis",
];

/// Actions granted to one principal on a created resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permission {
    pub principal: String,
    pub actions: Vec<String>,
}

impl Permission {
    pub fn new(principal: &str, actions: &[&str]) -> Self {
        Permission {
            principal: principal.to_string(),
            actions: actions.iter().map(|action| action.to_string()).collect(),
        }
    }
}

impl TryFrom<Permission> for ResourcePermission {
    type Error = Error;

    fn try_from(permission: Permission) -> Result<Self, Error> {
        Ok(ResourcePermission::builder()
            .principal(permission.principal)
            .set_actions(Some(permission.actions))
            .build()?)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataSourceRequest {
    pub account_id: String,
    pub data_source_id: String,
    pub name: String,
    pub parameters: Value,
    pub permission: Permission,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataSetRequest {
    pub account_id: String,
    pub data_set_id: String,
    pub name: String,
    pub physical_table_id: String,
    pub physical_table: Value,
    pub logical_table_id: String,
    pub logical_table: Value,
    pub permission: Permission,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub account_id: String,
    pub analysis_id: String,
    pub name: String,
    pub theme_arn: String,
    pub definition: Value,
    pub permission: Permission,
}

#[automock]
#[async_trait]
pub trait Dashboards: Send + Sync {
    async fn create_data_source(&self, request: DataSourceRequest) -> Result<(), Error>;
    async fn create_data_set(&self, request: DataSetRequest) -> Result<(), Error>;
    async fn create_analysis(&self, request: AnalysisRequest) -> Result<(), Error>;
}

pub struct QuickSightDashboards {
    quicksight_client: QuickSightClient,
}

impl QuickSightDashboards {
    pub fn new(quicksight_client: QuickSightClient) -> Self {
        QuickSightDashboards { quicksight_client }
    }
}

#[async_trait]
impl Dashboards for QuickSightDashboards {
    async fn create_data_source(&self, request: DataSourceRequest) -> Result<(), Error> {
        let parameters: DataSourceParametersTemplate =
            decode("data source parameters", request.parameters)?;

        let output = self
            .quicksight_client
            .create_data_source()
            .aws_account_id(&request.account_id)
            .data_source_id(&request.data_source_id)
            .name(&request.name)
            .r#type(DataSourceType::S3)
            .data_source_parameters(DataSourceParameters::try_from(parameters)?)
            .permissions(ResourcePermission::try_from(request.permission)?)
            .send()
            .await
            .map_err(aws_sdk_quicksight::Error::from)?;

        info!(
            "Created data source {} with arn {}",
            request.data_source_id,
            output.arn().unwrap_or_default()
        );

        Ok(())
    }

    async fn create_data_set(&self, request: DataSetRequest) -> Result<(), Error> {
        let physical_table: PhysicalTableTemplate =
            decode("physical table map", request.physical_table)?;

        let logical_table: LogicalTableTemplate =
            decode("logical table map", request.logical_table)?;

        // LogicalTableMap is superseded by DataPrepConfiguration, which the templates do not use.
        #[allow(deprecated)]
        let output = self
            .quicksight_client
            .create_data_set()
            .aws_account_id(&request.account_id)
            .data_set_id(&request.data_set_id)
            .name(&request.name)
            .physical_table_map(
                &request.physical_table_id,
                PhysicalTable::try_from(physical_table)?,
            )
            .logical_table_map(
                &request.logical_table_id,
                LogicalTable::try_from(logical_table)?,
            )
            .import_mode(DataSetImportMode::Spice)
            .permissions(ResourcePermission::try_from(request.permission)?)
            .send()
            .await
            .map_err(aws_sdk_quicksight::Error::from)?;

        info!(
            "Created dataset {} with arn {}",
            request.data_set_id,
            output.arn().unwrap_or_default()
        );

        Ok(())
    }

    async fn create_analysis(&self, request: AnalysisRequest) -> Result<(), Error> {
        let definition: AnalysisDefinitionTemplate =
            decode("analysis definition", request.definition)?;

        let output = self
            .quicksight_client
            .create_analysis()
            .aws_account_id(&request.account_id)
            .analysis_id(&request.analysis_id)
            .name(&request.name)
            .theme_arn(&request.theme_arn)
            .definition(AnalysisDefinition::try_from(definition)?)
            .permissions(ResourcePermission::try_from(request.permission)?)
            .send()
            .await
            .map_err(aws_sdk_quicksight::Error::from)?;

        info!(
            "Created analysis {} with arn {}",
            request.analysis_id,
            output.arn().unwrap_or_default()
        );

        Ok(())
    }
}
