//! The provisioning run: bucket, uploads, then the QuickSight data source, dataset, and
//! analysis. Every stage runs once, in order, and the first failure aborts the run.
//! Nothing created by earlier stages is rolled back.

use crate::aws::quicksight::{
    AnalysisRequest, Dashboards, DataSetRequest, DataSourceRequest, Permission,
    ANALYSIS_ACTIONS, DATA_SET_ACTIONS, DATA_SOURCE_ACTIONS,
};
use crate::aws::s3::{PublicAccessBlock, Storage};
use crate::config::{
    Config, ANALYSIS_DEFINITION_FILE, BUCKET_POLICY_FILE, DATA_SOURCE_PARAMETERS_FILE,
    LOGICAL_MAP_FILE, MANIFEST_FILE, PHYSICAL_MAP_FILE, STATS_FILE,
};
use crate::errors::Error;
use crate::ids::ResourceIds;
use crate::template::Template;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const MANIFEST_BUCKET_POINTER: &str = "/S3Parameters/ManifestFileLocation/Bucket";
pub const DATA_SOURCE_ARN_POINTER: &str = "/S3Source/DataSourceArn";
pub const ALIAS_POINTER: &str = "/Alias";
pub const PHYSICAL_TABLE_ID_POINTER: &str = "/Source/PhysicalTableId";
pub const DECLARATION_IDENTIFIER_POINTER: &str = "/DataSetIdentifierDeclarations/0/Identifier";
pub const DATA_SET_ARN_POINTER: &str = "/DataSetIdentifierDeclarations/0/DataSetArn";
pub const SHEET_ID_POINTER: &str = "/Sheets/0/SheetId";
pub const SHEET_NAME_POINTER: &str = "/Sheets/0/Name";
pub const CATEGORY_COLUMN_POINTER: &str = "/Sheets/0/Visuals/0/LineChartVisual/ChartConfiguration/FieldWells/LineChartAggregatedFieldWells/Category/0/CategoricalDimensionField/Column/DataSetIdentifier";

const SHEETS_POINTER: &str = "/Sheets";
const DATA_SET_IDENTIFIER_KEY: &str = "DataSetIdentifier";

/// What a completed run created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provisioned {
    pub bucket_name: String,
    pub data_source_id: String,
    pub data_set_id: String,
    pub data_set_name: String,
    pub analysis_id: String,
}

pub async fn create_bucket(
    storage: &dyn Storage,
    bucket_name: &str,
    region: Option<&str>,
) -> Result<(), Error> {
    info!(
        "Creating bucket {} in {}",
        bucket_name,
        region.unwrap_or("us-east-1")
    );

    storage
        .create_bucket(bucket_name.to_string(), region.map(str::to_string))
        .await
}

/// Turns off all four public-access block flags so the bucket policy can grant public reads.
pub async fn allow_public_access(storage: &dyn Storage, bucket_name: &str) -> Result<(), Error> {
    info!("Disabling public access block on bucket {}", bucket_name);

    storage
        .put_public_access_block(bucket_name.to_string(), PublicAccessBlock::disabled())
        .await
}

pub async fn configure_bucket_policy(
    storage: &dyn Storage,
    bucket_name: &str,
    policy_file: &Path,
) -> Result<Value, Error> {
    let contents = fs::read_to_string(policy_file)?;

    let policy: Value = serde_json::from_str(&contents)?;

    debug!("Bucket policy: {}", policy);

    storage
        .put_bucket_policy(bucket_name.to_string(), serde_json::to_string(&policy)?)
        .await?;

    Ok(policy)
}

pub async fn upload_file(
    storage: &dyn Storage,
    bucket_name: &str,
    path: &Path,
    key: &str,
) -> Result<(), Error> {
    info!("Uploading {} as {}", path.display(), key);

    storage
        .upload_file(bucket_name.to_string(), path.to_path_buf(), key.to_string())
        .await
}

/// Registers the bucket's manifest as a data source and returns `data_source_id`.
pub async fn create_data_source(
    dashboards: &dyn Dashboards,
    config: &Config,
    data_source_id: &str,
    bucket_name: &str,
    data_source_name: &str,
) -> Result<String, Error> {
    let mut parameters = Template::load(config.asset(DATA_SOURCE_PARAMETERS_FILE))?;

    parameters.set(MANIFEST_BUCKET_POINTER, bucket_name)?;

    info!("Creating data source {} ({})", data_source_name, data_source_id);

    dashboards
        .create_data_source(DataSourceRequest {
            account_id: config.aws_account_id.clone(),
            data_source_id: data_source_id.to_string(),
            name: data_source_name.to_string(),
            parameters: parameters.into_value(),
            permission: Permission::new(&config.principal_arn, &DATA_SOURCE_ACTIONS),
        })
        .await?;

    Ok(data_source_id.to_string())
}

/// Registers a SPICE dataset over the data source and returns its id and name.
pub async fn create_data_set(
    dashboards: &dyn Dashboards,
    config: &Config,
    data_set_id: &str,
    data_set_name: &str,
    physical_table_id: &str,
    logical_table_id: &str,
    data_source_id: &str,
) -> Result<(String, String), Error> {
    let mut physical_table = Template::load(config.asset(PHYSICAL_MAP_FILE))?;
    let mut logical_table = Template::load(config.asset(LOGICAL_MAP_FILE))?;

    let data_source_arn = physical_table.append(DATA_SOURCE_ARN_POINTER, data_source_id)?;

    logical_table.set(ALIAS_POINTER, data_set_name)?;
    logical_table.set(PHYSICAL_TABLE_ID_POINTER, physical_table_id)?;

    info!(
        "Creating dataset {} ({}) from {}",
        data_set_name, data_set_id, data_source_arn
    );

    dashboards
        .create_data_set(DataSetRequest {
            account_id: config.aws_account_id.clone(),
            data_set_id: data_set_id.to_string(),
            name: data_set_name.to_string(),
            physical_table_id: physical_table_id.to_string(),
            physical_table: physical_table.into_value(),
            logical_table_id: logical_table_id.to_string(),
            logical_table: logical_table.into_value(),
            permission: Permission::new(&config.principal_arn, &DATA_SET_ACTIONS),
        })
        .await?;

    Ok((data_set_id.to_string(), data_set_name.to_string()))
}

#[allow(clippy::too_many_arguments)]
pub async fn create_analysis(
    dashboards: &dyn Dashboards,
    config: &Config,
    analysis_id: &str,
    analysis_name: &str,
    sheet_id: &str,
    sheet_name: &str,
    data_set_name: &str,
    data_set_id: &str,
) -> Result<(), Error> {
    let mut definition = Template::load(config.asset(ANALYSIS_DEFINITION_FILE))?;

    definition.set(DECLARATION_IDENTIFIER_POINTER, data_set_name)?;
    definition.set(SHEET_ID_POINTER, sheet_id)?;
    definition.set(SHEET_NAME_POINTER, sheet_name)?;
    definition.set(CATEGORY_COLUMN_POINTER, data_set_name)?;
    definition.replace_key_under(SHEETS_POINTER, DATA_SET_IDENTIFIER_KEY, data_set_name)?;

    let data_set_arn = definition.append(DATA_SET_ARN_POINTER, data_set_id)?;

    info!(
        "Creating analysis {} ({}) over {}",
        analysis_name, analysis_id, data_set_arn
    );

    dashboards
        .create_analysis(AnalysisRequest {
            account_id: config.aws_account_id.clone(),
            analysis_id: analysis_id.to_string(),
            name: analysis_name.to_string(),
            theme_arn: config.theme_arn.clone(),
            definition: definition.into_value(),
            permission: Permission::new(&config.principal_arn, &ANALYSIS_ACTIONS),
        })
        .await
}

/// The uploaded manifest and, when public access is on, the bucket policy are sent as
/// written, so every bucket they name must be the configured one.
pub fn check_bucket_references(config: &Config) -> Result<(), Error> {
    let bucket_name = config.bucket_name.as_str();

    let manifest: Value = serde_json::from_str(&fs::read_to_string(config.asset(MANIFEST_FILE))?)?;

    let mut uris: Vec<&str> = Vec::new();
    for location in manifest["fileLocations"].as_array().into_iter().flatten() {
        for field in ["URIs", "URIPrefixes"] {
            uris.extend(
                location[field]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str),
            );
        }
    }

    if uris.is_empty() {
        return Err(Error::ConfigError(format!(
            "{} lists no file locations",
            MANIFEST_FILE
        )));
    }

    let object_prefix = format!("s3://{}/", bucket_name);
    if let Some(uri) = uris.iter().find(|uri| !uri.starts_with(&object_prefix)) {
        return Err(Error::ConfigError(format!(
            "{} points at {} which is outside bucket {}",
            MANIFEST_FILE, uri, bucket_name
        )));
    }

    if config.public_access {
        let policy: Value =
            serde_json::from_str(&fs::read_to_string(config.asset(BUCKET_POLICY_FILE))?)?;

        let bucket_arn = format!("arn:aws:s3:::{}", bucket_name);

        let statements: Vec<&Value> = match &policy["Statement"] {
            Value::Array(statements) => statements.iter().collect(),
            Value::Null => Vec::new(),
            statement => vec![statement],
        };

        for statement in statements {
            let resources: Vec<&str> = match &statement["Resource"] {
                Value::Array(resources) => resources.iter().filter_map(Value::as_str).collect(),
                Value::String(resource) => vec![resource.as_str()],
                _ => Vec::new(),
            };

            for resource in resources {
                let names_bucket = resource
                    .strip_prefix(&bucket_arn)
                    .map(|rest| rest.is_empty() || rest.starts_with('/'))
                    .unwrap_or(false);

                if !names_bucket {
                    return Err(Error::ConfigError(format!(
                        "{} grants {} which is outside bucket {}",
                        BUCKET_POLICY_FILE, resource, bucket_name
                    )));
                }
            }
        }
    }

    Ok(())
}

pub async fn run(
    storage: &dyn Storage,
    dashboards: &dyn Dashboards,
    config: &Config,
    ids: &ResourceIds,
) -> Result<Provisioned, Error> {
    let bucket_name = config.bucket_name.as_str();

    check_bucket_references(config)?;

    create_bucket(storage, bucket_name, config.bucket_region.as_deref()).await?;

    if config.public_access {
        allow_public_access(storage, bucket_name).await?;
        configure_bucket_policy(storage, bucket_name, &config.asset(BUCKET_POLICY_FILE)).await?;
    } else {
        warn!(
            "Public access disabled, skipping access block and policy for bucket {}",
            bucket_name
        );
    }

    upload_file(storage, bucket_name, &config.asset(STATS_FILE), STATS_FILE).await?;
    upload_file(storage, bucket_name, &config.asset(MANIFEST_FILE), MANIFEST_FILE).await?;

    let data_source_id = create_data_source(
        dashboards,
        config,
        &ids.data_source_id,
        bucket_name,
        &config.data_source_name,
    )
    .await?;

    let (data_set_id, data_set_name) = create_data_set(
        dashboards,
        config,
        &ids.data_set_id,
        &config.data_set_name,
        &ids.physical_table_id,
        &ids.logical_table_id,
        &data_source_id,
    )
    .await?;

    create_analysis(
        dashboards,
        config,
        &ids.analysis_id,
        &config.analysis_name,
        &ids.sheet_id,
        &config.sheet_name,
        &data_set_name,
        &data_set_id,
    )
    .await?;

    info!("Provisioned analysis {} in bucket {}", ids.analysis_id, bucket_name);

    Ok(Provisioned {
        bucket_name: bucket_name.to_string(),
        data_source_id,
        data_set_id,
        data_set_name,
        analysis_id: ids.analysis_id.clone(),
    })
}
