use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_quicksight::Client as QuickSightClient;
use aws_sdk_s3::Client as S3Client;
use fantasy_analyzer::aws::quicksight::QuickSightDashboards;
use fantasy_analyzer::aws::s3::S3Storage;
use fantasy_analyzer::config::Config;
use fantasy_analyzer::ids::ResourceIds;
use fantasy_analyzer::logger::init_tracing;
use fantasy_analyzer::pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load().context("loading configuration")?;

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;

    // Buckets outside us-east-1 must be created through their regional endpoint.
    let s3_client = match &config.bucket_region {
        Some(region) => {
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .region(Region::new(region.clone()))
                .build();
            S3Client::from_conf(s3_config)
        }
        None => S3Client::new(&sdk_config),
    };

    let storage = S3Storage::new(s3_client);
    let dashboards = QuickSightDashboards::new(QuickSightClient::new(&sdk_config));

    let ids = ResourceIds::generate();

    tracing::info!("Generated resource ids {:?}", ids);

    let provisioned = pipeline::run(&storage, &dashboards, &config, &ids)
        .await
        .context("provisioning fantasy analyzer resources")?;

    tracing::info!(
        "Created data source {}, dataset {} ({}), analysis {} in bucket {}",
        provisioned.data_source_id,
        provisioned.data_set_id,
        provisioned.data_set_name,
        provisioned.analysis_id,
        provisioned.bucket_name
    );

    Ok(())
}
