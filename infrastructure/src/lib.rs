//! Provision an S3 bucket with fantasy football stats and publish them to QuickSight
//! as a data source, a dataset, and a line-chart analysis.

pub mod aws;
pub mod config;
pub mod errors;
pub mod ids;
pub mod logger;
pub mod pipeline;
pub mod template;
