use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_VARIABLE: &str = "FANTASY_ANALYZER_CONFIG";

pub const DATA_SOURCE_PARAMETERS_FILE: &str = "datasource-params.json";
pub const PHYSICAL_MAP_FILE: &str = "dataset-physical-map.json";
pub const LOGICAL_MAP_FILE: &str = "dataset-logical-map.json";
pub const ANALYSIS_DEFINITION_FILE: &str = "analysis-definition.json";
pub const BUCKET_POLICY_FILE: &str = "public-read.json";
pub const STATS_FILE: &str = "FantasyFootball-PPR-stats.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub aws_account_id: String,
    pub principal_arn: String,
    pub bucket_name: String,
    /// `None` creates the bucket in us-east-1.
    pub bucket_region: Option<String>,
    pub public_access: bool,
    pub assets_directory: PathBuf,
    pub data_source_name: String,
    pub data_set_name: String,
    pub analysis_name: String,
    pub sheet_name: String,
    pub theme_arn: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws_account_id: String::new(),
            principal_arn: String::new(),
            bucket_name: "fantasy-analyzer".to_string(),
            bucket_region: None,
            public_access: true,
            assets_directory: PathBuf::from("."),
            data_source_name: "fantasy-ds".to_string(),
            data_set_name: "fantasy-ds".to_string(),
            analysis_name: "fantasy-analysis".to_string(),
            sheet_name: "2022-Fantasy-Stats".to_string(),
            theme_arn: "arn:aws:quicksight::aws:theme/CLASSIC".to_string(),
        }
    }
}

impl Config {
    /// Read the configuration file named by `FANTASY_ANALYZER_CONFIG`, or the environment.
    pub fn load() -> Result<Self, Error> {
        match std::env::var(CONFIG_FILE_VARIABLE) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let public_access = match std::env::var("S3_PUBLIC_ACCESS") {
            Ok(value) => value.parse::<bool>().map_err(|e| {
                Error::ConfigError(format!("S3_PUBLIC_ACCESS must be true or false: {}", e))
            })?,
            Err(_) => defaults.public_access,
        };

        let config = Self {
            aws_account_id: required_env("AWS_ACCOUNT_ID")?,
            principal_arn: required_env("QUICKSIGHT_PRINCIPAL_ARN")?,
            bucket_name: std::env::var("S3_BUCKET_NAME").unwrap_or(defaults.bucket_name),
            bucket_region: std::env::var("S3_BUCKET_REGION").ok(),
            public_access,
            assets_directory: std::env::var("ASSETS_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_directory),
            theme_arn: std::env::var("QUICKSIGHT_THEME_ARN").unwrap_or(defaults.theme_arn),
            ..defaults
        };

        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;

        let config: Self = serde_json::from_str(&contents)?;

        config.validate()?;

        Ok(config)
    }

    pub fn asset(&self, name: &str) -> PathBuf {
        self.assets_directory.join(name)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.aws_account_id.is_empty() {
            return Err(Error::ConfigError("aws_account_id must be set".to_string()));
        }
        if self.principal_arn.is_empty() {
            return Err(Error::ConfigError("principal_arn must be set".to_string()));
        }
        if self.bucket_name.is_empty() {
            return Err(Error::ConfigError("bucket_name must be set".to_string()));
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String, Error> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::ConfigError(format!("{} must be set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::NamedTempFile;

    const VARIABLES: [&str; 8] = [
        CONFIG_FILE_VARIABLE,
        "AWS_ACCOUNT_ID",
        "QUICKSIGHT_PRINCIPAL_ARN",
        "S3_BUCKET_NAME",
        "S3_BUCKET_REGION",
        "S3_PUBLIC_ACCESS",
        "ASSETS_DIRECTORY",
        "QUICKSIGHT_THEME_ARN",
    ];

    static ENVIRONMENT: Mutex<()> = Mutex::new(());

    /// Serializes tests that touch process environment and starts each from a clean slate.
    fn environment(variables: &[(&str, &str)]) -> MutexGuard<'static, ()> {
        let guard = ENVIRONMENT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        for name in VARIABLES {
            std::env::remove_var(name);
        }
        for (name, value) in variables {
            std::env::set_var(name, value);
        }

        guard
    }

    const ACCOUNT: (&str, &str) = ("AWS_ACCOUNT_ID", "123456789012");
    const PRINCIPAL: (&str, &str) = (
        "QUICKSIGHT_PRINCIPAL_ARN",
        "arn:aws:quicksight:us-east-1:123456789012:user/default/analyst",
    );

    #[test]
    fn test_from_env_defaults_optional_variables() {
        let _guard = environment(&[ACCOUNT, PRINCIPAL]);

        let config = Config::from_env().unwrap();

        assert_eq!(config.aws_account_id, "123456789012");
        assert_eq!(config.bucket_name, "fantasy-analyzer");
        assert_eq!(config.bucket_region, None);
        assert!(config.public_access);
        assert_eq!(config.assets_directory, PathBuf::from("."));
        assert_eq!(config.theme_arn, "arn:aws:quicksight::aws:theme/CLASSIC");
    }

    #[test]
    fn test_from_env_reads_optional_variables() {
        let _guard = environment(&[
            ACCOUNT,
            PRINCIPAL,
            ("S3_BUCKET_NAME", "fantasy-bucket"),
            ("S3_BUCKET_REGION", "eu-west-1"),
            ("S3_PUBLIC_ACCESS", "false"),
            ("ASSETS_DIRECTORY", "/srv/assets"),
        ]);

        let config = Config::from_env().unwrap();

        assert_eq!(config.bucket_name, "fantasy-bucket");
        assert_eq!(config.bucket_region.as_deref(), Some("eu-west-1"));
        assert!(!config.public_access);
        assert_eq!(config.assets_directory, PathBuf::from("/srv/assets"));
    }

    #[test]
    fn test_from_env_requires_account() {
        let _guard = environment(&[PRINCIPAL]);

        match Config::from_env() {
            Err(Error::ConfigError(message)) => assert!(message.contains("AWS_ACCOUNT_ID")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_env_requires_principal() {
        let _guard = environment(&[ACCOUNT]);

        match Config::from_env() {
            Err(Error::ConfigError(message)) => {
                assert!(message.contains("QUICKSIGHT_PRINCIPAL_ARN"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_env_rejects_invalid_public_access() {
        let _guard = environment(&[ACCOUNT, PRINCIPAL, ("S3_PUBLIC_ACCESS", "yes")]);

        assert!(matches!(Config::from_env(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_from_env_rejects_empty_bucket_name() {
        let _guard = environment(&[ACCOUNT, PRINCIPAL, ("S3_BUCKET_NAME", "")]);

        match Config::from_env() {
            Err(Error::ConfigError(message)) => assert!(message.contains("bucket_name")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_prefers_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "aws_account_id": "210987654321",
                "principal_arn": "arn:aws:iam::210987654321:root",
                "bucket_name": "file-bucket"
            }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let _guard = environment(&[
            (CONFIG_FILE_VARIABLE, path.as_str()),
            ACCOUNT,
            ("S3_BUCKET_NAME", "env-bucket"),
        ]);

        let config = Config::load().unwrap();

        assert_eq!(config.aws_account_id, "210987654321");
        assert_eq!(config.bucket_name, "file-bucket");
    }

    #[test]
    fn test_load_falls_back_to_environment() {
        let _guard = environment(&[ACCOUNT, PRINCIPAL, ("S3_BUCKET_NAME", "env-bucket")]);

        let config = Config::load().unwrap();

        assert_eq!(config.bucket_name, "env-bucket");
    }

    #[test]
    fn test_default_names() {
        let config = Config::default();

        assert_eq!(config.data_source_name, "fantasy-ds");
        assert_eq!(config.data_set_name, "fantasy-ds");
        assert_eq!(config.analysis_name, "fantasy-analysis");
        assert_eq!(config.sheet_name, "2022-Fantasy-Stats");
        assert_eq!(config.theme_arn, "arn:aws:quicksight::aws:theme/CLASSIC");
        assert!(config.bucket_region.is_none());
        assert!(config.public_access);
    }

    #[test]
    fn test_asset_joins_directory() {
        let config = Config {
            assets_directory: PathBuf::from("/srv/assets"),
            ..Config::default()
        };

        assert_eq!(
            config.asset(MANIFEST_FILE),
            PathBuf::from("/srv/assets/manifest.json")
        );
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "aws_account_id": "123456789012",
                "principal_arn": "arn:aws:quicksight:us-east-1:123456789012:user/default/analyst",
                "bucket_name": "fantasy-bucket",
                "bucket_region": "eu-west-1"
            }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.aws_account_id, "123456789012");
        assert_eq!(config.bucket_name, "fantasy-bucket");
        assert_eq!(config.bucket_region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.analysis_name, "fantasy-analysis");
        assert_eq!(config.assets_directory, PathBuf::from("."));
    }

    #[test]
    fn test_from_file_requires_account() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "principal_arn": "arn" }}"#).unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::ConfigError(_))
        ));
    }
}
