use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;

use crate::backend::s3::S3Config;
use crate::backend::BackendConfig;
use crate::candidates::date_pattern;

pub const DEFAULT_BUCKET: &str = "yourbucket.ninebyblue";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_DATE_FORMAT: &str = "%Y.%m.%d";
pub const DEFAULT_SOURCE_DIR: &str = "/var/log/www";
pub const DEFAULT_DATE_OFFSET: i64 = -1;
pub const DEFAULT_GRANTEE_ID: &str =
    "0b2b6d7e33c143cff9616ebaaee4c4670db68853a308b382410a1c0bf2ba2ace";

#[derive(Debug, Clone)]
pub struct ShipperConfig {
    pub source_dir: PathBuf,
    /// strftime pattern matched against local file names.
    pub date_format: String,
    /// Days added to today to get the target date; -1 is yesterday.
    pub date_offset: i64,
    pub key_prefix: String,
    /// Canonical user id granted FULL_CONTROL on every uploaded object.
    pub grantee_id: String,
    pub backend: BackendConfig,
}

impl ShipperConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from compiled-in defaults overridden by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let date_offset = match lookup("LOGSHIP_DATE_OFFSET") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("LOGSHIP_DATE_OFFSET is not an integer: {:?}", raw))?,
            None => DEFAULT_DATE_OFFSET,
        };

        let backend = match var("LOGSHIP_BACKEND", "s3").as_str() {
            "s3" => BackendConfig::S3(S3Config {
                bucket: var("LOGSHIP_BUCKET", DEFAULT_BUCKET),
                region: lookup("LOGSHIP_REGION")
                    .or_else(|| lookup("AWS_REGION"))
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint: lookup("LOGSHIP_ENDPOINT").filter(|ep| !ep.is_empty()),
                access_key_id: lookup("AWS_ACCESS_KEY_ID")
                    .context("AWS_ACCESS_KEY_ID must be set")?,
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY")
                    .context("AWS_SECRET_ACCESS_KEY must be set")?,
            }),
            "directory" => BackendConfig::Directory {
                path: lookup("LOGSHIP_TARGET_DIR")
                    .map(PathBuf::from)
                    .context("LOGSHIP_TARGET_DIR must be set for the directory backend")?,
            },
            other => bail!("Unknown backend type: {}", other),
        };

        let config = ShipperConfig {
            source_dir: PathBuf::from(var("LOGSHIP_SOURCE_DIR", DEFAULT_SOURCE_DIR)),
            date_format: var("LOGSHIP_DATE_FORMAT", DEFAULT_DATE_FORMAT),
            date_offset,
            key_prefix: var("LOGSHIP_KEY_PREFIX", ""),
            grantee_id: var("LOGSHIP_GRANTEE_ID", DEFAULT_GRANTEE_ID),
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.date_format.is_empty() {
            bail!("date_format must not be empty");
        }
        // Any calendar date will do; this only rejects unusable tokens
        let sample = NaiveDate::from_ymd_opt(2000, 1, 1).context("sample date out of range")?;
        date_pattern(sample, &self.date_format)?;
        if self.grantee_id.trim().is_empty() {
            bail!("grantee_id must not be empty");
        }
        match &self.backend {
            BackendConfig::S3(s3) => {
                if s3.bucket.is_empty() {
                    bail!("bucket must not be empty");
                }
                if s3.access_key_id.is_empty() {
                    bail!("AWS_ACCESS_KEY_ID must not be empty");
                }
                if s3.secret_access_key.is_empty() {
                    bail!("AWS_SECRET_ACCESS_KEY must not be empty");
                }
            }
            BackendConfig::Directory { path } => {
                if !path.is_absolute() {
                    bail!("target directory must be absolute: {}", path.display());
                }
            }
        }
        Ok(())
    }
}
