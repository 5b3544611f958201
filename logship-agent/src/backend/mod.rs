pub mod directory;
pub mod s3;

use std::fmt;
use std::path::PathBuf;

use logship_common::backend::BackendAdapter;

use self::directory::DirectoryAdapter;
use self::s3::{S3Adapter, S3Config};

/// Where shipped logs are stored.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    S3(S3Config),
    /// A local directory standing in for the bucket.
    Directory { path: PathBuf },
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::S3(s3) => write!(f, "s3://{}", s3.bucket),
            BackendConfig::Directory { path } => write!(f, "dir://{}", path.display()),
        }
    }
}

/// Construct a backend adapter and establish an authenticated handle to it.
pub async fn connect(config: &BackendConfig) -> anyhow::Result<Box<dyn BackendAdapter>> {
    match config {
        BackendConfig::S3(s3) => Ok(Box::new(S3Adapter::connect(s3.clone()).await?)),
        BackendConfig::Directory { path } => {
            if !path.is_dir() {
                anyhow::bail!("Target directory does not exist: {}", path.display());
            }
            Ok(Box::new(DirectoryAdapter::new(path)))
        }
    }
}
