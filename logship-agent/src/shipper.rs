//! The batch job: select the target day's logs, skip what the bucket already
//! has, then compress and upload the rest one file at a time.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use chrono::NaiveDate;
use tracing::{error, info};

use logship_common::backend::{remote_key, BackendAdapter, Grant, UploadHeaders};

use crate::candidates::{
    date_pattern, exclude_already_uploaded, preflight, select_candidates, target_date,
};
use crate::compress::{gzip, is_compressed, GZIP_SUFFIX};
use crate::config::ShipperConfig;

/// Conditions that stop the whole run.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),
    #[error(
        "Not able to connect to the log directory ({}). If this is a shared path on another \
         machine make sure that you are connected to the right network (such as a VPN) and \
         that the machine is running and sharing the path.",
        .0.display()
    )]
    SourceUnreachable(PathBuf),
    #[error("failed to connect to {target}: {error:#}")]
    Connect { target: String, error: anyhow::Error },
    #[error("failed to select candidate files: {0:#}")]
    Selection(anyhow::Error),
    #[error("failed to list existing objects: {0:#}")]
    RemoteListing(anyhow::Error),
}

impl FatalError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FatalError::SourceUnreachable(_) => 2,
            _ => 1,
        }
    }
}

/// One file ready to ship.
pub struct UploadUnit {
    pub key: String,
    pub data: Bytes,
    pub headers: UploadHeaders,
}

/// Read `name` from `source_dir` and derive its key and body. Files already
/// ending in `.gz` are shipped as-is; everything else is gzipped here.
pub async fn prepare_upload(
    source_dir: &Path,
    name: &str,
    key_prefix: &str,
) -> anyhow::Result<UploadUnit> {
    let path = source_dir.join(name);
    info!(path = %path.display(), "Opening file");
    let raw = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let (key_name, data) = if is_compressed(name) {
        (name.to_string(), raw)
    } else {
        (format!("{}{}", name, GZIP_SUFFIX), gzip(name, &raw)?)
    };

    Ok(UploadUnit {
        key: remote_key(key_prefix, &key_name),
        data: Bytes::from(data),
        headers: UploadHeaders::gzip_text(),
    })
}

/// Where a shipped file went and how many bytes were sent.
#[derive(Debug)]
pub struct Shipped {
    pub key: String,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub name: String,
    pub result: anyhow::Result<Shipped>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub candidates: Vec<String>,
    pub excluded: Vec<String>,
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub fn uploaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.uploaded()
    }

    pub fn shipped_keys(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.key.as_str())
            .collect()
    }

    pub fn failed_files(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn bytes_sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.bytes)
            .sum()
    }
}

/// Delimited dump of a per-file failure, including the full cause chain.
pub fn diagnostic(name: &str, error: &anyhow::Error) -> String {
    let rule = "-".repeat(10);
    format!("{rule}\nUnable to upload file '{name}'...\n{error:?}\n{rule}")
}

pub struct LogShipper<'a> {
    config: &'a ShipperConfig,
    backend: &'a dyn BackendAdapter,
    grant: Grant,
}

impl<'a> LogShipper<'a> {
    pub fn new(config: &'a ShipperConfig, backend: &'a dyn BackendAdapter) -> Self {
        Self {
            config,
            backend,
            grant: Grant::full_control(config.grantee_id.clone()),
        }
    }

    /// Ship every log for `today + date_offset` that is not yet in the bucket.
    /// Per-file failures are logged and recorded; only selection and listing
    /// errors abort.
    pub async fn run(&self, today: NaiveDate) -> Result<RunReport, FatalError> {
        let pattern = target_date(today, self.config.date_offset)
            .and_then(|date| date_pattern(date, &self.config.date_format))
            .map_err(FatalError::Selection)?;

        let candidates = select_candidates(&self.config.source_dir, &pattern)
            .map_err(FatalError::Selection)?;
        info!(pattern = %pattern, files = ?candidates, "Found candidate log files");

        info!("Excluding existing file names");
        let remote_keys = self.backend.list("").await.map_err(FatalError::RemoteListing)?;
        let pending = exclude_already_uploaded(&candidates, &remote_keys);
        let excluded: Vec<String> = candidates
            .iter()
            .filter(|name| !pending.contains(name))
            .cloned()
            .collect();
        info!(files = ?pending, excluded = excluded.len(), "Files to upload");

        let mut outcomes = Vec::with_capacity(pending.len());
        for name in pending {
            let result = self.process_one(&name).await;
            if let Err(error) = &result {
                error!("{}", diagnostic(&name, error));
            }
            outcomes.push(FileOutcome { name, result });
        }

        let report = RunReport { candidates, excluded, outcomes };
        info!(
            candidates = report.candidates.len(),
            excluded = report.excluded.len(),
            uploaded = report.uploaded(),
            failed = report.failed(),
            bytes_sent = report.bytes_sent(),
            "Run complete"
        );
        Ok(report)
    }

    /// Compress (if needed), upload, and grant access to a single file.
    pub async fn process_one(&self, name: &str) -> anyhow::Result<Shipped> {
        let unit = prepare_upload(&self.config.source_dir, name, &self.config.key_prefix).await?;
        let bytes = unit.data.len();

        info!(file = %name, key = %unit.key, bytes, "Uploading");
        self.backend
            .upload(&unit.key, unit.data, &unit.headers)
            .await
            .with_context(|| format!("Failed to upload {} to {}", name, unit.key))?;

        self.backend
            .grant(&unit.key, &self.grant)
            .await
            .with_context(|| {
                format!("Failed to grant {} on {}", self.grant.permission, unit.key)
            })?;
        info!(key = %unit.key, grantee = %self.grant.grantee_id, "Grant applied");

        Ok(Shipped { key: unit.key, bytes })
    }
}

/// Full run: preflight, connect, ship. The source directory is checked before
/// any connection attempt.
pub async fn ship<C, Fut>(
    config: &ShipperConfig,
    today: NaiveDate,
    connect: C,
) -> Result<RunReport, FatalError>
where
    C: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Box<dyn BackendAdapter>>>,
{
    if !preflight(&config.source_dir) {
        return Err(FatalError::SourceUnreachable(config.source_dir.clone()));
    }

    info!(bucket = %config.backend, "Connecting to bucket");
    let backend = connect().await.map_err(|error| FatalError::Connect {
        target: config.backend.to_string(),
        error,
    })?;

    LogShipper::new(config, backend.as_ref()).run(today).await
}
