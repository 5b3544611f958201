use std::fmt;

/// Trait implemented by all storage backend adapters.
///
/// The shipper owns candidate selection, exclusion, and compression; the
/// adapter is responsible only for listing keys, storing objects, and
/// attaching access grants to stored objects.
#[async_trait::async_trait]
pub trait BackendAdapter: Send + Sync {
    /// List all object keys under the given prefix.
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>>;

    /// Store `data` at the given remote key with the given transport headers.
    async fn upload(
        &self,
        remote_key: &str,
        data: bytes::Bytes,
        headers: &UploadHeaders,
    ) -> anyhow::Result<()>;

    /// Attach an access grant to an already uploaded object.
    async fn grant(&self, remote_key: &str, grant: &Grant) -> anyhow::Result<()>;
}

/// Transport headers sent with every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHeaders {
    pub content_type: String,
    pub content_encoding: Option<String>,
}

impl UploadHeaders {
    /// `text/plain` + `gzip`, used for every shipped log regardless of
    /// whether it was compressed locally or already on disk as `.gz`.
    pub fn gzip_text() -> Self {
        Self {
            content_type: "text/plain".to_string(),
            content_encoding: Some("gzip".to_string()),
        }
    }
}

/// ACL permission levels attached to shipped objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    FullControl,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FullControl => "FULL_CONTROL",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grant of `permission` to the account with canonical user id `grantee_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub grantee_id: String,
    pub permission: Permission,
}

impl Grant {
    pub fn full_control(grantee_id: impl Into<String>) -> Self {
        Self {
            grantee_id: grantee_id.into(),
            permission: Permission::FullControl,
        }
    }
}

/// Compute the remote key for a local file name given the key prefix.
/// Scheme: `{prefix}/{name}`, or just `{name}` with an empty prefix.
pub fn remote_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
