use std::io::Write;

use anyhow::Context;
use flate2::{Compression, GzBuilder};

pub const GZIP_SUFFIX: &str = ".gz";

pub fn is_compressed(name: &str) -> bool {
    name.ends_with(GZIP_SUFFIX)
}

/// gzip `data` at maximum compression. The header carries `name` and a zero
/// mtime, so identical input always yields identical output.
pub fn gzip(name: &str, data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .filename(name)
        .mtime(0)
        .write(Vec::with_capacity(data.len() / 4), Compression::best());
    encoder.write_all(data).context("gzip compression failed")?;
    encoder.finish().context("Failed to finish gzip stream")
}
