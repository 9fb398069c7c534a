//! This module contains small independent components.

pub(crate) mod markdown;

pub(crate) fn make_parents<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create dir `{}`", parent.display()))?;
    }
    Ok(())
}

use anyhow::Context as _;
use std::fs;
use std::path::Path;
