//! Portrait lookup for committed slots.
//!
//! Portraits are numbered from 1, so slot `n` maps to a file whose stem is
//! `n + 1`. A missing portrait never blocks a commit.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use walkdir::WalkDir;

const PORTRAIT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub slot: u32,
    pub path: PathBuf,
}

pub trait AssetSource: Send + Sync {
    fn portrait(&self, slot: u32) -> Result<Option<AssetRef>>;
}

/// Looks portraits up in a directory tree.
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectoryAssets {
    fn portrait(&self, slot: u32) -> Result<Option<AssetRef>> {
        if !self.root.exists() {
            return Ok(None);
        }
        let wanted = (u64::from(slot) + 1).to_string();
        for entry in WalkDir::new(&self.root).max_depth(2).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed scanning portrait directory {:?}", self.root))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(wanted.as_str());
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| PORTRAIT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if stem_matches && is_image {
                return Ok(Some(AssetRef {
                    slot,
                    path: path.to_path_buf(),
                }));
            }
        }
        Ok(None)
    }
}

/// Source used when no portraits are installed.
pub struct NoAssets;

impl AssetSource for NoAssets {
    fn portrait(&self, _slot: u32) -> Result<Option<AssetRef>> {
        Ok(None)
    }
}
