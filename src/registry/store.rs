//! Registry store backends.
//!
//! The store is keyed by opaque user key and only guarantees per-key
//! atomicity. Deleting a missing key is a no-op.

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Profile, RegistrySnapshot};
use crate::identity::UserKey;

pub trait RegistryStore: Send + Sync {
    fn find(&self, key: &UserKey) -> Result<Option<Profile>>;

    fn find_all(&self) -> Result<Vec<Profile>>;

    /// Inserts or overwrites the document stored under `profile.key`.
    fn upsert(&self, profile: &Profile) -> Result<()>;

    /// Removes the document for `key`, returning whether one existed.
    fn delete(&self, key: &UserKey) -> Result<bool>;

    fn exists(&self, key: &UserKey) -> Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    fn snapshot(&self) -> Result<RegistrySnapshot> {
        Ok(RegistrySnapshot::from_profiles(&self.find_all()?))
    }
}

/// File-backed store holding one JSON document per user key.
pub struct FileRegistryStore {
    root: PathBuf,
}

impl FileRegistryStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed creating registry directory {:?}", root))?;
        Ok(Self { root })
    }

    fn path(&self, key: &UserKey) -> PathBuf {
        self.root.join(format!("{}.json", key.as_str()))
    }
}

impl RegistryStore for FileRegistryStore {
    fn find(&self, key: &UserKey) -> Result<Option<Profile>> {
        read_profile(&self.path(key))
    }

    fn find_all(&self) -> Result<Vec<Profile>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed listing registry directory {:?}", self.root))?
        {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some("json")
            {
                paths.push(path);
            }
        }
        // A document deleted between listing and reading is simply skipped.
        let mut profiles: Vec<Profile> = paths
            .par_iter()
            .map(|path| read_profile(path))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        profiles.sort_by_key(|profile| profile.slot);
        Ok(profiles)
    }

    fn upsert(&self, profile: &Profile) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path(&profile.key);
        let staging = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(profile)
            .with_context(|| format!("Failed serializing profile {}", profile.key.short()))?;
        fs::write(&staging, data)
            .with_context(|| format!("Failed writing profile staging file {:?}", staging))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("Failed committing profile file {:?}", path))?;
        Ok(())
    }

    fn delete(&self, key: &UserKey) -> Result<bool> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("Failed deleting profile file {:?}", path))
            }
        }
    }
}

/// Reads one document; a missing file is `None`, not an error.
fn read_profile(path: &Path) -> Result<Option<Profile>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed reading profile document {:?}", path))
        }
    };
    let profile = serde_json::from_slice(&data)
        .with_context(|| format!("Failed parsing profile document {:?}", path))?;
    Ok(Some(profile))
}

/// In-process store. `set_offline(true)` makes every call fail, which lets
/// callers exercise their unavailable-store paths.
#[derive(Default)]
pub struct MemoryRegistryStore {
    profiles: Mutex<BTreeMap<UserKey, Profile>>,
    offline: AtomicBool,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.lock().is_empty()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("registry store is offline");
        }
        Ok(())
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn find(&self, key: &UserKey) -> Result<Option<Profile>> {
        self.check_online()?;
        Ok(self.profiles.lock().get(key).cloned())
    }

    fn find_all(&self) -> Result<Vec<Profile>> {
        self.check_online()?;
        let mut profiles: Vec<Profile> = self.profiles.lock().values().cloned().collect();
        profiles.sort_by_key(|profile| profile.slot);
        Ok(profiles)
    }

    fn upsert(&self, profile: &Profile) -> Result<()> {
        self.check_online()?;
        self.profiles
            .lock()
            .insert(profile.key.clone(), profile.clone());
        Ok(())
    }

    fn delete(&self, key: &UserKey) -> Result<bool> {
        self.check_online()?;
        Ok(self.profiles.lock().remove(key).is_some())
    }
}
