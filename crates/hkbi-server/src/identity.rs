//! Persistent camera identity registry.
//!
//! Maps recorder camera names to small integer accessory ids that survive restarts.
//! Ids are allocated as `max + 1` and are never reassigned once written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// File name of the persisted identity table inside the data directory.
pub const KNOWN_CAMERAS_FILE: &str = "known_cameras.json";

#[derive(Debug)]
pub struct IdentityRegistry {
    path: PathBuf,
    ids: BTreeMap<String, u64>,
    dirty: bool,
}

impl IdentityRegistry {
    /// Load the table from `path`. A missing file yields an empty registry; any other
    /// read failure or a corrupt file is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<BTreeMap<String, u64>>(&raw)
                .with_context(|| format!("decode known cameras {:?}", path))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no known cameras file, starting empty");
                BTreeMap::new()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read known cameras {:?}", path));
            }
        };
        Ok(Self {
            path,
            ids,
            dirty: false,
        })
    }

    /// Load the table stored in `data_dir`.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        Self::load(data_dir.join(KNOWN_CAMERAS_FILE))
    }

    /// Return the stable id for `name`, allocating one on first sight.
    pub fn resolve(&mut self, name: &str) -> u64 {
        if let Some(id) = self.ids.get(name) {
            tracing::debug!(camera = %name, id, "reusing previously assigned id");
            return *id;
        }
        let id = self.ids.values().max().map(|max| max + 1).unwrap_or(0);
        tracing::info!(camera = %name, id, "newly discovered camera assigned id");
        self.ids.insert(name.to_string(), id);
        self.dirty = true;
        id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Write the table back to disk when new ids were allocated.
    pub fn persist(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let raw = serde_json::to_string_pretty(&self.ids).context("encode known cameras")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("write known cameras {:?}", self.path))?;
        self.dirty = false;
        tracing::info!(path = %self.path.display(), count = self.ids.len(), "saved known cameras");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hkbi-identity-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn new_cameras_get_sequential_ids_and_survive_reload() {
        let dir = temp_dir("reload");
        let mut registry = IdentityRegistry::load_from_dir(&dir).expect("load empty");
        assert_eq!(registry.len(), 0);

        assert_eq!(registry.resolve("Porch"), 0);
        assert_eq!(registry.resolve("Driveway"), 1);
        assert_eq!(registry.resolve("Garage"), 2);
        assert!(registry.is_dirty());
        registry.persist().expect("persist");
        assert!(!registry.is_dirty());
        assert!(dir.join(KNOWN_CAMERAS_FILE).exists());

        let mut reloaded = IdentityRegistry::load_from_dir(&dir).expect("reload");
        assert_eq!(reloaded.resolve("Driveway"), 1);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn ids_are_stable_across_repeated_runs() {
        let dir = temp_dir("stable");
        let names = ["Front", "Back", "Side"];
        let mut first = Vec::new();
        {
            let mut registry = IdentityRegistry::load_from_dir(&dir).unwrap();
            for name in names {
                first.push(registry.resolve(name));
            }
            registry.persist().unwrap();
        }
        for _ in 0..3 {
            let mut registry = IdentityRegistry::load_from_dir(&dir).unwrap();
            // Resolution order must not matter once ids are persisted.
            for (name, id) in names.iter().rev().zip(first.iter().rev()) {
                assert_eq!(registry.resolve(name), *id);
            }
            registry.persist().unwrap();
        }
    }

    #[test]
    fn allocation_continues_after_highest_existing_id() {
        let dir = temp_dir("gap");
        std::fs::write(dir.join(KNOWN_CAMERAS_FILE), r#"{"Old": 7, "Older": 3}"#).unwrap();
        let mut registry = IdentityRegistry::load_from_dir(&dir).unwrap();
        assert_eq!(registry.resolve("Older"), 3);
        assert_eq!(registry.resolve("New"), 8);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn persist_without_new_ids_does_not_write() {
        let dir = temp_dir("clean");
        let mut registry = IdentityRegistry::load_from_dir(&dir).unwrap();
        registry.persist().unwrap();
        assert!(!dir.join(KNOWN_CAMERAS_FILE).exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join(KNOWN_CAMERAS_FILE), "not json").unwrap();
        assert!(IdentityRegistry::load_from_dir(&dir).is_err());
    }
}
