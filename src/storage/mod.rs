//! Storage layer for Crewtask data.
//!
//! This module persists tasks, groups, suggestions and cached users as
//! keyed records.
//!
//! ## Layout
//!
//! Each entity type lives in its own JSONL collection (`tasks.jsonl`,
//! `groups.jsonl`, `suggestions.jsonl`, `users.jsonl`). Upserts append the
//! full record; the last line for an id wins. Deletes rewrite the
//! collection without the id.
//!
//! The engine only sees the [`Repository`] trait, so any keyed store can
//! stand in for [`Storage`].

pub mod backend;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

use crate::models::{Group, Suggestion, Task, User};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CT_DATA_DIR";

/// A record type kept in its own keyed collection.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Collection (file) name
    const COLLECTION: &'static str;

    /// Unique key within the collection
    fn key(&self) -> &str;
}

impl Entity for Task {
    const COLLECTION: &'static str = "tasks.jsonl";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Entity for Group {
    const COLLECTION: &'static str = "groups.jsonl";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Entity for Suggestion {
    const COLLECTION: &'static str = "suggestions.jsonl";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users.jsonl";
    fn key(&self) -> &str {
        &self.id
    }
}

/// All collections, created on init.
pub const COLLECTIONS: [&str; 4] = [
    Task::COLLECTION,
    Group::COLLECTION,
    Suggestion::COLLECTION,
    User::COLLECTION,
];

/// Keyed get/list/upsert/delete over entities.
pub trait Repository {
    /// Fetch one entity by key.
    fn get<E: Entity>(&self, id: &str) -> Result<Option<E>>;

    /// All entities of a type, in first-insertion order.
    fn list<E: Entity>(&self) -> Result<Vec<E>>;

    /// Insert or replace an entity.
    fn upsert<E: Entity>(&mut self, entity: &E) -> Result<()>;

    /// Remove an entity. Returns false if it did not exist.
    fn delete<E: Entity>(&mut self, id: &str) -> Result<bool>;

    /// Fetch one entity or fail with `NotFound`.
    fn require<E: Entity>(&self, id: &str) -> Result<E> {
        self.get(id)?.ok_or_else(|| {
            let kind = E::COLLECTION.trim_end_matches(".jsonl").trim_end_matches('s');
            Error::NotFound(format!("{} not found: {}", kind, id))
        })
    }
}

/// Storage manager over a line backend.
pub struct Storage<B: StorageBackend> {
    backend: B,
}

impl Storage<FileBackend> {
    /// Open existing storage in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        if !Self::exists(data_dir) {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            backend: FileBackend::new(data_dir),
        })
    }

    /// Initialize storage in `data_dir`, creating empty collections.
    pub fn init(data_dir: &Path) -> Result<Self> {
        let mut backend = FileBackend::new(data_dir);
        backend.init(&COLLECTIONS)?;
        Ok(Self { backend })
    }

    /// Check if storage exists in `data_dir`.
    pub fn exists(data_dir: &Path) -> bool {
        FileBackend::new(data_dir).exists(Task::COLLECTION)
    }
}

impl Storage<MemoryBackend> {
    /// Fresh, initialized in-memory storage.
    pub fn in_memory() -> Self {
        let mut backend = MemoryBackend::default();
        // MemoryBackend::init cannot fail
        let _ = backend.init(&COLLECTIONS);
        Self { backend }
    }
}

impl<B: StorageBackend> Storage<B> {
    /// Where the data lives (for display purposes).
    pub fn location(&self) -> String {
        self.backend.location()
    }

    pub fn backend_type(&self) -> &'static str {
        self.backend.backend_type()
    }

    /// Collapse a collection to one line per entity.
    pub fn compact<E: Entity>(&mut self) -> Result<usize> {
        let entities: Vec<E> = self.list()?;
        let lines = entities
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.backend.write_jsonl(E::COLLECTION, &lines)?;
        Ok(lines.len())
    }

    /// Parse a collection, keeping the latest version of each id.
    fn load<E: Entity>(&self) -> Result<Vec<E>> {
        let mut order: Vec<E> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for line in self.backend.read_jsonl(E::COLLECTION)? {
            let entity: E = match serde_json::from_str(&line) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::warn!(collection = E::COLLECTION, error = %e, "skipping malformed record");
                    continue;
                }
            };
            match index.get(entity.key()) {
                Some(&pos) => order[pos] = entity,
                None => {
                    index.insert(entity.key().to_string(), order.len());
                    order.push(entity);
                }
            }
        }
        Ok(order)
    }
}

impl<B: StorageBackend> Repository for Storage<B> {
    fn get<E: Entity>(&self, id: &str) -> Result<Option<E>> {
        Ok(self.load::<E>()?.into_iter().find(|e| e.key() == id))
    }

    fn list<E: Entity>(&self) -> Result<Vec<E>> {
        self.load()
    }

    fn upsert<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let json = serde_json::to_string(entity)?;
        self.backend.append_jsonl(E::COLLECTION, &json)
    }

    fn delete<E: Entity>(&mut self, id: &str) -> Result<bool> {
        let entities: Vec<E> = self.load()?;
        let before = entities.len();
        let lines = entities
            .iter()
            .filter(|e| e.key() != id)
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if lines.len() == before {
            return Ok(false);
        }
        self.backend.write_jsonl(E::COLLECTION, &lines)?;
        Ok(true)
    }
}

/// Get the data directory: `CT_DATA_DIR` if set, else `~/.local/share/crewtask/`.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("crewtask"))
}

fn hash_hex(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    format!("{:x}", hasher.finalize())
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<6 hex chars>`
/// - Task prefix: "ct"
/// - Group prefix: "ctg"
/// - Suggestion prefix: "cts"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    format!("{}-{}", prefix, &hash_hex(seed)[..6])
}

/// Generate a six-character uppercase invite code for a group.
pub fn generate_invite_code(seed: &str) -> String {
    hash_hex(seed)[..6].to_uppercase()
}
