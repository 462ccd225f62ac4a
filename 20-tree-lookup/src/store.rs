//! Durable key/value storage for a single node.
//!
//! Each node owns one sled database with a single bucket (a sled `Tree`)
//! named after the node. The bucket is created and filled once at startup by
//! [`Store::seed_load`]; afterwards the store is only read. sled handles
//! concurrent readers internally, so `get` needs no extra locking.

use std::collections::BTreeMap;
use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use thiserror::Error;
use tracing::debug;

/// Longest key accepted when seeding a bucket.
pub const MAX_KEY_SIZE: usize = 256;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage engine error: {0}")]
    Engine(#[from] sled::Error),

    #[error("bucket '{0}' does not exist; the store has not been seeded")]
    MissingBucket(String),

    #[error("invalid seed key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("value stored under {key:?} is not valid UTF-8")]
    Corrupt { key: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub struct Store {
    db: Db,
    bucket: String,
    tree: Option<Tree>,
}

impl Store {
    /// Opens (or creates) the database at `path`.
    ///
    /// A bucket left behind by an earlier run is attached right away;
    /// otherwise reads fail with [`StoreError::MissingBucket`] until
    /// [`seed_load`](Self::seed_load) creates it.
    pub fn open(path: impl AsRef<Path>, bucket: &str) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        Self::with_db(db, bucket)
    }

    /// Opens an in-memory database that is discarded on drop.
    pub fn temporary(bucket: &str) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db, bucket)
    }

    fn with_db(db: Db, bucket: &str) -> Result<Self> {
        let exists = db
            .tree_names()
            .iter()
            .any(|name| &name[..] == bucket.as_bytes());
        let tree = if exists {
            Some(db.open_tree(bucket)?)
        } else {
            None
        };

        Ok(Self {
            db,
            bucket: bucket.to_string(),
            tree,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Writes every entry in one transaction, creating the bucket first if
    /// needed. Either all entries are committed or none are.
    pub fn seed_load(&mut self, entries: &BTreeMap<String, String>) -> Result<()> {
        let tree = match &self.tree {
            Some(tree) => tree.clone(),
            None => self.db.open_tree(&self.bucket)?,
        };

        tree.transaction(|tx| {
            for (key, value) in entries {
                if let Some(reason) = invalid_key_reason(key) {
                    return Err(ConflictableTransactionError::Abort(StoreError::InvalidKey {
                        key: key.clone(),
                        reason,
                    }));
                }
                tx.insert(key.as_str(), value.as_str())?;
            }
            Ok(())
        })
        .map_err(|err| match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => StoreError::Engine(err),
        })?;

        tree.flush()?;
        debug!(bucket = %self.bucket, entries = entries.len(), "seeded bucket");
        self.tree = Some(tree);
        Ok(())
    }

    /// Point lookup. `Ok(None)` means the key is absent; a stored empty
    /// string comes back as `Ok(Some(""))`.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let tree = self.tree()?;
        match tree.get(key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| StoreError::Corrupt {
                    key: key.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.tree()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.tree()?.is_empty())
    }

    fn tree(&self) -> Result<&Tree> {
        self.tree
            .as_ref()
            .ok_or_else(|| StoreError::MissingBucket(self.bucket.clone()))
    }
}

fn invalid_key_reason(key: &str) -> Option<&'static str> {
    if key.is_empty() {
        Some("key is empty")
    } else if key.len() > MAX_KEY_SIZE {
        Some("key exceeds maximum size")
    } else {
        None
    }
}
