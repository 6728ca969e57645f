// src/storage/encrypted/store.rs
use std::path::Path;

use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::{cipher::StorageCipher, errors::*};
use crate::core::identity::types::{AuditRecord, EnrolledIdentity, SubjectId};
use crate::storage::IdentityStore;
use crate::utils::config::StorageConfig;

const IDENTITY_PREFIX: &str = "identity/";
const AUDIT_PREFIX: &str = "audit/";

/// RocksDB-backed identity store. Values are JSON sealed with AES-256-GCM;
/// subject ids are hex-encoded in keys so arbitrary ids cannot collide
/// across prefixes.
pub struct EncryptedStore {
    db: DB,
    cipher: StorageCipher,
}

impl EncryptedStore {
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let path = Path::new(&config.path);
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_keep_log_file_num(10);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to open database: {}", e)))?;
        let cipher = StorageCipher::new(config.encryption_key.as_bytes())?;

        info!(
            "Opened identity store at {} (key {})",
            path.display(),
            cipher.fingerprint()
        );

        Ok(Self { db, cipher })
    }

    fn store<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let serialized = serde_json::to_vec(value)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        let encrypted = self.cipher.encrypt(&serialized)?;

        self.db
            .put(key, encrypted)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    fn retrieve<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        let encrypted = match self.db.get(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))? {
            Some(data) => data,
            None => return Ok(None),
        };

        self.open_value(&encrypted).map(Some)
    }

    fn open_value<T: DeserializeOwned>(&self, encrypted: &[u8]) -> Result<T> {
        let decrypted = self.cipher.decrypt(encrypted)?;
        serde_json::from_slice(&decrypted)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            values.push(self.open_value(&value)?);
        }

        Ok(values)
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }
}

fn identity_key(subject_id: &SubjectId) -> String {
    format!("{}{}", IDENTITY_PREFIX, hex::encode(subject_id.as_str()))
}

fn audit_prefix(subject_id: &SubjectId) -> String {
    format!("{}{}/", AUDIT_PREFIX, hex::encode(subject_id.as_str()))
}

// Zero-padded nanos keep keys in chronological order; the id breaks ties.
fn audit_key(record: &AuditRecord) -> String {
    let nanos = record.timestamp.timestamp_nanos_opt().unwrap_or_default().max(0);
    format!("{}{:020}-{}", audit_prefix(&record.subject_id), nanos, record.id)
}

#[async_trait]
impl IdentityStore for EncryptedStore {
    async fn find_identity(&self, subject_id: &SubjectId) -> Result<Option<EnrolledIdentity>> {
        self.retrieve(identity_key(subject_id).as_bytes())
    }

    async fn save_identity(&self, identity: &EnrolledIdentity) -> Result<()> {
        self.store(identity_key(&identity.subject_id).as_bytes(), identity)?;
        debug!(subject = %identity.subject_id, "Stored enrolled identity");
        Ok(())
    }

    async fn append_audit_record(&self, record: &AuditRecord) -> Result<()> {
        let key = audit_key(record);
        if self.db.get(key.as_bytes())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
            .is_some()
        {
            return Err(StorageError::DatabaseError(format!(
                "audit record {} already exists",
                record.id
            )));
        }

        self.store(key.as_bytes(), record)?;
        debug!(subject = %record.subject_id, record = %record.id, "Appended audit record");
        Ok(())
    }

    async fn audit_records(&self, subject_id: &SubjectId) -> Result<Vec<AuditRecord>> {
        self.scan(&audit_prefix(subject_id))
    }
}
