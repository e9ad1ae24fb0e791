//! Durable JSON-file record store with optional encryption at rest.

use crate::error::StoreError;
use crate::memory::RecordTable;
use crate::store::{RecordStore, StoreResult};
use crate::types::RegistrationRecord;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use async_trait::async_trait;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Key derivation context mixed into the passphrase hash.
const KEY_DERIVATION_PATH: &str = "device-registry/store";

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot of the whole store.
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    version: u32,
    next_id: u64,
    records: Vec<RegistrationRecord>,
}

impl From<&RecordTable> for StoreSnapshot {
    fn from(table: &RecordTable) -> Self {
        let mut records: Vec<_> = table.records().cloned().collect();
        records.sort_by_key(|r| r.id);
        Self {
            version: SNAPSHOT_VERSION,
            next_id: table.next_id(),
            records,
        }
    }
}

impl TryFrom<StoreSnapshot> for RecordTable {
    type Error = StoreError;

    fn try_from(snapshot: StoreSnapshot) -> Result<Self, Self::Error> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let max_id = snapshot.records.iter().map(|r| r.id).max().unwrap_or(0);
        let next_id = max_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt(format!("record id {} leaves no room", max_id)))?
            .max(snapshot.next_id);

        Ok(RecordTable::from_records(next_id, snapshot.records))
    }
}

/// AES-256-GCM cipher keyed from a passphrase.
struct Cipher {
    key: [u8; 32],
}

impl Cipher {
    /// Key = SHA256(passphrase || KEY_DERIVATION_PATH)
    fn from_passphrase(passphrase: &SecretString) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.expose_secret().as_bytes());
        hasher.update(KEY_DERIVATION_PATH.as_bytes());

        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        Self { key }
    }

    /// Output format: [12 bytes nonce][ciphertext with auth tag]
    fn encrypt(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, plaintext)?;

        let mut data = nonce_bytes.to_vec();
        data.extend(ciphertext);
        Ok(data)
    }

    fn decrypt(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);

        cipher.decrypt(nonce, &data[NONCE_SIZE..]).map_err(|_| {
            StoreError::Encryption(
                "Failed to decrypt store. The encryption key may have changed.".to_string(),
            )
        })
    }
}

/// Record store persisted as a single snapshot file.
///
/// Every mutation rewrites the snapshot (temp file + rename). In-memory state is
/// only updated once the write succeeded.
pub struct FileStore {
    path: PathBuf,
    cipher: Option<Cipher>,
    table: RwLock<RecordTable>,
}

impl FileStore {
    /// Open a store at `path`, loading any existing snapshot.
    ///
    /// With a passphrase the snapshot is encrypted; opening an encrypted snapshot
    /// with the wrong passphrase fails.
    pub async fn open(
        path: impl Into<PathBuf>,
        passphrase: Option<&SecretString>,
    ) -> StoreResult<Self> {
        let path = path.into();
        let cipher = passphrase.map(Cipher::from_passphrase);
        let table = Self::read_table(&path, cipher.as_ref()).await?;

        info!(
            "Opened file store with {} records from {:?} (encrypted: {})",
            table.len(),
            path,
            cipher.is_some()
        );

        Ok(Self {
            path,
            cipher,
            table: RwLock::new(table),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_table(path: &Path, cipher: Option<&Cipher>) -> StoreResult<RecordTable> {
        if !path.exists() {
            info!("Store file not found at {:?}, starting empty", path);
            return Ok(RecordTable::default());
        }

        let data = fs::read(path).await?;
        let plaintext = match cipher {
            Some(_) if data.len() < NONCE_SIZE => {
                warn!("Store file too short, starting empty");
                return Ok(RecordTable::default());
            }
            Some(cipher) => cipher.decrypt(&data)?,
            None if data.is_empty() => return Ok(RecordTable::default()),
            None => data,
        };

        let snapshot: StoreSnapshot = serde_json::from_slice(&plaintext)?;
        snapshot.try_into()
    }

    async fn persist(&self, table: &RecordTable) -> StoreResult<()> {
        let plaintext = serde_json::to_vec(&StoreSnapshot::from(table))?;
        let data = match &self.cipher {
            Some(cipher) => cipher.encrypt(&plaintext)?,
            None => plaintext,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved store snapshot ({} bytes) to {:?}", data.len(), self.path);
        Ok(())
    }

    /// Run a write under the table lock.
    ///
    /// `skip` inspects the live table and returns a result when there is nothing
    /// to write. Otherwise `apply` runs on a copy that replaces the table only
    /// once it has been persisted.
    async fn mutate<T, S, A>(&self, skip: S, apply: A) -> StoreResult<T>
    where
        S: FnOnce(&RecordTable) -> Option<T>,
        A: FnOnce(&mut RecordTable) -> StoreResult<T>,
    {
        let mut table = self.table.write().await;
        if let Some(result) = skip(&table) {
            return Ok(result);
        }

        let mut next = table.clone();
        let result = apply(&mut next)?;
        self.persist(&next).await?;
        *table = next;
        Ok(result)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn find_by_reg_id(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>> {
        Ok(self.table.read().await.find(reg_id).cloned())
    }

    async fn save(&self, reg_id: &str) -> StoreResult<RegistrationRecord> {
        self.mutate(|_| None, |table| table.insert(reg_id)).await
    }

    async fn delete(&self, record: &RegistrationRecord) -> StoreResult<()> {
        self.mutate(
            |table| (!table.contains(record.id)).then_some(()),
            |table| {
                table.remove(record.id);
                Ok(())
            },
        )
        .await
    }

    async fn list(&self, limit: usize) -> StoreResult<Vec<RegistrationRecord>> {
        Ok(self.table.read().await.take(limit))
    }

    async fn insert_if_absent(&self, reg_id: &str) -> StoreResult<Option<RegistrationRecord>> {
        self.mutate(
            |table| table.find(reg_id).map(|_| None),
            |table| table.insert(reg_id).map(Some),
        )
        .await
    }

    async fn delete_if_present(&self, reg_id: &str) -> StoreResult<bool> {
        self.mutate(
            |table| table.find(reg_id).is_none().then_some(false),
            |table| Ok(table.remove_all(reg_id) > 0),
        )
        .await
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.table.read().await.len())
    }
}
