// # File Store
//
// File-based implementation of AddressStore and ReportStore with crash
// recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Automatic backup: the previous good file is kept as `.backup`
// - Recovery: a file that fails to parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "addresses": [
//     { "ip": "203.0.113.5", "action": "Block", "author": "ops",
//       "comment": "ssh brute force", "created_at": "2026-01-09T12:00:00Z" }
//   ],
//   "reports": [
//     { "checker": "AbuseIPDB", "report": { "ip": "203.0.113.5", ... } }
//   ]
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::StoreData;
use crate::Error;
use crate::model::{Address, ReputationReport};
use crate::traits::{AddressStore, ReportStore};

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// File-based store
///
/// Every mutation is written through to disk before it returns. A failed
/// write leaves the in-memory view unchanged, so callers see the same
/// state the file holds.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFileFormat {
    version: String,
    #[serde(default)]
    addresses: Vec<Address>,
    #[serde(default)]
    reports: Vec<StoredReport>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredReport {
    checker: String,
    report: ReputationReport,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// Parent directories are created as needed. A corrupted file is
    /// recovered from its backup; if that fails too the store starts empty.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let data = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<StoreData, Error> {
        let err = match Self::load(path).await {
            Ok(data) => {
                tracing::debug!(path = %path.display(), records = data.address_count(), "Loaded store");
                return Ok(data);
            }
            Err(e @ Error::Json(_)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!("Store file appears corrupted: {}. Attempting recovery from backup.", err);

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            return Err(Error::store(format!(
                "Store file {} is unreadable ({}) and no backup exists at {}. \
                Refusing to start with an empty store; repair or remove the file.",
                path.display(),
                err,
                backup_path.display()
            )));
        }

        match Self::load(&backup_path).await {
            Ok(data) => {
                tracing::info!(records = data.address_count(), "Recovered store from backup");
                if let Err(e) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore store file from backup: {}", e);
                }
                Ok(data)
            }
            Err(backup_err) => Err(Error::store(format!(
                "Store file {} is unreadable ({}) and its backup {} is unreadable too ({}). \
                Refusing to start with an empty store; repair or remove the files.",
                path.display(),
                err,
                backup_path.display(),
                backup_err
            ))),
        }
    }

    async fn load(path: &Path) -> Result<StoreData, Error> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Store file does not exist yet");
            return Ok(StoreData::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read store file {}: {}", path.display(), e))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)?;
        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        let mut data = StoreData::default();
        for address in &file.addresses {
            if data.insert_address(address).is_err() {
                tracing::warn!(ip = %address.ip, "Duplicate record in store file, keeping the first");
            }
        }
        for stored in &file.reports {
            data.put_report(&stored.checker, &stored.report);
        }
        Ok(data)
    }

    /// Write `data` atomically: temp file, backup of the current file, rename
    async fn persist(&self, data: &StoreData) -> Result<(), Error> {
        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            addresses: data.all_addresses(),
            reports: data
                .report_entries()
                .map(|(checker, report)| StoredReport {
                    checker: checker.to_string(),
                    report: report.clone(),
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize store: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!("Failed to create temp file {}: {}", temp_path.display(), e))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!("Failed to write temp file {}: {}", temp_path.display(), e))
            })?;
            out.flush().await.map_err(|e| {
                Error::store(format!("Failed to flush temp file {}: {}", temp_path.display(), e))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!(path = %self.path.display(), "Store written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        with_suffix(&self.path, ".tmp")
    }

    fn backup_path(path: &Path) -> PathBuf {
        with_suffix(path, ".backup")
    }
}

/// `store.json` -> `store.json<suffix>`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[async_trait]
impl AddressStore for FileStore {
    async fn create(&self, address: &Address) -> Result<(), Error> {
        let mut data = self.data.write().await;
        data.insert_address(address)?;

        if let Err(e) = self.persist(&data).await {
            data.remove_address(address.ip);
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, ip: IpAddr) -> Result<Option<Address>, Error> {
        Ok(self.data.read().await.address(ip))
    }

    async fn get_all(&self) -> Result<Vec<Address>, Error> {
        Ok(self.data.read().await.all_addresses())
    }

    async fn delete(&self, ip: IpAddr) -> Result<(), Error> {
        let mut data = self.data.write().await;
        let Some(removed) = data.remove_address(ip) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&data).await {
            data.insert_address(&removed)?;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for FileStore {
    async fn get(&self, checker: &str, ip: IpAddr) -> Result<Option<ReputationReport>, Error> {
        Ok(self.data.read().await.report(checker, ip))
    }

    async fn put(&self, checker: &str, report: &ReputationReport) -> Result<(), Error> {
        let mut data = self.data.write().await;
        let previous = data.put_report(checker, report);

        if let Err(e) = self.persist(&data).await {
            match previous {
                Some(previous) => {
                    data.put_report(checker, &previous);
                }
                None => {
                    data.remove_report(checker, report.ip);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, ip: IpAddr) -> Result<(), Error> {
        let mut data = self.data.write().await;
        let removed = data.remove_reports(ip);
        if removed.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.persist(&data).await {
            for (checker, report) in &removed {
                data.put_report(checker, report);
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, NewAddress};
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(ip: &str) -> Address {
        NewAddress::parse(ip, "ops", "ssh brute force")
            .unwrap()
            .into_record(Action::Block)
    }

    #[tokio::test]
    async fn test_file_store_persists_records_and_reports() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        let address = record("203.0.113.5");
        store.create(&address).await.unwrap();
        store
            .put(
                "AbuseIPDB",
                &ReputationReport {
                    ip: address.ip,
                    abuse_confidence_score: 77,
                    country_code: Some("US".to_string()),
                    usage_type: None,
                    isp: Some("Example ISP".to_string()),
                    total_reports: 12,
                    num_distinct_users: 4,
                    last_reported_at: None,
                    fetched_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(AddressStore::get(&reopened, address.ip).await.unwrap(), Some(address.clone()));
        let report = ReportStore::get(&reopened, "AbuseIPDB", address.ip)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.abuse_confidence_score, 77);
        assert!(reopened.create(&address).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        let first = record("203.0.113.5");
        store.create(&first).await.unwrap();
        // Second write moves the first state into the backup
        store.create(&record("203.0.113.6")).await.unwrap();
        assert!(FileStore::backup_path(&path).exists());

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = FileStore::open(&path).await.unwrap();
        let all = recovered.get_all().await.unwrap();
        assert_eq!(all, vec![first]);
    }

    #[tokio::test]
    async fn test_delete_removes_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        let address = record("2001:db8::7");
        store.create(&address).await.unwrap();
        AddressStore::delete(&store, address.ip).await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrecoverable_corruption_is_surfaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store.create(&record("203.0.113.5")).await.unwrap();
        drop(store);

        let truncated = br#"{"version":"1.0","addresses":["#;
        fs::write(&path, truncated).await.unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("store.json"));

        // The damaged file is left for the operator
        assert_eq!(fs::read(&path).await.unwrap(), truncated.to_vec());
        assert!(!FileStore::backup_path(&path).exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_and_backup_is_surfaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"not json").await.unwrap();
        fs::write(FileStore::backup_path(&path), b"also not json")
            .await
            .unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("store.json.backup"));
        assert_eq!(fs::read(&path).await.unwrap(), b"not json".to_vec());
    }

    #[tokio::test]
    async fn test_sidecar_paths_keep_the_full_file_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.tmp");

        let store = FileStore::open(&path).await.unwrap();
        assert_ne!(store.temp_path(), path);
        assert_eq!(store.temp_path(), dir.path().join("state.tmp.tmp"));
        assert_eq!(
            FileStore::backup_path(&dir.path().join("a.json")),
            dir.path().join("a.json.backup")
        );
        assert_ne!(
            FileStore::backup_path(&dir.path().join("a.json")),
            FileStore::backup_path(&dir.path().join("a.txt"))
        );

        store.create(&record("198.51.100.1")).await.unwrap();
        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_all().await.unwrap().len(), 1);
    }
}
