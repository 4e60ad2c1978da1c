//! File-based storage backend for persistent storage.

use crate::backend::{merge_record, CredentialTransfer, Record, StorageBackend};
use crate::error::{validate_name, StorageError, StorageResult, TEMP_SUFFIX};
use crate::kind::BackendKind;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::Mutex;

const CREDENTIALS_DIR: &str = "credentials";
const STATE_FILE: &str = "state.json";
const CONFIG_FILE: &str = "config.json";
const USAGE_FILE: &str = "usage_stats.json";

/// A file-based storage backend.
///
/// Each namespace gets its own directory:
///
/// ```text
/// <dir>/
///   credentials/<name>     one JSON document per credential
///   state.json             { name: state }
///   config.json            { key: value }
///   usage_stats.json       { name: stats }
/// ```
///
/// # Durability
///
/// Every write goes to a temporary file first and is then renamed over the
/// target, so readers never observe a half-written document.
///
/// # Concurrency
///
/// Read-modify-write cycles on the shared JSON files are serialized by an
/// internal async mutex. Separate processes writing the same directory are
/// not coordinated.
///
/// # Example
///
/// ```no_run
/// use nsvault_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// # async fn demo() -> nsvault_storage::StorageResult<()> {
/// let backend = FileBackend::for_namespace(Path::new("data"), "tenant-a");
/// backend.initialize().await?;
/// backend.set_config("region", serde_json::json!("eu")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl FileBackend {
    /// Creates a backend rooted directly at `dir`.
    ///
    /// Nothing touches the disk until [`StorageBackend::initialize`].
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a backend for one namespace under a shared root directory.
    ///
    /// Characters outside `[A-Za-z0-9._-]` in the namespace key are
    /// percent-escaped, so every key maps to its own directory component.
    #[must_use]
    pub fn for_namespace(root: &Path, namespace_key: &str) -> Self {
        Self::new(root.join(encode_component(namespace_key)))
    }

    /// Returns the namespace directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn credentials_dir(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_DIR)
    }

    fn credential_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.credentials_dir().join(name))
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    async fn read_object(path: &Path) -> StorageResult<Option<Map<String, Value>>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(StorageError::corrupted(format!(
                "{} does not contain a JSON object",
                path.display()
            ))),
        }
    }

    async fn read_table(&self, file: &str) -> StorageResult<Map<String, Value>> {
        Ok(Self::read_object(&self.dir.join(file)).await?.unwrap_or_default())
    }

    async fn read_records(&self, file: &str) -> StorageResult<BTreeMap<String, Record>> {
        self.read_table(file)
            .await?
            .into_iter()
            .map(|(name, value)| match value {
                Value::Object(record) => Ok((name, record)),
                _ => Err(StorageError::corrupted(format!(
                    "entry {name:?} in {file} is not an object"
                ))),
            })
            .collect()
    }

    async fn write_value(path: &Path, value: &Value) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TEMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_table(&self, file: &str, table: Map<String, Value>) -> StorageResult<()> {
        Self::write_value(&self.dir.join(file), &Value::Object(table)).await
    }

    async fn merge_into_table(&self, file: &str, name: &str, updates: Record) -> StorageResult<bool> {
        validate_name(name)?;
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table(file).await?;
        let entry = table
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Record::new()));
        match entry {
            Value::Object(record) => merge_record(record, updates),
            _ => {
                return Err(StorageError::corrupted(format!(
                    "entry {name:?} in {file} is not an object"
                )))
            }
        }
        self.write_table(file, table).await?;
        Ok(true)
    }

    async fn get_from_table(&self, file: &str, name: &str) -> StorageResult<Record> {
        Ok(self.read_records(file).await?.remove(name).unwrap_or_default())
    }

    async fn remove_from_table(&self, file: &str, name: &str) -> StorageResult<bool> {
        let mut table = self.read_table(file).await?;
        if table.remove(name).is_none() {
            return Ok(false);
        }
        self.write_table(file, table).await?;
        Ok(true)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn initialize(&self) -> StorageResult<()> {
        fs::create_dir_all(self.credentials_dir()).await?;
        self.closed.store(false, Ordering::Release);
        tracing::debug!(dir = %self.dir.display(), "file storage ready");
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        // Serialize with in-flight writers so close never interrupts a rename.
        let _guard = self.write_lock.lock().await;
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn store_credential(&self, name: &str, data: Record) -> StorageResult<bool> {
        self.check_open()?;
        let path = self.credential_path(name)?;
        let _guard = self.write_lock.lock().await;
        Self::write_value(&path, &Value::Object(data)).await?;
        Ok(true)
    }

    async fn get_credential(&self, name: &str) -> StorageResult<Option<Record>> {
        self.check_open()?;
        if validate_name(name).is_err() {
            return Ok(None);
        }
        Self::read_object(&self.credentials_dir().join(name)).await
    }

    async fn list_credentials(&self) -> StorageResult<Vec<String>> {
        self.check_open()?;
        let mut entries = match fs::read_dir(self.credentials_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TEMP_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_credential(&self, name: &str) -> StorageResult<bool> {
        self.check_open()?;
        if validate_name(name).is_err() {
            return Ok(false);
        }
        let _guard = self.write_lock.lock().await;
        let existed = match fs::remove_file(self.credentials_dir().join(name)).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        self.remove_from_table(STATE_FILE, name).await?;
        self.remove_from_table(USAGE_FILE, name).await?;
        Ok(existed)
    }

    async fn update_credential_state(&self, name: &str, updates: Record) -> StorageResult<bool> {
        self.check_open()?;
        self.merge_into_table(STATE_FILE, name, updates).await
    }

    async fn get_credential_state(&self, name: &str) -> StorageResult<Record> {
        self.check_open()?;
        self.get_from_table(STATE_FILE, name).await
    }

    async fn get_all_credential_states(&self) -> StorageResult<BTreeMap<String, Record>> {
        self.check_open()?;
        self.read_records(STATE_FILE).await
    }

    async fn set_config(&self, key: &str, value: Value) -> StorageResult<bool> {
        self.check_open()?;
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table(CONFIG_FILE).await?;
        table.insert(key.to_string(), value);
        self.write_table(CONFIG_FILE, table).await?;
        Ok(true)
    }

    async fn get_config(&self, key: &str) -> StorageResult<Option<Value>> {
        self.check_open()?;
        Ok(self.read_table(CONFIG_FILE).await?.remove(key))
    }

    async fn get_all_config(&self) -> StorageResult<Map<String, Value>> {
        self.check_open()?;
        self.read_table(CONFIG_FILE).await
    }

    async fn delete_config(&self, key: &str) -> StorageResult<bool> {
        self.check_open()?;
        let _guard = self.write_lock.lock().await;
        self.remove_from_table(CONFIG_FILE, key).await
    }

    async fn update_usage_stats(&self, name: &str, updates: Record) -> StorageResult<bool> {
        self.check_open()?;
        self.merge_into_table(USAGE_FILE, name, updates).await
    }

    async fn get_usage_stats(&self, name: &str) -> StorageResult<Record> {
        self.check_open()?;
        self.get_from_table(USAGE_FILE, name).await
    }

    async fn get_all_usage_stats(&self) -> StorageResult<BTreeMap<String, Record>> {
        self.check_open()?;
        self.read_records(USAGE_FILE).await
    }

    fn details(&self) -> BTreeMap<String, String> {
        let mut details = BTreeMap::new();
        details.insert(
            "credentials_dir".to_string(),
            self.credentials_dir().display().to_string(),
        );
        details.insert(
            "state_file".to_string(),
            self.dir.join(STATE_FILE).display().to_string(),
        );
        details.insert(
            "config_file".to_string(),
            self.dir.join(CONFIG_FILE).display().to_string(),
        );
        details.insert(
            "usage_stats_file".to_string(),
            self.dir.join(USAGE_FILE).display().to_string(),
        );
        details
    }

    fn credential_transfer(&self) -> Option<&dyn CredentialTransfer> {
        Some(self)
    }
}

#[async_trait]
impl CredentialTransfer for FileBackend {
    async fn export_credential(&self, name: &str, output: &Path) -> StorageResult<bool> {
        self.check_open()?;
        if validate_name(name).is_err() {
            return Ok(false);
        }
        let source = self.credentials_dir().join(name);
        if !fs::try_exists(&source).await? {
            return Ok(false);
        }
        fs::copy(&source, output).await?;
        Ok(true)
    }

    async fn import_credential(&self, input: &Path, name: &str) -> StorageResult<bool> {
        self.check_open()?;
        let bytes = fs::read(input).await?;
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(data) => self.store_credential(name, data).await,
            _ => Err(StorageError::InvalidDocument(format!(
                "{} does not contain a JSON object",
                input.display()
            ))),
        }
    }
}

/// Maps a namespace key to a directory name, one-to-one.
///
/// Bytes outside `[A-Za-z0-9._-]` become `%XX`. `%` is itself escaped so
/// distinct keys never share a directory.
fn encode_component(key: &str) -> String {
    match key {
        "" => return "%".to_string(),
        "." => return "%2E".to_string(),
        ".." => return "%2E%2E".to_string(),
        _ => {}
    }
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
