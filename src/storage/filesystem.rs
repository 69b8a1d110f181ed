use crate::error::{Error, Result};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

/// Stores each key as a pretty-printed `<key>.json` file inside one directory.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    data_dir: PathBuf,
}

impl FileSystemStore {
    /// Creates a new FileSystemStore instance.
    /// Ensures the data directory exists.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let path_buf = data_dir.as_ref().to_path_buf();
        // Synchronous in the constructor; async methods report any lasting failure
        if let Err(e) = std::fs::create_dir_all(&path_buf) {
            error!(path = %path_buf.display(), error = %e, "Failed to create data directory during initialization");
        }
        Self { data_dir: path_buf }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileSystemStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::store(format_args!("Failed to read {}", path.display()), e))
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| Error::store(format_args!("Failed to parse {}", path.display()), e))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.key_path(key);
        let contents = serde_json::to_string_pretty(&value)
            .map_err(|e| Error::store(format_args!("Failed to serialize key '{}'", key), e))?;

        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).await.map_err(|e| {
                Error::store(format_args!("Failed to create data directory '{}'", self.data_dir.display()), e)
            })?;
        }

        // Write next to the target and rename so readers never observe a partial file
        let tmp = path.with_extension(format!("json.{}.tmp", rand::random::<u32>()));
        if let Err(e) = write_and_rename(&tmp, &path, contents.as_bytes()).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                debug!(path = %tmp.display(), error = %cleanup, "Temp file not removed");
            }
            return Err(e);
        }
        debug!(key, path = %path.display(), "Persisted key");
        Ok(())
    }
}

async fn write_and_rename(tmp: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp)
        .await
        .map_err(|e| Error::store(format_args!("Failed to create {}", tmp.display()), e))?;
    file.write_all(contents)
        .await
        .map_err(|e| Error::store(format_args!("Failed to write {}", tmp.display()), e))?;
    file.sync_all()
        .await
        .map_err(|e| Error::store(format_args!("Failed to flush {}", tmp.display()), e))?;
    drop(file);

    fs::rename(tmp, path)
        .await
        .map_err(|e| Error::store(format_args!("Failed to replace {}", path.display()), e))
}
