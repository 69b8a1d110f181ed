use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemStore;
pub use memory::MemoryStore;

/// Key under which the prompt collection is persisted.
pub const PROMPTS_KEY: &str = "prompts";
/// Key under which the backup ring is persisted.
pub const BACKUPS_KEY: &str = "backups";
pub const SELECTORS_KEY: &str = "selectors";
pub const THEME_KEY: &str = "theme";

/// Asynchronous key-value store that every other component reads and writes through.
///
/// Values are whole JSON documents; a key is read and written as one unit. Failures
/// surface as `Error::StoreUnavailable` and are never retried here. Implementations are
/// shared between components as `Arc<dyn KeyValueStore>`.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` if the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}
