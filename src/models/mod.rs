pub mod backup;
pub mod injection;
pub mod prompt;

pub use backup::{Backup, BackupReason};
pub use injection::{InjectionFallback, InjectionRequest, InjectionResponse};
pub use prompt::{generate_id, Prompt, PromptDraft, TagInput};
