use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prompt_keeper::backup::InstallReason;
use prompt_keeper::models::InjectionRequest;
use prompt_keeper::storage::FileSystemStore;
use prompt_keeper::{
    BackupPolicy, BackupReason, ImportOutcome, LifecycleEvent, PromptDraft, PromptKeeper,
    RateLimitScope,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the persisted keys
    #[arg(long, env = "PROMPT_KEEPER_DIR", default_value = "./prompt-data")]
    data_dir: PathBuf,

    /// Throttle manual and pre-import/pre-restore backups too, not only automatic ones
    #[arg(long)]
    rate_limit_all: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List prompts, favorites first
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print one prompt as JSON
    Show { id: String },
    /// Create a prompt
    Add {
        #[arg(long)]
        label: String,
        #[arg(long)]
        template: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Replace an existing prompt
    Edit {
        id: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    Delete { id: String },
    /// Toggle the favorite flag
    Favorite { id: String },
    /// List all distinct tags
    Tags,
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON document, taking a pre-import backup first
    Import { file: PathBuf },
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Simulate a browser lifecycle event
    Trigger { event: TriggerEvent },
    /// Show injection selectors
    Selectors {
        #[arg(long)]
        host: Option<String>,
    },
    Theme {
        #[arg(long)]
        cycle: bool,
    },
    /// Print the injection request the popup would send for a prompt
    Inject { id: String },
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    Create {
        #[arg(long, default_value = "manual")]
        reason: BackupReason,
    },
    List,
    /// Restore a backup, taking a pre-restore backup first
    Restore { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TriggerEvent {
    Startup,
    Update,
    Install,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=prompt_keeper=debug
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    tracing::debug!(args = ?args, "Starting prompt-keeper");

    let policy = BackupPolicy {
        scope: if args.rate_limit_all { RateLimitScope::All } else { RateLimitScope::AutomaticOnly },
        ..BackupPolicy::default()
    };
    let store = FileSystemStore::new(&args.data_dir);
    tracing::debug!(path = %store.data_dir().display(), "Using filesystem store");
    let keeper = PromptKeeper::with_policy(Arc::new(store), policy);

    run(&keeper, args.command).await
}

async fn run(keeper: &PromptKeeper, command: Command) -> Result<()> {
    match command {
        Command::List { tag } => {
            for prompt in keeper.prompts.list().await {
                if let Some(tag) = &tag {
                    if !prompt.tags.iter().any(|t| t == tag) {
                        continue;
                    }
                }
                let star = if prompt.favorite { "*" } else { " " };
                println!("{} {}  {}  [{}]", star, prompt.id, prompt.label, prompt.tags.join(", "));
            }
        }
        Command::Show { id } => match keeper.prompts.get_by_id(&id).await {
            Some(prompt) => println!("{}", serde_json::to_string_pretty(&prompt)?),
            None => bail!("Prompt '{}' not found", id),
        },
        Command::Add { label, template, tags } => {
            let saved = keeper
                .prompts
                .save(PromptDraft::new(label, template).with_tags(tags))
                .await
                .context("Failed to save prompt")?;
            println!("{}", saved.id);
        }
        Command::Edit { id, label, template, tags } => {
            let Some(existing) = keeper.prompts.get_by_id(&id).await else {
                bail!("Prompt '{}' not found", id);
            };
            let mut draft = PromptDraft::from(&existing);
            if let Some(label) = label {
                draft.label = label;
            }
            if let Some(template) = template {
                draft.template = template;
            }
            if let Some(tags) = tags {
                draft.tags = tags.into();
            }
            keeper.prompts.save(draft).await.context("Failed to save prompt")?;
        }
        Command::Delete { id } => {
            keeper
                .prompts
                .delete_by_id(&id)
                .await
                .with_context(|| format!("Failed to delete prompt '{}'", id))?;
        }
        Command::Favorite { id } => {
            let favorite = keeper
                .prompts
                .toggle_favorite(&id)
                .await
                .with_context(|| format!("Failed to toggle favorite for '{}'", id))?;
            println!("{}", if favorite { "added to favorites" } else { "removed from favorites" });
        }
        Command::Tags => {
            for tag in keeper.prompts.list_tags().await {
                println!("{}", tag);
            }
        }
        Command::Export { output } => {
            let json = keeper.transfer.export().await.context("Failed to export prompts")?;
            match output {
                Some(path) => tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("Failed to write export file: {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let document = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read import file: {}", file.display()))?;
            let summary = keeper
                .import_with_backup(&document)
                .await
                .context("Failed to import prompts")?;
            match summary.outcome() {
                ImportOutcome::Nothing => println!("No new prompts imported"),
                ImportOutcome::All => println!("Imported {} prompts", summary.imported),
                ImportOutcome::Partial => println!(
                    "Imported {} of {} prompts (duplicates or incomplete entries skipped)",
                    summary.imported, summary.total
                ),
            }
        }
        Command::Backup(BackupCommand::Create { reason }) => {
            match keeper.backups.create_backup(reason).await {
                Some(backup) => println!("{}", backup.id),
                None => println!("No backup created"),
            }
        }
        Command::Backup(BackupCommand::List) => {
            for backup in keeper.backups.list_backups().await {
                println!("{}  {}  {} prompts  {}", backup.id, backup.date, backup.prompt_count, backup.reason);
            }
        }
        Command::Backup(BackupCommand::Restore { id }) => {
            let summary = keeper
                .restore_with_backup(&id)
                .await
                .with_context(|| format!("Failed to restore backup '{}'", id))?;
            println!("Restored {} prompts", summary.restored);
        }
        Command::Trigger { event } => {
            let event = match event {
                TriggerEvent::Startup => LifecycleEvent::Startup,
                TriggerEvent::Update => LifecycleEvent::Installed { reason: InstallReason::Update },
                TriggerEvent::Install => LifecycleEvent::Installed { reason: InstallReason::Install },
            };
            keeper.backups.handle_event(event).await;
        }
        Command::Selectors { host: Some(host) } => match keeper.selectors.selector_for(&host).await {
            Some(selector) => println!("{}", selector),
            None => println!("No selector for {}, generic fallbacks apply", host),
        },
        Command::Selectors { host: None } => {
            for (host, selector) in keeper.selectors.get().await {
                println!("{}  {}", host, selector);
            }
        }
        Command::Theme { cycle } => {
            let theme = if cycle {
                keeper.preferences.cycle_theme().await.context("Failed to save theme")?
            } else {
                keeper.preferences.theme().await
            };
            println!("{}", theme);
        }
        Command::Inject { id } => {
            let Some(prompt) = keeper.prompts.get_by_id(&id).await else {
                bail!("Prompt '{}' not found", id);
            };
            let request = InjectionRequest { text: prompt.template };
            println!("{}", serde_json::to_string(&request)?);
        }
    }
    Ok(())
}
