use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use taskvault::{PatchInput, StoreConfig, TaskInput, TaskQuery, TaskService};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskvault")]
#[command(about = "Operator tooling for the TaskVault file-backed task store")]
struct Cli {
    /// Override TASKVAULT_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seed sample tasks when the store has no live file yet
    #[arg(long, global = true)]
    seed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tasks with filters, sorting and pagination
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        order: Option<String>,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        limit: Option<String>,
    },
    Get {
        id: String,
    },
    Add(TaskArgs),
    /// Bulk create from a JSON array of task payloads
    Import {
        path: PathBuf,
    },
    Replace {
        id: String,
        #[command(flatten)]
        task: TaskArgs,
    },
    /// Partial update, e.g. `--set status=completed --set dueDate=null`
    Patch {
        id: String,
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },
    Delete {
        id: String,
    },
    Backups,
    Restore {
        snapshot_id: String,
    },
    Stats,
    Health,
}

#[derive(Args)]
struct TaskArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    priority: Option<String>,
    /// YYYY-MM-DD, or an empty string to clear
    #[arg(long)]
    due: Option<String>,
}

impl TaskArgs {
    fn into_input(self) -> TaskInput {
        TaskInput {
            title: Some(self.title),
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due.map(|due| (!due.is_empty()).then_some(due)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = StoreConfig::from_env().context("failed to load store configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.seed {
        config.seed_sample_data = true;
    }

    let service = TaskService::open(&config)
        .await
        .with_context(|| format!("failed to open task store in {}", config.data_dir.display()))?;

    match cli.command {
        Command::List {
            status,
            priority,
            search,
            sort,
            order,
            page,
            limit,
        } => {
            let params = [
                ("status", status),
                ("priority", priority),
                ("search", search),
                ("sort", sort),
                ("order", order),
                ("page", page),
                ("limit", limit),
            ];
            let query = TaskQuery::from_params(
                params
                    .iter()
                    .filter_map(|(key, value)| value.as_deref().map(|value| (*key, value))),
            )?;
            print_json(&service.list_tasks(&query).await?)
        }
        Command::Get { id } => print_json(&service.get_task(&id).await?),
        Command::Add(task) => print_json(&service.create_task(task.into_input()).await?),
        Command::Import { path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let inputs: Vec<TaskInput> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of tasks", path.display()))?;
            let outcome = service.bulk_create(inputs).await?;
            info!(
                created = outcome.created.len(),
                rejected = outcome.errors.len(),
                "import finished"
            );
            print_json(&outcome)
        }
        Command::Replace { id, task } => {
            print_json(&service.replace_task(&id, task.into_input()).await?)
        }
        Command::Patch { id, set } => {
            let patch = parse_assignments(&set)?;
            print_json(&service.patch_task(&id, patch).await?)
        }
        Command::Delete { id } => print_json(&service.delete_task(&id).await?),
        Command::Backups => print_json(&service.list_backups().await?),
        Command::Restore { snapshot_id } => {
            print_json(&service.restore_backup(&snapshot_id).await?)
        }
        Command::Stats => print_json(&service.stats().await?),
        Command::Health => print_json(&service.health_stats().await?),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskvault=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `field=value` pairs; `null` is sent as JSON null.
fn parse_assignments(pairs: &[String]) -> Result<PatchInput> {
    pairs.iter().try_fold(PatchInput::new(), |patch, pair| {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{}'", pair))?;
        let value = match value {
            "null" => Value::Null,
            other => Value::String(other.to_string()),
        };
        Ok(patch.set(field.trim(), value))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{}", rendered);
    Ok(())
}
