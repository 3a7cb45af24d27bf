pub mod commands;
pub mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use clientdesk_core::config::{ConfigOverrides, DeskConfig, LoadOptions, LogFormat};
use clientdesk_core::domain::customer::CustomerId;

use commands::customers::{Backend, CustomerAction, FieldInput};

#[derive(Debug, Parser)]
#[command(
    name = "clientdesk",
    about = "Customer desk CLI",
    long_about = "List, search, create, edit, delete and export customers held by a REST customer service.",
    after_help = "Examples:\n  clientdesk list\n  clientdesk search ana\n  clientdesk delete 7 --yes\n  clientdesk doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a clientdesk.toml file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the customers endpoint URL")]
    pub base_url: Option<String>,
    #[arg(long, global = true, value_enum, default_value_t = Backend::Http, help = "Backend to talk to")]
    pub backend: Backend,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides { api_base_url: self.base_url.clone(), ..ConfigOverrides::default() },
        }
    }
}

#[derive(Debug, Clone, Args)]
struct FieldArgs {
    #[arg(long)]
    national_id: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    contact: Option<String>,
}

impl From<FieldArgs> for FieldInput {
    fn from(args: FieldArgs) -> Self {
        Self {
            national_id: args.national_id,
            first_name: args.first_name,
            last_name: args.last_name,
            contact: args.contact,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show every customer")]
    List,
    #[command(about = "Filter customers by name, national ID or contact")]
    Search { term: String },
    #[command(about = "Show one customer as it would populate the edit form")]
    Show { id: CustomerId },
    #[command(about = "Create a customer")]
    Create {
        #[command(flatten)]
        fields: FieldArgs,
    },
    #[command(about = "Update a customer; omitted fields keep their current value")]
    Update {
        id: CustomerId,
        #[command(flatten)]
        fields: FieldArgs,
    },
    #[command(about = "Delete a customer after confirmation")]
    Delete {
        id: CustomerId,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Export every customer to customers_<date>.csv")]
    Export {
        #[arg(long, help = "Directory to write into (defaults to export.directory)")]
        dir: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and check that the customer service is reachable")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Command::Config => commands::config::run(&global.load_options(), &global),
        Command::Doctor { json } => commands::doctor::run(&global.load_options(), global.backend, json),
        Command::List => commands::customers::run(&global, CustomerAction::List, false),
        Command::Search { term } => {
            commands::customers::run(&global, CustomerAction::Search(term), false)
        }
        Command::Show { id } => commands::customers::run(&global, CustomerAction::Show(id), false),
        Command::Create { fields } => {
            commands::customers::run(&global, CustomerAction::Create(fields.into()), false)
        }
        Command::Update { id, fields } => {
            commands::customers::run(&global, CustomerAction::Update(id, fields.into()), false)
        }
        Command::Delete { id, yes } => {
            commands::customers::run(&global, CustomerAction::Delete(id), yes)
        }
        Command::Export { dir } => {
            commands::customers::run(&global, CustomerAction::Export(dir), false)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays clean; `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &DeskConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed (tests); keep it.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
