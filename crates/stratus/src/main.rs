mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stratus_cloud::StateStore;
use stratus_config::ProviderConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Drive cloud resources through create, read, update and delete", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory holding .stratus/state.json
    #[arg(long, global = true, env = "STRATUS_PROJECT", default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the attribute schema of a resource or data source type
    Schema {
        /// Type name (lists every type when omitted)
        type_name: Option<String>,
    },
    /// Validate a configuration file without contacting the cloud
    Validate {
        /// Resource or data source type
        type_name: String,
        /// JSON file with the desired attributes
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Create a resource and wait until it is ready
    Create {
        /// Resource type
        type_name: String,
        /// Local name of the instance
        name: String,
        /// JSON file with the desired attributes
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Refresh a tracked resource from the cloud
    Read {
        /// Resource type
        type_name: String,
        /// Local name of the instance
        name: String,
    },
    /// Apply changed attributes to a tracked resource
    Update {
        /// Resource type
        type_name: String,
        /// Local name of the instance
        name: String,
        /// JSON file with the desired attributes
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete a tracked resource and wait until it is gone
    Delete {
        /// Resource type
        type_name: String,
        /// Local name of the instance
        name: String,
    },
    /// Start tracking an existing remote object
    Import {
        /// Resource type
        type_name: String,
        /// Local name of the instance
        name: String,
        /// Remote id
        id: String,
    },
    /// Find exactly one remote object through a data source
    Lookup {
        /// Data source type
        type_name: String,
        /// JSON file with the filter attributes
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Inspect the local state file
    #[command(subcommand)]
    State(StateCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum StateCommands {
    /// List tracked resources
    List {
        /// Only resources of this type
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,
    },
    /// Show the stored attributes of one resource
    Show {
        /// Resource type
        type_name: String,
        /// Local name of the instance
        name: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        verbose,
        project,
        command,
    } = Cli::parse();

    init_tracing(verbose);

    // Commands that work without credentials
    match &command {
        Commands::Version => {
            println!("stratus {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Schema { type_name } => return commands::schema::handle(type_name.as_deref()),
        Commands::Validate { type_name, file } => return commands::validate::handle(type_name, file),
        Commands::State(StateCommands::List { type_name }) => {
            let store = StateStore::new(&project);
            return commands::state::handle_list(&store, type_name.as_deref()).await;
        }
        Commands::State(StateCommands::Show { type_name, name }) => {
            let store = StateStore::new(&project);
            return commands::state::handle_show(&store, type_name, name).await;
        }
        _ => {}
    }

    let config = ProviderConfig::load()?;
    let provider = stratus_cloud_otc::provider(&config)?;
    let store = StateStore::new(&project);
    tracing::debug!("Using project directory {}", project.display());

    let ctx = commands::lifecycle::Context {
        provider: &provider,
        store: &store,
        region: &config.region,
    };

    match command {
        Commands::Create {
            type_name,
            name,
            file,
        } => commands::lifecycle::create(&ctx, &type_name, &name, &file).await,
        Commands::Read { type_name, name } => {
            commands::lifecycle::read(&ctx, &type_name, &name).await
        }
        Commands::Update {
            type_name,
            name,
            file,
        } => commands::lifecycle::update(&ctx, &type_name, &name, &file).await,
        Commands::Delete { type_name, name } => {
            commands::lifecycle::delete(&ctx, &type_name, &name).await
        }
        Commands::Import {
            type_name,
            name,
            id,
        } => commands::lifecycle::import(&ctx, &type_name, &name, &id).await,
        Commands::Lookup { type_name, file } => {
            commands::lookup::handle(&provider, &type_name, file.as_deref()).await
        }
        Commands::Version
        | Commands::Schema { .. }
        | Commands::Validate { .. }
        | Commands::State(_) => Ok(()),
    }
}
