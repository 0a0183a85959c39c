//! tasklit binary entry point.

use anyhow::Result;
use clap::Parser;
use tasklit::cli::{Cli, Command};
use tasklit::config::Config;
use tasklit::db::Database;
use tasklit::logging::{self, LogTarget};
use tasklit::server::{self, AppState};
use tasklit::service::TaskService;
use tracing::info;

/// Resolve configuration and apply CLI overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::resolve(cli.config.as_deref())?;

    if let Some(database) = &cli.database {
        config.server.db_path = database.clone();
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    Ok(config)
}

async fn serve(config: Config, db: Database) -> Result<()> {
    let service = TaskService::new(db, config.api.clone());
    let handle = server::start_server(AppState::new(service), &config.bind_addr()).await?;

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C");

    handle.shutdown().await
}

fn migrate(db: &Database) -> Result<()> {
    let tasks = db.count_tasks()?;
    let tags = db.count_tags()?;
    info!(tasks, tags, "Migrations applied");
    println!("Database is up to date: {} tasks, {} tags", tasks, tags);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let config = load_config(&cli)?;
    config.ensure_db_dir()?;

    // Opening the database applies pending migrations
    let db = Database::open(&config.server.db_path)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::Migrate => migrate(&db),
    }
}
