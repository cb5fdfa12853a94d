use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tracing::info;

use server::{
    auth::{hash_password, Role},
    config::AppConfig,
    http::{self, AppState, ServeConfig},
    obs::init_tracing,
};

#[derive(Parser, Debug)]
#[command(name = "roster-server", version, about = "Employee roster service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Create the initial admin user from ADMIN_USERNAME / ADMIN_PASSWORD.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up(&config).await,
            MigrateCommand::Down => migrate_down(&config).await,
        },
        Command::Seed => run_seed(&config).await,
    }
}

async fn connect(config: &AppConfig) -> Result<DatabaseConnection> {
    Database::connect(&config.database_url)
        .await
        .map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let db = connect(&config).await?;
    ensure_migrations(&db, cmd.allow_dirty).await?;
    let state = AppState::new(db, config);
    http::serve(ServeConfig::new(cmd.host, cmd.port), state).await
}

async fn ensure_migrations(db: &DatabaseConnection, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `cargo run -p server -- migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up(config: &AppConfig) -> Result<()> {
    let db = connect(config).await?;
    Migrator::up(&db, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(config: &AppConfig) -> Result<()> {
    let db = connect(config).await?;
    Migrator::down(&db, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let password =
        std::env::var("ADMIN_PASSWORD").map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD missing"))?;

    let db = connect(config).await?;
    let existing = entity::user::Entity::find()
        .filter(entity::user::Column::Username.eq(username.as_str()))
        .one(&db)
        .await?;
    if existing.is_some() {
        info!(%username, "admin user already present; nothing to do");
        return Ok(());
    }

    let password_hash =
        hash_password(&password).map_err(|err| anyhow::anyhow!("password hash: {err}"))?;
    entity::user::ActiveModel {
        username: Set(username.clone()),
        password_hash: Set(password_hash),
        role: Set(Role::Admin.into()),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    info!(%username, "admin user created");
    Ok(())
}
