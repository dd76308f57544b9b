use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::{migrate::MigrateDatabase, Postgres};

use skillify_common::DatabaseConfig;
use skillify_database::{create_pool, MigrationRunner, SEED_PASSWORD};

#[derive(Parser)]
#[command(name = "db-cli")]
#[command(about = "Skillify Database CLI Tool")]
struct Cli {
    /// Database URL override (defaults to DATABASE_URL or the DATABASE_* variables)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Check migration status
    Status,
    /// Seed the demo mentors
    Seed,
    /// Reset database (drop, recreate, migrate)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
        /// Seed the demo mentors after migrating
        #[arg(long)]
        seed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = get_database_config(cli.database_url)?;

    match cli.command {
        Commands::Migrate => {
            let pool = create_pool(&config).await?;
            MigrationRunner::new(pool).run_all_migrations().await?;

            println!("✅ Migrations completed successfully");
        }
        Commands::Status => {
            let pool = create_pool(&config).await?;
            let status = MigrationRunner::new(pool).check_migration_status().await?;
            println!("📊 {}", status);

            if status.is_up_to_date {
                println!("✅ Database is up to date");
            } else {
                println!("⚠️  Database needs migration");
            }
        }
        Commands::Seed => {
            let pool = create_pool(&config).await?;
            let seeded = MigrationRunner::new(pool).seed_initial_data().await?;
            println!(
                "✅ Seeded {} mentors (password: {})",
                seeded, SEED_PASSWORD
            );
        }
        Commands::Reset { force, seed } => {
            if !force {
                println!(
                    "⚠️  This will delete ALL data in database '{}'!",
                    config.database
                );
                println!("Type 'yes' to continue:");

                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;

                if input.trim() != "yes" {
                    println!("❌ Operation cancelled");
                    return Ok(());
                }
            }

            let connection_string = config.connection_string();
            if Postgres::database_exists(&connection_string).await? {
                tracing::info!("Dropping database: {}", config.database);
                Postgres::drop_database(&connection_string)
                    .await
                    .context("failed to drop database; close open connections and retry")?;
            }

            // create_pool recreates the missing database
            let pool = create_pool(&config).await?;
            let runner = MigrationRunner::new(pool);
            runner.run_all_migrations().await?;
            if seed {
                let seeded = runner.seed_initial_data().await?;
                println!("🌱 Seeded {} mentors", seeded);
            }

            println!("✅ Database reset completed");
        }
    }

    Ok(())
}

fn get_database_config(database_url: Option<String>) -> anyhow::Result<DatabaseConfig> {
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    match database_url.or_else(|| std::env::var("DATABASE_URL").ok()) {
        Some(raw) => {
            let url = url::Url::parse(&raw).context("invalid database URL")?;

            Ok(DatabaseConfig {
                host: url.host_str().unwrap_or("localhost").to_string(),
                port: url.port().unwrap_or(5432),
                username: url.username().to_string(),
                password: url.password().unwrap_or("").to_string(),
                database: url.path().trim_start_matches('/').to_string(),
                max_connections,
                url: Some(raw),
            })
        }
        None => Ok(DatabaseConfig {
            url: None,
            host: std::env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("DATABASE_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            username: std::env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "skillify".to_string()),
            password: std::env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "skillify".to_string()),
            database: std::env::var("DATABASE_NAME").unwrap_or_else(|_| "skillify".to_string()),
            max_connections,
        }),
    }
}
