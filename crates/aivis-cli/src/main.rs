mod analyze;
mod report;

use clap::{Parser, Subcommand};

use aivis_core::load_app_config;

#[derive(Debug, Parser)]
#[command(name = "aivis-cli")]
#[command(about = "AI search visibility analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance commands.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Print the probe queries that would be generated for a company.
    Queries {
        /// Company slug from the companies config file.
        company: String,
    },
    /// Run a full analysis for a company and persist the results.
    Analyze {
        /// Company slug from the companies config file.
        company: String,
        /// Print the plan without fetching or writing anything.
        #[arg(long)]
        dry_run: bool,
        /// Restrict fetches to these providers (comma-separated).
        #[arg(long, value_delimiter = ',')]
        providers: Vec<aivis_serp::ProviderId>,
    },
    /// Show recent analysis runs and their scores for a company.
    Report {
        /// Company slug from the companies config file.
        company: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify database connectivity.
    Ping,
    /// Apply pending migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_app_config()?;

    match cli.command {
        Some(Commands::Db { command }) => {
            let pool =
                aivis_db::connect_pool(&config.database_url, aivis_db::PoolConfig::from_app_config(&config))
                    .await?;
            match command {
                DbCommands::Ping => {
                    aivis_db::ping(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = aivis_db::run_migrations(&pool).await?;
                    println!("applied {applied} migrations");
                }
            }
        }
        Some(Commands::Queries { company }) => {
            analyze::print_queries(&config, &company)?;
        }
        Some(Commands::Analyze {
            company,
            dry_run,
            providers,
        }) => {
            if dry_run {
                analyze::print_queries(&config, &company)?;
            } else {
                let pool = aivis_db::connect_pool(
                    &config.database_url,
                    aivis_db::PoolConfig::from_app_config(&config),
                )
                .await?;
                analyze::run_analyze(&pool, &config, &company, providers).await?;
            }
        }
        Some(Commands::Report { company, limit }) => {
            let pool = aivis_db::connect_pool(
                &config.database_url,
                aivis_db::PoolConfig::from_app_config(&config),
            )
            .await?;
            report::run_report(&pool, &company, limit).await?;
        }
        None => {
            println!("no command given; try `aivis-cli --help`");
        }
    }

    Ok(())
}
