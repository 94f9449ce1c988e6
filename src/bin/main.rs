use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::{AuthConfig, DatabaseConfig, Environment, Server, ServerConfig};

#[derive(Parser)]
#[command(name = "tollgate")]
#[command(about = "Token-authenticated API server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, env = "PORT", default_value_t = 8080)]
        port: u16,
        /// Data store endpoint, e.g. "memory" or a remote SurrealDB URL
        #[arg(long, env = "DB_URL", default_value = "memory")]
        db_url: String,
        /// Expected token issuer
        #[arg(long, env = "AUTH_ISSUER")]
        issuer: String,
        /// Expected token audience
        #[arg(long, env = "AUTH_AUDIENCE")]
        audience: String,
        /// JWKS endpoint used to verify token signatures
        #[arg(long, env = "AUTH_JWKS_URL")]
        jwks_url: String,
    },
    /// Initialize the data store schema
    Init {
        #[arg(long, env = "DB_URL", default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tollgate=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            db_url,
            issuer,
            audience,
            jwks_url,
        } => {
            let config = ServerConfig {
                port,
                database: DatabaseConfig {
                    url: db_url,
                    ..Default::default()
                },
                auth: AuthConfig::new(issuer, audience, jwks_url),
                environment: Environment::from_env(),
            };

            let server = Server::start(config).await?;
            server.run_until_shutdown().await
        }
        Commands::Init { db_url } => {
            let config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Initializing data store at {}", config.url);

            let db = tollgate::create_connection(config).await?;
            tollgate::ensure_schema(&db).await?;

            info!("Data store initialized");
            Ok(())
        }
    }
}
