use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matterdesk::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up DATABASE_URL / AUTH_SECRET from a local .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matterdesk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Serve { host, port } => cli::commands::serve(host, port).await,
        Commands::Migrate => cli::commands::migrate().await,
        Commands::Signup {
            name,
            email,
            password,
            server,
        } => cli::commands::signup(&name, &email, &password, &server).await,
        Commands::Login {
            email,
            password,
            server,
        } => cli::commands::login(&email, &password, &server).await,
    }
}
