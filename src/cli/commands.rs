//! CLI command implementations

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use crate::cli::{error, info, print_user_table, success, warn};
use crate::client::{navigate, AuthProvider, HttpAuthApi, LoginForm, Navigation, SubmitOutcome, View};
use crate::config::{self, Config, StoreKind};
use crate::store::PostgresStore;

/// Initialize a new matterdesk.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new("matterdesk.toml");

    if config_path.exists() {
        warn("matterdesk.toml already exists");
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)?;

    success("Created matterdesk.toml");
    info("Set AUTH_SECRET and DATABASE_URL, then run 'matterdesk migrate' and 'matterdesk serve'");

    Ok(())
}

/// Start the HTTP server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = load_config()?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info(&format!("Starting server at http://{}:{}", host, port));
    info(&format!("Auth bridge mounted at {}", config.mount_prefix()));

    crate::api::run_server(config, &host, port).await?;
    Ok(())
}

/// Apply the auth schema to the configured database
pub async fn migrate() -> Result<()> {
    let config = load_config()?;

    if config.database.store == StoreKind::Memory {
        warn("database.store is \"memory\"; nothing to migrate");
        return Ok(());
    }
    if config.database.url.is_empty() {
        error("database.url is not set (DATABASE_URL)");
        anyhow::bail!("missing database url");
    }

    match PostgresStore::connect(&config.database.url).await {
        Ok(store) => {
            store.migrate().await?;
            success("Auth tables are up to date");
            Ok(())
        }
        Err(e) => {
            error(&format!("Failed to connect to database: {}", e));
            Err(e.into())
        }
    }
}

/// Create an account through the server's auth bridge
pub async fn signup(name: &str, email: &str, password: &str, server: &str) -> Result<()> {
    let provider = client_provider(server)?;
    provider.mount().await;

    match provider.sign_up(name, email, password).await {
        Ok(user) => {
            success(&format!("Created account for {}", user.email));
            print_user_table(&user);
            Ok(())
        }
        Err(e) => {
            error(&format!("Sign up failed: {}", e));
            Err(e.into())
        }
    }
}

/// Run the login flow: session check, sign-in, then the dashboard
pub async fn login(email: &str, password: &str, server: &str) -> Result<()> {
    let prefix = load_config().map(|c| c.mount_prefix())?;
    let api = HttpAuthApi::new(server, &prefix)?;
    let provider = AuthProvider::new(Arc::new(api.clone()));
    provider.mount().await;

    if let Some(user) = provider.snapshot().user {
        info(&format!("Already signed in as {}", user.email));
    } else {
        let mut form = LoginForm::new(email, password);
        match form.submit(&provider).await {
            SubmitOutcome::LoggedIn(user) => success(&format!("Signed in as {}", user.email)),
            SubmitOutcome::Failed(message) => {
                error(&message);
                anyhow::bail!("login failed");
            }
            SubmitOutcome::Ignored => {
                warn("A login attempt is already in progress");
                return Ok(());
            }
        }
    }

    let state = provider.snapshot();
    match navigate(View::Dashboard.path(), &state) {
        Navigation::Render(View::Dashboard) => {
            if let Some(user) = &state.user {
                print_user_table(user);
            }
            let message = api.protected_message().await?;
            success(&message);
        }
        Navigation::Redirect(view) => warn(&format!("Redirected to {}", view.path())),
        other => warn(&format!("Dashboard not available: {:?}", other)),
    }

    Ok(())
}

// Helper functions

fn load_config() -> Result<Config> {
    config::load_config().map_err(|e| anyhow::anyhow!("{}", e))
}

fn client_provider(server: &str) -> Result<AuthProvider> {
    let config = load_config()?;
    let api = HttpAuthApi::new(server, &config.mount_prefix())?;
    Ok(AuthProvider::new(Arc::new(api)))
}
