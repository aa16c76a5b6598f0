//! CLI interface for Matterdesk

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "matterdesk")]
#[command(author = "Krakaw")]
#[command(version = "0.1.0")]
#[command(about = "Auth gateway and session tooling for Matterdesk", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new matterdesk.toml configuration file
    Init,

    /// Start the HTTP server with the auth bridge and guarded routes
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create or update the auth tables in the configured database
    Migrate,

    /// Create an account against a running server
    Signup {
        /// Display name
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "MATTERDESK_PASSWORD")]
        password: String,

        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,
    },

    /// Sign in against a running server and open the dashboard
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "MATTERDESK_PASSWORD")]
        password: String,

        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,
    },
}
