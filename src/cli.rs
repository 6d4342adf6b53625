use clap::{Parser, Subcommand};

/// Portal — session-gated API with one-time CSRF tokens
#[derive(Parser)]
#[command(name = "portal", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (overrides PORTAL_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Local session helpers
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Mint a session JWT signed with PORTAL_SESSION_SECRET (development only)
    Mint {
        /// Principal id (`sub` claim)
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        permissions: Option<Vec<String>>,
        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: i64,
    },
}
