use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Log in to the Hireboard backend and make authenticated API calls.
#[derive(Parser, Debug)]
#[command(name = "hireboard", about = "Hireboard session gate CLI")]
pub struct Cli {
    /// Backend base URL; API paths are resolved relative to it.
    #[arg(long, global = true, env = "HIREBOARD_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the stored session token.
    #[arg(long, global = true, env = "HIREBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Exchange credentials for a token and show the home screen for the user's role.
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "HIREBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored token.
    Logout,

    /// Check the stored token locally, without contacting the backend.
    Status,

    /// Restore the session and show the resolved role.
    Whoami,

    /// GET a backend path.
    Get(PathArgs),

    /// POST to a backend path.
    Post(BodyArgs),

    /// PUT to a backend path.
    Put(BodyArgs),

    /// PATCH a backend path.
    Patch(BodyArgs),

    /// Print the CLI version.
    Version,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Path relative to the API base, e.g. `JobPosting`.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct BodyArgs {
    /// Path relative to the API base, e.g. `JobPosting`.
    pub path: String,

    /// JSON request body.
    #[arg(long)]
    pub body: Option<String>,
}
