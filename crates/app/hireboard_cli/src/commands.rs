use std::sync::Arc;

use hireboard_core::config::GateConfig;
use hireboard_core::gateway::{ApiClient, ApiOutcome, Navigator};
use hireboard_core::session::{SessionController, SessionState};
use hireboard_core::store::{FileTokenStore, TokenStore};
use hireboard_core::token;
use serde_json::Value;

use crate::cli::{BodyArgs, Cli, Commands};
use crate::navigator::ConsoleNavigator;
use crate::Result;

enum Method {
    Post,
    Put,
    Patch,
}

pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config_from(&cli);
    log::debug!("api: {}, data dir: {}", config.api_url, config.data_dir.display());
    let store = Arc::new(FileTokenStore::new(&config.data_dir, &config.token_key));
    let client = ApiClient::from_config(&config, store)?;
    let session = SessionController::new(client);

    match cli.command {
        Commands::Version => {}
        Commands::Login { email, password } => {
            let role = session.login(&email, &password).await?;
            println!("logged in as {role} → {}", role.home_route().name);
        }
        Commands::Logout => {
            session.logout().await?;
            println!("logged out");
        }
        Commands::Status => status(&session).await?,
        Commands::Whoami => match session.boot().await? {
            SessionState::Authenticated(role) => {
                println!("{role} → {}", role.home_route().name);
            }
            _ => println!("logged out"),
        },
        Commands::Get(args) => {
            let outcome = session
                .client()
                .get(&args.path, Some(&ConsoleNavigator))
                .await?;
            print_outcome(outcome)?;
        }
        Commands::Post(args) => send(&session, Method::Post, args).await?,
        Commands::Put(args) => send(&session, Method::Put, args).await?,
        Commands::Patch(args) => send(&session, Method::Patch, args).await?,
    }

    Ok(())
}

/// Environment first, then explicit flags.
fn config_from(cli: &Cli) -> GateConfig {
    let mut config = GateConfig::from_env();
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    config
}

async fn status(session: &SessionController) -> Result<()> {
    let Some(stored) = session.client().store().read().await? else {
        println!("logged out");
        return Ok(());
    };

    match token::decode_claims(&stored) {
        Ok(claims) if claims.is_live() => {
            let until = claims
                .expires_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            let who = claims.email.or(claims.subject).unwrap_or_default();
            println!("live until {until} {who}");
        }
        Ok(_) => {
            session.check().await?;
            println!("expired");
        }
        Err(e) => {
            log::debug!("{e}");
            session.check().await?;
            println!("invalid token");
        }
    }
    Ok(())
}

async fn send(session: &SessionController, method: Method, args: BodyArgs) -> Result<()> {
    let body: Option<Value> = args.body.as_deref().map(serde_json::from_str).transpose()?;
    let client = session.client();
    let navigator = Some(&ConsoleNavigator as &dyn Navigator);
    let outcome = match method {
        Method::Post => client.post(&args.path, body.as_ref(), navigator).await?,
        Method::Put => client.put(&args.path, body.as_ref(), navigator).await?,
        Method::Patch => client.patch(&args.path, body.as_ref(), navigator).await?,
    };
    print_outcome(outcome)
}

fn print_outcome(outcome: ApiOutcome) -> Result<()> {
    // The navigator has already told the user to log in again.
    if outcome == ApiOutcome::Unauthorized {
        return Ok(());
    }
    match outcome.into_result()? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("ok (no content)"),
    }
    Ok(())
}
