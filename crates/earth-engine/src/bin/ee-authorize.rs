//! One-time Earth Engine authorization.
//!
//! Prints an authorization URL, reads back the code the user is shown after
//! granting access, and stores the resulting refresh token where the API
//! service looks for it.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use earth_engine::oauth::{self, OAuthClient, Pkce};
use earth_engine::token::TOKEN_URL;
use earth_engine::StoredCredentials;

#[derive(Parser, Debug)]
#[command(name = "ee-authorize")]
#[command(about = "Authorize access to Google Earth Engine and store credentials")]
struct Args {
    /// OAuth client id
    #[arg(long, env = "EE_CLIENT_ID")]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "EE_CLIENT_SECRET")]
    client_secret: Option<String>,

    /// Cloud project to record alongside the credentials
    #[arg(long, env = "EE_PROJECT")]
    project: Option<String>,

    /// Where to write credentials (default: ~/.config/earthengine/credentials)
    #[arg(long, env = "EE_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Redirect URI registered for the client
    #[arg(long, default_value = oauth::DEFAULT_REDIRECT_URI)]
    redirect_uri: String,

    /// Authorization code, if already obtained (skips the prompt)
    #[arg(long)]
    code: Option<String>,

    /// Overwrite existing credentials
    #[arg(long)]
    force: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    let path = args
        .credentials
        .clone()
        .unwrap_or_else(StoredCredentials::default_path);

    if path.exists() && !args.force {
        bail!(
            "Credentials already exist at {} (use --force to replace them)",
            path.display()
        );
    }

    let pkce = Pkce::generate();
    let url = oauth::authorization_url(&args.client_id, &args.redirect_uri, &pkce)?;

    let code = match &args.code {
        Some(code) => code.clone(),
        None => prompt_for_code(url.as_str())?,
    };

    let client = OAuthClient {
        client_id: args.client_id.clone(),
        client_secret: args.client_secret.clone(),
        redirect_uri: args.redirect_uri.clone(),
        token_url: TOKEN_URL.to_string(),
    };

    let http = reqwest::Client::new();
    let mut credentials = oauth::exchange_code(&http, &client, &code, &pkce)
        .await
        .context("Failed to exchange authorization code")?;
    credentials.project = args.project.clone();

    credentials
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Earth Engine authorization complete");
    println!("Credentials saved to {}", path.display());
    Ok(())
}

fn prompt_for_code(url: &str) -> Result<String> {
    println!("Open this URL in a browser and grant access:\n\n  {}\n", url);
    print!("Enter the authorization code: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read authorization code")?;

    let code = line.trim().to_string();
    if code.is_empty() {
        bail!("No authorization code entered");
    }
    Ok(code)
}
