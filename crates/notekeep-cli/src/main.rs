//! notekeep - a command-line front end for the notekeep session core.
//!
//! Signs in with a password or a scanned QR login URL, keeps the session in
//! secure storage, and issues authenticated API requests.

mod cli;

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Method;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notekeep_core::auth::{EncryptedFileStore, KeyringStore, MemoryStore, SecretStore};
use notekeep_core::{AppContext, AuthState, Config, Location, ScanOutcome, StorageBackend};

use cli::{Cli, Command, StoreArg};

/// Environment variable overriding the API origin
const API_URL_ENV: &str = "NOTEKEEP_API_URL";

/// Environment variable holding the encrypted-file passphrase
const PASSPHRASE_ENV: &str = "NOTEKEEP_PASSPHRASE";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let base_url = cli
        .api_url
        .clone()
        .or_else(|| std::env::var(API_URL_ENV).ok())
        .unwrap_or_else(|| config.base_url().to_string());

    let store = open_store(cli.store, &config)?;
    let mut ctx = AppContext::start(config, &base_url, store)?;

    match cli.command {
        Command::Login { email } => login(&mut ctx, email).await,
        Command::QrLogin { text } => qr_login(&ctx, &text).await,
        Command::Logout => logout(&ctx),
        Command::Whoami => whoami(&ctx),
        Command::Request {
            endpoint,
            method,
            data,
        } => request(&ctx, &endpoint, &method, data.as_deref()).await,
    }
}

fn open_store(arg: Option<StoreArg>, config: &Config) -> Result<Box<dyn SecretStore>> {
    let backend = match arg {
        Some(StoreArg::Memory) => return Ok(Box::new(MemoryStore::new())),
        Some(StoreArg::Keyring) => StorageBackend::Keyring,
        Some(StoreArg::EncryptedFile) => StorageBackend::EncryptedFile,
        None => config.storage,
    };

    match backend {
        StorageBackend::Keyring => Ok(Box::new(KeyringStore::new())),
        StorageBackend::EncryptedFile => {
            let path = config.credentials_path()?;
            let passphrase = match std::env::var(PASSPHRASE_ENV) {
                Ok(p) if !p.is_empty() => p,
                _ => rpassword::prompt_password("Storage passphrase: ")?,
            };
            let store = EncryptedFileStore::open(&path, &passphrase)
                .with_context(|| format!("Failed to open credential file {}", path.display()))?;
            Ok(Box::new(store))
        }
    }
}

async fn login(ctx: &mut AppContext, email: Option<String>) -> Result<()> {
    let email = match (email, ctx.config.last_email.clone()) {
        (Some(email), _) => email,
        (None, Some(last)) => prompt_with_default("Email", &last)?,
        (None, None) => prompt("Email")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    if email.is_empty() || password.is_empty() {
        bail!("Email and password required");
    }

    let payload = ctx
        .api
        .login(&email, &password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e.user_message()))?;

    let user = ctx.session.sign_in(
        payload.access_token.as_deref().unwrap_or_default(),
        payload.user.unwrap_or_default(),
    )?;

    ctx.config.last_email = Some(email);
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    info!(user_id = user.id, "Login successful");
    println!("Signed in as {} <{}>", user.display_name(), user.email);
    Ok(())
}

async fn qr_login(ctx: &AppContext, text: &str) -> Result<()> {
    let flow = ctx.qr_login();
    match flow.handle_scan(text).await {
        Ok(ScanOutcome::SignedIn(user)) => {
            println!("Signed in as {} <{}>", user.display_name(), user.email);
            Ok(())
        }
        Ok(ScanOutcome::Ignored) => bail!("A scan is already being processed"),
        Err(e) => bail!("QR login failed: {}", e.user_message()),
    }
}

fn logout(ctx: &AppContext) -> Result<()> {
    let was_signed_in = ctx.state() == AuthState::Authenticated;
    ctx.session.sign_out().context("Signed out, but stored credentials could not be removed")?;
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

fn whoami(ctx: &AppContext) -> Result<()> {
    match ctx.session.user() {
        Some(user) => println!("{} <{}> (id {})", user.display_name(), user.email, user.id),
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn request(ctx: &AppContext, endpoint: &str, method: &str, data: Option<&str>) -> Result<()> {
    if ctx.redirect_for(&Location::home()) == Some(Location::login()) {
        bail!("Not signed in. Run `notekeep login` or `notekeep qr-login <url>` first.");
    }

    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))?;
    let body = data
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("Request body is not valid JSON")?;

    match ctx.api.request(endpoint, method, body.as_ref()).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            if let Err(sign_out_err) = ctx.session.sign_out() {
                warn!(error = %sign_out_err, "Failed to clear expired session");
            }
            bail!("Session expired. Please log in again.")
        }
        Err(e) => bail!("Request failed: {}", e.user_message()),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_with_default(label: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]", label, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}
