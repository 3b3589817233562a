//! ThreadCraft operator CLI.
//!
//! Drives the orchestrator directly; there is no HTTP layer. The session
//! handle is held client-side in a state file under the data directory,
//! exactly as a browser would hold it, and is validated server-side on
//! every command.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tc_core::{
    api::XApiClient, CoreConfig, CredentialBundle, Orchestrator, SessionHandle, SessionStatus,
};
use tc_crypto::kdf::MasterSecret;
use tc_store::Store;

const ENV_MASTER_SECRET: &str = "THREADCRAFT_MASTER_SECRET";
const ENV_SERVER_SALT: &str = "THREADCRAFT_SERVER_SALT";

#[derive(Parser)]
#[command(name = "threadcraft")]
#[command(about = "Post a daily solution thread, one day at a time", long_about = None)]
struct Cli {
    /// Override the data directory (database, key material, session file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store API credentials and open a session.
    ///
    /// Credentials are read from THREADCRAFT_API_KEY, THREADCRAFT_API_SECRET,
    /// THREADCRAFT_ACCESS_TOKEN, THREADCRAFT_ACCESS_TOKEN_SECRET and
    /// THREADCRAFT_BEARER_TOKEN (never from argv).
    Connect,

    /// Show session and thread progress
    Status,

    /// Start a new thread with an introduction post
    Start {
        /// Introduction text for the root post
        intro: String,
    },

    /// Resume an existing thread by ID or URL
    Continue {
        /// Thread ID or x.com/twitter.com status URL
        thread: String,
    },

    /// Post the next day into the active thread
    Post {
        /// Body of the post (the day marker is added automatically)
        body: String,
        /// Optional link appended after the body
        #[arg(long)]
        link: Option<String>,
    },

    /// Preview the next post without sending it
    Preview {
        body: String,
        #[arg(long)]
        link: Option<String>,
    },

    /// Manually set the current day (out-of-band reconciliation)
    SetDay {
        #[arg(allow_negative_numbers = true)]
        day: i64,
    },

    /// Clear thread progress, keeping credentials
    Reset,

    /// End the session and remove stored credentials
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    fs::create_dir_all(&data_dir)?;

    let config = load_config(&data_dir)?;
    let store = Store::open(&data_dir.join("vault.db")).await?;
    let orchestrator = Orchestrator::new(store, Arc::new(XApiClient::new()), config);
    let session_path = data_dir.join("session");

    match cli.command {
        Commands::Connect => {
            let bundle = bundle_from_env()?;
            let (handle, profile) = orchestrator.connect(&bundle).await?;
            write_session(&session_path, &handle)?;
            println!("Connected as @{} ({})", profile.username, profile.name);
        }

        Commands::Status => {
            let handle = read_session(&session_path)?;
            match orchestrator.session_status(&handle).await? {
                SessionStatus::Invalid => {
                    println!("Session is not active; run `threadcraft connect`.");
                }
                SessionStatus::Valid => {
                    let progress = orchestrator.progress(&handle).await?;
                    match progress.thread_ref {
                        Some(thread_ref) => println!(
                            "Active thread {} at day {}; next post is day {}.",
                            thread_ref, progress.current_day, progress.next_day
                        ),
                        None => println!("Connected, no active thread yet."),
                    }
                }
            }
        }

        Commands::Start { intro } => {
            let handle = read_session(&session_path)?;
            let thread_ref = orchestrator.start_thread(&handle, &intro).await?;
            println!("Thread started: https://x.com/i/status/{thread_ref}");
        }

        Commands::Continue { thread } => {
            let handle = read_session(&session_path)?;
            let resolved = orchestrator.continue_thread(&handle, &thread).await?;
            println!(
                "Thread {} resumed at day {}; next post is day {}.",
                resolved.thread_ref, resolved.current_day, resolved.next_day
            );
        }

        Commands::Post { body, link } => {
            let handle = read_session(&session_path)?;
            let posted = orchestrator
                .post_next(&handle, &body, link.as_deref())
                .await?;
            println!(
                "Day {} posted: https://x.com/i/status/{}",
                posted.day, posted.post_id
            );
        }

        Commands::Preview { body, link } => {
            let handle = read_session(&session_path)?;
            let preview = orchestrator
                .preview_next(&handle, &body, link.as_deref())
                .await?;
            println!("{}", preview.text);
            println!(
                "-- {} characters, {}",
                preview.chars,
                if preview.fits { "fits" } else { "over the limit" }
            );
        }

        Commands::SetDay { day } => {
            let handle = read_session(&session_path)?;
            orchestrator.set_day(&handle, day).await?;
            println!("Current day set to {day}.");
        }

        Commands::Reset => {
            let handle = read_session(&session_path)?;
            orchestrator.reset(&handle).await?;
            println!("Progress reset; credentials kept.");
        }

        Commands::Disconnect => {
            if let Ok(handle) = read_session(&session_path) {
                orchestrator.disconnect(&handle).await?;
            }
            let _ = fs::remove_file(&session_path);
            println!("Session ended; credentials removed.");
        }
    }

    Ok(())
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "threadcraft", "threadcraft")
        .ok_or_else(|| anyhow!("could not determine a data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Master secret and salt come from the environment when set (full
/// `CoreConfig::from_env` semantics, including TTL and fallback overrides);
/// otherwise they are generated once and kept in owner-only files under the
/// data directory.
fn load_config(data_dir: &PathBuf) -> Result<CoreConfig> {
    if std::env::var(ENV_MASTER_SECRET).is_ok() && std::env::var(ENV_SERVER_SALT).is_ok() {
        let config = CoreConfig::from_env()?;
        return Ok(if config.progress_fallback.is_some() {
            config
        } else {
            config.with_progress_fallback(Some(data_dir.join("progress-fallback.json")))
        });
    }
    let master_secret = load_or_create_master_secret(&data_dir.join("master.key"))?;
    let server_salt = load_or_create_salt(&data_dir.join("salt"))?;
    Ok(CoreConfig::new(master_secret, server_salt)
        .with_progress_fallback(Some(data_dir.join("progress-fallback.json"))))
}

fn load_or_create_master_secret(path: &PathBuf) -> Result<MasterSecret> {
    if path.exists() {
        let encoded = fs::read_to_string(path).context("read master key file")?;
        return MasterSecret::from_base64(&encoded).map_err(|e| anyhow!("master key file: {e}"));
    }
    let secret = MasterSecret::generate();
    write_private(path, &secret.to_base64())?;
    Ok(secret)
}

fn load_or_create_salt(path: &PathBuf) -> Result<String> {
    if path.exists() {
        return Ok(fs::read_to_string(path).context("read salt file")?.trim().to_string());
    }
    let salt = tc_crypto::token::generate_handle();
    write_private(path, &salt)?;
    Ok(salt)
}

fn write_session(path: &PathBuf, handle: &SessionHandle) -> Result<()> {
    write_private(path, handle.as_str())
}

fn read_session(path: &PathBuf) -> Result<SessionHandle> {
    let raw = fs::read_to_string(path)
        .map_err(|_| anyhow!("no session; run `threadcraft connect` first"))?;
    Ok(SessionHandle::new(raw.trim().to_string()))
}

/// Write a sensitive file with owner-only permissions.
fn write_private(path: &PathBuf, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("set file permissions")?;
    }
    Ok(())
}

fn bundle_from_env() -> Result<CredentialBundle> {
    fn var(name: &str) -> Result<String> {
        std::env::var(name).map_err(|_| anyhow!("{name} is not set"))
    }
    Ok(CredentialBundle {
        api_key: var("THREADCRAFT_API_KEY")?,
        api_secret: var("THREADCRAFT_API_SECRET")?,
        access_token: var("THREADCRAFT_ACCESS_TOKEN")?,
        access_token_secret: var("THREADCRAFT_ACCESS_TOKEN_SECRET")?,
        bearer_token: var("THREADCRAFT_BEARER_TOKEN")?,
    })
}
