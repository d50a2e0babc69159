//! yamet-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `YAMET_*`
//! environment variables, opens the SQLite store and serves the JSON API.
//!
//! # First administrator
//!
//! Set `bootstrap_admin_email` and `bootstrap_admin_password_hash` to have a
//! SUPERADMIN created on startup when no account uses that email. Generate
//! the hash with:
//!
//! ```
//! cargo run -p yamet-server -- --hash-password
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use yamet_core::{
  store::Store,
  user::{NewUser, Role, UserStatus},
};
use yamet_server::{AppState, ServerConfig, auth::hash_password};
use yamet_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "YAMET admin API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = rpassword_or_stdin()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("YAMET"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.upload_dir = expand_tilde(&server_cfg.upload_dir);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  bootstrap_admin(&store, &server_cfg).await?;

  tokio::fs::create_dir_all(server_cfg.attachment_dir())
    .await
    .with_context(|| format!("failed to create upload directory {:?}", server_cfg.attachment_dir()))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!(environment = ?server_cfg.environment, "Listening on http://{address}");

  let app = yamet_server::router(AppState::new(store, server_cfg));
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Create the configured SUPERADMIN if nobody holds that email yet.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let (Some(email), Some(hash)) = (&cfg.bootstrap_admin_email, &cfg.bootstrap_admin_password_hash) else {
    return Ok(());
  };
  if store.find_login(email).await.context("failed to look up admin")?.is_some() {
    return Ok(());
  }

  let created = store
    .create_user(NewUser {
      name:          "Super Admin".to_owned(),
      email:         Some(email.clone()),
      phone:         None,
      role:          Role::SuperAdmin,
      status:        UserStatus::Active,
      password_hash: hash.clone(),
      created_by:    None,
    })
    .await
    .context("failed to create admin")?;
  if let Some(user) = created {
    tracing::info!(user_id = user.id, email, "bootstrap SUPERADMIN created");
  }
  Ok(())
}

/// Read a password from stdin.
fn rpassword_or_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
