use std::env;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

use self::commands::{
    FavoriteArgs, FolderArgs, LoginArgs, ProfileArgs, RecipesArgs, SignupArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "ecodiet",
    version,
    about = "Recipe folders, favorites and diet profile"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over ECODIET_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over ECODIET_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the recipe catalog
    Recipes(RecipesArgs),
    /// Manage recipe folders
    Folders(FolderArgs),
    /// Manage favorite recipes
    Favorites(FavoriteArgs),
    /// Show or edit the user profile
    Profile(ProfileArgs),
    /// Create an account and pick diet preferences
    Signup(SignupArgs),
    /// Sign in with any non-empty username and password
    Login(LoginArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("setting up logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let config = loader.load_or_init()?;
    let storage = storage::init(loader.paths(), &config.storage)?;
    tracing::debug!(database = %storage.database_path().display(), "storage ready");

    let mut app = App::new(Arc::new(config), Arc::new(storage));
    let output = match cli.command {
        Commands::Recipes(args) => commands::list_recipes(&app, &args),
        Commands::Folders(args) => commands::handle_folder_command(&mut app, args),
        Commands::Favorites(args) => commands::handle_favorite_command(&mut app, args),
        Commands::Profile(args) => commands::handle_profile_command(&mut app, args),
        Commands::Signup(args) => commands::signup(&mut app, args),
        Commands::Login(args) => commands::login(&mut app, args),
    }?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .context("writing command output")?;
    stdout.flush().context("flushing command output")
}

/// Installs the stderr subscriber once; an unparsable level falls back to
/// `info`.
fn init_tracing(level: &str) -> Result<()> {
    static SUBSCRIBER: OnceCell<()> = OnceCell::new();
    SUBSCRIBER.get_or_try_init(|| -> Result<()> {
        let filter = EnvFilter::try_new(level).or_else(|_| EnvFilter::try_new("info"))?;
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))
    })?;
    Ok(())
}
