use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::layout::MIN_CHIP_PADDING;

const QUALIFIER: &str = "io";
const ORGANIZATION: &str = "EcoDiet";
const APPLICATION: &str = "ecodiet";
const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "ecodiet.db";

/// Points at a config file, or at a directory holding `config.toml`.
pub const CONFIG_ENV: &str = "ECODIET_CONFIG";
/// Directory holding the snapshot database.
pub const DATA_ENV: &str = "ECODIET_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        Ok(Self::with_paths(ConfigPaths::discover()?))
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Reads the config file, writing one with default values first when
    /// none exists yet.
    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        let file = &self.paths.config_file;
        if file.exists() {
            return self.load();
        }
        let config = AppConfig::default();
        let rendered = toml::to_string_pretty(&config).context("rendering default config")?;
        fs::write(file, rendered)
            .with_context(|| format!("writing default config to {}", file.display()))?;
        tracing::info!(path = %file.display(), "wrote default config");
        Ok(config)
    }

    pub fn load(&self) -> Result<AppConfig> {
        let file = &self.paths.config_file;
        let raw = fs::read_to_string(file)
            .with_context(|| format!("reading config {}", file.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", file.display()))?;
        config.post_load();
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ConfigPaths {
    /// Platform directories, with `ECODIET_CONFIG` and `ECODIET_DATA`
    /// taking precedence when set.
    pub fn discover() -> Result<Self> {
        let dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .context("no home directory to place ecodiet files in")?;

        let (config_dir, config_file) = match env::var_os(CONFIG_ENV).map(PathBuf::from) {
            Some(path) => split_config_override(path),
            None => {
                let dir = dirs.config_dir().to_path_buf();
                let file = dir.join(CONFIG_FILE_NAME);
                (dir, file)
            }
        };
        let data_dir = env::var_os(DATA_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| dirs.data_dir().to_path_buf());

        Ok(Self::new(config_dir, config_file, data_dir))
    }

    pub fn new(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        let database_path = data_dir.join(DATABASE_FILE_NAME);
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}

fn split_config_override(path: PathBuf) -> (PathBuf, PathBuf) {
    if path.is_dir() || path.extension().is_none() {
        let file = path.join(CONFIG_FILE_NAME);
        return (path, file);
    }
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    (dir, path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Install the demo profile and favorites when no profile snapshot exists
    pub seed_demo_data: bool,
    pub storage: StorageOptions,
    pub layout: LayoutOptions,
    pub auth: AuthOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
            storage: StorageOptions::default(),
            layout: LayoutOptions::default(),
            auth: AuthOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self) {
        if self.layout.line_width == 0 {
            tracing::warn!("layout.line_width must be positive, falling back to default");
            self.layout.line_width = LayoutOptions::default().line_width;
        }
        if self.layout.chip_padding < MIN_CHIP_PADDING {
            tracing::warn!(
                chip_padding = self.layout.chip_padding,
                "layout.chip_padding is narrower than the chip brackets, raising it"
            );
            self.layout.chip_padding = MIN_CHIP_PADDING;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            wal_autocheckpoint: 1000,
        }
    }
}

/// Terminal rendering of tag chips, in columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub line_width: u16,
    pub chip_spacing: u16,
    /// Columns added around each chip label (brackets and padding)
    pub chip_padding: u16,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_width: 60,
            chip_spacing: 1,
            chip_padding: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthOptions {
    pub simulated_delay_ms: u64,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            simulated_delay_ms: 800,
        }
    }
}

impl AuthOptions {
    pub fn simulated_delay(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.simulated_delay_ms).unwrap_or(i64::MAX))
    }
}
