pub mod app;
pub mod cli;
pub mod config;
pub mod folders;
pub mod layout;
pub mod model;
pub mod notify;
pub mod profile;
pub mod search;
pub mod signup;
pub mod storage;

pub use app::{ActionDispatcher, App};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use folders::{FolderEvent, RecipeDataManager};
pub use model::{CookingLevel, Recipe, RecipeFolder, UserPreferences, UserProfile};
pub use profile::{ProfileEvent, UserProfileManager};
pub use storage::{MemoryStore, SnapshotStore, StorageHandle};
