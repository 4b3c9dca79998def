use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use time::macros::format_description;

use crate::app::App;
use crate::layout::render_chips;
use crate::model::{CookingLevel, FolderId, Recipe, RecipeFolder, UserPreferences};
use crate::signup::SignupFlow;

#[derive(Args, Debug, Clone)]
pub struct RecipesArgs {
    /// Only list recipes whose title contains this text (case-insensitive)
    #[arg(long, short)]
    pub query: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FolderCommand {
    /// List folders
    List(FolderListArgs),
    /// Show one folder and its recipes
    Show(FolderShowArgs),
    /// Create a folder
    Add(FolderAddArgs),
    /// Delete folders by position
    Delete(FolderDeleteArgs),
    /// Rename a folder
    Rename(FolderRenameArgs),
    /// Add a new recipe to a folder
    AddRecipe(AddRecipeArgs),
    /// Remove recipes from a folder by position
    RemoveRecipe(RemoveRecipeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FolderListArgs {
    /// Filter folder titles (case-insensitive)
    #[arg(long, short)]
    pub query: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FolderShowArgs {
    /// Folder position (1-based) or id
    pub folder: String,
}

#[derive(Args, Debug, Clone)]
pub struct FolderAddArgs {
    /// Folder title
    pub title: String,
    /// Icon token for the folder
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FolderDeleteArgs {
    /// Folder positions (1-based)
    #[arg(required = true)]
    pub positions: Vec<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct FolderRenameArgs {
    /// Folder position (1-based) or id
    pub folder: String,
    /// New title
    pub title: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddRecipeArgs {
    /// Folder position (1-based) or id
    pub folder: String,
    /// Recipe title
    pub title: String,
    #[arg(long, default_value = "")]
    pub subtitle: String,
    #[arg(long, default_value = "fork.knife")]
    pub icon: String,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveRecipeArgs {
    /// Folder position (1-based) or id
    pub folder: String,
    /// Recipe positions inside the folder (1-based)
    #[arg(required = true)]
    pub positions: Vec<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct FavoriteArgs {
    #[command(subcommand)]
    pub command: FavoriteCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FavoriteCommand {
    /// List favorite recipes
    List,
    /// Add the catalog recipe at this position (1-based)
    Add { position: usize },
    /// Remove the favorite at this position (1-based)
    Remove { position: usize },
    /// Toggle the catalog recipe at this position (1-based)
    Toggle { position: usize },
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Print the profile with preference and allergy chips
    Show,
    /// Replace profile fields; omitted flags keep their current value
    Edit(ProfileEditArgs),
    /// Add a custom dietary preference
    AddPreference { value: String },
    /// Remove a dietary preference
    RemovePreference { value: String },
    /// Add a custom allergy
    AddAllergy { value: String },
    /// Remove an allergy
    RemoveAllergy { value: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileEditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// beginner, intermediate, advanced or expert
    #[arg(long, value_parser = parse_cooking_level)]
    pub level: Option<CookingLevel>,
    /// Dietary preference (repeat to set several; replaces the current list)
    #[arg(long = "preference")]
    pub preferences: Vec<String>,
    /// Allergy (repeat to set several; replaces the current list)
    #[arg(long = "allergy")]
    pub allergies: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SignupArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub vegetarian: bool,
    #[arg(long)]
    pub vegan: bool,
    #[arg(long)]
    pub gluten_free: bool,
    #[arg(long)]
    pub lactose_free: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    pub username: String,
    #[arg(long)]
    pub password: String,
}

fn parse_cooking_level(raw: &str) -> Result<CookingLevel, String> {
    raw.parse::<CookingLevel>()
        .map_err(|_| format!("unknown cooking level '{raw}'"))
}

pub fn list_recipes(app: &App, args: &RecipesArgs) -> Result<String> {
    let query = args.query.as_deref().unwrap_or("");
    let recipes = app.folders().search_recipes(query);
    if recipes.is_empty() {
        return Ok("No recipes match.\n".to_string());
    }
    let mut out = String::new();
    for (position, recipe) in app.folders().recipes().iter().enumerate() {
        if !recipes.iter().any(|hit| hit.id() == recipe.id()) {
            continue;
        }
        let marker = if app.profile().is_favorite(recipe) {
            "  [FAVORITE]"
        } else {
            ""
        };
        let _ = writeln!(&mut out, "{:>2}. {}{marker}", position + 1, recipe.title());
        if !recipe.subtitle().is_empty() {
            let _ = writeln!(&mut out, "    {}", recipe.subtitle());
        }
    }
    Ok(out)
}

pub fn handle_folder_command(app: &mut App, args: FolderArgs) -> Result<String> {
    match args.command {
        FolderCommand::List(args) => Ok(folder_list(app, &args)),
        FolderCommand::Show(args) => folder_show(app, &args),
        FolderCommand::Add(args) => folder_add(app, args),
        FolderCommand::Delete(args) => folder_delete(app, args),
        FolderCommand::Rename(args) => folder_rename(app, args),
        FolderCommand::AddRecipe(args) => folder_add_recipe(app, args),
        FolderCommand::RemoveRecipe(args) => folder_remove_recipe(app, args),
    }
}

fn folder_list(app: &App, args: &FolderListArgs) -> String {
    let query = args.query.as_deref().unwrap_or("");
    let hits = app.folders().search_folders(query);
    if hits.is_empty() {
        return "No folders.\n".to_string();
    }
    let mut out = String::new();
    for folder in hits {
        let position = app.folders().position(folder.id()).unwrap_or_default() + 1;
        let _ = writeln!(
            &mut out,
            "{:>2}. {}  ({} recette{})",
            position,
            folder.title,
            folder.recipes.len(),
            plural(folder.recipes.len())
        );
    }
    out
}

fn folder_show(app: &App, args: &FolderShowArgs) -> Result<String> {
    let folder_id = resolve_folder(app, &args.folder)?;
    let folder = app
        .folders()
        .folder(folder_id)
        .with_context(|| format!("folder {folder_id} not found"))?;
    Ok(format_folder(folder))
}

fn folder_add(app: &mut App, args: FolderAddArgs) -> Result<String> {
    let title = args.title.trim();
    if title.is_empty() {
        bail!("folder title cannot be empty");
    }
    let folder_id = app.actions().create_folder(title, args.icon.as_deref());
    Ok(format!("Created folder '{title}' ({folder_id})\n"))
}

fn folder_delete(app: &mut App, args: FolderDeleteArgs) -> Result<String> {
    let len = app.folders().folders().len();
    let offsets = to_offsets(&args.positions, len, "folder")?;
    app.actions().delete_folders(&offsets);
    Ok(format!(
        "Deleted {} folder{}\n",
        offsets.len(),
        plural(offsets.len())
    ))
}

fn folder_rename(app: &mut App, args: FolderRenameArgs) -> Result<String> {
    let title = args.title.trim();
    if title.is_empty() {
        bail!("folder title cannot be empty");
    }
    let folder_id = resolve_folder(app, &args.folder)?;
    app.folders_mut().rename_folder(folder_id, title);
    Ok(format!("Renamed folder to '{title}'\n"))
}

fn folder_add_recipe(app: &mut App, args: AddRecipeArgs) -> Result<String> {
    let title = args.title.trim();
    if title.is_empty() {
        bail!("recipe title cannot be empty");
    }
    let folder_id = resolve_folder(app, &args.folder)?;
    app.actions()
        .add_recipe_to_folder(folder_id, title, args.subtitle.trim(), &args.icon);
    Ok(format!("Added '{title}'\n"))
}

fn folder_remove_recipe(app: &mut App, args: RemoveRecipeArgs) -> Result<String> {
    let folder_id = resolve_folder(app, &args.folder)?;
    let len = app
        .folders()
        .folder(folder_id)
        .map(|folder| folder.recipes.len())
        .unwrap_or_default();
    let offsets = to_offsets(&args.positions, len, "recipe")?;
    app.actions().remove_recipes_from_folder(folder_id, &offsets);
    Ok(format!(
        "Removed {} recipe{}\n",
        offsets.len(),
        plural(offsets.len())
    ))
}

pub fn handle_favorite_command(app: &mut App, args: FavoriteArgs) -> Result<String> {
    match args.command {
        FavoriteCommand::List => Ok(format_favorites(app.profile().profile().favorite_recipes())),
        FavoriteCommand::Add { position } => {
            let index = position_to_offset(position, app.folders().recipes().len(), "recipe")?;
            let title = app
                .actions()
                .favorite_catalog_recipe(index)
                .map(|recipe| recipe.title().to_string())
                .unwrap_or_default();
            Ok(format!("'{title}' is a favorite\n"))
        }
        FavoriteCommand::Remove { position } => {
            let len = app.profile().profile().favorite_recipes().len();
            let index = position_to_offset(position, len, "favorite")?;
            let removed = app
                .actions()
                .unfavorite(index)
                .with_context(|| format!("no favorite at position {position}"))?;
            Ok(format!("Removed '{}' from favorites\n", removed.title()))
        }
        FavoriteCommand::Toggle { position } => {
            let index = position_to_offset(position, app.folders().recipes().len(), "recipe")?;
            let now_favorite = app
                .actions()
                .toggle_catalog_favorite(index)
                .unwrap_or_default();
            let title = app.folders().recipes()[index].title();
            Ok(if now_favorite {
                format!("Added '{title}' to favorites\n")
            } else {
                format!("Removed '{title}' from favorites\n")
            })
        }
    }
}

pub fn handle_profile_command(app: &mut App, args: ProfileArgs) -> Result<String> {
    match args.command {
        ProfileCommand::Show => Ok(format_profile(app)),
        ProfileCommand::Edit(args) => profile_edit(app, args),
        ProfileCommand::AddPreference { value } => {
            let added = app.profile_mut().add_dietary_preference(value.trim());
            Ok(tag_outcome("preference", value.trim(), added, "added"))
        }
        ProfileCommand::RemovePreference { value } => {
            let removed = app.profile_mut().remove_dietary_preference(value.trim());
            Ok(tag_outcome("preference", value.trim(), removed, "removed"))
        }
        ProfileCommand::AddAllergy { value } => {
            let added = app.profile_mut().add_allergy(value.trim());
            Ok(tag_outcome("allergy", value.trim(), added, "added"))
        }
        ProfileCommand::RemoveAllergy { value } => {
            let removed = app.profile_mut().remove_allergy(value.trim());
            Ok(tag_outcome("allergy", value.trim(), removed, "removed"))
        }
    }
}

fn profile_edit(app: &mut App, args: ProfileEditArgs) -> Result<String> {
    let current = app.profile().profile();
    let name = args.name.unwrap_or_else(|| current.name.clone());
    let email = args.email.unwrap_or_else(|| current.email.clone());
    let level = args.level.unwrap_or(current.cooking_level);
    let preferences = if args.preferences.is_empty() {
        current.dietary_preferences().map(String::from).collect()
    } else {
        args.preferences
    };
    let allergies = if args.allergies.is_empty() {
        current.allergies().map(String::from).collect()
    } else {
        args.allergies
    };
    app.profile_mut()
        .update_profile(name, email, level, preferences, allergies);
    Ok("Profile updated\n".to_string())
}

pub fn signup(app: &mut App, args: SignupArgs) -> Result<String> {
    let mut flow = SignupFlow::new();
    flow.email = args.email;
    flow.password = args.password;
    flow.continue_to_preferences()
        .context("checking signup credentials")?;
    for (enabled, flag) in [
        (args.vegetarian, UserPreferences::VEGETARIAN),
        (args.vegan, UserPreferences::VEGAN),
        (args.gluten_free, UserPreferences::GLUTEN_FREE),
        (args.lactose_free, UserPreferences::LACTOSE_FREE),
    ] {
        if enabled {
            flow.toggle(flag);
        }
    }
    let request = app.complete_signup(flow).context("completing signup")?;
    let labels = request.preferences.labels();
    let mut out = format!("Account created for {}\n", request.email);
    if !labels.is_empty() {
        let _ = writeln!(&mut out, "Preferences: {}", labels.join(", "));
    }
    Ok(out)
}

pub fn login(app: &mut App, args: LoginArgs) -> Result<String> {
    let session = app
        .login(&args.username, &args.password)
        .context("signing in")?;
    Ok(format!("Signed in as {}\n", session.username))
}

/// Accepts a 1-based folder position or a folder id.
fn resolve_folder(app: &App, selector: &str) -> Result<FolderId> {
    if let Ok(position) = selector.trim().parse::<usize>() {
        let len = app.folders().folders().len();
        let index = position_to_offset(position, len, "folder")?;
        return Ok(app.folders().folders()[index].id());
    }
    let folder_id: FolderId = selector
        .parse()
        .with_context(|| format!("'{selector}' is neither a position nor a folder id"))?;
    if app.folders().folder(folder_id).is_none() {
        bail!("folder {folder_id} not found");
    }
    Ok(folder_id)
}

fn position_to_offset(position: usize, len: usize, what: &str) -> Result<usize> {
    if position == 0 || position > len {
        bail!("no {what} at position {position} (have {len})");
    }
    Ok(position - 1)
}

fn to_offsets(positions: &[usize], len: usize, what: &str) -> Result<Vec<usize>> {
    let mut offsets = positions
        .iter()
        .map(|&position| position_to_offset(position, len, what))
        .collect::<Result<Vec<_>>>()?;
    offsets.sort_unstable();
    offsets.dedup();
    Ok(offsets)
}

fn format_folder(folder: &RecipeFolder) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}  [{}]", folder.title, folder.image_name);
    let _ = writeln!(&mut out, "    id {}", folder.id());
    if folder.recipes.is_empty() {
        out.push_str("    (no recipes)\n");
        return out;
    }
    for (position, recipe) in folder.recipes.iter().enumerate() {
        let _ = writeln!(&mut out, "{:>2}. {}", position + 1, recipe_line(recipe));
    }
    out
}

fn format_favorites(favorites: &[Recipe]) -> String {
    if favorites.is_empty() {
        return "No favorites yet.\n".to_string();
    }
    let mut out = String::new();
    for (position, recipe) in favorites.iter().enumerate() {
        let _ = writeln!(&mut out, "{:>2}. {}", position + 1, recipe_line(recipe));
    }
    out
}

fn format_profile(app: &App) -> String {
    let profile = app.profile().profile();
    let layout = &app.config.layout;
    let mut out = String::new();
    let _ = writeln!(&mut out, "{} <{}>", profile.name, profile.email);
    let _ = writeln!(&mut out, "Niveau: {}", profile.cooking_level);
    let _ = writeln!(&mut out, "Membre depuis: {}", format_join_date(profile.join_date()));
    let _ = writeln!(
        &mut out,
        "Favoris: {}",
        profile.favorite_recipes().len()
    );

    let preferences: Vec<&str> = profile.dietary_preferences().collect();
    if !preferences.is_empty() {
        let _ = writeln!(&mut out, "\nPréférences alimentaires");
        let _ = writeln!(&mut out, "{}", render_chips(&preferences, layout));
    }
    let allergies: Vec<&str> = profile.allergies().collect();
    if !allergies.is_empty() {
        let _ = writeln!(&mut out, "\nAllergies");
        let _ = writeln!(&mut out, "{}", render_chips(&allergies, layout));
    }
    out
}

fn format_join_date(date: time::OffsetDateTime) -> String {
    let format = format_description!("[day]/[month]/[year]");
    date.format(format)
        .unwrap_or_else(|_| date.unix_timestamp().to_string())
}

fn recipe_line(recipe: &Recipe) -> String {
    if recipe.subtitle().is_empty() {
        recipe.title().to_string()
    } else {
        format!("{} - {}", recipe.title(), recipe.subtitle())
    }
}

fn tag_outcome(kind: &str, value: &str, changed: bool, verb: &str) -> String {
    if changed {
        format!("{kind} '{value}' {verb}\n")
    } else {
        format!("{kind} '{value}' unchanged\n")
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
