use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_FOLDER_ICON: &str = "folder";
pub const DEFAULT_PROFILE_IMAGE: &str = "person.crop.circle.fill";

/// Namespace for ids derived from built-in catalog titles.
const CATALOG_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8b3d_4c71_9e05_d2a8_41b7_c930);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl RecipeId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    fn for_catalog_title(title: &str) -> Self {
        Self(Uuid::new_v5(&CATALOG_NAMESPACE, title.as_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Uuid);

impl FolderId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FolderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A single recipe card. The id is minted once in [`Recipe::new`] and the
/// value is immutable afterwards, so copies held by folders, the catalog and
/// the favorites list always agree with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    id: RecipeId,
    title: String,
    subtitle: String,
    image_name: String,
}

impl Recipe {
    pub fn new(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        image_name: impl Into<String>,
    ) -> Self {
        Self {
            id: RecipeId::generate(),
            title: title.into(),
            subtitle: subtitle.into(),
            image_name: image_name.into(),
        }
    }

    /// Built-in catalog entry. The id is derived from the title, so the
    /// same entry rebuilt by another process compares equal to a stored copy.
    pub(crate) fn catalog(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        image_name: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            id: RecipeId::for_catalog_title(&title),
            title,
            subtitle: subtitle.into(),
            image_name: image_name.into(),
        }
    }

    pub fn id(&self) -> RecipeId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFolder {
    id: FolderId,
    pub title: String,
    pub recipes: Vec<Recipe>,
    pub image_name: String,
}

impl RecipeFolder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: FolderId::generate(),
            title: title.into(),
            recipes: Vec::new(),
            image_name: DEFAULT_FOLDER_ICON.to_string(),
        }
    }

    pub fn with_icon(mut self, image_name: impl Into<String>) -> Self {
        self.image_name = image_name.into();
        self
    }

    pub fn with_recipes(mut self, recipes: Vec<Recipe>) -> Self {
        self.recipes = recipes;
        self
    }

    pub fn id(&self) -> FolderId {
        self.id
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum CookingLevel {
    #[default]
    #[serde(rename = "Débutant")]
    #[strum(to_string = "Débutant", serialize = "beginner")]
    Beginner,
    #[serde(rename = "Intermédiaire")]
    #[strum(to_string = "Intermédiaire", serialize = "intermediate")]
    Intermediate,
    #[serde(rename = "Avancé")]
    #[strum(to_string = "Avancé", serialize = "advanced")]
    Advanced,
    #[serde(rename = "Expert")]
    #[strum(to_string = "Expert", serialize = "expert")]
    Expert,
}

impl CookingLevel {
    pub fn all() -> impl Iterator<Item = CookingLevel> {
        CookingLevel::iter()
    }
}

/// Persisted user profile. The collections are private so the
/// de-duplication rules enforced by the profile manager cannot be bypassed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub profile_image_name: String,
    #[serde(deserialize_with = "unique_favorites")]
    pub(crate) favorite_recipes: Vec<Recipe>,
    pub(crate) dietary_preferences: IndexSet<String>,
    pub(crate) allergies: IndexSet<String>,
    pub cooking_level: CookingLevel,
    #[serde(with = "time::serde::rfc3339")]
    join_date: OffsetDateTime,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            profile_image_name: DEFAULT_PROFILE_IMAGE.to_string(),
            favorite_recipes: Vec::new(),
            dietary_preferences: IndexSet::new(),
            allergies: IndexSet::new(),
            cooking_level: CookingLevel::default(),
            join_date: OffsetDateTime::now_utc(),
        }
    }

    pub fn favorite_recipes(&self) -> &[Recipe] {
        &self.favorite_recipes
    }

    pub fn dietary_preferences(&self) -> impl Iterator<Item = &str> {
        self.dietary_preferences.iter().map(String::as_str)
    }

    pub fn allergies(&self) -> impl Iterator<Item = &str> {
        self.allergies.iter().map(String::as_str)
    }

    pub fn join_date(&self) -> OffsetDateTime {
        self.join_date
    }
}

/// Keeps the first favorite for each id.
fn unique_favorites<'de, D>(deserializer: D) -> Result<Vec<Recipe>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut recipes = Vec::<Recipe>::deserialize(deserializer)?;
    let mut seen = HashSet::with_capacity(recipes.len());
    recipes.retain(|recipe| seen.insert(recipe.id()));
    Ok(recipes)
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new("", "")
    }
}

bitflags::bitflags! {
    /// Diet choices collected by the second signup step. Never persisted.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct UserPreferences: u8 {
        const VEGETARIAN = 0b0001;
        const VEGAN = 0b0010;
        const GLUTEN_FREE = 0b0100;
        const LACTOSE_FREE = 0b1000;
    }
}

impl UserPreferences {
    const LABELS: [(UserPreferences, &'static str); 4] = [
        (UserPreferences::VEGETARIAN, "Végétarien"),
        (UserPreferences::VEGAN, "Végan"),
        (UserPreferences::GLUTEN_FREE, "Sans gluten"),
        (UserPreferences::LACTOSE_FREE, "Sans lactose"),
    ];

    pub fn is_vegetarian(&self) -> bool {
        self.contains(Self::VEGETARIAN)
    }

    pub fn is_vegan(&self) -> bool {
        self.contains(Self::VEGAN)
    }

    pub fn is_gluten_free(&self) -> bool {
        self.contains(Self::GLUTEN_FREE)
    }

    pub fn is_lactose_free(&self) -> bool {
        self.contains(Self::LACTOSE_FREE)
    }

    /// Display labels of the selected flags, in card order.
    pub fn labels(&self) -> Vec<&'static str> {
        Self::LABELS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipes_get_distinct_ids() {
        let a = Recipe::new("Bowl veggie", "Protéines végétales", "leaf");
        let b = Recipe::new("Bowl veggie", "Protéines végétales", "leaf");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn folder_defaults_to_folder_icon() {
        let folder = RecipeFolder::new("Desserts");
        assert_eq!(folder.image_name, DEFAULT_FOLDER_ICON);
        assert!(folder.recipes.is_empty());
        let folder = folder.with_icon("snowflake");
        assert_eq!(folder.image_name, "snowflake");
    }

    #[test]
    fn folder_id_parses_from_display() {
        let folder = RecipeFolder::new("Sport");
        let parsed: FolderId = folder.id().to_string().parse().expect("uuid");
        assert_eq!(parsed, folder.id());
        assert!("not-a-uuid".parse::<FolderId>().is_err());
    }

    #[test]
    fn cooking_level_uses_french_labels() -> anyhow::Result<()> {
        assert_eq!(CookingLevel::Intermediate.to_string(), "Intermédiaire");
        assert_eq!(
            serde_json::to_string(&CookingLevel::Advanced)?,
            "\"Avancé\""
        );
        assert_eq!("expert".parse::<CookingLevel>()?, CookingLevel::Expert);
        assert_eq!("Débutant".parse::<CookingLevel>()?, CookingLevel::Beginner);
        assert_eq!(CookingLevel::all().count(), 4);
        Ok(())
    }

    #[test]
    fn profile_round_trips_through_json() -> anyhow::Result<()> {
        let mut profile = UserProfile::new("Marie", "marie@example.com");
        profile
            .favorite_recipes
            .push(Recipe::new("Salade césar", "Poulet, parmesan", "fork.knife"));
        profile.dietary_preferences.insert("Bio".into());
        profile.allergies.insert("Soja".into());

        let json = serde_json::to_string(&profile)?;
        assert!(json.contains("\"favoriteRecipes\""));
        assert!(json.contains("\"joinDate\""));
        let decoded: UserProfile = serde_json::from_str(&json)?;
        assert_eq!(decoded, profile);
        assert_eq!(decoded.join_date(), profile.join_date());
        Ok(())
    }

    #[test]
    fn decoding_collapses_duplicate_tags() -> anyhow::Result<()> {
        let profile = UserProfile::new("A", "a@b.c");
        let mut value = serde_json::to_value(&profile)?;
        value["allergies"] = serde_json::json!(["Soja", "Soja", "Gluten"]);
        let decoded: UserProfile = serde_json::from_value(value)?;
        assert_eq!(decoded.allergies().collect::<Vec<_>>(), vec!["Soja", "Gluten"]);
        Ok(())
    }

    #[test]
    fn decoding_keeps_first_favorite_per_id() -> anyhow::Result<()> {
        let original = Recipe::new("Soupe de saison", "Potiron & coco", "cup.and.saucer");
        let mut renamed = serde_json::to_value(&original)?;
        renamed["title"] = serde_json::json!("Soupe renommée");

        let mut value = serde_json::to_value(UserProfile::new("A", "a@b.c"))?;
        let stored = serde_json::to_value(&original)?;
        value["favoriteRecipes"] = serde_json::json!([stored.clone(), renamed, stored]);
        let decoded: UserProfile = serde_json::from_value(value)?;
        assert_eq!(decoded.favorite_recipes(), &[original]);
        Ok(())
    }

    #[test]
    fn catalog_ids_are_stable_per_title() {
        let first = Recipe::catalog("Bowl veggie", "Protéines végétales", "leaf");
        let again = Recipe::catalog("Bowl veggie", "Protéines végétales", "leaf");
        let other = Recipe::catalog("Salade césar", "Poulet, parmesan", "fork.knife");
        assert_eq!(first, again);
        assert_ne!(first.id(), other.id());
        assert_ne!(first.id(), Recipe::new("Bowl veggie", "", "leaf").id());
    }

    #[test]
    fn preference_labels_follow_selected_flags() {
        let mut prefs = UserPreferences::default();
        assert!(prefs.labels().is_empty());
        prefs.toggle(UserPreferences::VEGAN);
        prefs.toggle(UserPreferences::LACTOSE_FREE);
        assert!(prefs.is_vegan() && prefs.is_lactose_free());
        assert!(!prefs.is_vegetarian() && !prefs.is_gluten_free());
        assert_eq!(prefs.labels(), vec!["Végan", "Sans lactose"]);
    }
}
