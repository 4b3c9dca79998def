use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::Receiver;
use indexmap::IndexSet;

use crate::folders::default_catalog;
use crate::model::{CookingLevel, Recipe, RecipeId, UserProfile};
use crate::notify::Notifier;
use crate::storage::{load_snapshot, save_snapshot, SnapshotStore};

pub const PROFILE_KEY: &str = "UserProfile";

pub const AVAILABLE_DIETARY_PREFERENCES: [&str; 9] = [
    "Végétarien",
    "Végétalien",
    "Sans gluten",
    "Bio",
    "Local",
    "Faible en sel",
    "Faible en sucre",
    "Keto",
    "Paleo",
];

pub const COMMON_ALLERGIES: [&str; 9] = [
    "Fruits à coque",
    "Arachides",
    "Gluten",
    "Lactose",
    "Œufs",
    "Poisson",
    "Crustacés",
    "Soja",
    "Sésame",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    FavoriteAdded { recipe_id: RecipeId },
    FavoriteRemoved { recipe_id: RecipeId },
    PreferencesChanged,
    AllergiesChanged,
    ProfileUpdated,
}

/// Owns the single user profile. Mutations are written through to the
/// `UserProfile` slot.
pub struct UserProfileManager {
    profile: UserProfile,
    store: Arc<dyn SnapshotStore>,
    notifier: Notifier<ProfileEvent>,
}

impl UserProfileManager {
    /// Hydrates from the stored profile. Without one, the demo profile is
    /// installed when `seed_demo_data` is set, an empty profile otherwise.
    pub fn load(store: Arc<dyn SnapshotStore>, seed_demo_data: bool) -> Self {
        let profile = match load_snapshot::<UserProfile>(store.as_ref(), PROFILE_KEY) {
            Some(profile) => {
                tracing::debug!(name = %profile.name, "restored user profile");
                profile
            }
            None if seed_demo_data => {
                tracing::info!("seeding demo user profile");
                demo_profile()
            }
            None => UserProfile::default(),
        };
        Self {
            profile,
            store,
            notifier: Notifier::new(),
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn subscribe(&mut self) -> Receiver<ProfileEvent> {
        self.notifier.subscribe()
    }

    /// Appends unless a favorite with the same id is already present.
    pub fn add_favorite_recipe(&mut self, recipe: Recipe) {
        let recipe_id = recipe.id();
        if self
            .profile
            .favorite_recipes
            .iter()
            .any(|favorite| favorite.id() == recipe_id)
        {
            return;
        }
        self.profile.favorite_recipes.push(recipe);
        self.commit(ProfileEvent::FavoriteAdded { recipe_id });
    }

    pub fn remove_favorite_recipe(&mut self, recipe: &Recipe) {
        let recipe_id = recipe.id();
        let before = self.profile.favorite_recipes.len();
        self.profile
            .favorite_recipes
            .retain(|favorite| favorite.id() != recipe_id);
        if self.profile.favorite_recipes.len() == before {
            return;
        }
        self.commit(ProfileEvent::FavoriteRemoved { recipe_id });
    }

    /// Full value comparison, stricter than the id check used when adding.
    pub fn is_favorite(&self, recipe: &Recipe) -> bool {
        self.profile.favorite_recipes.contains(recipe)
    }

    /// Returns whether the recipe is a favorite afterwards.
    pub fn toggle_favorite(&mut self, recipe: &Recipe) -> bool {
        if self.is_favorite(recipe) {
            self.remove_favorite_recipe(recipe);
        } else {
            self.add_favorite_recipe(recipe.clone());
        }
        self.is_favorite(recipe)
    }

    pub fn update_profile(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        cooking_level: CookingLevel,
        dietary_preferences: Vec<String>,
        allergies: Vec<String>,
    ) {
        self.profile.name = name.into();
        self.profile.email = email.into();
        self.profile.cooking_level = cooking_level;
        self.profile.dietary_preferences = dietary_preferences.into_iter().collect();
        self.profile.allergies = allergies.into_iter().collect();
        self.commit(ProfileEvent::ProfileUpdated);
    }

    pub fn add_dietary_preference(&mut self, preference: &str) -> bool {
        if !insert_tag(&mut self.profile.dietary_preferences, preference) {
            return false;
        }
        self.commit(ProfileEvent::PreferencesChanged);
        true
    }

    pub fn remove_dietary_preference(&mut self, preference: &str) -> bool {
        if !self.profile.dietary_preferences.shift_remove(preference) {
            return false;
        }
        self.commit(ProfileEvent::PreferencesChanged);
        true
    }

    pub fn add_allergy(&mut self, allergy: &str) -> bool {
        if !insert_tag(&mut self.profile.allergies, allergy) {
            return false;
        }
        self.commit(ProfileEvent::AllergiesChanged);
        true
    }

    pub fn remove_allergy(&mut self, allergy: &str) -> bool {
        if !self.profile.allergies.shift_remove(allergy) {
            return false;
        }
        self.commit(ProfileEvent::AllergiesChanged);
        true
    }

    /// Catalog preferences not chosen yet, in catalog order.
    pub fn available_dietary_preferences(&self) -> Vec<&'static str> {
        AVAILABLE_DIETARY_PREFERENCES
            .into_iter()
            .filter(|pref| !self.profile.dietary_preferences.contains(*pref))
            .collect()
    }

    pub fn available_allergies(&self) -> Vec<&'static str> {
        COMMON_ALLERGIES
            .into_iter()
            .filter(|allergy| !self.profile.allergies.contains(*allergy))
            .collect()
    }

    pub fn save(&self) -> Result<()> {
        save_snapshot(self.store.as_ref(), PROFILE_KEY, &self.profile)
    }

    fn commit(&mut self, event: ProfileEvent) {
        if let Err(err) = self.save() {
            tracing::warn!(?err, "failed to persist user profile");
        }
        self.notifier.publish(event);
    }
}

fn insert_tag(tags: &mut IndexSet<String>, value: &str) -> bool {
    if value.is_empty() || tags.contains(value) {
        return false;
    }
    tags.insert(value.to_string())
}

pub fn demo_profile() -> UserProfile {
    const DEMO_FAVORITES: [&str; 3] = ["Bowl veggie", "Salade césar", "Soupe de saison"];

    let mut profile = UserProfile::new("Marie Dupont", "marie.dupont@email.com");
    profile.favorite_recipes = default_catalog()
        .into_iter()
        .filter(|recipe| DEMO_FAVORITES.iter().any(|title| *title == recipe.title()))
        .collect();
    profile.dietary_preferences = ["Végétarien", "Bio", "Local"]
        .into_iter()
        .map(String::from)
        .collect();
    profile.allergies = IndexSet::from(["Fruits à coque".to_string()]);
    profile.cooking_level = CookingLevel::Intermediate;
    profile
}
