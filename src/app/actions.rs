use std::collections::BTreeSet;

use crate::folders::RecipeDataManager;
use crate::model::{FolderId, Recipe, RecipeFolder, RecipeId};
use crate::profile::UserProfileManager;

/// Front-end commands that span both managers or build entities from raw
/// form input before handing them to a manager.
pub struct ActionDispatcher<'a> {
    folders: &'a mut RecipeDataManager,
    profile: &'a mut UserProfileManager,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(folders: &'a mut RecipeDataManager, profile: &'a mut UserProfileManager) -> Self {
        Self { folders, profile }
    }

    pub fn create_folder(&mut self, title: &str, icon: Option<&str>) -> FolderId {
        let mut folder = RecipeFolder::new(title);
        if let Some(icon) = icon {
            folder = folder.with_icon(icon);
        }
        let id = folder.id();
        self.folders.add_folder(folder);
        id
    }

    pub fn delete_folders(&mut self, offsets: &[usize]) {
        let offsets: BTreeSet<usize> = offsets.iter().copied().collect();
        self.folders.delete_folders(&offsets);
    }

    pub fn add_recipe_to_folder(
        &mut self,
        folder_id: FolderId,
        title: &str,
        subtitle: &str,
        icon: &str,
    ) -> RecipeId {
        let recipe = Recipe::new(title, subtitle, icon);
        let id = recipe.id();
        self.folders.add_recipe(folder_id, recipe);
        id
    }

    pub fn remove_recipes_from_folder(&mut self, folder_id: FolderId, offsets: &[usize]) {
        let offsets: BTreeSet<usize> = offsets.iter().copied().collect();
        self.folders.remove_recipes(folder_id, &offsets);
    }

    /// Toggles the catalog recipe at `index`; `None` when the index is past
    /// the end of the catalog.
    pub fn toggle_catalog_favorite(&mut self, index: usize) -> Option<bool> {
        let recipe = self.folders.recipes().get(index)?.clone();
        Some(self.profile.toggle_favorite(&recipe))
    }

    pub fn favorite_catalog_recipe(&mut self, index: usize) -> Option<&Recipe> {
        let recipe = self.folders.recipes().get(index)?.clone();
        self.profile.add_favorite_recipe(recipe);
        self.folders.recipes().get(index)
    }

    pub fn unfavorite(&mut self, index: usize) -> Option<Recipe> {
        let recipe = self.profile.profile().favorite_recipes().get(index)?.clone();
        self.profile.remove_favorite_recipe(&recipe);
        Some(recipe)
    }
}
