use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::Receiver;

use crate::model::{FolderId, Recipe, RecipeFolder, RecipeId};
use crate::notify::Notifier;
use crate::search::filter_by_title;
use crate::storage::{load_snapshot, save_snapshot, SnapshotStore};

pub const FOLDERS_KEY: &str = "RecipeFolders";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEvent {
    FolderAdded {
        folder_id: FolderId,
    },
    FoldersDeleted {
        folder_ids: Vec<FolderId>,
    },
    FolderUpdated {
        folder_id: FolderId,
    },
    RecipeAdded {
        folder_id: FolderId,
        recipe_id: RecipeId,
    },
    RecipesRemoved {
        folder_id: FolderId,
        recipe_ids: Vec<RecipeId>,
    },
}

/// Owns the user's folders and the home-feed recipe catalog. Every folder
/// mutation is written through to the `RecipeFolders` slot before
/// subscribers are told about it.
pub struct RecipeDataManager {
    folders: Vec<RecipeFolder>,
    recipes: Vec<Recipe>,
    store: Arc<dyn SnapshotStore>,
    notifier: Notifier<FolderEvent>,
}

impl RecipeDataManager {
    pub fn load(store: Arc<dyn SnapshotStore>) -> Self {
        let folders = match load_snapshot::<Vec<RecipeFolder>>(store.as_ref(), FOLDERS_KEY) {
            Some(folders) => {
                tracing::debug!(count = folders.len(), "restored recipe folders");
                folders
            }
            None => {
                tracing::info!("installing default recipe folders");
                default_folders()
            }
        };
        Self {
            folders,
            recipes: default_catalog(),
            store,
            notifier: Notifier::new(),
        }
    }

    pub fn folders(&self) -> &[RecipeFolder] {
        &self.folders
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn search_recipes(&self, query: &str) -> Vec<&Recipe> {
        filter_by_title(&self.recipes, query)
    }

    pub fn search_folders(&self, query: &str) -> Vec<&RecipeFolder> {
        filter_by_title(&self.folders, query)
    }

    pub fn subscribe(&mut self) -> Receiver<FolderEvent> {
        self.notifier.subscribe()
    }

    pub fn folder(&self, id: FolderId) -> Option<&RecipeFolder> {
        self.folders.iter().find(|folder| folder.id() == id)
    }

    pub fn position(&self, id: FolderId) -> Option<usize> {
        self.folders.iter().position(|folder| folder.id() == id)
    }

    pub fn add_folder(&mut self, folder: RecipeFolder) {
        let folder_id = folder.id();
        tracing::debug!(%folder_id, title = %folder.title, "adding folder");
        self.folders.push(folder);
        self.commit(FolderEvent::FolderAdded { folder_id });
    }

    /// Removes the folders at `offsets`. Offsets must come from the current
    /// list; any that do not are skipped.
    pub fn delete_folders(&mut self, offsets: &BTreeSet<usize>) {
        let removed = remove_offsets(&mut self.folders, offsets);
        if removed.is_empty() {
            return;
        }
        let folder_ids = removed.iter().map(RecipeFolder::id).collect();
        self.commit(FolderEvent::FoldersDeleted { folder_ids });
    }

    pub fn add_recipe(&mut self, folder_id: FolderId, recipe: Recipe) {
        let Some(folder) = self.folder_mut(folder_id) else {
            tracing::debug!(%folder_id, "add_recipe: folder not found, ignoring");
            return;
        };
        let recipe_id = recipe.id();
        folder.recipes.push(recipe);
        self.commit(FolderEvent::RecipeAdded {
            folder_id,
            recipe_id,
        });
    }

    pub fn remove_recipes(&mut self, folder_id: FolderId, offsets: &BTreeSet<usize>) {
        let Some(folder) = self.folder_mut(folder_id) else {
            tracing::debug!(%folder_id, "remove_recipes: folder not found, ignoring");
            return;
        };
        let removed = remove_offsets(&mut folder.recipes, offsets);
        if removed.is_empty() {
            return;
        }
        let recipe_ids = removed.iter().map(Recipe::id).collect();
        self.commit(FolderEvent::RecipesRemoved {
            folder_id,
            recipe_ids,
        });
    }

    pub fn rename_folder(&mut self, folder_id: FolderId, title: impl Into<String>) {
        let Some(folder) = self.folder_mut(folder_id) else {
            return;
        };
        folder.title = title.into();
        self.commit(FolderEvent::FolderUpdated { folder_id });
    }

    pub fn set_folder_icon(&mut self, folder_id: FolderId, image_name: impl Into<String>) {
        let Some(folder) = self.folder_mut(folder_id) else {
            return;
        };
        folder.image_name = image_name.into();
        self.commit(FolderEvent::FolderUpdated { folder_id });
    }

    /// Writes the whole folder list to its slot.
    pub fn save(&self) -> Result<()> {
        save_snapshot(self.store.as_ref(), FOLDERS_KEY, &self.folders)
    }

    fn folder_mut(&mut self, id: FolderId) -> Option<&mut RecipeFolder> {
        self.folders.iter_mut().find(|folder| folder.id() == id)
    }

    fn commit(&mut self, event: FolderEvent) {
        if let Err(err) = self.save() {
            tracing::warn!(?err, "failed to persist recipe folders");
        }
        self.notifier.publish(event);
    }
}

/// Removes the given offsets highest first so the remaining ones stay valid.
/// Returned items keep their original relative order.
pub(crate) fn remove_offsets<T>(items: &mut Vec<T>, offsets: &BTreeSet<usize>) -> Vec<T> {
    let mut removed = Vec::with_capacity(offsets.len());
    for &offset in offsets.iter().rev() {
        if offset >= items.len() {
            tracing::warn!(offset, len = items.len(), "ignoring out-of-range offset");
            continue;
        }
        removed.push(items.remove(offset));
    }
    removed.reverse();
    removed
}

pub fn default_folders() -> Vec<RecipeFolder> {
    vec![
        RecipeFolder::new("Recettes sport").with_icon("figure.run"),
        RecipeFolder::new("Recettes hiver").with_icon("snowflake"),
        RecipeFolder::new("Végétarien").with_icon("leaf.fill"),
    ]
}

/// Home-feed recipes. Ids are derived from the titles, so favorites saved
/// by an earlier run still match.
pub fn default_catalog() -> Vec<Recipe> {
    vec![
        Recipe::catalog("Bowl veggie", "Protéines végétales", "leaf"),
        Recipe::catalog("Salade césar", "Poulet, parmesan", "fork.knife"),
        Recipe::catalog(
            "Pâtes complètes",
            "Tomates & basilic",
            "takeoutbag.and.cup.and.straw",
        ),
        Recipe::catalog("Soupe de saison", "Potiron & coco", "cup.and.saucer"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::init_storage;
    use crate::storage::{decode_snapshot, encode_snapshot, MemoryStore};
    use assert_matches::assert_matches;

    fn offsets(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    fn memory_manager() -> (MemoryStore, RecipeDataManager) {
        let store = MemoryStore::new();
        let manager = RecipeDataManager::load(Arc::new(store.clone()));
        (store, manager)
    }

    #[test]
    fn fresh_store_installs_default_folders() {
        let (store, manager) = memory_manager();
        let titles: Vec<&str> = manager.folders().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Recettes sport", "Recettes hiver", "Végétarien"]);
        assert_eq!(manager.recipes().len(), 4);
        assert!(store.keys().is_empty(), "defaults are not written until a mutation");
    }

    #[test]
    fn add_and_delete_preserve_count_and_order() {
        let (_store, mut manager) = memory_manager();
        let initial: Vec<FolderId> = manager.folders().iter().map(RecipeFolder::id).collect();

        let mut added = Vec::new();
        for i in 0..5 {
            let folder = RecipeFolder::new(format!("Dossier {i}"));
            added.push(folder.id());
            manager.add_folder(folder);
        }
        assert_eq!(manager.folders().len(), initial.len() + 5);

        manager.delete_folders(&offsets(&[0, 4, 6]));
        assert_eq!(manager.folders().len(), initial.len() + 5 - 3);

        let survivors: Vec<FolderId> = manager.folders().iter().map(RecipeFolder::id).collect();
        let expected: Vec<FolderId> = initial
            .iter()
            .chain(added.iter())
            .enumerate()
            .filter(|(idx, _)| ![0, 4, 6].contains(idx))
            .map(|(_, id)| *id)
            .collect();
        assert_eq!(survivors, expected);
    }

    #[test]
    fn duplicate_titles_are_allowed() {
        let (_store, mut manager) = memory_manager();
        manager.add_folder(RecipeFolder::new("Végétarien"));
        let count = manager
            .folders()
            .iter()
            .filter(|f| f.title == "Végétarien")
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn out_of_range_offsets_are_skipped() {
        let (store, mut manager) = memory_manager();
        manager.delete_folders(&offsets(&[42]));
        assert_eq!(manager.folders().len(), 3);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn recipes_added_to_missing_folder_are_ignored() {
        let (store, mut manager) = memory_manager();
        let ghost = RecipeFolder::new("ghost").id();
        manager.add_recipe(ghost, Recipe::new("Smoothie", "Banane", "cup.and.saucer"));
        manager.remove_recipes(ghost, &offsets(&[0]));
        assert!(manager.folders().iter().all(|f| f.recipes.is_empty()));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn recipes_append_and_remove_within_folder() {
        let (_store, mut manager) = memory_manager();
        let folder_id = manager.folders()[0].id();
        let names = ["Smoothie protéiné", "Bowl énergétique", "Porridge"];
        for name in names {
            manager.add_recipe(folder_id, Recipe::new(name, "", "leaf"));
        }
        manager.remove_recipes(folder_id, &offsets(&[1]));

        let folder = manager.folder(folder_id).expect("folder present");
        let titles: Vec<&str> = folder.recipes.iter().map(Recipe::title).collect();
        assert_eq!(titles, vec!["Smoothie protéiné", "Porridge"]);
        assert!(manager.folders()[1].recipes.is_empty());
    }

    #[test]
    fn folder_copies_do_not_alias_catalog() {
        let (_store, mut manager) = memory_manager();
        let folder_id = manager.folders()[0].id();
        let recipe = manager.recipes()[0].clone();
        manager.add_recipe(folder_id, recipe.clone());
        manager.remove_recipes(folder_id, &offsets(&[0]));
        assert_eq!(manager.recipes()[0], recipe);
    }

    #[test]
    fn mutations_write_through_and_reload() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        let store: Arc<dyn SnapshotStore> = Arc::new(storage.clone());
        let folder_id;
        {
            let mut manager = RecipeDataManager::load(store.clone());
            let folder = RecipeFolder::new("Desserts").with_icon("birthday.cake");
            folder_id = folder.id();
            manager.add_folder(folder);
            manager.add_recipe(folder_id, Recipe::new("Tarte", "Pommes", "leaf"));
            manager.rename_folder(folder_id, "Desserts d'hiver");
        }

        let reloaded = RecipeDataManager::load(store);
        let folder = reloaded.folder(folder_id).expect("persisted folder");
        assert_eq!(folder.title, "Desserts d'hiver");
        assert_eq!(folder.image_name, "birthday.cake");
        assert_eq!(folder.recipes.len(), 1);
        assert_eq!(reloaded.position(folder_id), Some(3));
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_defaults() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.write(FOLDERS_KEY, b"{\"broken\": true")?;
        let manager = RecipeDataManager::load(Arc::new(store));
        assert_eq!(manager.folders().len(), 3);
        assert_eq!(manager.folders()[0].title, "Recettes sport");
        Ok(())
    }

    #[test]
    fn folder_list_round_trips_with_ids() -> anyhow::Result<()> {
        let folders = vec![
            RecipeFolder::new("Sport").with_recipes(vec![
                Recipe::new("Smoothie protéiné", "Banane et whey", "cup.and.saucer"),
                Recipe::new("Bowl énergétique", "Avoine et fruits", "leaf"),
            ]),
            RecipeFolder::new("Hiver").with_icon("snowflake"),
        ];
        let decoded: Vec<RecipeFolder> = decode_snapshot(&encode_snapshot(&folders)?)?;
        assert_eq!(decoded, folders);
        assert_eq!(decoded[0].recipes[1].id(), folders[0].recipes[1].id());
        Ok(())
    }

    #[test]
    fn explicit_save_writes_current_state() -> anyhow::Result<()> {
        let (store, manager) = memory_manager();
        manager.save()?;
        let raw = store.read(FOLDERS_KEY)?.expect("slot written");
        let decoded: Vec<RecipeFolder> = decode_snapshot(&raw)?;
        assert_eq!(decoded, manager.folders());
        Ok(())
    }

    #[test]
    fn subscribers_see_each_mutation() {
        let (_store, mut manager) = memory_manager();
        let events = manager.subscribe();
        let folder = RecipeFolder::new("Brunch");
        let folder_id = folder.id();
        manager.add_folder(folder);
        let recipe = Recipe::new("Pancakes", "Sirop d'érable", "fork.knife");
        let recipe_id = recipe.id();
        manager.add_recipe(folder_id, recipe);
        manager.set_folder_icon(folder_id, "sun.max");
        manager.delete_folders(&offsets(&[3]));

        let received: Vec<FolderEvent> = events.try_iter().collect();
        assert_eq!(received.len(), 4);
        assert_matches!(received[0], FolderEvent::FolderAdded { folder_id: id } if id == folder_id);
        assert_matches!(received[1], FolderEvent::RecipeAdded { recipe_id: id, .. } if id == recipe_id);
        assert_matches!(received[2], FolderEvent::FolderUpdated { .. });
        assert_matches!(&received[3], FolderEvent::FoldersDeleted { folder_ids } if folder_ids == &vec![folder_id]);
    }

    #[test]
    fn catalog_keeps_identity_across_loads() {
        let (store, first) = memory_manager();
        let second = RecipeDataManager::load(Arc::new(store));
        assert_eq!(first.recipes(), second.recipes());
    }

    #[test]
    fn search_filters_catalog_and_folders() {
        let (_store, manager) = memory_manager();
        let hits: Vec<&str> = manager
            .search_recipes("SOUPE")
            .into_iter()
            .map(Recipe::title)
            .collect();
        assert_eq!(hits, vec!["Soupe de saison"]);
        assert_eq!(manager.search_folders("recettes").len(), 2);
        assert_eq!(manager.search_recipes("").len(), 4);
    }
}
