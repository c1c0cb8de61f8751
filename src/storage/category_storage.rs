use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tracker::entities::{Category, CategoryId, Color};

pub const DEFAULT_CATEGORY_ID: &str = "default_001";
const DEFAULT_CATEGORY_NAME: &str = "Focus (default 25 min)";
const DEFAULT_CATEGORY_COLOR: Color = Color::rgb(0xff, 0x2d, 0x55);

/// Hue step between generated colors. Consecutive categories land far apart on the color wheel.
const GOLDEN_ANGLE: f64 = 137.508;

/// Category used when nothing else is selected. It always exists and can't be changed.
pub fn default_category() -> Category {
    Category {
        id: DEFAULT_CATEGORY_ID.into(),
        name: DEFAULT_CATEGORY_NAME.into(),
        color: DEFAULT_CATEGORY_COLOR,
    }
}

/// User defined categories together with the one currently selected for the timer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRegistry {
    #[serde(default)]
    active: Option<CategoryId>,
    #[serde(default)]
    categories: Vec<Category>,
    /// Position of the next generated color on the hue walk. Never goes back, so deleting a
    /// category doesn't hand its color to the next one.
    #[serde(default)]
    next_hue: u32,
}

impl CategoryRegistry {
    pub fn list(&self) -> &[Category] {
        &self.categories
    }

    /// Looks a category up by id. The default category always resolves.
    pub fn resolve(&self, id: &CategoryId) -> Option<Category> {
        if id.as_str() == DEFAULT_CATEGORY_ID {
            return Some(default_category());
        }
        self.categories.iter().find(|c| &c.id == id).cloned()
    }

    /// Category the timer attributes ticks to. Falls back to the default when the selected one
    /// is gone.
    pub fn active(&self) -> Category {
        self.active
            .as_ref()
            .and_then(|id| self.resolve(id))
            .unwrap_or_else(default_category)
    }

    pub fn add(&mut self, name: &str, color: Option<Color>, now: DateTime<Utc>) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Category name can't be empty");
        }

        let mut stamp = now.timestamp_millis();
        while self.contains(&CategoryId::new(stamp.to_string())) {
            stamp += 1;
        }

        let color = color.unwrap_or_else(|| self.generate_color());
        let category = Category {
            id: CategoryId::new(stamp.to_string()),
            name: name.into(),
            color,
        };
        info!("Adding category {category:?}");
        self.categories.push(category.clone());
        Ok(category)
    }

    pub fn rename(&mut self, id: &CategoryId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Category name can't be empty");
        }
        let category = self.find_mut(id)?;
        category.name = Arc::from(name);
        Ok(())
    }

    pub fn recolor(&mut self, id: &CategoryId, color: Color) -> Result<()> {
        self.find_mut(id)?.color = color;
        Ok(())
    }

    /// Removes a category. Past sessions keep their snapshots. If it was selected the default
    /// category takes over.
    pub fn delete(&mut self, id: &CategoryId) -> Result<Category> {
        if id.as_str() == DEFAULT_CATEGORY_ID {
            bail!("The default category can't be deleted");
        }
        let index = self
            .categories
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| anyhow!("Category {id} doesn't exist"))?;
        let removed = self.categories.remove(index);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        info!("Deleted category {removed:?}");
        Ok(removed)
    }

    pub fn select(&mut self, id: &CategoryId) -> Result<Category> {
        let category = self
            .resolve(id)
            .ok_or_else(|| anyhow!("Category {id} doesn't exist"))?;
        self.active = Some(category.id.clone());
        Ok(category)
    }

    fn generate_color(&mut self) -> Color {
        // Registries written before the counter existed start past their categories.
        let step = self.next_hue.max(self.categories.len() as u32);
        self.next_hue = step + 1;
        Color::from_hsl(f64::from(step) * GOLDEN_ANGLE, 80., 60.)
    }

    fn contains(&self, id: &CategoryId) -> bool {
        self.resolve(id).is_some()
    }

    fn find_mut(&mut self, id: &CategoryId) -> Result<&mut Category> {
        if id.as_str() == DEFAULT_CATEGORY_ID {
            bail!("The default category can't be changed");
        }
        self.categories
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| anyhow!("Category {id} doesn't exist"))
    }
}

/// Keeps the [CategoryRegistry] in a json file. Writes go through a temporary file so a reader
/// never sees a partial registry.
#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
}

impl CategoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CategoryRegistry> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Corrupted category registry {:?}", self.path)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No categories at {:?} yet", self.path);
                Ok(CategoryRegistry::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Can't read category registry {:?}", self.path))
            }
        }
    }

    pub fn save(&self, registry: &CategoryRegistry) -> Result<()> {
        let temporary = self.path.with_extension("json.tmp");
        std::fs::write(&temporary, serde_json::to_vec_pretty(registry)?)
            .with_context(|| format!("Can't write {temporary:?}"))?;
        std::fs::rename(&temporary, &self.path)
            .with_context(|| format!("Can't replace {:?}", self.path))?;
        Ok(())
    }

    /// Loads the registry, applies `change` and saves the result if the change succeeded.
    pub fn update<T>(&self, change: impl FnOnce(&mut CategoryRegistry) -> Result<T>) -> Result<T> {
        let mut registry = self.load()?;
        let result = change(&mut registry)?;
        self.save(&registry)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::{
        default_category, CategoryRegistry, CategoryStore, DEFAULT_CATEGORY_ID, GOLDEN_ANGLE,
    };
    use crate::tracker::entities::{CategoryId, Color};

    #[test]
    fn add_generates_ids_and_colors() -> Result<()> {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut registry = CategoryRegistry::default();

        let first = registry.add("  Reading ", None, now)?;
        let second = registry.add("Writing", None, now)?;
        let third = registry.add("Coding", Some(Color::rgb(1, 2, 3)), now)?;

        assert_eq!(first.id.as_str(), "1700000000000");
        assert_eq!(second.id.as_str(), "1700000000001");
        assert_eq!(&*first.name, "Reading");
        assert_ne!(first.color, second.color);
        assert_eq!(third.color, Color::rgb(1, 2, 3));
        assert_eq!(registry.list().len(), 3);
        assert!(registry.add("   ", None, now).is_err());
        Ok(())
    }

    #[test]
    fn generated_colors_are_not_reused_after_delete() -> Result<()> {
        let now = Utc.timestamp_millis_opt(0).unwrap();
        let mut registry = CategoryRegistry::default();
        registry.add("Reading", None, now)?;
        let writing = registry.add("Writing", None, now)?;
        registry.add("Coding", None, now)?;

        registry.delete(&writing.id)?;
        let added = registry.add("Drawing", None, now)?;

        let others = registry
            .list()
            .iter()
            .filter(|c| c.id != added.id)
            .collect::<Vec<_>>();
        assert_eq!(others.len(), 2);
        for other in others {
            assert_ne!(other.color, added.color);
        }
        assert_ne!(added.color, writing.color);
        Ok(())
    }

    #[test]
    fn registries_without_hue_counter_continue_after_their_categories() -> Result<()> {
        let mut registry: CategoryRegistry = serde_json::from_str(
            r##"{"categories": [{"id": "1", "name": "Reading", "color": "#000000"}]}"##,
        )?;
        let now = Utc.timestamp_millis_opt(0).unwrap();

        let added = registry.add("Writing", None, now)?;
        assert_eq!(added.color, Color::from_hsl(GOLDEN_ANGLE, 80., 60.));
        Ok(())
    }

    #[test]
    fn active_falls_back_to_default() -> Result<()> {
        let now = Utc.timestamp_millis_opt(0).unwrap();
        let mut registry = CategoryRegistry::default();
        assert_eq!(registry.active(), default_category());

        let reading = registry.add("Reading", None, now)?;
        registry.select(&reading.id)?;
        assert_eq!(registry.active(), reading);

        registry.delete(&reading.id)?;
        assert_eq!(registry.active(), default_category());
        assert!(registry.resolve(&reading.id).is_none());
        Ok(())
    }

    #[test]
    fn default_category_is_fixed() {
        let mut registry = CategoryRegistry::default();
        let id = CategoryId::from(DEFAULT_CATEGORY_ID);
        assert!(registry.rename(&id, "other").is_err());
        assert!(registry.recolor(&id, Color::default()).is_err());
        assert!(registry.delete(&id).is_err());
        assert!(registry.select(&id).is_ok());
    }

    #[test]
    fn unknown_categories_are_errors() {
        let mut registry = CategoryRegistry::default();
        let id = CategoryId::from("missing");
        assert!(registry.rename(&id, "name").is_err());
        assert!(registry.select(&id).is_err());
        assert!(registry.delete(&id).is_err());
    }

    #[test]
    fn store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = CategoryStore::new(dir.path().join("categories.json"));
        assert_eq!(store.load()?, CategoryRegistry::default());

        let now = Utc.timestamp_millis_opt(5).unwrap();
        let added = store.update(|registry| {
            let category = registry.add("Reading", None, now)?;
            registry.select(&category.id)?;
            Ok(category)
        })?;
        store.update(|registry| registry.rename(&added.id, "Books"))?;

        let registry = store.load()?;
        assert_eq!(&*registry.active().name, "Books");
        assert!(!dir.path().join("categories.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn failed_update_is_not_saved() -> Result<()> {
        let dir = tempdir()?;
        let store = CategoryStore::new(dir.path().join("categories.json"));
        let result = store.update(|registry| registry.rename(&"missing".into(), "name"));
        assert!(result.is_err());
        assert!(!store.path().exists());
        Ok(())
    }
}
