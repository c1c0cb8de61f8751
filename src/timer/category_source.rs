use anyhow::Result;
use tracing::warn;

use crate::{
    storage::category_storage::{default_category, CategoryStore},
    tracker::entities::Category,
};

/// Intended to serve as the contract for whatever knows which category is being focused on.
#[cfg_attr(test, mockall::automock)]
pub trait CategorySource {
    /// Category the next tick belongs to.
    fn active_category(&mut self) -> Result<Category>;
}

/// Follows the selection stored in the category registry. The registry is read on every tick,
/// so selecting, renaming or recoloring from another terminal affects a running timer.
pub struct RegistryCategorySource {
    store: CategoryStore,
    last_known: Category,
}

impl RegistryCategorySource {
    pub fn new(store: CategoryStore) -> Self {
        Self {
            store,
            last_known: default_category(),
        }
    }
}

impl CategorySource for RegistryCategorySource {
    fn active_category(&mut self) -> Result<Category> {
        match self.store.load() {
            Ok(registry) => {
                self.last_known = registry.active();
            }
            Err(e) => {
                // Mostly a registry being replaced right now. Keep counting for the last category.
                warn!("Can't read categories, staying with {}: {e:?}", self.last_known.id);
            }
        }
        Ok(self.last_known.clone())
    }
}
