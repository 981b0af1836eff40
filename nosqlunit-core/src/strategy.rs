//! Dataset load strategies.

/// How a dataset is applied before a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Insert the dataset on top of whatever the store holds.
    Insert,
    /// Empty the store, then insert the dataset.
    #[default]
    CleanInsert,
    /// Empty the store; no dataset is loaded.
    DeleteAll,
    /// Insert the dataset, overwriting records with the same identity.
    Refresh,
}

impl LoadStrategy {
    /// Whether the store is emptied before loading.
    pub fn clears_store(&self) -> bool {
        matches!(self, LoadStrategy::CleanInsert | LoadStrategy::DeleteAll)
    }

    /// Whether datasets are read at all.
    pub fn loads_data(&self) -> bool {
        !matches!(self, LoadStrategy::DeleteAll)
    }
}
