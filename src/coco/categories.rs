//! Category definition files.
//!
//! A category definition file is a JSON array of `{"id": ..., "name": ...}`
//! objects. It is validated up front, before any conversion starts: ids
//! must be the consecutive integers 1..=N and names must be unique.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::ids::CategoryId;
use super::model::Category;
use crate::error::CocomaskError;

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    id: Option<u64>,
    name: Option<String>,
    #[serde(default)]
    supercategory: Option<String>,
}

/// A validated set of category definitions with id and name lookups.
#[derive(Clone, Debug)]
pub struct CategorySet {
    categories: Vec<Category>,
    by_name: HashMap<String, CategoryId>,
}

impl CategorySet {
    /// Loads and validates a category definition file.
    pub fn from_path(path: &Path) -> Result<Self, CocomaskError> {
        let bytes = fs::read(path).map_err(|e| {
            CocomaskError::InvalidCategoryDefinition(format!(
                "cannot read {}: {e}",
                path.display()
            ))
        })?;
        Self::from_slice(&bytes)
    }

    /// Parses and validates category definitions from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CocomaskError> {
        let entries: Vec<CategoryEntry> = serde_json::from_slice(bytes)
            .map_err(|e| CocomaskError::InvalidCategoryDefinition(format!("malformed JSON: {e}")))?;
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<CategoryEntry>) -> Result<Self, CocomaskError> {
        if entries.is_empty() {
            return Err(CocomaskError::InvalidCategoryDefinition(
                "category list is empty".to_string(),
            ));
        }

        let mut categories = Vec::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        for entry in entries {
            let (Some(id), Some(name)) = (entry.id, entry.name) else {
                return Err(CocomaskError::InvalidCategoryDefinition(
                    "each category must have an 'id' and a 'name'".to_string(),
                ));
            };
            if id == 0 {
                return Err(CocomaskError::InvalidCategoryDefinition(
                    "category ids must be positive".to_string(),
                ));
            }
            if name.is_empty() {
                return Err(CocomaskError::InvalidCategoryDefinition(format!(
                    "category {id} has an empty name"
                )));
            }
            if by_name.insert(name.clone(), CategoryId::new(id)).is_some() {
                return Err(CocomaskError::InvalidCategoryDefinition(format!(
                    "duplicate category name '{name}'"
                )));
            }
            let mut category = Category::new(id, name);
            category.supercategory = entry.supercategory;
            categories.push(category);
        }

        // Ids must be exactly 1..=N, in any order. A duplicate or a gap
        // both fail this check.
        let mut ids: Vec<u64> = categories.iter().map(|c| c.id.as_u64()).collect();
        ids.sort_unstable();
        for (index, id) in ids.iter().enumerate() {
            let expected = index as u64 + 1;
            if *id != expected {
                return Err(CocomaskError::InvalidCategoryDefinition(format!(
                    "ids must be consecutive starting at 1; expected {expected}, found {id}"
                )));
            }
        }

        Ok(Self {
            categories,
            by_name,
        })
    }

    /// The categories, in file order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Looks up a category id by name.
    pub fn id_of(&self, name: &str) -> Option<CategoryId> {
        self.by_name.get(name).copied()
    }

    /// Looks up a category name by id.
    pub fn name_of(&self, id: CategoryId) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// True if `id` is one of the defined categories.
    pub fn contains_id(&self, id: CategoryId) -> bool {
        let raw = id.as_u64();
        raw >= 1 && raw <= self.categories.len() as u64
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
