//! Add / update / delete edits for a [`ConfigStore`].

use serde::Deserialize;

use crate::config_store::{ConfigStore, StoreShape, upsert};
use crate::error::ConfigError;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ChangeSet {
    pub add: Vec<AddEntry>,
    #[serde(alias = "upd")]
    pub update: Vec<UpdateEntry>,
    #[serde(alias = "del")]
    pub delete: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddEntry {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateEntry {
    pub original: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ChangeSet {
    pub fn from_json(body: &[u8]) -> Result<ChangeSet, ConfigError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Rejects names and values that would not read back unchanged from the
    /// store file.
    pub fn validate(&self, shape: StoreShape) -> Result<(), ConfigError> {
        let names = self
            .add
            .iter()
            .map(|add| &add.name)
            .chain(self.update.iter().filter_map(|update| update.name.as_ref()));
        for name in names {
            check_name(name, shape)?;
        }

        if shape == StoreShape::Mapping {
            let values = self
                .add
                .iter()
                .filter_map(|add| add.value.as_ref())
                .chain(self.update.iter().filter_map(|update| update.value.as_ref()));
            for value in values {
                check_value(value)?;
            }
        }
        Ok(())
    }

    /// Applies deletes, then updates, then adds to a copy of `store`.
    pub fn apply(&self, store: &ConfigStore) -> ConfigStore {
        let mut next = store.clone();
        match &mut next {
            ConfigStore::Mapping(entries) => self.apply_mapping(entries),
            ConfigStore::List(names) => self.apply_list(names),
        }
        next
    }

    fn apply_mapping(&self, entries: &mut Vec<(String, String)>) {
        entries.retain(|(name, _)| !self.delete.contains(name));

        for update in &self.update {
            let Some(pos) = entries.iter().position(|(n, _)| *n == update.original) else {
                continue;
            };
            if update.name.is_none() && update.value.is_none() {
                entries.remove(pos);
                continue;
            }
            let name = update.name.clone().unwrap_or_else(|| update.original.clone());
            let value = update.value.clone().unwrap_or_else(|| entries[pos].1.clone());
            entries[pos] = (name, value);
            // a rename onto an existing name replaces that entry
            let renamed = &entries[pos].0;
            if let Some(dup) = entries
                .iter()
                .enumerate()
                .position(|(i, (n, _))| i != pos && n == renamed)
            {
                entries.remove(dup);
            }
        }

        for add in &self.add {
            upsert(entries, add.name.clone(), add.value.clone().unwrap_or_default());
        }
    }

    fn apply_list(&self, names: &mut Vec<String>) {
        names.retain(|name| !self.delete.contains(name));

        for update in &self.update {
            let Some(pos) = names.iter().position(|n| *n == update.original) else {
                continue;
            };
            match (&update.name, &update.value) {
                (Some(name), _) if names.iter().enumerate().any(|(i, n)| i != pos && n == name) => {
                    names.remove(pos);
                }
                (Some(name), _) => names[pos] = name.clone(),
                // a list entry has no value of its own to change
                (None, Some(_)) => {}
                (None, None) => {
                    names.remove(pos);
                }
            }
        }

        for add in &self.add {
            if !names.contains(&add.name) {
                names.push(add.name.clone());
            }
        }
    }
}

/// Applies `changeset` to `store` and writes the result to `path`.
///
/// Returns the new store, or `None` when the changeset is empty and nothing
/// was written.
pub fn apply_and_persist(
    store: &ConfigStore,
    changeset: &ChangeSet,
    path: &std::path::Path,
) -> Result<Option<ConfigStore>, ConfigError> {
    if changeset.is_empty() {
        return Ok(None);
    }
    changeset.validate(store.shape())?;
    let next = changeset.apply(store);
    next.persist(path)?;
    Ok(Some(next))
}

fn check_name(name: &str, shape: StoreShape) -> Result<(), ConfigError> {
    let reason = if name.trim().is_empty() {
        "empty name"
    } else if name.contains(['\r', '\n']) {
        "line break in name"
    } else if name.trim_start().starts_with('#') {
        "name starts with '#'"
    } else if shape == StoreShape::Mapping && name.contains('\'') {
        "quote in name"
    } else if shape == StoreShape::List && name.trim() != name {
        "surrounding whitespace in name"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidEntry(format!("{reason}: {name:?}")))
}

fn check_value(value: &str) -> Result<(), ConfigError> {
    let reason = if value.contains(['\r', '\n']) {
        "line break in value"
    } else if value.contains('\'') {
        "quote in value"
    } else {
        return Ok(());
    };
    // the value itself is never echoed
    Err(ConfigError::InvalidEntry(reason.to_string()))
}
