//! Flat-file stores: `'name'='value'` mapping files (API keys, engine ids)
//! and one-name-per-line list files (proxied domains).

use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreShape {
    Mapping,
    List,
}

/// In-memory contents of one store file. Order is the file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStore {
    Mapping(Vec<(String, String)>),
    List(Vec<String>),
}

impl ConfigStore {
    pub fn empty(shape: StoreShape) -> ConfigStore {
        match shape {
            StoreShape::Mapping => ConfigStore::Mapping(Vec::new()),
            StoreShape::List => ConfigStore::List(Vec::new()),
        }
    }

    pub fn shape(&self) -> StoreShape {
        match self {
            ConfigStore::Mapping(_) => StoreShape::Mapping,
            ConfigStore::List(_) => StoreShape::List,
        }
    }

    /// Reads a store file. A missing file is an empty store.
    pub fn load(path: &Path, shape: StoreShape) -> Result<ConfigStore, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(ConfigStore::parse(&text, shape)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "store file missing, starting empty");
                Ok(ConfigStore::empty(shape))
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str, shape: StoreShape) -> ConfigStore {
        let mut store = ConfigStore::empty(shape);
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        for line in lines {
            match &mut store {
                ConfigStore::Mapping(entries) => match parse_mapping_line(line) {
                    Some((name, value)) => upsert(entries, name, value),
                    None => tracing::warn!(line, "skipping malformed store line"),
                },
                ConfigStore::List(names) => {
                    if !names.iter().any(|n| n == line) {
                        names.push(line.to_string());
                    }
                }
            }
        }
        store
    }

    /// File contents for this store.
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self {
            ConfigStore::Mapping(entries) => {
                for (name, value) in entries {
                    out.push_str(&format!("'{name}'='{value}'\n"));
                }
            }
            ConfigStore::List(names) => {
                for name in names {
                    out.push_str(name);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Replaces the file at `path` with this store. The new contents are
    /// written to a sibling temp file and renamed over the old one, so
    /// readers see either the old file or the new one.
    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.render().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            ConfigStore::Mapping(entries) => entries
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            ConfigStore::List(names) => names.iter().find(|n| *n == name).map(String::as_str),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            ConfigStore::Mapping(entries) => entries.iter().map(|(n, _)| n.as_str()).collect(),
            ConfigStore::List(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ConfigStore::Mapping(entries) => entries.len(),
            ConfigStore::List(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sets `name` to `value`, keeping the position of an existing entry.
pub(crate) fn upsert(entries: &mut Vec<(String, String)>, name: String, value: String) {
    match entries.iter_mut().find(|(n, _)| *n == name) {
        Some(entry) => entry.1 = value,
        None => entries.push((name, value)),
    }
}

/// Accepts `'name'='value'` as written by [`ConfigStore::render`], plus plain
/// or double-quoted `NAME=value` lines from hand-edited files.
fn parse_mapping_line(line: &str) -> Option<(String, String)> {
    let (name, value) = match line.strip_prefix('\'').and_then(|rest| rest.split_once("'='")) {
        Some((name, value)) => (name, value.strip_suffix('\'').unwrap_or(value)),
        None => {
            let (name, value) = line.split_once('=')?;
            (unquote(name.trim()), unquote(value.trim()))
        }
    };
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}
