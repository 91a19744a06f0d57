use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{AnalysisDataset, MATCHES_EXT, MATCHES_PREFIX};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("yaml error in {path}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{path}: {message}")]
    Format { path: PathBuf, message: String },
}

fn io_err<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> StoreError + 'a {
    move |source| StoreError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

fn yaml_err(path: &Path) -> impl FnOnce(serde_yaml::Error) -> StoreError + '_ {
    move |source| StoreError::Yaml {
        path: path.to_path_buf(),
        source,
    }
}

/// Per-summoner match file: a YAML sequence whose first item is the summoner
/// name and whose remaining items are match records. Records are appended one
/// at a time so a crash keeps everything saved so far.
#[derive(Debug)]
pub struct MatchStore {
    path: PathBuf,
    saved: usize,
}

impl MatchStore {
    /// Starts a fresh file for `summoner`, replacing any previous one.
    pub fn create(path: &Path, summoner: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                fs::create_dir_all(parent).map_err(io_err("create dir", parent))?;
                log::info!("Created '{}'", parent.display());
            }
        }
        if path.is_file() {
            log::warn!("Overwriting existing file {}", path.display());
            fs::remove_file(path).map_err(io_err("remove", path))?;
        }
        let store = Self {
            path: path.to_path_buf(),
            saved: 0,
        };
        store.append_item(&summoner)?;
        Ok(store)
    }

    pub fn append(&mut self, record: &Value) -> Result<(), StoreError> {
        self.append_item(record)?;
        self.saved += 1;
        Ok(())
    }

    fn append_item<T: Serialize + ?Sized>(&self, item: &T) -> Result<(), StoreError> {
        let chunk = serde_yaml::to_string(&[item]).map_err(yaml_err(&self.path))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err("open", &self.path))?;
        file.write_all(chunk.as_bytes())
            .map_err(io_err("append to", &self.path))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saved(&self) -> usize {
        self.saved
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedMatches {
    pub summoner: String,
    pub matches: Vec<Value>,
}

pub fn load_matches(path: &Path) -> Result<PersistedMatches, StoreError> {
    let raw = fs::read_to_string(path).map_err(io_err("read", path))?;
    let items: Vec<Value> = if raw.trim().is_empty() {
        Vec::new()
    } else {
        serde_yaml::from_str(&raw).map_err(yaml_err(path))?
    };
    let mut items = items.into_iter();
    let summoner = match items.next() {
        Some(Value::String(name)) => name,
        Some(_) => {
            return Err(StoreError::Format {
                path: path.to_path_buf(),
                message: "first item must be the summoner name".to_string(),
            });
        }
        None => {
            return Err(StoreError::Format {
                path: path.to_path_buf(),
                message: "empty match file".to_string(),
            });
        }
    };
    Ok(PersistedMatches {
        summoner,
        matches: items.collect(),
    })
}

/// Writes a whole match file in one go.
pub fn write_matches(path: &Path, persisted: &PersistedMatches) -> Result<(), StoreError> {
    let mut items = Vec::with_capacity(persisted.matches.len() + 1);
    items.push(Value::String(persisted.summoner.clone()));
    items.extend(persisted.matches.iter().cloned());
    let yaml = serde_yaml::to_string(&items).map_err(yaml_err(path))?;
    write_atomically(path, &yaml)
}

/// Match files in `data_dir`, sorted by name. A missing directory holds no
/// match files.
pub fn list_match_files(data_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !data_dir.exists() {
        log::warn!("Data directory {} does not exist", data_dir.display());
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(data_dir).map_err(io_err("list", data_dir))?;
    let suffix = format!(".{MATCHES_EXT}");
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err("list", data_dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(MATCHES_PREFIX) && name.ends_with(&suffix) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

pub fn save_dataset(path: &Path, dataset: &AnalysisDataset) -> Result<(), StoreError> {
    if path.is_file() {
        log::warn!("Overwriting existing file {}", path.display());
    }
    let yaml = serde_yaml::to_string(dataset).map_err(yaml_err(path))?;
    write_atomically(path, &yaml)
}

pub fn load_dataset(path: &Path) -> Result<AnalysisDataset, StoreError> {
    let raw = fs::read_to_string(path).map_err(io_err("read", path))?;
    serde_yaml::from_str(&raw).map_err(yaml_err(path))
}

fn write_atomically(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err("create dir", parent))?;
        }
    }
    let tmp = path.with_extension("yml.tmp");
    fs::write(&tmp, contents).map_err(io_err("write", &tmp))?;
    fs::rename(&tmp, path).map_err(io_err("replace", path))?;
    Ok(())
}
