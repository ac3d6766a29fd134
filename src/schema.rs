//! Merged action configuration
//!
//! An action's `action.yml` may name a shared base document through a
//! top-level `extends` key. The base is loaded (it may itself extend another
//! document), then the action's own document is merged on top:
//!
//! - Mappings merge recursively, the action's keys winning on conflict.
//! - Sequences and scalars from the action replace the base value.
//! - The `extends` key never appears in the result.
//!
//! `extends` paths are resolved against the monorepo root unless absolute.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::path::normalize_directory;

/// Key naming the base document.
pub const EXTENDS_KEY: &str = "extends";

/// File name of an action's configuration document.
pub const ACTION_FILE: &str = "action.yml";

/// Load `action_file` and merge it over every document it extends.
pub fn get_config(working_directory: &Path, action_file: &Path) -> Result<YamlValue> {
    let mut chain: Vec<PathBuf> = Vec::new();
    load(working_directory, action_file, &mut chain)
}

/// Serialize a merged configuration the way it is written to disk.
pub fn to_yaml(value: &YamlValue) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

fn load(working_directory: &Path, file: &Path, chain: &mut Vec<PathBuf>) -> Result<YamlValue> {
    let schema_error = |message: String| Error::Schema {
        path: file.display().to_string(),
        message,
    };

    if chain.iter().any(|seen| seen == file) {
        let cycle: Vec<String> = chain
            .iter()
            .chain(std::iter::once(&file.to_path_buf()))
            .map(|p| p.display().to_string())
            .collect();
        return Err(schema_error(format!("extends cycle: {}", cycle.join(" -> "))));
    }
    chain.push(file.to_path_buf());

    let content = fs::read_to_string(file).map_err(|e| schema_error(e.to_string()))?;
    let mut document: YamlValue =
        serde_yaml::from_str(&content).map_err(|e| schema_error(e.to_string()))?;

    let extends = match document.as_mapping_mut() {
        Some(map) => map.remove(EXTENDS_KEY),
        None => None,
    };

    let merged = match extends {
        None => document,
        Some(YamlValue::String(base)) => {
            let base_file = normalize_directory(working_directory, Path::new(&base));
            let mut merged = load(working_directory, &base_file, chain)?;
            merge_yaml_values(&mut merged, &document, "");
            merged
        }
        Some(other) => {
            return Err(schema_error(format!(
                "'{}' must be a path string, found {:?}",
                EXTENDS_KEY, other
            )))
        }
    };

    chain.pop();
    Ok(merged)
}

/// Recursively merge `source` into `target`.
///
/// Mappings are merged key by key; anything else in `source` replaces the
/// target value. Replacing a mapping with a non-mapping (or the reverse) is
/// allowed but logged, since it usually means a typo in the override.
pub fn merge_yaml_values(target: &mut YamlValue, source: &YamlValue, path: &str) {
    match (target, source) {
        (YamlValue::Mapping(target_map), YamlValue::Mapping(source_map)) => {
            for (key, value) in source_map {
                let key_str = match key {
                    YamlValue::String(s) => s.clone(),
                    _ => format!("{:?}", key),
                };
                let new_path = if path.is_empty() {
                    key_str
                } else {
                    format!("{}.{}", path, key_str)
                };

                match target_map.get_mut(key) {
                    Some(existing) => merge_yaml_values(existing, value, &new_path),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => {
            if target.is_mapping() != source.is_mapping() && !target.is_null() {
                warn!(
                    "Type mismatch at '{}': replacing base value with override of a different shape",
                    if path.is_empty() { "<root>" } else { path }
                );
            }
            *target = source.clone();
        }
    }
}
