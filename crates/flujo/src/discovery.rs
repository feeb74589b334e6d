//! Locating rule files and matching them to clients.
//!
//! Rule files live either in a dedicated configs directory (any supported
//! extension) or next to the application as `clasificadores*.{json,toml,...}`.
//! A client's rules are found by extracting the client name from a bank
//! statement file name and looking for a rule file that mentions it.

use crate::error::{FlujoError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

const RULE_EXTENSIONS: &[&str] = &["json", "toml", "csv", "xlsx"];
const RULE_FILE_PREFIX: &str = "clasificadores";

/// Patterns tried in order against a lowercased statement file stem.
const CLIENT_PATTERNS: &[&str] = &[
    r"cliente[_\s]+([a-z0-9_]+)",
    r"empresa[_\s]+([a-z0-9_]+)",
    r"([a-z0-9_]+)[_\s]+cartola",
    r"([a-z0-9_]+)[_\s]+datos",
    r"cartola[_\s]+([a-z0-9_]+)",
];

fn client_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        CLIENT_PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::error!("Invalid client pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect()
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| FlujoError::Config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| FlujoError::Config(format!("Failed to build globset: {}", e)))
}

fn files_matching(dir: &Path, globs: &GlobSet) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| globs.is_match(entry.file_name()))
        .map(|entry| entry.into_path())
        .collect()
}

/// List rule files from `configs_dir` (every supported extension) and
/// `base_dir` (only `clasificadores*` files), sorted by file name.
/// Missing directories contribute nothing.
pub fn discover_rule_files(configs_dir: Option<&Path>, base_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let any_rules: Vec<String> = RULE_EXTENSIONS.iter().map(|ext| format!("*.{}", ext)).collect();
    let prefixed: Vec<String> = RULE_EXTENSIONS
        .iter()
        .map(|ext| format!("{}*.{}", RULE_FILE_PREFIX, ext))
        .collect();

    let mut found = BTreeSet::new();
    if let Some(dir) = configs_dir.filter(|d| d.is_dir()) {
        found.extend(files_matching(dir, &build_globset(&any_rules)?));
    }
    if let Some(dir) = base_dir.filter(|d| d.is_dir()) {
        found.extend(files_matching(dir, &build_globset(&prefixed)?));
    }

    let mut files: Vec<PathBuf> = found.into_iter().collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    log::debug!("Discovered {} rule files", files.len());
    Ok(files)
}

/// Guess the client a bank statement belongs to from its file name.
///
/// `cartola_cliente_acme.xlsx` yields `acme`, `empresa_xyz_cartola.xlsx`
/// yields `xyz_cartola`.
pub fn client_name_from_file(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())?
        .to_lowercase();

    client_patterns().iter().find_map(|re| {
        re.captures(&stem)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Find the rule file meant for a client.
pub fn find_rules_for_client<'a>(client: &str, files: &'a [PathBuf]) -> Option<&'a PathBuf> {
    let client = client.trim().to_lowercase().replace(' ', "_");
    if client.is_empty() {
        return None;
    }

    let prefix = format!("{}_", RULE_FILE_PREFIX);
    files.iter().find(|path| {
        let stem = file_stem_lower(path);
        stem.contains(&client) || stem.strip_prefix(&prefix) == Some(client.as_str())
    })
}

/// Map display client names (lowercase, spaces for underscores) to their
/// rule files. The generic `clasificadores` file is left out.
pub fn client_rule_map(files: &[PathBuf]) -> BTreeMap<String, PathBuf> {
    let prefix = format!("{}_", RULE_FILE_PREFIX);
    files
        .iter()
        .filter_map(|path| {
            let stem = file_stem_lower(path);
            let name = stem.strip_prefix(&prefix).unwrap_or(&stem).replace('_', " ");
            (name != RULE_FILE_PREFIX).then(|| (name, path.clone()))
        })
        .collect()
}

fn file_stem_lower(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase()
}
