//! Structured rule documents (JSON or TOML).
//!
//! ```toml
//! default_label = "NO CLASIFICADO"
//!
//! [[classifiers.debit]]
//! name = "PROVEEDORES"
//! keywords = ["PROVEEDOR", "SERVIPAG"]
//! match_mode = "any"
//! exclusions = ["DEVOLUCION"]
//! ```
//!
//! The Spanish vocabulary of older configuration files (`clasificadores`,
//! `abonos`/`cargos`, `nombre`, `palabras_clave`, `tipo`, `excluir`, `orden`,
//! `clasificacion_default`) is accepted as well; English keys take precedence
//! when both are present.

use super::{split_terms, DropReason, LoadOptions, LoadReport, RuleCollector, RuleEntry};
use crate::classify::{Rule, RuleSet, Side};
use crate::error::{FlujoError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const CLASSIFIERS_KEYS: &[&str] = &["classifiers", "clasificadores"];
const CREDIT_KEYS: &[&str] = &["credit", "abonos"];
const DEBIT_KEYS: &[&str] = &["debit", "cargos"];
const DEFAULT_LABEL_KEYS: &[&str] = &["default_label", "clasificacion_default"];

const NAME_KEYS: &[&str] = &["name", "nombre"];
const KEYWORDS_KEYS: &[&str] = &["keywords", "palabras_clave"];
const MATCH_MODE_KEYS: &[&str] = &["match_mode", "tipo", "tipo_coincidencia"];
const EXCLUSIONS_KEYS: &[&str] = &["exclusions", "excluir"];
const PRIORITY_KEYS: &[&str] = &["priority", "orden"];

/// Serializable shape of a rule document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    pub default_label: String,
    pub classifiers: DocumentClassifiers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentClassifiers {
    #[serde(default)]
    pub credit: Vec<Rule>,
    #[serde(default)]
    pub debit: Vec<Rule>,
}

impl RuleSet {
    pub fn to_document(&self) -> RuleDocument {
        RuleDocument {
            default_label: self.default_label().to_string(),
            classifiers: DocumentClassifiers {
                credit: self.credit_rules().to_vec(),
                debit: self.debit_rules().to_vec(),
            },
        }
    }

    /// Serialize into a TOML rule document that loads back to an equal set.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.to_document())
            .map_err(|e| FlujoError::Config(format!("Failed to serialize rules: {}", e)))
    }

    /// Serialize into a JSON rule document that loads back to an equal set.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}

pub fn load_json(text: &str, origin: &str, options: &LoadOptions) -> Result<LoadReport> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| FlujoError::unreadable(origin, format!("invalid JSON: {}", e)))?;
    load_value(&value, origin, options)
}

pub fn load_toml(text: &str, origin: &str, options: &LoadOptions) -> Result<LoadReport> {
    let value: Value = toml::from_str(text)
        .map_err(|e| FlujoError::unreadable(origin, format!("invalid TOML: {}", e)))?;
    load_value(&value, origin, options)
}

/// Build a rule set from a parsed document tree.
pub fn load_value(value: &Value, origin: &str, options: &LoadOptions) -> Result<LoadReport> {
    let root = value
        .as_object()
        .ok_or_else(|| FlujoError::unreadable(origin, "document root is not a table"))?;

    let classifiers = match lookup(root, CLASSIFIERS_KEYS) {
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(FlujoError::unreadable(origin, "'classifiers' is not a table"));
        }
        None => return Err(FlujoError::unreadable(origin, "missing 'classifiers' table")),
    };

    let mut collector = RuleCollector::new();
    for (side, keys) in [(Side::Credit, CREDIT_KEYS), (Side::Debit, DEBIT_KEYS)] {
        let entries: &[Value] = match lookup(classifiers, keys) {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(FlujoError::unreadable(
                    origin,
                    format!("'classifiers.{}' is not a list", side),
                ));
            }
        };

        let section = side.as_str();
        for (index, item) in entries.iter().enumerate() {
            let position = index + 1;
            match parse_entry(item) {
                Ok(entry) => collector.push(side, section, position, entry),
                Err(detail) => collector.drop_entry(section, position, DropReason::Malformed(detail)),
            }
        }
    }

    let document_label = lookup(root, DEFAULT_LABEL_KEYS).and_then(Value::as_str);
    let default_label = options.default_label.as_deref().or(document_label);

    Ok(collector.finish(origin, default_label))
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

fn parse_entry(item: &Value) -> std::result::Result<RuleEntry, String> {
    let map = item.as_object().ok_or("entry is not a table")?;

    let name = match lookup(map, NAME_KEYS) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(_) => return Err("'name' is not a string".to_string()),
    };

    let match_mode = match lookup(map, MATCH_MODE_KEYS) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(_) => return Err("'match_mode' is not a string".to_string()),
    };

    let priority = match lookup(map, PRIORITY_KEYS) {
        Some(Value::Null) | None => None,
        Some(v) => Some(as_integer(v).ok_or("'priority' is not an integer")?),
    };

    Ok(RuleEntry {
        name,
        keywords: term_list(lookup(map, KEYWORDS_KEYS), "keywords")?,
        match_mode,
        exclusions: term_list(lookup(map, EXCLUSIONS_KEYS), "exclusions")?,
        priority,
    })
}

/// Accept either a list of strings or a single delimited string.
fn term_list(value: Option<&Value>, field: &str) -> std::result::Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(split_terms(s)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("'{}' contains a non-string item", field))
            })
            .collect(),
        Some(_) => Err(format!("'{}' is not a list", field)),
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
