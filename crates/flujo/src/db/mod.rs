//! SQLite persistence for per-owner rule configuration.
//!
//! Stored rules translate losslessly into a [`RuleSet`] and back: keywords and
//! exclusions are kept as JSON arrays of their normalized form, and the side,
//! match mode and priority are stored as columns.

pub mod rules;
pub mod schema;

use crate::classify::{Rule, RuleSet, Side};
use crate::error::{FlujoError, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// A rule as persisted for one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRule {
    pub id: i64,
    pub owner_id: i64,
    pub side: Side,
    pub rule: Rule,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct RuleStore {
    conn: Connection,
}

impl RuleStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn initialize(&mut self) -> Result<()> {
        schema::initialize_schema(&self.conn)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_rule(&mut self, owner_id: i64, side: Side, rule: &Rule) -> Result<i64> {
        rules::insert_rule(&self.conn, owner_id, side, rule)
    }

    pub fn get_rule(&self, id: i64) -> Result<StoredRule> {
        rules::get_rule(&self.conn, id)?.ok_or(FlujoError::RuleNotFound(id))
    }

    pub fn list_rules(&self, owner_id: i64, side: Option<Side>) -> Result<Vec<StoredRule>> {
        rules::list_rules(&self.conn, owner_id, side)
    }

    pub fn deactivate_rule(&mut self, id: i64, owner_id: i64) -> Result<bool> {
        rules::deactivate_rule(&self.conn, id, owner_id)
    }

    pub fn load_rule_set(&self, owner_id: i64, default_label: &str) -> Result<RuleSet> {
        rules::load_rule_set(&self.conn, owner_id, default_label)
    }

    pub fn replace_rule_set(&mut self, owner_id: i64, rule_set: &RuleSet) -> Result<usize> {
        rules::replace_rule_set(&self.conn, owner_id, rule_set)
    }
}
