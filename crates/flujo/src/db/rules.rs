use crate::classify::{MatchMode, Rule, RuleSet, Side};
use crate::db::StoredRule;
use crate::error::{FlujoError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

const SELECT_RULES: &str = "SELECT id, owner_id, name, side, keywords, match_mode, exclusions,
                                   priority, active, created_at
                            FROM rules";

/// Row as stored, before JSON columns are decoded.
struct RuleRow {
    id: i64,
    owner_id: i64,
    name: String,
    side: String,
    keywords: String,
    match_mode: String,
    exclusions: Option<String>,
    priority: i64,
    active: bool,
    created_at: Option<String>,
}

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<RuleRow> {
    Ok(RuleRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        side: row.get(3)?,
        keywords: row.get(4)?,
        match_mode: row.get(5)?,
        exclusions: row.get(6)?,
        priority: row.get(7)?,
        active: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn decode(row: RuleRow) -> Result<Option<StoredRule>> {
    let side = side_from_str(&row.side)?;
    let keywords: Vec<String> = serde_json::from_str(&row.keywords)?;
    let exclusions: Vec<String> = match row.exclusions.as_deref() {
        Some(text) if !text.is_empty() => serde_json::from_str(text)?,
        _ => Vec::new(),
    };

    let Some(rule) = Rule::new(
        &row.name,
        &keywords,
        MatchMode::parse_lenient(&row.match_mode),
        &exclusions,
        row.priority,
    ) else {
        log::warn!("Stored rule {} has no usable name or keyword, ignoring it", row.id);
        return Ok(None);
    };

    Ok(Some(StoredRule {
        id: row.id,
        owner_id: row.owner_id,
        side,
        rule,
        active: row.active,
        created_at: row.created_at.as_deref().and_then(parse_timestamp),
    }))
}

fn side_from_str(s: &str) -> Result<Side> {
    match s {
        "credit" => Ok(Side::Credit),
        "debit" => Ok(Side::Debit),
        _ => Err(FlujoError::Config(format!("Invalid rule side: {}", s))),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        })
}

/// Persist a rule for an owner and return its id.
pub fn insert_rule(conn: &Connection, owner_id: i64, side: Side, rule: &Rule) -> Result<i64> {
    let keywords = serde_json::to_string(&rule.keywords)?;
    let exclusions = if rule.exclusions.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&rule.exclusions)?)
    };

    conn.execute(
        "INSERT INTO rules (owner_id, name, side, keywords, match_mode, exclusions, priority)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            owner_id,
            &rule.name,
            side.as_str(),
            &keywords,
            rule.match_mode.as_str(),
            &exclusions,
            rule.priority,
        ),
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn get_rule(conn: &Connection, id: i64) -> Result<Option<StoredRule>> {
    let sql = format!("{} WHERE id = ?1", SELECT_RULES);
    let row = conn.query_row(&sql, [id], read_row).optional()?;
    match row {
        Some(row) => decode(row),
        None => Ok(None),
    }
}

/// Active rules of an owner, in evaluation order within each side.
pub fn list_rules(conn: &Connection, owner_id: i64, side: Option<Side>) -> Result<Vec<StoredRule>> {
    let sql = format!(
        "{} WHERE owner_id = ?1 AND active = 1 AND (?2 IS NULL OR side = ?2)
         ORDER BY side, priority, id",
        SELECT_RULES
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((owner_id, side.map(|s| s.as_str())), read_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(rule) = decode(row)? {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Soft-delete a rule. Returns false when the owner has no such active rule.
pub fn deactivate_rule(conn: &Connection, id: i64, owner_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE rules SET active = 0 WHERE id = ?1 AND owner_id = ?2 AND active = 1",
        (id, owner_id),
    )?;
    Ok(changed > 0)
}

/// Translate an owner's active rules into a rule set.
pub fn load_rule_set(conn: &Connection, owner_id: i64, default_label: &str) -> Result<RuleSet> {
    let mut credit = Vec::new();
    let mut debit = Vec::new();

    for stored in list_rules(conn, owner_id, None)? {
        match stored.side {
            Side::Credit => credit.push(stored.rule),
            Side::Debit => debit.push(stored.rule),
        }
    }

    Ok(RuleSet::new(credit, debit, default_label))
}

/// Replace an owner's active rules with the given set in one transaction.
/// Previous rules are deactivated, not deleted.
pub fn replace_rule_set(conn: &Connection, owner_id: i64, rule_set: &RuleSet) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "UPDATE rules SET active = 0 WHERE owner_id = ?1 AND active = 1",
        [owner_id],
    )?;

    let mut inserted = 0;
    for (side, rule) in rule_set.iter() {
        insert_rule(&tx, owner_id, side, rule)?;
        inserted += 1;
    }

    tx.commit()?;
    log::info!("Stored {} rules for owner {}", inserted, owner_id);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::initialize_schema;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn
    }

    fn rule(name: &str, keywords: &[&str], priority: i64) -> Rule {
        Rule::new(name, keywords, MatchMode::Any, Vec::<String>::new(), priority).unwrap()
    }

    #[test]
    fn test_insert_and_get_rule() {
        let conn = create_test_db();
        let original = Rule::new("UTIL", ["agua", "luz"], MatchMode::All, ["reverso"], 4).unwrap();

        let id = insert_rule(&conn, 1, Side::Debit, &original).unwrap();
        assert!(id > 0);

        let stored = get_rule(&conn, id).unwrap().unwrap();
        assert_eq!(stored.rule, original);
        assert_eq!(stored.side, Side::Debit);
        assert_eq!(stored.owner_id, 1);
        assert!(stored.active);
        assert!(stored.created_at.is_some());
    }

    #[test]
    fn test_list_rules_filters_owner_and_side() {
        let conn = create_test_db();
        insert_rule(&conn, 1, Side::Debit, &rule("B", &["B"], 2)).unwrap();
        insert_rule(&conn, 1, Side::Debit, &rule("A", &["A"], 1)).unwrap();
        insert_rule(&conn, 1, Side::Credit, &rule("C", &["C"], 0)).unwrap();
        insert_rule(&conn, 2, Side::Debit, &rule("OTHER", &["X"], 0)).unwrap();

        let debit = list_rules(&conn, 1, Some(Side::Debit)).unwrap();
        let names: Vec<&str> = debit.iter().map(|r| r.rule.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        assert_eq!(list_rules(&conn, 1, None).unwrap().len(), 3);
        assert_eq!(list_rules(&conn, 2, None).unwrap().len(), 1);
    }

    #[test]
    fn test_deactivate_rule() {
        let conn = create_test_db();
        let id = insert_rule(&conn, 1, Side::Debit, &rule("A", &["A"], 0)).unwrap();

        assert!(!deactivate_rule(&conn, id, 2).unwrap());
        assert!(deactivate_rule(&conn, id, 1).unwrap());
        assert!(!deactivate_rule(&conn, id, 1).unwrap());
        assert!(list_rules(&conn, 1, None).unwrap().is_empty());
    }

    #[test]
    fn test_rule_set_round_trip() {
        let conn = create_test_db();
        let set = RuleSet::new(
            vec![rule("VENTAS", &["VENTA"], 0)],
            vec![
                Rule::new("UTIL", ["AGUA", "LUZ"], MatchMode::All, ["REVERSO"], 0).unwrap(),
                rule("PROVEEDORES", &["PROVEEDOR"], 1),
                rule("OTROS PAGOS", &["PAGO"], 1),
            ],
            "",
        );

        assert_eq!(replace_rule_set(&conn, 7, &set).unwrap(), 4);
        let loaded = load_rule_set(&conn, 7, set.default_label()).unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_replace_deactivates_previous_rules() {
        let conn = create_test_db();
        let first = RuleSet::new(vec![], vec![rule("OLD", &["OLD"], 0)], "");
        let second = RuleSet::new(vec![], vec![rule("NEW", &["NEW"], 0)], "");

        replace_rule_set(&conn, 1, &first).unwrap();
        replace_rule_set(&conn, 1, &second).unwrap();

        let loaded = load_rule_set(&conn, 1, "").unwrap();
        assert_eq!(loaded.debit_rules().len(), 1);
        assert_eq!(loaded.debit_rules()[0].name, "NEW");

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM rules WHERE owner_id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_owner_without_rules_loads_empty_set() {
        let conn = create_test_db();
        let loaded = load_rule_set(&conn, 99, "").unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.classify("PAGO", -1.0), crate::classify::DEFAULT_LABEL);
    }
}
