//! Rule and rule set types.
//!
//! A [`RuleSet`] holds two partitions of [`Rule`]s, one evaluated for credits
//! (money in) and one for debits (money out). Each partition is kept sorted by
//! ascending priority, with ties in insertion order, from the moment the set
//! is built; the classifier relies on that and never sorts.

use crate::normalize::normalize_terms;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label returned when no rule matches.
pub const DEFAULT_LABEL: &str = "NO CLASIFICADO";

/// Which side of the account a transaction affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Credit,
    Debit,
}

impl Side {
    /// Route a signed amount. Only strictly positive amounts are credits.
    pub fn for_amount(amount: f64) -> Self {
        if amount > 0.0 {
            Side::Credit
        } else {
            Side::Debit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Credit => "credit",
            Side::Debit => "debit",
        }
    }

    /// Recognize a partition label (`"ABONO"`, `"credit"`, `"Cargos"`, ...).
    pub fn parse_label(s: &str) -> Option<Self> {
        match crate::normalize::normalize(s).as_str() {
            "CREDIT" | "CREDITS" | "CREDITO" | "CREDITOS" | "ABONO" | "ABONOS" | "INGRESO"
            | "INGRESOS" => Some(Side::Credit),
            "DEBIT" | "DEBITS" | "DEBITO" | "DEBITOS" | "CARGO" | "CARGOS" | "EGRESO"
            | "EGRESOS" => Some(Side::Debit),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule's keywords combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At least one keyword must occur in the text.
    #[default]
    Any,
    /// Every keyword must occur in the text.
    All,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Any => "any",
            MatchMode::All => "all",
        }
    }

    /// Parse a match mode, falling back to [`MatchMode::Any`] for anything
    /// unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        let value = crate::normalize::normalize(s);
        match value.as_str() {
            "ALL" | "TODAS" | "TODOS" | "CONTIENE_EXACTO" => MatchMode::All,
            _ if value.contains("EXACT") => MatchMode::All,
            _ => MatchMode::Any,
        }
    }
}

/// A single keyword rule. Keywords and exclusions are stored normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub priority: i64,
}

impl Rule {
    /// Build a rule, normalizing its terms. Returns `None` when the name is
    /// blank or no keyword survives normalization.
    pub fn new<K, E>(
        name: &str,
        keywords: K,
        match_mode: MatchMode,
        exclusions: E,
        priority: i64,
    ) -> Option<Self>
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let keywords = normalize_terms(keywords);
        if keywords.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            keywords,
            match_mode,
            exclusions: normalize_terms(exclusions),
            priority,
        })
    }

    /// True when one of the exclusions occurs in the text.
    pub fn is_excluded(&self, text: &str) -> bool {
        self.exclusions.iter().any(|e| text.contains(e.as_str()))
    }

    /// Evaluate the keyword part of the rule, ignoring exclusions.
    pub fn keywords_match(&self, text: &str) -> bool {
        match self.match_mode {
            MatchMode::Any => self.keywords.iter().any(|k| text.contains(k.as_str())),
            MatchMode::All => self.keywords.iter().all(|k| text.contains(k.as_str())),
        }
    }

    /// Full evaluation: exclusions veto, then the match mode decides.
    pub fn matches(&self, text: &str) -> bool {
        !self.is_excluded(text) && self.keywords_match(text)
    }
}

/// Immutable, partitioned and priority-ordered collection of rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    credit_rules: Vec<Rule>,
    debit_rules: Vec<Rule>,
    default_label: String,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl RuleSet {
    /// Build a rule set. Each partition is stably sorted by priority, so rules
    /// sharing a priority keep the order they were given in.
    pub fn new(credit_rules: Vec<Rule>, debit_rules: Vec<Rule>, default_label: &str) -> Self {
        let default_label = match default_label.trim() {
            "" => DEFAULT_LABEL.to_string(),
            label => label.to_string(),
        };

        Self {
            credit_rules: sorted(credit_rules),
            debit_rules: sorted(debit_rules),
            default_label,
        }
    }

    /// A rule set with no rules that labels everything as unclassified.
    pub fn empty() -> Self {
        Self {
            credit_rules: Vec::new(),
            debit_rules: Vec::new(),
            default_label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn credit_rules(&self) -> &[Rule] {
        &self.credit_rules
    }

    pub fn debit_rules(&self) -> &[Rule] {
        &self.debit_rules
    }

    pub fn rules(&self, side: Side) -> &[Rule] {
        match side {
            Side::Credit => &self.credit_rules,
            Side::Debit => &self.debit_rules,
        }
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    pub fn len(&self) -> usize {
        self.credit_rules.len() + self.debit_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every rule with its side, credits first.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &Rule)> {
        self.credit_rules
            .iter()
            .map(|r| (Side::Credit, r))
            .chain(self.debit_rules.iter().map(|r| (Side::Debit, r)))
    }

    /// Every distinct label this rule set can produce, including the default.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for (_, rule) in self.iter() {
            if !labels.contains(&rule.name.as_str()) {
                labels.push(&rule.name);
            }
        }
        if !labels.contains(&self.default_label.as_str()) {
            labels.push(&self.default_label);
        }
        labels
    }
}

fn sorted(mut rules: Vec<Rule>) -> Vec<Rule> {
    rules.sort_by_key(|r| r.priority);
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, keywords: &[&str], priority: i64) -> Rule {
        Rule::new(name, keywords, MatchMode::Any, Vec::<String>::new(), priority).unwrap()
    }

    #[test]
    fn test_side_for_amount() {
        assert_eq!(Side::for_amount(1.0), Side::Credit);
        assert_eq!(Side::for_amount(0.0), Side::Debit);
        assert_eq!(Side::for_amount(-0.0), Side::Debit);
        assert_eq!(Side::for_amount(-25.5), Side::Debit);
        assert_eq!(Side::for_amount(f64::NAN), Side::Debit);
    }

    #[test]
    fn test_side_labels() {
        assert_eq!(Side::parse_label("Abonos"), Some(Side::Credit));
        assert_eq!(Side::parse_label(" crédito "), Some(Side::Credit));
        assert_eq!(Side::parse_label("CARGO"), Some(Side::Debit));
        assert_eq!(Side::parse_label("debit"), Some(Side::Debit));
        assert_eq!(Side::parse_label("otro"), None);
    }

    #[test]
    fn test_match_mode_lenient() {
        assert_eq!(MatchMode::parse_lenient("all"), MatchMode::All);
        assert_eq!(MatchMode::parse_lenient("contiene_exacto"), MatchMode::All);
        assert_eq!(MatchMode::parse_lenient("Exacto"), MatchMode::All);
        assert_eq!(MatchMode::parse_lenient("any"), MatchMode::Any);
        assert_eq!(MatchMode::parse_lenient("contiene_cualquiera"), MatchMode::Any);
        assert_eq!(MatchMode::parse_lenient("whatever"), MatchMode::Any);
        assert_eq!(MatchMode::parse_lenient(""), MatchMode::Any);
    }

    #[test]
    fn test_rule_new_normalizes_terms() {
        let rule = Rule::new(" Servicios ", ["luz", " agua "], MatchMode::All, ["Devolución"], 3)
            .unwrap();
        assert_eq!(rule.name, "Servicios");
        assert_eq!(rule.keywords, vec!["LUZ", "AGUA"]);
        assert_eq!(rule.exclusions, vec!["DEVOLUCION"]);
        assert_eq!(rule.priority, 3);
    }

    #[test]
    fn test_rule_new_drops_repeated_terms() {
        let rule = Rule::new(
            "UTIL",
            ["AGUA", "agua", "luz", "Água"],
            MatchMode::All,
            ["reverso", "REVERSO"],
            0,
        )
        .unwrap();
        assert_eq!(rule.keywords, vec!["AGUA", "LUZ"]);
        assert_eq!(rule.exclusions, vec!["REVERSO"]);

        let set = RuleSet::new(vec![], vec![rule], "");
        let exported = set.to_toml().unwrap();
        assert_eq!(exported.matches("\"AGUA\"").count(), 1);
    }

    #[test]
    fn test_rule_set_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Rule>();
        assert_send_sync::<RuleSet>();
    }

    #[test]
    fn test_rule_new_rejects_missing_parts() {
        assert!(Rule::new("", ["AGUA"], MatchMode::Any, Vec::<String>::new(), 0).is_none());
        assert!(Rule::new("X", ["  ", ""], MatchMode::Any, Vec::<String>::new(), 0).is_none());
        assert!(Rule::new("X", Vec::<String>::new(), MatchMode::Any, Vec::<String>::new(), 0)
            .is_none());
    }

    #[test]
    fn test_rule_matching() {
        let all = Rule::new("UTIL", ["AGUA", "LUZ"], MatchMode::All, ["REVERSO"], 0).unwrap();
        assert!(!all.matches("PAGO AGUA"));
        assert!(all.matches("PAGO AGUA Y LUZ"));
        assert!(!all.matches("REVERSO PAGO AGUA Y LUZ"));
        assert!(all.keywords_match("REVERSO PAGO AGUA Y LUZ"));
    }

    #[test]
    fn test_rule_set_sorts_stably() {
        let set = RuleSet::new(
            vec![],
            vec![rule("C", &["C"], 2), rule("A", &["A"], 1), rule("B", &["B"], 1)],
            "",
        );
        let names: Vec<&str> = set.debit_rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(set.default_label(), DEFAULT_LABEL);
    }

    #[test]
    fn test_labels_are_distinct() {
        let set = RuleSet::new(
            vec![rule("VENTAS", &["VENTA"], 0)],
            vec![rule("VENTAS", &["X"], 0), rule("SUELDOS", &["REMUNERACION"], 1)],
            "SIN CATEGORIA",
        );
        assert_eq!(set.labels(), vec!["VENTAS", "SUELDOS", "SIN CATEGORIA"]);
        assert_eq!(set.len(), 3);
    }
}
