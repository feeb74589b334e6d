//! Classification of normalized descriptions against a [`RuleSet`].

use super::rules::{Rule, RuleSet, Side, DEFAULT_LABEL};
use serde::Serialize;

/// Outcome of classifying a single transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch<'a> {
    pub label: &'a str,
    pub side: Side,
    /// The rule that fired, `None` when the default label was used.
    pub rule: Option<&'a Rule>,
}

impl RuleMatch<'_> {
    pub fn is_classified(&self) -> bool {
        self.rule.is_some()
    }
}

/// Classify a normalized description and signed amount.
///
/// A missing rule set degrades to [`DEFAULT_LABEL`]; classification itself
/// never fails.
pub fn classify<'a>(text: &str, amount: f64, rule_set: Option<&'a RuleSet>) -> &'a str {
    match rule_set {
        Some(set) => set.classify(text, amount),
        None => DEFAULT_LABEL,
    }
}

impl RuleSet {
    /// Return the label for a normalized description and signed amount.
    ///
    /// Positive amounts are evaluated against the credit rules, everything
    /// else (zero included) against the debit rules. The first rule in
    /// priority order that matches wins.
    pub fn classify(&self, text: &str, amount: f64) -> &str {
        self.evaluate(text, amount).label
    }

    /// Like [`RuleSet::classify`] but reports which rule fired.
    pub fn evaluate(&self, text: &str, amount: f64) -> RuleMatch<'_> {
        let side = Side::for_amount(amount);
        let rule = self.rules(side).iter().find(|rule| rule.matches(text));

        RuleMatch {
            label: rule.map_or(self.default_label(), |r| r.name.as_str()),
            side,
            rule,
        }
    }

    /// Classify many `(normalized text, amount)` pairs, preserving order.
    pub fn classify_batch<'a, I, S>(&'a self, rows: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        rows.into_iter()
            .map(|(text, amount)| self.classify(text.as_ref(), amount))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::MatchMode;
    use crate::normalize::normalize;

    fn rule(name: &str, keywords: &[&str], mode: MatchMode, exclusions: &[&str], priority: i64) -> Rule {
        Rule::new(name, keywords, mode, exclusions, priority).unwrap()
    }

    fn suppliers_only() -> RuleSet {
        RuleSet::new(
            vec![],
            vec![rule("SUPPLIERS", &["PROVEEDOR"], MatchMode::Any, &[], 0)],
            "",
        )
    }

    #[test]
    fn test_debit_keyword_match() {
        let set = suppliers_only();
        assert_eq!(set.classify("PAGO PROVEEDOR XYZ", -1000.0), "SUPPLIERS");
    }

    #[test]
    fn test_credit_without_rules_is_unclassified() {
        let set = suppliers_only();
        assert_eq!(set.classify("DEPOSITO CLIENTE", 5000.0), "NO CLASIFICADO");
    }

    #[test]
    fn test_all_mode_requires_every_keyword() {
        let set = RuleSet::new(
            vec![],
            vec![rule("UTIL", &["AGUA", "LUZ"], MatchMode::All, &[], 0)],
            "",
        );
        assert_eq!(set.classify("PAGO AGUA ANDINA", -10.0), DEFAULT_LABEL);
        assert_eq!(set.classify("PAGO AGUA Y LUZ", -10.0), "UTIL");
    }

    #[test]
    fn test_first_match_wins() {
        let set = RuleSet::new(
            vec![],
            vec![
                rule("SECOND", &["PAGO"], MatchMode::Any, &[], 2),
                rule("FIRST", &["PAGO"], MatchMode::Any, &[], 1),
            ],
            "",
        );
        let result = set.evaluate("PAGO", -1.0);
        assert_eq!(result.label, "FIRST");
        assert_eq!(result.rule.map(|r| r.priority), Some(1));
    }

    #[test]
    fn test_exclusion_falls_through_to_next_rule() {
        let set = RuleSet::new(
            vec![],
            vec![
                rule("TRANSFERS", &["TRANSFERENCIA"], MatchMode::Any, &["PROPIA"], 0),
                rule("OTHER", &["TRANSFERENCIA"], MatchMode::Any, &[], 1),
            ],
            "",
        );
        assert_eq!(set.classify("TRANSFERENCIA A TERCEROS", -5.0), "TRANSFERS");
        assert_eq!(set.classify("TRANSFERENCIA CUENTA PROPIA", -5.0), "OTHER");
    }

    #[test]
    fn test_exclusion_falls_through_to_default() {
        let set = RuleSet::new(
            vec![rule("VENTAS", &["VENTA"], MatchMode::Any, &["ANULA"], 0)],
            vec![],
            "",
        );
        assert_eq!(set.classify("ANULACION VENTA", 100.0), DEFAULT_LABEL);
    }

    #[test]
    fn test_zero_amount_routes_to_debit() {
        let set = RuleSet::new(
            vec![rule("CREDIT SIDE", &["AJUSTE"], MatchMode::Any, &[], 0)],
            vec![rule("DEBIT SIDE", &["AJUSTE"], MatchMode::Any, &[], 0)],
            "",
        );
        let result = set.evaluate("AJUSTE", 0.0);
        assert_eq!(result.label, "DEBIT SIDE");
        assert_eq!(result.side, Side::Debit);
        assert_eq!(set.classify("AJUSTE", 0.01), "CREDIT SIDE");
    }

    #[test]
    fn test_missing_rule_set_degrades() {
        assert_eq!(classify("PAGO PROVEEDOR", -1.0, None), DEFAULT_LABEL);
        assert_eq!(classify("PAGO PROVEEDOR", -1.0, Some(&RuleSet::empty())), DEFAULT_LABEL);
    }

    #[test]
    fn test_custom_default_label() {
        let set = RuleSet::new(vec![], vec![], "OTROS");
        let result = set.evaluate("CUALQUIER COSA", 1.0);
        assert_eq!(result.label, "OTROS");
        assert!(!result.is_classified());
    }

    #[test]
    fn test_accented_descriptions_match_after_normalization() {
        let set = RuleSet::new(
            vec![],
            vec![rule("SERVICIOS", &["Pago Servicio"], MatchMode::Any, &[], 0)],
            "",
        );
        assert_eq!(set.classify(&normalize("pagó servicio luz"), -1.0), "SERVICIOS");
    }

    #[test]
    fn test_batch_preserves_order() {
        let set = suppliers_only();
        let labels = set.classify_batch([
            ("PAGO PROVEEDOR", -1.0),
            ("DEPOSITO", 2.0),
            ("PROVEEDOR 2", 0.0),
        ]);
        assert_eq!(labels, vec!["SUPPLIERS", DEFAULT_LABEL, "SUPPLIERS"]);
    }
}
