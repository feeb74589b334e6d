mod common;

use common::{any, bakery_rules, rule};
use flujo_lib::{classify, normalize, MatchMode, RuleSet, DEFAULT_LABEL};
use proptest::prelude::*;

#[test]
fn test_first_matching_debit_rule_wins() {
    let rules = RuleSet::new(
        vec![],
        vec![
            rule("UTILITIES", &["AGUA", "LUZ"], MatchMode::All, &["REVERSO"], 0),
            any("SUPPLIERS", &["PROVEEDOR"], 1),
        ],
        "",
    );

    let text = normalize("Pago proveedor Agua y Luz");
    assert_eq!(text, "PAGO PROVEEDOR AGUA Y LUZ");
    assert_eq!(rules.classify(&text, -50_000.0), "UTILITIES");

    let reversed = normalize("Reverso pago proveedor agua luz");
    assert_eq!(rules.classify(&reversed, -50_000.0), "SUPPLIERS");
}

#[test]
fn test_positive_amounts_only_see_credit_rules() {
    let rules = RuleSet::new(vec![], vec![any("SUPPLIERS", &["PROVEEDOR"], 0)], "");
    let text = normalize("devolución proveedor");

    assert_eq!(rules.classify(&text, 10_000.0), DEFAULT_LABEL);
    assert_eq!(rules.classify(&text, -10_000.0), "SUPPLIERS");
    assert_eq!(rules.classify(&text, 0.0), "SUPPLIERS");
}

#[test]
fn test_missing_rule_set_yields_default_label() {
    assert_eq!(classify("PAGO PROVEEDOR", -1.0, None), DEFAULT_LABEL);
    assert_eq!(classify("", 1.0, None), DEFAULT_LABEL);
}

#[test]
fn test_bakery_statement_lines() {
    let rules = bakery_rules();
    let cases = [
        ("Venta mesón", 45_500.0, "VENTAS"),
        ("Depósito cliente Mayorista", 120_000.0, "VENTAS"),
        ("Transferencia de Juan", 20_000.0, "TRANSFERENCIAS RECIBIDAS"),
        ("Pago agua y luz", -32_000.0, "SERVICIOS BASICOS"),
        ("Pago agua", -12_000.0, DEFAULT_LABEL),
        ("Reverso agua luz", -32_000.0, DEFAULT_LABEL),
        ("Pago proveedor harina", -150_000.0, "PROVEEDORES"),
        ("Remuneración enero", -400_000.0, "REMUNERACIONES"),
        ("Transferencia a proveedor", -80_000.0, "PROVEEDORES"),
    ];

    for (description, amount, expected) in cases {
        let text = normalize(description);
        assert_eq!(rules.classify(&text, amount), expected, "{description}");
    }
}

#[test]
fn test_evaluate_reports_rule_and_side() {
    let rules = bakery_rules();
    let outcome = rules.evaluate("PAGO PROVEEDOR", -1.0);
    assert!(outcome.is_classified());
    assert_eq!(outcome.rule.map(|r| r.priority), Some(1));

    let outcome = rules.evaluate("INTERESES", 5.0);
    assert!(!outcome.is_classified());
    assert_eq!(outcome.label, DEFAULT_LABEL);
}

const WORDS: &[&str] = &[
    "pago", "proveedor", "agua", "luz", "reverso", "venta", "sueldo", "transferencia", "banco",
];

fn description() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..6).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn prop_classification_is_deterministic(text in description(), amount in -1e7f64..1e7f64) {
        let rules = bakery_rules();
        let text = normalize(&text);
        let first = rules.classify(&text, amount).to_string();
        let second = rules.classify(&text, amount).to_string();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_label_is_known(text in description(), amount in -1e7f64..1e7f64) {
        let rules = bakery_rules();
        let text = normalize(&text);
        let label = rules.classify(&text, amount);
        prop_assert!(rules.labels().contains(&label));
    }

    #[test]
    fn prop_label_comes_from_amount_side(text in description(), amount in -1e7f64..1e7f64) {
        let rules = bakery_rules();
        let text = normalize(&text);
        let label = rules.classify(&text, amount);
        let side_rules = if amount > 0.0 { rules.credit_rules() } else { rules.debit_rules() };
        prop_assert!(
            label == rules.default_label() || side_rules.iter().any(|r| r.name == label)
        );
    }
}
