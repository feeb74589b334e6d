#![allow(dead_code)]

use flujo_lib::{MatchMode, Result, Rule, RuleSet, RuleStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestFixture {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub store: RuleStore,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("test.db");
        let mut store = RuleStore::open(&db_path)?;
        store.initialize()?;

        Ok(Self {
            temp_dir,
            db_path,
            store,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        write_file(self.temp_dir.path(), name, contents)
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test file");
    path
}

pub fn rule(name: &str, keywords: &[&str], mode: MatchMode, exclusions: &[&str], priority: i64) -> Rule {
    Rule::new(name, keywords, mode, exclusions, priority).expect("valid test rule")
}

pub fn any(name: &str, keywords: &[&str], priority: i64) -> Rule {
    rule(name, keywords, MatchMode::Any, &[], priority)
}

/// A small bakery rule set used across tests.
pub fn bakery_rules() -> RuleSet {
    RuleSet::new(
        vec![
            any("VENTAS", &["VENTA", "DEPOSITO CLIENTE"], 0),
            any("TRANSFERENCIAS RECIBIDAS", &["TRANSFERENCIA"], 1),
        ],
        vec![
            rule("SERVICIOS BASICOS", &["AGUA", "LUZ"], MatchMode::All, &["REVERSO"], 0),
            any("PROVEEDORES", &["PROVEEDOR", "HARINA"], 1),
            any("REMUNERACIONES", &["SUELDO", "REMUNERACION"], 2),
        ],
        "",
    )
}

pub const BAKERY_TOML: &str = r#"
default_label = "NO CLASIFICADO"

[[classifiers.credit]]
name = "VENTAS"
keywords = ["venta", "depósito cliente"]

[[classifiers.credit]]
name = "TRANSFERENCIAS RECIBIDAS"
keywords = ["transferencia"]

[[classifiers.debit]]
name = "SERVICIOS BASICOS"
keywords = ["agua", "luz"]
match_mode = "all"
exclusions = ["reverso"]

[[classifiers.debit]]
name = "PROVEEDORES"
keywords = ["proveedor", "harina"]

[[classifiers.debit]]
name = "REMUNERACIONES"
keywords = ["sueldo", "remuneración"]
"#;

pub const LEGACY_JSON: &str = r#"{
  "clasificadores": {
    "abonos": [
      {"nombre": "VENTAS", "palabras_clave": ["VENTA", "DEPOSITO CLIENTE"], "tipo": "contiene_cualquiera"},
      {"nombre": "TRANSFERENCIAS RECIBIDAS", "palabras_clave": ["TRANSFERENCIA"]}
    ],
    "cargos": [
      {"nombre": "SERVICIOS BASICOS", "palabras_clave": ["AGUA", "LUZ"], "tipo": "contiene_exacto", "excluir": ["REVERSO"]},
      {"nombre": "PROVEEDORES", "palabras_clave": ["PROVEEDOR", "HARINA"]},
      {"nombre": "REMUNERACIONES", "palabras_clave": ["SUELDO", "REMUNERACION"]}
    ]
  },
  "clasificacion_default": "NO CLASIFICADO"
}"#;

pub const BAKERY_LEDGER_CSV: &str = "\
Banco Ejemplo - Cartola Cuenta Corriente
Titular: Panaderia Don Pepe
Fecha;Descripción;Cargos (CLP);Abonos (CLP);Saldo (CLP)
02/01/2024;Pago proveedor harina;150.000;;850.000
03/01/2024;Venta mesón;;45.500;895.500
04/01/2024;Pago agua y luz;32.000;;863.500
05/01/2024;Transferencia de Juan;;20.000;883.500
06/01/2024;Comisión mantención;4.990;;878.510
";
