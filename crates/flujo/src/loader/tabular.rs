//! Rule sets from tabular sources.
//!
//! Column headers are matched by case- and accent-insensitive substring
//! search against a list of synonyms per column role. Rows are assigned to a
//! side in one of three ways, in order of preference:
//!
//! 1. sheets whose name is a side label (`ABONOS`, `CARGOS`, `CREDIT`, ...);
//! 2. a side column on the first sheet (`TIPO`, `TYPE`, `SIDE`, ...);
//! 3. the [`UntypedRows`] policy from the load options (debit by default).

use super::{DropReason, LoadOptions, LoadReport, LoadWarning, RuleCollector, RuleEntry, UntypedRows};
use crate::classify::Side;
use crate::normalize::normalize;
use std::fmt;

/// Delimiters tried, in order, when splitting a multi-term cell.
const TERM_DELIMITERS: [char; 3] = ['|', ';', ','];

/// Split a keyword or exclusion cell on the first delimiter it contains.
///
/// `"AGUA|LUZ"` yields two terms, `"AGUA, LUZ; GAS"` splits on `;` only.
/// A cell without delimiters is a single term.
pub fn split_terms(cell: &str) -> Vec<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Vec::new();
    }

    match TERM_DELIMITERS.iter().find(|d| cell.contains(**d)) {
        Some(delimiter) => cell
            .split(*delimiter)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![cell.to_string()],
    }
}

/// A sheet whose header row has already been isolated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: &str, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    /// Side named by the sheet itself, if any.
    pub fn labeled_side(&self) -> Option<Side> {
        Side::parse_label(&self.name)
    }
}

/// One or more sheets of rule rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub sheets: Vec<Sheet>,
}

impl Table {
    pub fn single(sheet: Sheet) -> Self {
        Self { sheets: vec![sheet] }
    }
}

/// Semantic role of a rule table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Name,
    Keywords,
    MatchMode,
    Exclusions,
    Side,
    Priority,
}

impl ColumnRole {
    /// Roles in the order headers are tested against them. More specific
    /// roles come first so `TIPO COINCIDENCIA` is a match mode, not a side,
    /// and `PALABRAS CLAVE` is never taken for a name.
    const RESOLUTION_ORDER: [ColumnRole; 6] = [
        ColumnRole::Exclusions,
        ColumnRole::Keywords,
        ColumnRole::MatchMode,
        ColumnRole::Priority,
        ColumnRole::Side,
        ColumnRole::Name,
    ];

    fn synonyms(&self) -> &'static [&'static str] {
        match self {
            ColumnRole::Name => &[
                "NOMBRE", "NAME", "CLASIFICACION", "CATEGOR", "LABEL", "ETIQUETA", "GLOSA",
                "DESCRIP",
            ],
            ColumnRole::Keywords => &[
                "PALABRA", "CLAVE", "KEYWORD", "KEY TERM", "TERMINO", "PATRON", "PATTERN",
            ],
            ColumnRole::MatchMode => &["COINCIDENCIA", "MATCH", "MODO", "MODE"],
            ColumnRole::Exclusions => &["EXCLU", "EXCEPT"],
            ColumnRole::Side => &[
                "TIPO", "TYPE", "SIDE", "PARTICION", "PARTITION", "NATURALEZA", "MOVIMIENTO",
            ],
            ColumnRole::Priority => &["PRIORI", "ORDEN", "ORDER"],
        }
    }

    /// Role a header most likely stands for.
    pub fn for_header(header: &str) -> Option<Self> {
        let header = normalize(header);
        if header.is_empty() {
            return None;
        }
        Self::RESOLUTION_ORDER
            .into_iter()
            .find(|role| role.synonyms().iter().any(|s| header.contains(s)))
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Name => "rule name",
            ColumnRole::Keywords => "keywords",
            ColumnRole::MatchMode => "match mode",
            ColumnRole::Exclusions => "exclusions",
            ColumnRole::Side => "side",
            ColumnRole::Priority => "priority",
        };
        f.write_str(name)
    }
}

/// Column index for each role found in a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub keywords: Option<usize>,
    pub match_mode: Option<usize>,
    pub exclusions: Option<usize>,
    pub side: Option<usize>,
    pub priority: Option<usize>,
}

impl ColumnMap {
    /// Resolve roles from headers. The first header claiming a role keeps it.
    pub fn resolve(headers: &[String]) -> Self {
        let mut map = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let Some(role) = ColumnRole::for_header(header) else {
                continue;
            };
            let slot = map.slot_mut(role);
            if slot.is_none() {
                log::debug!("Column '{}' resolved as {}", header, role);
                *slot = Some(idx);
            }
        }
        map
    }

    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Name => self.name,
            ColumnRole::Keywords => self.keywords,
            ColumnRole::MatchMode => self.match_mode,
            ColumnRole::Exclusions => self.exclusions,
            ColumnRole::Side => self.side,
            ColumnRole::Priority => self.priority,
        }
    }

    fn slot_mut(&mut self, role: ColumnRole) -> &mut Option<usize> {
        match role {
            ColumnRole::Name => &mut self.name,
            ColumnRole::Keywords => &mut self.keywords,
            ColumnRole::MatchMode => &mut self.match_mode,
            ColumnRole::Exclusions => &mut self.exclusions,
            ColumnRole::Side => &mut self.side,
            ColumnRole::Priority => &mut self.priority,
        }
    }

    /// Required roles that could not be located.
    pub fn missing_required(&self) -> Vec<ColumnRole> {
        [ColumnRole::Name, ColumnRole::Keywords]
            .into_iter()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }
}

/// How rows of a sheet are routed to a side.
#[derive(Debug, Clone, Copy)]
enum Routing {
    Fixed(Side),
    ByColumn(usize),
    Untyped(UntypedRows),
}

pub fn load_table(table: &Table, origin: &str, options: &LoadOptions) -> LoadReport {
    let mut collector = RuleCollector::new();

    let labeled: Vec<(&Sheet, Side)> = table
        .sheets
        .iter()
        .filter_map(|sheet| sheet.labeled_side().map(|side| (sheet, side)))
        .collect();

    if labeled.is_empty() {
        if let Some(sheet) = table.sheets.first() {
            if table.sheets.len() > 1 {
                log::debug!(
                    "No side-labeled sheets in {}, reading only '{}'",
                    origin,
                    sheet.name
                );
            }
            load_sheet(sheet, None, options, &mut collector);
        }
    } else {
        for (sheet, side) in labeled {
            load_sheet(sheet, Some(side), options, &mut collector);
        }
    }

    collector.finish(origin, options.default_label.as_deref())
}

fn load_sheet(sheet: &Sheet, side: Option<Side>, options: &LoadOptions, collector: &mut RuleCollector) {
    let columns = ColumnMap::resolve(&sheet.headers);

    let missing = columns.missing_required();
    if !missing.is_empty() {
        for column in missing {
            collector.warn(LoadWarning::MissingColumn {
                sheet: sheet.name.clone(),
                column,
            });
        }
        return;
    }

    let routing = match (side, columns.side) {
        (Some(side), _) => Routing::Fixed(side),
        (None, Some(idx)) => Routing::ByColumn(idx),
        (None, None) => {
            log::info!(
                "Sheet '{}' has no side column, applying {:?} policy to its rows",
                sheet.name,
                options.untyped_rows
            );
            Routing::Untyped(options.untyped_rows)
        }
    };

    let section = if sheet.name.is_empty() { "row" } else { sheet.name.as_str() };

    for (index, row) in sheet.rows.iter().enumerate() {
        let position = index + 1;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row_side = match routing {
            Routing::Fixed(side) => side,
            Routing::ByColumn(idx) => {
                let value = cell(row, Some(idx));
                match Side::parse_label(value) {
                    Some(side) => side,
                    None => {
                        let reason = DropReason::UnknownSide(value.to_string());
                        collector.drop_entry(section, position, reason);
                        continue;
                    }
                }
            }
            Routing::Untyped(UntypedRows::Debit) => Side::Debit,
            Routing::Untyped(UntypedRows::Credit) => Side::Credit,
            Routing::Untyped(UntypedRows::Skip) => {
                collector.drop_entry(section, position, DropReason::Untyped);
                continue;
            }
        };

        collector.push(row_side, section, position, row_entry(row, &columns));
    }
}

fn row_entry(row: &[String], columns: &ColumnMap) -> RuleEntry {
    let name = cell(row, columns.name);
    let match_mode = cell(row, columns.match_mode);

    RuleEntry {
        name: (!name.is_empty()).then(|| name.to_string()),
        keywords: split_terms(cell(row, columns.keywords)),
        match_mode: (!match_mode.is_empty()).then(|| match_mode.to_string()),
        exclusions: split_terms(cell(row, columns.exclusions)),
        priority: parse_priority(cell(row, columns.priority)),
    }
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}

/// Spreadsheet numbers often arrive as `"3"` or `"3.0"`.
fn parse_priority(value: &str) -> Option<i64> {
    if value.is_empty() {
        return None;
    }
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}
