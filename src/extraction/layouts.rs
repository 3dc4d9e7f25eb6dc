//! Coordinate tables for the five workbook extractions.
//!
//! Each table is written in A1 notation (`LayoutSpec`) and compiled once into
//! zero-based coordinates (`SheetLayout`) that the engine walks. A typo in a
//! reference surfaces as `InvalidReference` when the tables are compiled.

use super::models::Table;
use crate::common::errors::{BusinessError, BusinessResult};
use crate::workbook::address::{column_index, parse_range, parse_reference};
use serde_json::Value;
use std::sync::LazyLock;

/// How the units (one output record each) of a sheet are discovered
#[derive(Debug, Clone, Copy)]
pub enum UnitSpec {
    /// One unit per populated cell of a header row range, e.g. `"F57:J57"`
    HeaderColumns(&'static str),
    /// One unit per sheet when this header cell is populated
    HeaderCell(&'static str),
    /// Every row of a one-column range is a unit; the scan stops at the first
    /// row whose cell in that column holds the number zero. Seeds are
    /// `(field name, column letters)`.
    Rows {
        rows: &'static str,
        seeds: &'static [(&'static str, &'static str)],
    },
}

/// Column holding the value paired with a label
#[derive(Debug, Clone, Copy)]
pub enum ValueSpec {
    /// Same column for every unit
    Column(&'static str),
    /// `label column + extra + id2`
    UnitOffset(u32),
}

/// How the field name is built from the label cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    Label,
    Prefixed(&'static str),
}

/// What to do with a label/value pair when one side is blank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPolicy {
    /// Always emit the pair, absent cells become null
    Keep,
    SkipBlankLabel,
    SkipBlankValue,
}

#[derive(Debug, Clone, Copy)]
pub enum DetailSpec {
    /// Labels down one column (`"C7:C21"` or a single `"C59"`), values on the same rows
    Block {
        labels: &'static str,
        value: ValueSpec,
        naming: Naming,
        empty: EmptyPolicy,
    },
    /// Labels along one row (`"E15:U15"`), values in the same columns on the unit's row
    Sweep { labels: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutSpec {
    pub table: Table,
    pub sheets: &'static [&'static str],
    pub units: UnitSpec,
    pub details: &'static [DetailSpec],
    pub join_key: Option<&'static str>,
}

const fn keep(labels: &'static str, value: ValueSpec) -> DetailSpec {
    DetailSpec::Block {
        labels,
        value,
        naming: Naming::Label,
        empty: EmptyPolicy::Keep,
    }
}

const fn economics(labels: &'static str, prefix: &'static str) -> DetailSpec {
    DetailSpec::Block {
        labels,
        value: ValueSpec::Column("J"),
        naming: Naming::Prefixed(prefix),
        empty: EmptyPolicy::SkipBlankValue,
    }
}

const fn financing(labels: &'static str, extra: u32, prefix: &'static str) -> DetailSpec {
    DetailSpec::Block {
        labels,
        value: ValueSpec::UnitOffset(extra),
        naming: Naming::Prefixed(prefix),
        empty: EmptyPolicy::SkipBlankLabel,
    }
}

pub const IDENTIFICATION: LayoutSpec = LayoutSpec {
    table: Table::Identification,
    sheets: &["Identif"],
    units: UnitSpec::HeaderColumns("F57:J57"),
    details: &[
        keep("C59", ValueSpec::UnitOffset(2)),
        keep("C61", ValueSpec::UnitOffset(2)),
        keep("C62", ValueSpec::UnitOffset(2)),
        keep("C66", ValueSpec::UnitOffset(2)),
        keep("C67", ValueSpec::UnitOffset(2)),
        keep("C7:C21", ValueSpec::Column("D")),
        keep("M19", ValueSpec::Column("O")),
        keep("M22", ValueSpec::Column("O")),
        keep("C25", ValueSpec::Column("D")),
    ],
    join_key: None,
};

pub const SYNTHESIS: LayoutSpec = LayoutSpec {
    table: Table::Synthesis,
    sheets: &["Fiche_Synthèse"],
    units: UnitSpec::HeaderColumns("G4:K4"),
    details: &[
        keep("F19:F28", ValueSpec::UnitOffset(0)),
        keep("F31:F34", ValueSpec::UnitOffset(0)),
        keep("F87:F89", ValueSpec::UnitOffset(0)),
        keep("D136:D139", ValueSpec::UnitOffset(2)),
        keep("D144:D146", ValueSpec::UnitOffset(2)),
    ],
    join_key: Some("clef"),
};

pub const RENT_AND_CHARGES: LayoutSpec = LayoutSpec {
    table: Table::RentAndCharges,
    sheets: &["LoyersEtCharges"],
    units: UnitSpec::Rows {
        rows: "C16:C55",
        seeds: &[("produit", "C"), ("typologie", "D")],
    },
    details: &[DetailSpec::Sweep { labels: "E15:U15" }],
    join_key: Some("produit"),
};

pub const PROJECT_ECONOMICS: LayoutSpec = LayoutSpec {
    table: Table::ProjectEconomics,
    sheets: &[
        "PRP CE SE_1",
        "PRP CE SE_2",
        "PRP CE SE_3",
        "PRP CE SE_4",
        "PRP CE SE_5",
    ],
    units: UnitSpec::HeaderCell("V7"),
    details: &[
        economics("D12:D15", "Total Terrain_"),
        economics("D18:D22", "Total Terrain_"),
        economics("D25:D29", "Total Raccordement_"),
        economics("D32:D37", "Total Charge Foncière_"),
        economics("D40:D45", "Total Taxes et Divers_"),
        economics("D48:D51", "Total Frais Foncier_"),
        economics("D54:D55", "Total de construction en charge foncière_"),
        economics("D59:D84", "Total construction_"),
        economics("D87:D103", "Total Honoraires Techniques_"),
        economics("D106:D113", "Total Actualisation Imprevus_"),
        economics("D123:D127", "Autres Charges Non Immobilisees_"),
        economics("D137:D143", "Complement Accession_"),
    ],
    join_key: Some("produit"),
};

pub const FINANCING: LayoutSpec = LayoutSpec {
    table: Table::Financing,
    sheets: &["Financement"],
    units: UnitSpec::HeaderColumns("J8:N8"),
    details: &[
        financing("E14:E33", 4, "Subventions_"),
        financing("F36:F45", 3, "Fonds Propres_"),
        financing("F47:F71", 3, "Prêts_"),
    ],
    join_key: Some("clef"),
};

// Compiled, zero-based form

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScan {
    HeaderColumns { row: u32, first_col: u32, last_col: u32 },
    HeaderCell { row: u32, col: u32 },
    Rows { first_row: u32, last_row: u32, stop_col: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueColumn {
    Fixed(u32),
    UnitOffset { base: u32, extra: u32 },
}

impl ValueColumn {
    pub const fn resolve(self, id2: u32) -> u32 {
        match self {
            ValueColumn::Fixed(col) => col,
            ValueColumn::UnitOffset { base, extra } => base + extra + id2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailRule {
    Block {
        label_col: u32,
        first_row: u32,
        last_row: u32,
        value: ValueColumn,
        naming: Naming,
        empty: EmptyPolicy,
    },
    Sweep {
        label_row: u32,
        first_col: u32,
        last_col: u32,
    },
}

#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub table: Table,
    pub sheets: Vec<String>,
    pub units: UnitScan,
    pub seeds: Vec<(String, u32)>,
    pub details: Vec<DetailRule>,
    pub join_key: Option<String>,
}

fn single_column(range: &str) -> BusinessResult<(u32, u32, u32)> {
    let (start, end) = parse_range(range)?;
    if start.col != end.col {
        return Err(BusinessError::InvalidReference {
            reference: range.to_string(),
        });
    }
    Ok((start.col, start.row, end.row))
}

fn single_row(range: &str) -> BusinessResult<(u32, u32, u32)> {
    let (start, end) = parse_range(range)?;
    if start.row != end.row {
        return Err(BusinessError::InvalidReference {
            reference: range.to_string(),
        });
    }
    Ok((start.row, start.col, end.col))
}

impl UnitSpec {
    fn compile(self) -> BusinessResult<(UnitScan, Vec<(String, u32)>)> {
        match self {
            UnitSpec::HeaderColumns(range) => {
                let (row, first_col, last_col) = single_row(range)?;
                Ok((
                    UnitScan::HeaderColumns {
                        row,
                        first_col,
                        last_col,
                    },
                    Vec::new(),
                ))
            }
            UnitSpec::HeaderCell(cell) => {
                let cell = parse_reference(cell)?;
                Ok((
                    UnitScan::HeaderCell {
                        row: cell.row,
                        col: cell.col,
                    },
                    Vec::new(),
                ))
            }
            UnitSpec::Rows { rows, seeds } => {
                let (stop_col, first_row, last_row) = single_column(rows)?;
                let seeds = seeds
                    .iter()
                    .map(|(name, letters)| Ok(((*name).to_string(), column_index(letters)?)))
                    .collect::<BusinessResult<Vec<_>>>()?;
                Ok((
                    UnitScan::Rows {
                        first_row,
                        last_row,
                        stop_col,
                    },
                    seeds,
                ))
            }
        }
    }
}

impl DetailSpec {
    fn compile(self) -> BusinessResult<DetailRule> {
        match self {
            DetailSpec::Block {
                labels,
                value,
                naming,
                empty,
            } => {
                let (label_col, first_row, last_row) = single_column(labels)?;
                let value = match value {
                    ValueSpec::Column(letters) => ValueColumn::Fixed(column_index(letters)?),
                    ValueSpec::UnitOffset(extra) => ValueColumn::UnitOffset {
                        base: label_col,
                        extra,
                    },
                };
                Ok(DetailRule::Block {
                    label_col,
                    first_row,
                    last_row,
                    value,
                    naming,
                    empty,
                })
            }
            DetailSpec::Sweep { labels } => {
                let (label_row, first_col, last_col) = single_row(labels)?;
                Ok(DetailRule::Sweep {
                    label_row,
                    first_col,
                    last_col,
                })
            }
        }
    }
}

impl LayoutSpec {
    pub fn compile(&self) -> BusinessResult<SheetLayout> {
        let (units, seeds) = self.units.compile()?;
        let details = self
            .details
            .iter()
            .map(|detail| detail.compile())
            .collect::<BusinessResult<Vec<_>>>()?;

        Ok(SheetLayout {
            table: self.table,
            sheets: self.sheets.iter().map(|s| (*s).to_string()).collect(),
            units,
            seeds,
            details,
            join_key: self.join_key.map(str::to_string),
        })
    }
}

impl Naming {
    /// Field name for a label cell; absent labels render as `"null"`
    pub fn field_name(self, label: Option<&Value>) -> String {
        let text = label_text(label);
        match self {
            Naming::Label => text,
            Naming::Prefixed(prefix) => format!("{prefix}{text}"),
        }
    }
}

/// Text of a label cell as used in field names
pub fn label_text(label: Option<&Value>) -> String {
    match label {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The five compiled layouts of an operation workbook
#[derive(Debug, Clone)]
pub struct Layouts {
    pub identification: SheetLayout,
    pub synthesis: SheetLayout,
    pub rent_and_charges: SheetLayout,
    pub project_economics: SheetLayout,
    pub financing: SheetLayout,
}

impl Layouts {
    pub fn compile() -> BusinessResult<Self> {
        Ok(Self {
            identification: IDENTIFICATION.compile()?,
            synthesis: SYNTHESIS.compile()?,
            rent_and_charges: RENT_AND_CHARGES.compile()?,
            project_economics: PROJECT_ECONOMICS.compile()?,
            financing: FINANCING.compile()?,
        })
    }
}

static LAYOUTS: LazyLock<BusinessResult<Layouts>> = LazyLock::new(Layouts::compile);

/// Layouts compiled once per process
pub fn layouts() -> BusinessResult<&'static Layouts> {
    LAYOUTS.as_ref().map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_layouts_compile() {
        let layouts = layouts().unwrap();
        assert_eq!(
            layouts.identification.units,
            UnitScan::HeaderColumns {
                row: 56,
                first_col: 5,
                last_col: 9
            }
        );
        assert_eq!(
            layouts.rent_and_charges.units,
            UnitScan::Rows {
                first_row: 15,
                last_row: 54,
                stop_col: 2
            }
        );
        assert_eq!(
            layouts.rent_and_charges.seeds,
            [("produit".to_string(), 2), ("typologie".to_string(), 3)]
        );
        assert_eq!(layouts.project_economics.sheets.len(), 5);
        assert_eq!(layouts.project_economics.details.len(), 12);
        assert_eq!(layouts.financing.join_key.as_deref(), Some("clef"));
    }

    #[test]
    fn test_offset_value_columns() {
        let layouts = layouts().unwrap();
        // C59 pairs with E59 + id2, i.e. F59 for the first unit
        let DetailRule::Block { value, .. } = layouts.identification.details[0] else {
            panic!("expected a block rule");
        };
        assert_eq!(value.resolve(1), 5);

        // E14 pairs with J14 for the first financing unit
        let DetailRule::Block { value, .. } = layouts.financing.details[0] else {
            panic!("expected a block rule");
        };
        assert_eq!(value.resolve(1), 9);
    }

    #[test]
    fn test_bad_reference_is_reported() {
        const TWO_COLUMN_LABELS: &[DetailSpec] = &[keep("C7:D21", ValueSpec::Column("D"))];
        let broken = LayoutSpec {
            details: TWO_COLUMN_LABELS,
            ..IDENTIFICATION
        };
        let err = broken.compile().unwrap_err();
        assert_eq!(
            err,
            BusinessError::InvalidReference {
                reference: "C7:D21".to_string()
            }
        );

        let broken = LayoutSpec {
            units: UnitSpec::HeaderColumns("F57J57"),
            ..IDENTIFICATION
        };
        assert!(broken.compile().is_err());
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Naming::Label.field_name(Some(&json!("Commune"))), "Commune");
        assert_eq!(Naming::Label.field_name(None), "null");
        assert_eq!(
            Naming::Prefixed("Prêts_").field_name(Some(&json!("PLUS"))),
            "Prêts_PLUS"
        );
        assert_eq!(
            Naming::Prefixed("Total Terrain_").field_name(Some(&json!(1000))),
            "Total Terrain_1000"
        );
        assert_eq!(
            Naming::Prefixed("Total Terrain_").field_name(Some(&json!(1.5))),
            "Total Terrain_1.5"
        );
    }
}
