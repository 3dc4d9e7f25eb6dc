use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;

/// Flat, insertion-ordered field name to scalar mapping
pub type Record = Map<String, Value>;

/// The five sub-tables of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Table {
    #[serde(rename = "identif")]
    Identification,
    #[serde(rename = "synthese")]
    Synthesis,
    #[serde(rename = "prp")]
    ProjectEconomics,
    #[serde(rename = "financements")]
    Financing,
    #[serde(rename = "loyer")]
    RentAndCharges,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Identification,
        Table::Synthesis,
        Table::ProjectEconomics,
        Table::Financing,
        Table::RentAndCharges,
    ];

    /// Name of the table inside a persisted operation
    pub const fn as_str(self) -> &'static str {
        match self {
            Table::Identification => "identif",
            Table::Synthesis => "synthese",
            Table::ProjectEconomics => "prp",
            Table::Financing => "financements",
            Table::RentAndCharges => "loyer",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One consolidated operation, the unit of persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OperationRecord {
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub identif: Vec<Record>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub synthese: Vec<Record>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub prp: Vec<Record>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub financements: Vec<Record>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub loyer: Vec<Record>,
}

impl OperationRecord {
    pub fn table(&self, table: Table) -> &[Record] {
        match table {
            Table::Identification => &self.identif,
            Table::Synthesis => &self.synthese,
            Table::ProjectEconomics => &self.prp,
            Table::Financing => &self.financements,
            Table::RentAndCharges => &self.loyer,
        }
    }

    pub fn table_mut(&mut self, table: Table) -> &mut Vec<Record> {
        match table {
            Table::Identification => &mut self.identif,
            Table::Synthesis => &mut self.synthese,
            Table::ProjectEconomics => &mut self.prp,
            Table::Financing => &mut self.financements,
            Table::RentAndCharges => &mut self.loyer,
        }
    }

    /// Source workbook of the operation, taken from its first identification row
    pub fn source_id(&self) -> Option<&Value> {
        self.identif
            .first()
            .and_then(|record| record.get("id"))
            .filter(|id| !id.is_null())
    }

    /// Value of `field` on the first identification row
    pub fn identification_field(&self, field: &str) -> Option<&Value> {
        self.identif.first().and_then(|record| record.get(field))
    }

    pub fn record_count(&self) -> usize {
        Table::ALL.iter().map(|t| self.table(*t).len()).sum()
    }
}
