use std::collections::HashMap;

use tracing::warn;

use crate::error::ReconError;
use crate::model::{Domain, RawRow};

// ---------------------------------------------------------------------------
// Table catalogue
// ---------------------------------------------------------------------------

pub const EMPLOYEE: &str = "employee";
pub const SALARY: &str = "salary";
pub const ATTENDANCE: &str = "attendance";
pub const TRANSACTIONS: &str = "transactions";
pub const MASTER: &str = "master";
pub const USER_ACCESS: &str = "user_access";
pub const ACCESS_MATRIX: &str = "access_matrix";
pub const EXCEPTION_LIST: &str = "exception_list";

/// Shape of one table a domain reads.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub key_column: &'static str,
    /// Columns that must be present in the header.
    pub columns: &'static [&'static str],
    /// The table holds the facts being judged rather than reference data.
    pub fact: bool,
    /// A key may appear at most once. Violations abort the run.
    pub unique: bool,
    pub required: bool,
}

const PAYROLL_TABLES: &[TableSpec] = &[
    TableSpec {
        name: EMPLOYEE,
        key_column: "Employee_ID",
        columns: &["Employee_ID"],
        fact: true,
        unique: false,
        required: true,
    },
    TableSpec {
        name: SALARY,
        key_column: "Employee_ID",
        columns: &["Employee_ID", "Basic_Salary", "Allowance"],
        fact: false,
        unique: true,
        required: true,
    },
    TableSpec {
        name: ATTENDANCE,
        key_column: "Employee_ID",
        columns: &["Employee_ID", "Days_Present"],
        fact: false,
        unique: true,
        required: true,
    },
];

const RISK_TABLES: &[TableSpec] = &[
    TableSpec {
        name: TRANSACTIONS,
        key_column: "Transaction_ID",
        columns: &["Transaction_ID", "Amount"],
        fact: true,
        unique: false,
        required: true,
    },
    TableSpec {
        name: MASTER,
        key_column: "Customer_ID",
        columns: &["Customer_ID"],
        fact: false,
        unique: true,
        required: true,
    },
];

const COMPLIANCE_TABLES: &[TableSpec] = &[
    TableSpec {
        name: USER_ACCESS,
        key_column: "User_ID",
        columns: &["User_ID", "Role", "Access_Type"],
        fact: true,
        unique: false,
        required: true,
    },
    TableSpec {
        name: ACCESS_MATRIX,
        key_column: "Role",
        columns: &["Role", "Access_Type"],
        fact: false,
        unique: false,
        required: true,
    },
    TableSpec {
        name: EXCEPTION_LIST,
        key_column: "User_ID",
        columns: &["User_ID", "Access_Type"],
        fact: false,
        unique: false,
        required: false,
    },
];

/// Tables read by a domain, fact table first.
pub fn table_specs(domain: Domain) -> &'static [TableSpec] {
    match domain {
        Domain::Payroll => PAYROLL_TABLES,
        Domain::Risk => RISK_TABLES,
        Domain::Compliance => COMPLIANCE_TABLES,
    }
}

/// Look up a table by name across all domains. Table names are unique.
pub fn spec_for_table(name: &str) -> Option<&'static TableSpec> {
    [PAYROLL_TABLES, RISK_TABLES, COMPLIANCE_TABLES]
        .into_iter()
        .flatten()
        .find(|s| s.name == name)
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Read-only lookup from a key column to the rows carrying that key.
///
/// Lookups never fail: an absent key is `None`, which the rules treat as a
/// legitimate input.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    name: String,
    rows: HashMap<String, Vec<RawRow>>,
}

impl ReferenceTable {
    pub fn build(spec: &TableSpec, rows: &[RawRow]) -> Result<Self, ReconError> {
        let mut by_key: HashMap<String, Vec<RawRow>> = HashMap::new();

        for row in rows {
            let Some(key) = row.get(spec.key_column) else {
                warn!(
                    table = spec.name,
                    row = row.index,
                    "reference row has no {}; skipped",
                    spec.key_column
                );
                continue;
            };

            let entry = by_key.entry(key.to_string()).or_default();
            if spec.unique && !entry.is_empty() {
                return Err(ReconError::DuplicateReference {
                    table: spec.name.into(),
                    key: key.into(),
                });
            }
            entry.push(row.clone());
        }

        Ok(Self {
            name: spec.name.into(),
            rows: by_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lookup(&self, key: &str) -> Option<&[RawRow]> {
        self.rows.get(key).map(|v| v.as_slice())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// True when some row under `key` has `column == value`.
    pub fn has_entry(&self, key: &str, column: &str, value: &str) -> bool {
        self.lookup(key)
            .is_some_and(|rows| rows.iter().any(|r| r.get(column) == Some(value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All reference tables of one run, built once and shared immutably.
#[derive(Debug, Clone, Default)]
pub struct References {
    tables: HashMap<String, ReferenceTable>,
}

impl References {
    /// Index the domain's reference tables from loaded rows.
    ///
    /// Optional tables that were not supplied are indexed as empty.
    pub fn build(
        domain: Domain,
        tables: &HashMap<String, Vec<RawRow>>,
    ) -> Result<Self, ReconError> {
        let mut built = HashMap::new();
        for spec in table_specs(domain).iter().filter(|s| !s.fact) {
            let table = match tables.get(spec.name) {
                Some(rows) => ReferenceTable::build(spec, rows)?,
                None if spec.required => return Err(ReconError::MissingTable(spec.name.into())),
                None => ReferenceTable::build(spec, &[])?,
            };
            built.insert(spec.name.to_string(), table);
        }
        Ok(Self { tables: built })
    }

    /// Assemble from already-built tables.
    pub fn from_tables(tables: impl IntoIterator<Item = ReferenceTable>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|t| (t.name().to_string(), t))
                .collect(),
        }
    }

    pub fn get(&self, table: &str) -> Option<&ReferenceTable> {
        self.tables.get(table)
    }

    /// Rows under `key` in `table`. An unknown table reads as empty.
    pub fn lookup(&self, table: &str, key: &str) -> Option<&[RawRow]> {
        self.get(table).and_then(|t| t.lookup(key))
    }

    pub fn contains(&self, table: &str, key: &str) -> bool {
        self.get(table).is_some_and(|t| t.contains(key))
    }

    pub fn has_entry(&self, table: &str, key: &str, column: &str, value: &str) -> bool {
        self.get(table)
            .is_some_and(|t| t.has_entry(key, column, value))
    }
}
