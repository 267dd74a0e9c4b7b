use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// The three reconciliation problems the engine knows how to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Payroll,
    Risk,
    Compliance,
}

impl Domain {
    /// Name of the table whose rows are judged.
    pub fn fact_table(&self) -> &'static str {
        match self {
            Self::Payroll => "employee",
            Self::Risk => "transactions",
            Self::Compliance => "user_access",
        }
    }

    /// Column holding the natural key of a fact row.
    pub fn key_column(&self) -> &'static str {
        match self {
            Self::Payroll => "Employee_ID",
            Self::Risk => "Transaction_ID",
            Self::Compliance => "User_ID",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payroll => write!(f, "payroll"),
            Self::Risk => write!(f, "risk"),
            Self::Compliance => write!(f, "compliance"),
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One loaded row, before any validation.
///
/// `index` is the row's position in its source table and is the provenance
/// carried through to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    pub index: usize,
    pub fields: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(index: usize, fields: BTreeMap<String, String>) -> Self {
        Self { index, fields }
    }

    /// Trimmed cell value. Empty and whitespace-only cells read as absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Pre-loaded rows grouped by table name.
pub struct ReconInput {
    pub tables: HashMap<String, Vec<RawRow>>,
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeFact {
    pub employee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionFact {
    pub transaction_id: String,
    pub amount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub missing_foreign_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessFact {
    pub user_id: String,
    pub role: String,
    pub access_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactBody {
    Payroll(EmployeeFact),
    Risk(TransactionFact),
    Compliance(AccessFact),
}

/// A validated, deduplicated row ready for rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactRow {
    pub index: usize,
    pub key: String,
    pub body: FactBody,
}

impl FactRow {
    pub fn domain(&self) -> Domain {
        match self.body {
            FactBody::Payroll(_) => Domain::Payroll,
            FactBody::Risk(_) => Domain::Risk,
            FactBody::Compliance(_) => Domain::Compliance,
        }
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Policy findings. These are verdicts, not pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    HighRisk,
    MissingCustomer,
    UnknownCustomer,
    UnknownRole,
    UnauthorizedAccess,
}

impl std::fmt::Display for FlagReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighRisk => write!(f, "high_risk"),
            Self::MissingCustomer => write!(f, "missing_customer"),
            Self::UnknownCustomer => write!(f, "unknown_customer"),
            Self::UnknownRole => write!(f, "unknown_role"),
            Self::UnauthorizedAccess => write!(f, "unauthorized_access"),
        }
    }
}

/// Data defects that keep a row from being judged on its merits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidValue,
    DuplicateKey,
    IncompleteRecord,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue => write!(f, "invalid_value"),
            Self::DuplicateKey => write!(f, "duplicate_key"),
            Self::IncompleteRecord => write!(f, "incomplete_record"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessBasis {
    /// (Role, Access_Type) is listed in the access matrix.
    Policy,
    /// (User_ID, Access_Type) is listed in the exception list.
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcceptedValue {
    Payroll {
        gross_cents: i64,
        net_cents: i64,
        deduction_applied: bool,
    },
    Amount {
        amount_cents: i64,
    },
    Access {
        basis: AccessBasis,
    },
}

impl AcceptedValue {
    /// Monetary value carried by the verdict, if any.
    pub fn cents(&self) -> Option<i64> {
        match self {
            Self::Payroll { net_cents, .. } => Some(*net_cents),
            Self::Amount { amount_cents } => Some(*amount_cents),
            Self::Access { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Accepted { value: AcceptedValue },
    Flagged { reason: FlagReason, severity: Severity },
    Rejected { reason: RejectReason },
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Self::Accepted { .. } => VerdictKind::Accepted,
            Self::Flagged { .. } => VerdictKind::Flagged,
            Self::Rejected { .. } => VerdictKind::Rejected,
        }
    }

    pub fn flagged(reason: FlagReason, severity: Severity) -> Self {
        Self::Flagged { reason, severity }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Accepted,
    Flagged,
    Rejected,
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Flagged => write!(f, "flagged"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization output
// ---------------------------------------------------------------------------

/// A raw row that never reached evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub row: RawRow,
    pub reason: RejectReason,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub facts: Vec<FactRow>,
    pub rejected: Vec<Rejection>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub fact: FactRow,
    pub verdict: Verdict,
}

/// A reference row keyed to a fact that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnmatchedReference {
    pub table: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub input_rows: usize,
    pub accepted: usize,
    pub flagged: usize,
    /// Rows the evaluator rejected (payroll join failures).
    pub rejected_verdicts: usize,
    /// Rows the normalizer kept out of evaluation.
    pub excluded: usize,
    pub flagged_high: usize,
    pub flagged_medium: usize,
    /// Sum of the monetary values of accepted rows.
    pub accepted_total_cents: i64,
    pub kind_counts: BTreeMap<String, usize>,
    pub reason_counts: BTreeMap<String, usize>,
}

impl ReconSummary {
    /// Flagged rows of the given severity.
    pub fn flagged_with(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.flagged_high,
            Severity::Medium => self.flagged_medium,
        }
    }

    /// Verdicts of the given kind.
    pub fn count(&self, kind: VerdictKind) -> usize {
        match kind {
            VerdictKind::Accepted => self.accepted,
            VerdictKind::Flagged => self.flagged,
            VerdictKind::Rejected => self.rejected_verdicts,
        }
    }

    /// True when no row was flagged or kept out of evaluation.
    pub fn is_clean(&self) -> bool {
        self.flagged == 0 && self.rejected_verdicts == 0 && self.excluded == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconReport {
    pub domain: Domain,
    pub summary: ReconSummary,
    pub rows: Vec<ReportRow>,
    pub rejected: Vec<Rejection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched_references: Vec<UnmatchedReference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub domain: Domain,
    pub engine_version: String,
    pub run_at: String,
    /// SHA-256 of the report's JSON. Stable across runs over the same data.
    pub report_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub report: ReconReport,
}
