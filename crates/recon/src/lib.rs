//! `rulegrid-recon`: rule reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded fact and reference tables, returns
//! one verdict per fact plus a pre-aggregated report. Three domains share the
//! pipeline (normalize, evaluate, report): payroll adjustment, transaction
//! risk and access compliance. No CLI or filesystem dependencies.

pub mod amount;
pub mod compliance;
pub mod composite;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod normalize;
pub mod payroll;
pub mod reference;
pub mod report;
pub mod risk;

pub use composite::{CompositeResult, CompositeVerdict, StepResult, StepStatus};
pub use config::{CompositeConfig, ReconConfig};
pub use engine::{load_csv_rows, reconcile, run};
pub use error::ReconError;
pub use model::{
    Domain, FactRow, RawRow, ReconInput, ReconReport, ReconResult, Severity, Verdict, VerdictKind,
};
pub use reference::{ReferenceTable, References};
