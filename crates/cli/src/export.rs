//! `--csv` output: one line per judged fact, then one per rejected row.

use std::path::Path;

use rulegrid_recon::amount::format_cents;
use rulegrid_recon::model::{AcceptedValue, AccessBasis, ReconReport, Verdict};

use crate::exit_codes::EXIT_RECON_RUNTIME;
use crate::CliError;

const HEADER: [&str; 8] = [
    "row", "key", "kind", "reason", "severity", "value", "gross", "detail",
];

fn io_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_RECON_RUNTIME, message: msg.into(), hint: None }
}

/// Render the report as CSV bytes. Row numbers are 0-based data-row
/// positions in the fact table, matching the JSON `index` field.
pub fn report_csv(report: &ReconReport) -> Result<Vec<u8>, CliError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(HEADER).map_err(|e| io_err(e.to_string()))?;

    for row in &report.rows {
        let index = row.fact.index.to_string();
        let record: [String; 8] = match row.verdict {
            Verdict::Accepted { value } => {
                let (value, gross, detail) = match value {
                    AcceptedValue::Payroll { gross_cents, net_cents, deduction_applied } => (
                        format_cents(net_cents),
                        format_cents(gross_cents),
                        if deduction_applied { "deduction applied".into() } else { String::new() },
                    ),
                    AcceptedValue::Amount { amount_cents } => {
                        (format_cents(amount_cents), String::new(), String::new())
                    }
                    AcceptedValue::Access { basis } => (
                        String::new(),
                        String::new(),
                        match basis {
                            AccessBasis::Policy => "policy".into(),
                            AccessBasis::Exception => "exception".into(),
                        },
                    ),
                };
                [
                    index,
                    row.fact.key.clone(),
                    "accepted".into(),
                    String::new(),
                    String::new(),
                    value,
                    gross,
                    detail,
                ]
            }
            Verdict::Flagged { reason, severity } => [
                index,
                row.fact.key.clone(),
                "flagged".into(),
                reason.to_string(),
                severity.to_string(),
                String::new(),
                String::new(),
                String::new(),
            ],
            Verdict::Rejected { reason } => [
                index,
                row.fact.key.clone(),
                "rejected".into(),
                reason.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
        };
        writer.write_record(&record).map_err(|e| io_err(e.to_string()))?;
    }

    let key_column = report.domain.key_column();
    for rejection in &report.rejected {
        let index = rejection.row.index.to_string();
        let reason = rejection.reason.to_string();
        writer
            .write_record([
                index.as_str(),
                rejection.row.get(key_column).unwrap_or(""),
                "excluded",
                reason.as_str(),
                "",
                "",
                "",
                rejection.detail.as_str(),
            ])
            .map_err(|e| io_err(e.to_string()))?;
    }

    writer.into_inner().map_err(|e| io_err(e.to_string()))
}

pub fn write_report_csv(path: &Path, report: &ReconReport) -> Result<(), CliError> {
    let bytes = report_csv(report)?;
    std::fs::write(path, &bytes)
        .map_err(|e| io_err(format!("cannot write {}: {e}", path.display())))
}
