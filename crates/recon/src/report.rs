use std::collections::BTreeMap;

use crate::model::{
    Domain, FactRow, ReconReport, ReconSummary, Rejection, ReportRow, Severity,
    UnmatchedReference, Verdict,
};

/// Pair facts with their verdicts and pre-aggregate the counts.
///
/// `facts` and `verdicts` must line up one-to-one.
pub fn build(
    domain: Domain,
    facts: Vec<FactRow>,
    verdicts: Vec<Verdict>,
    rejected: Vec<Rejection>,
) -> ReconReport {
    debug_assert_eq!(facts.len(), verdicts.len());

    let rows: Vec<ReportRow> = facts
        .into_iter()
        .zip(verdicts)
        .map(|(fact, verdict)| ReportRow { fact, verdict })
        .collect();

    let summary = compute_summary(&rows, &rejected);

    ReconReport {
        domain,
        summary,
        rows,
        rejected,
        unmatched_references: Vec::new(),
    }
}

/// Attach reference rows that point at no fact.
pub fn with_unmatched(
    mut report: ReconReport,
    mut unmatched: Vec<UnmatchedReference>,
) -> ReconReport {
    unmatched.sort();
    report.unmatched_references = unmatched;
    report
}

/// Compute summary statistics from judged rows and rejections.
pub fn compute_summary(rows: &[ReportRow], rejected: &[Rejection]) -> ReconSummary {
    let mut s = ReconSummary {
        input_rows: rows.len() + rejected.len(),
        excluded: rejected.len(),
        ..ReconSummary::default()
    };
    let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();

    for row in rows {
        *kind_counts.entry(row.verdict.kind().to_string()).or_insert(0) += 1;

        match &row.verdict {
            Verdict::Accepted { value } => {
                s.accepted += 1;
                s.accepted_total_cents += value.cents().unwrap_or(0);
            }
            Verdict::Flagged { reason, severity } => {
                s.flagged += 1;
                match severity {
                    Severity::High => s.flagged_high += 1,
                    Severity::Medium => s.flagged_medium += 1,
                }
                *reason_counts.entry(reason.to_string()).or_insert(0) += 1;
            }
            Verdict::Rejected { reason } => {
                s.rejected_verdicts += 1;
                *reason_counts.entry(reason.to_string()).or_insert(0) += 1;
            }
        }
    }

    for r in rejected {
        *reason_counts.entry(r.reason.to_string()).or_insert(0) += 1;
    }

    s.kind_counts = kind_counts;
    s.reason_counts = reason_counts;
    s
}
