use std::collections::{BTreeMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{ReconConfig, TableConfig};
use crate::error::ReconError;
use crate::evaluate::{evaluate, evaluate_parallel};
use crate::model::{
    Domain, RawRow, ReconInput, ReconMeta, ReconReport, ReconResult, UnmatchedReference,
};
use crate::normalize::normalize;
use crate::reference::{spec_for_table, table_specs, References};
use crate::report;

/// Run reconciliation per config. Returns the report plus run metadata.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let report = reconcile(config, input)?;
    let report_sha256 = report_digest(&report)?;

    let s = &report.summary;
    info!(
        config = %config.name,
        domain = %config.domain,
        input = s.input_rows,
        accepted = s.accepted,
        flagged = s.flagged,
        flagged_high = s.flagged_high,
        rejected = s.rejected_verdicts + s.excluded,
        "recon complete"
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            domain: config.domain,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            report_sha256,
        },
        report,
    })
}

/// Normalize, evaluate and report. Deterministic for identical input.
///
/// Fails only when a table is missing or a reference table breaks a
/// required uniqueness; no partial report is produced in that case.
pub fn reconcile(config: &ReconConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    let domain = config.domain;

    let refs = References::build(domain, &input.tables)?;
    let fact_rows = input
        .tables
        .get(domain.fact_table())
        .ok_or_else(|| ReconError::MissingTable(domain.fact_table().into()))?;

    let normalized = normalize(domain, fact_rows, &config.normalize);

    let verdicts = if config.engine.parallel {
        evaluate_parallel(&normalized.facts, &refs, &config.rules, config.engine.chunk_size)
    } else {
        evaluate(&normalized.facts, &refs, &config.rules)
    };
    debug!(%domain, verdicts = verdicts.len(), "evaluated");

    let unmatched = unmatched_references(domain, &refs, fact_rows);
    let built = report::build(domain, normalized.facts, verdicts, normalized.rejected);
    Ok(report::with_unmatched(built, unmatched))
}

/// Hex SHA-256 of the report's JSON.
pub fn report_digest(report: &ReconReport) -> Result<String, ReconError> {
    let bytes = serde_json::to_vec(report)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Reference rows keyed by the domain's natural key whose key matches no
/// fact row (valid or not).
fn unmatched_references(
    domain: Domain,
    refs: &References,
    fact_rows: &[RawRow],
) -> Vec<UnmatchedReference> {
    let fact_keys: HashSet<&str> = fact_rows
        .iter()
        .filter_map(|r| r.get(domain.key_column()))
        .collect();

    let mut unmatched = Vec::new();
    for spec in table_specs(domain)
        .iter()
        .filter(|s| !s.fact && s.key_column == domain.key_column())
    {
        let Some(table) = refs.get(spec.name) else {
            continue;
        };
        unmatched.extend(
            table
                .keys()
                .filter(|k| !fact_keys.contains(k))
                .map(|k| UnmatchedReference {
                    table: spec.name.into(),
                    key: k.into(),
                }),
        );
    }
    unmatched
}

/// Load CSV text into raw rows, renaming mapped headers to their canonical
/// column names and checking the table's required columns.
pub fn load_csv_rows(
    table_name: &str,
    csv_data: &str,
    table_config: &TableConfig,
) -> Result<Vec<RawRow>, ReconError> {
    let csv_err = |e: csv::Error| ReconError::Csv {
        table: table_name.into(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| {
            let h = h.trim_start_matches('\u{feff}').trim();
            table_config
                .columns
                .iter()
                .find(|(_, source)| source.as_str() == h)
                .map(|(canonical, _)| canonical.clone())
                .unwrap_or_else(|| h.to_string())
        })
        .collect();

    if let Some(spec) = spec_for_table(table_name) {
        for column in spec.columns {
            if !headers.iter().any(|h| h == column) {
                return Err(ReconError::MissingColumn {
                    table: table_name.into(),
                    column: column.to_string(),
                });
            }
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let mut fields = BTreeMap::new();
        for (i, h) in headers.iter().enumerate() {
            if let Some(val) = record.get(i) {
                fields.insert(h.clone(), val.to_string());
            }
        }
        rows.push(RawRow::new(index, fields));
    }

    debug!(table = table_name, rows = rows.len(), "loaded csv");
    Ok(rows)
}
