use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::amount::parse_cents;
use crate::config::NormalizeConfig;
use crate::model::{
    AccessFact, Domain, EmployeeFact, FactBody, FactRow, Normalized, RawRow, RejectReason,
    Rejection, TransactionFact,
};

/// Validate and deduplicate one domain's fact rows.
///
/// Rows failing validation are rejected with `InvalidValue`. Rows sharing a
/// natural key are all rejected with `DuplicateKey` unless
/// `last_write_wins` is set, in which case the latest occurrence survives.
/// Transactions repeated with the same amount are a double submission and
/// are rejected as a group either way. Survivors keep their input order.
pub fn normalize(domain: Domain, rows: &[RawRow], config: &NormalizeConfig) -> Normalized {
    let mut rejected = Vec::new();
    let mut parsed: Vec<(FactRow, &RawRow)> = Vec::with_capacity(rows.len());

    for row in rows {
        match parse_fact(domain, row) {
            Ok(fact) => parsed.push((fact, row)),
            Err(detail) => rejected.push(Rejection {
                row: row.clone(),
                reason: RejectReason::InvalidValue,
                detail,
            }),
        }
    }
    let invalid = rejected.len();

    // Positions in `parsed`, grouped by natural key
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (pos, (fact, _)) in parsed.iter().enumerate() {
        groups.entry(fact.key.as_str()).or_default().push(pos);
    }

    let mut dropped: HashSet<usize> = HashSet::new();
    for (key, positions) in groups.iter().filter(|(_, p)| p.len() > 1) {
        let indexes: Vec<String> = positions
            .iter()
            .map(|&p| parsed[p].1.index.to_string())
            .collect();
        let exact = has_exact_duplicate(positions.iter().map(|&p| &parsed[p].0));

        let keep = if config.last_write_wins && !exact {
            positions.last().copied()
        } else {
            None
        };

        for &pos in positions {
            if Some(pos) == keep {
                continue;
            }
            let detail = match keep {
                Some(k) => format!(
                    "{} '{key}' superseded by row {}",
                    domain.key_column(),
                    parsed[k].1.index
                ),
                None if exact => format!(
                    "{} '{key}' submitted more than once with the same amount (rows {})",
                    domain.key_column(),
                    indexes.join(", ")
                ),
                None => format!(
                    "{} '{key}' appears in rows {}",
                    domain.key_column(),
                    indexes.join(", ")
                ),
            };
            rejected.push(Rejection {
                row: parsed[pos].1.clone(),
                reason: RejectReason::DuplicateKey,
                detail,
            });
            dropped.insert(pos);
        }
    }

    rejected.sort_by_key(|r| r.row.index);

    let facts: Vec<FactRow> = parsed
        .into_iter()
        .enumerate()
        .filter(|(pos, _)| !dropped.contains(pos))
        .map(|(_, (fact, _))| fact)
        .collect();

    debug!(
        %domain,
        input = rows.len(),
        invalid,
        duplicates = dropped.len(),
        canonical = facts.len(),
        "normalized fact rows"
    );

    Normalized { facts, rejected }
}

/// Two risk facts with the same amount under one key.
fn has_exact_duplicate<'a>(facts: impl Iterator<Item = &'a FactRow>) -> bool {
    let mut seen = HashSet::new();
    for fact in facts {
        if let FactBody::Risk(t) = &fact.body {
            if !seen.insert(t.amount_cents) {
                return true;
            }
        }
    }
    false
}

fn required<'a>(row: &'a RawRow, column: &str) -> Result<&'a str, String> {
    row.get(column).ok_or_else(|| format!("missing {column}"))
}

fn parse_fact(domain: Domain, row: &RawRow) -> Result<FactRow, String> {
    let key = required(row, domain.key_column())?.to_string();

    let body = match domain {
        Domain::Payroll => FactBody::Payroll(EmployeeFact {
            employee_id: key.clone(),
            name: row.get("Name").map(str::to_string),
            department: row.get("Department").map(str::to_string),
        }),
        Domain::Risk => {
            let raw = required(row, "Amount")?;
            let amount_cents = parse_cents(raw)?;
            if amount_cents < 0 {
                return Err(format!("negative Amount {raw} (reversal entry)"));
            }
            let customer_id = row.get("Customer_ID").map(str::to_string);
            FactBody::Risk(TransactionFact {
                transaction_id: key.clone(),
                amount_cents,
                missing_foreign_key: customer_id.is_none(),
                customer_id,
            })
        }
        Domain::Compliance => FactBody::Compliance(AccessFact {
            user_id: key.clone(),
            role: required(row, "Role")?.to_string(),
            access_type: required(row, "Access_Type")?.to_string(),
        }),
    };

    Ok(FactRow {
        index: row.index,
        key,
        body,
    })
}
