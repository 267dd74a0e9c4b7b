use rayon::prelude::*;
use tracing::debug;

use crate::config::RuleConfig;
use crate::model::{Domain, FactBody, FactRow, Verdict};
use crate::reference::References;
use crate::{compliance, payroll, risk};

/// Apply the fact's domain rule. Pure: same inputs, same verdict.
pub fn decide(fact: &FactRow, refs: &References, rules: &RuleConfig) -> Verdict {
    match &fact.body {
        FactBody::Payroll(employee) => payroll::decide(employee, refs, rules),
        FactBody::Risk(transaction) => risk::decide(transaction, refs, rules),
        FactBody::Compliance(access) => compliance::decide(access, refs),
    }
}

/// One verdict per fact, in fact order.
pub fn evaluate(facts: &[FactRow], refs: &References, rules: &RuleConfig) -> Vec<Verdict> {
    facts.iter().map(|f| decide(f, refs, rules)).collect()
}

/// Shard facts across the rayon pool and merge the partial verdict lists
/// back by the fact's position, never by completion order.
pub fn evaluate_parallel(
    facts: &[FactRow],
    refs: &References,
    rules: &RuleConfig,
    chunk_size: usize,
) -> Vec<Verdict> {
    let chunk_size = chunk_size.max(1);
    let mut tagged: Vec<(usize, Verdict)> = facts
        .par_chunks(chunk_size)
        .enumerate()
        .flat_map_iter(|(chunk_no, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(move |(i, fact)| (chunk_no * chunk_size + i, decide(fact, refs, rules)))
        })
        .collect();

    tagged.sort_by_key(|(pos, _)| *pos);
    debug!(
        facts = facts.len(),
        chunks = facts.len().div_ceil(chunk_size),
        "parallel evaluation merged"
    );
    tagged.into_iter().map(|(_, v)| v).collect()
}

/// The decision table a domain applies, one line per rule.
pub fn decision_table(domain: Domain, rules: &RuleConfig) -> Vec<String> {
    match domain {
        Domain::Payroll => payroll::decision_table(rules),
        Domain::Risk => risk::decision_table(rules),
        Domain::Compliance => compliance::decision_table(),
    }
}
