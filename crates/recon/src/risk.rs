use crate::amount::format_cents;
use crate::config::RuleConfig;
use crate::model::{AcceptedValue, FlagReason, Severity, TransactionFact, Verdict};
use crate::reference::{References, MASTER};

/// Risk classification for one canonical transaction. First match wins:
///
/// 1. amount above the high-risk threshold
/// 2. no Customer_ID
/// 3. Customer_ID not in Master
/// 4. accepted at face value
pub fn decide(fact: &TransactionFact, refs: &References, rules: &RuleConfig) -> Verdict {
    if fact.amount_cents > rules.high_risk_cents() {
        return Verdict::flagged(FlagReason::HighRisk, Severity::High);
    }

    let Some(customer) = fact.customer_id.as_deref() else {
        return Verdict::flagged(FlagReason::MissingCustomer, Severity::Medium);
    };

    if !refs.contains(MASTER, customer) {
        return Verdict::flagged(FlagReason::UnknownCustomer, Severity::Medium);
    }

    Verdict::Accepted {
        value: AcceptedValue::Amount {
            amount_cents: fact.amount_cents,
        },
    }
}

pub fn decision_table(rules: &RuleConfig) -> Vec<String> {
    vec![
        "Negative Amount => excluded before scoring (invalid_value)".into(),
        "Transaction_ID repeated => excluded (duplicate_key); \
         last_write_wins keeps the latest unless amounts match"
            .into(),
        format!(
            "1. Amount > {} => flagged high_risk (high)",
            format_cents(rules.high_risk_cents())
        ),
        "2. Customer_ID missing => flagged missing_customer (medium)".into(),
        "3. Customer_ID not in master => flagged unknown_customer (medium)".into(),
        "4. otherwise => accepted (amount)".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawRow;
    use crate::reference::{spec_for_table, ReferenceTable};
    use std::collections::BTreeMap;

    fn master(ids: &[&str]) -> References {
        let rows: Vec<RawRow> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                RawRow::new(i, BTreeMap::from([("Customer_ID".to_string(), id.to_string())]))
            })
            .collect();
        References::from_tables([
            ReferenceTable::build(spec_for_table(MASTER).unwrap(), &rows).unwrap()
        ])
    }

    fn txn(amount_cents: i64, customer: Option<&str>) -> TransactionFact {
        TransactionFact {
            transaction_id: "T".into(),
            amount_cents,
            customer_id: customer.map(str::to_string),
            missing_foreign_key: customer.is_none(),
        }
    }

    #[test]
    fn high_amount_wins_over_valid_customer() {
        let refs = master(&["C100", "C101", "C102"]);
        assert_eq!(
            decide(&txn(15_000_000, Some("C101")), &refs, &RuleConfig::default()),
            Verdict::flagged(FlagReason::HighRisk, Severity::High)
        );
    }

    #[test]
    fn high_amount_wins_over_missing_and_unknown_customer() {
        let refs = master(&["C100"]);
        for customer in [None, Some("C999")] {
            assert_eq!(
                decide(&txn(20_000_000, customer), &refs, &RuleConfig::default()),
                Verdict::flagged(FlagReason::HighRisk, Severity::High)
            );
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        let refs = master(&["C100"]);
        assert_eq!(
            decide(&txn(10_000_000, Some("C100")), &refs, &RuleConfig::default()),
            Verdict::Accepted {
                value: AcceptedValue::Amount {
                    amount_cents: 10_000_000
                }
            }
        );
        assert_eq!(
            decide(&txn(10_000_001, Some("C100")), &refs, &RuleConfig::default()),
            Verdict::flagged(FlagReason::HighRisk, Severity::High)
        );
    }

    #[test]
    fn missing_customer_is_distinct_from_unknown() {
        let refs = master(&["C100", "C101", "C102"]);
        assert_eq!(
            decide(&txn(20_000, None), &refs, &RuleConfig::default()),
            Verdict::flagged(FlagReason::MissingCustomer, Severity::Medium)
        );
        assert_eq!(
            decide(&txn(50_000, Some("C999")), &refs, &RuleConfig::default()),
            Verdict::flagged(FlagReason::UnknownCustomer, Severity::Medium)
        );
    }

    #[test]
    fn configured_threshold() {
        let rules = RuleConfig {
            high_risk_amount: 1_000,
            ..RuleConfig::default()
        };
        let refs = master(&["C100"]);
        assert_eq!(
            decide(&txn(500_000, Some("C100")), &refs, &rules),
            Verdict::flagged(FlagReason::HighRisk, Severity::High)
        );
    }
}
