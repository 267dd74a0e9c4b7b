use crate::amount::{apply_deduction, format_cents, parse_cents, parse_count};
use crate::config::RuleConfig;
use crate::model::{AcceptedValue, EmployeeFact, RawRow, RejectReason, Verdict};
use crate::reference::{References, ATTENDANCE, SALARY};

/// Net pay for one employee joined against Salary and Attendance.
///
/// `Gross = Basic_Salary + Allowance`; below the attendance threshold the
/// deduction rate is withheld. Exactly at the threshold nothing is withheld.
pub fn decide(fact: &EmployeeFact, refs: &References, rules: &RuleConfig) -> Verdict {
    let id = fact.employee_id.as_str();
    let (Some(salary), Some(attendance)) = (first(refs, SALARY, id), first(refs, ATTENDANCE, id))
    else {
        return Verdict::rejected(RejectReason::IncompleteRecord);
    };

    let Some((gross_cents, days)) = pay_inputs(salary, attendance) else {
        return Verdict::rejected(RejectReason::InvalidValue);
    };

    let deduction_applied = days < rules.attendance_threshold_days;
    let net_cents = if deduction_applied {
        apply_deduction(gross_cents, rules.deduction_bps())
    } else {
        gross_cents
    };

    Verdict::Accepted {
        value: AcceptedValue::Payroll {
            gross_cents,
            net_cents,
            deduction_applied,
        },
    }
}

fn first<'a>(refs: &'a References, table: &str, key: &str) -> Option<&'a RawRow> {
    refs.lookup(table, key).and_then(|rows| rows.first())
}

fn pay_inputs(salary: &RawRow, attendance: &RawRow) -> Option<(i64, u32)> {
    let basic = non_negative(salary.get("Basic_Salary")?)?;
    let allowance = non_negative(salary.get("Allowance")?)?;
    let days = parse_count(attendance.get("Days_Present")?).ok()?;
    Some((basic.checked_add(allowance)?, days))
}

fn non_negative(raw: &str) -> Option<i64> {
    parse_cents(raw).ok().filter(|c| *c >= 0)
}

/// Human-readable decision table.
pub fn decision_table(rules: &RuleConfig) -> Vec<String> {
    vec![
        "Employee missing from Salary or Attendance => rejected (incomplete_record)".into(),
        "Salary or attendance value missing, negative or unparseable => rejected (invalid_value)"
            .into(),
        "Gross = Basic_Salary + Allowance".into(),
        format!(
            "Days_Present < {} => accepted, Net = Gross - {:.2}%",
            rules.attendance_threshold_days,
            rules.deduction_bps() as f64 / 100.0
        ),
        format!(
            "Days_Present >= {} => accepted, Net = Gross",
            rules.attendance_threshold_days
        ),
        format!(
            "example: Gross {} below threshold => Net {}",
            format_cents(7_200_000),
            format_cents(apply_deduction(7_200_000, rules.deduction_bps()))
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{spec_for_table, ReferenceTable};
    use std::collections::BTreeMap;

    fn row(index: usize, pairs: &[(&str, &str)]) -> RawRow {
        let fields: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawRow::new(index, fields)
    }

    fn refs(salaries: &[(&str, &str, &str)], days: &[(&str, &str)]) -> References {
        let salary_rows: Vec<RawRow> = salaries
            .iter()
            .enumerate()
            .map(|(i, &(id, b, a))| {
                row(i, &[("Employee_ID", id), ("Basic_Salary", b), ("Allowance", a)])
            })
            .collect();
        let attendance_rows: Vec<RawRow> = days
            .iter()
            .enumerate()
            .map(|(i, &(id, d))| row(i, &[("Employee_ID", id), ("Days_Present", d)]))
            .collect();
        References::from_tables([
            ReferenceTable::build(spec_for_table(SALARY).unwrap(), &salary_rows).unwrap(),
            ReferenceTable::build(spec_for_table(ATTENDANCE).unwrap(), &attendance_rows)
                .unwrap(),
        ])
    }

    fn employee(id: &str) -> EmployeeFact {
        EmployeeFact {
            employee_id: id.into(),
            name: None,
            department: None,
        }
    }

    fn net(v: Verdict) -> (i64, i64, bool) {
        match v {
            Verdict::Accepted {
                value:
                    AcceptedValue::Payroll {
                        gross_cents,
                        net_cents,
                        deduction_applied,
                    },
            } => (gross_cents, net_cents, deduction_applied),
            other => panic!("expected payroll acceptance, got {other:?}"),
        }
    }

    #[test]
    fn deduction_below_threshold() {
        let r = refs(&[("E002", "60000", "12000")], &[("E002", "18")]);
        let verdict = decide(&employee("E002"), &r, &RuleConfig::default());
        let (gross, net_cents, applied) = net(verdict);
        assert_eq!(gross, 7_200_000);
        assert_eq!(net_cents, 6_480_000);
        assert!(applied);
    }

    #[test]
    fn no_deduction_at_threshold() {
        let r = refs(&[("E004", "70000", "15000")], &[("E004", "20")]);
        let verdict = decide(&employee("E004"), &r, &RuleConfig::default());
        let (gross, net_cents, applied) = net(verdict);
        assert_eq!(gross, 8_500_000);
        assert_eq!(net_cents, gross);
        assert!(!applied);
    }

    #[test]
    fn configured_threshold_and_rate() {
        let rules = RuleConfig {
            deduction_rate: 0.25,
            attendance_threshold_days: 25,
            ..RuleConfig::default()
        };
        let r = refs(&[("E001", "50000", "10000")], &[("E001", "24")]);
        let (_, net_cents, applied) = net(decide(&employee("E001"), &r, &rules));
        assert!(applied);
        assert_eq!(net_cents, 4_500_000);
    }

    #[test]
    fn missing_join_partner_is_incomplete() {
        let r = refs(&[("E001", "50000", "10000")], &[("E002", "22")]);
        assert_eq!(
            decide(&employee("E001"), &r, &RuleConfig::default()),
            Verdict::rejected(RejectReason::IncompleteRecord)
        );
        assert_eq!(
            decide(&employee("E002"), &r, &RuleConfig::default()),
            Verdict::rejected(RejectReason::IncompleteRecord)
        );
    }

    #[test]
    fn negative_or_garbled_pay_is_invalid() {
        let r = refs(
            &[("E001", "-50000", "10000"), ("E002", "60000", "n/a")],
            &[("E001", "22"), ("E002", "22")],
        );
        for id in ["E001", "E002"] {
            assert_eq!(
                decide(&employee(id), &r, &RuleConfig::default()),
                Verdict::rejected(RejectReason::InvalidValue)
            );
        }
    }

    #[test]
    fn fractional_days_are_invalid() {
        let r = refs(&[("E001", "50000", "10000")], &[("E001", "19.5")]);
        assert_eq!(
            decide(&employee("E001"), &r, &RuleConfig::default()),
            Verdict::rejected(RejectReason::InvalidValue)
        );
    }
}
