use crate::model::{AccessBasis, AccessFact, AcceptedValue, FlagReason, Severity, Verdict};
use crate::reference::{References, ACCESS_MATRIX, EXCEPTION_LIST};

const ACCESS_TYPE: &str = "Access_Type";

/// Compliance verdict for one access event.
///
/// Role validity is checked before anything else, so an exception entry can
/// lift a matrix denial but never an unknown role.
pub fn decide(fact: &AccessFact, refs: &References) -> Verdict {
    if !refs.contains(ACCESS_MATRIX, &fact.role) {
        return Verdict::flagged(FlagReason::UnknownRole, Severity::High);
    }

    if refs.has_entry(ACCESS_MATRIX, &fact.role, ACCESS_TYPE, &fact.access_type) {
        return accepted(AccessBasis::Policy);
    }

    if refs.has_entry(EXCEPTION_LIST, &fact.user_id, ACCESS_TYPE, &fact.access_type) {
        return accepted(AccessBasis::Exception);
    }

    Verdict::flagged(FlagReason::UnauthorizedAccess, Severity::High)
}

fn accepted(basis: AccessBasis) -> Verdict {
    Verdict::Accepted {
        value: AcceptedValue::Access { basis },
    }
}

pub fn decision_table() -> Vec<String> {
    vec![
        "1. Role has no entries in access_matrix => flagged unknown_role (high)".into(),
        "2. (Role, Access_Type) in access_matrix => accepted (policy)".into(),
        "3. (User_ID, Access_Type) in exception_list => accepted (exception)".into(),
        "4. otherwise => flagged unauthorized_access (high)".into(),
    ]
}
