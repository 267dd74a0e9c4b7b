//! Decimal amount text to integer minor units (cents), no f64.

/// Parse "1234.56", "1234.5", "1234", "-1234.56" into cents.
pub fn parse_cents(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if digits.is_empty() {
        return Err(format!("bad amount: '{s}'"));
    }

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("bad amount: '{s}'"));
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|e| format!("bad amount '{s}': {e}"))?
    };
    let cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|e| format!("bad cents: {e}"))? * 10,
        2 => frac.parse().map_err(|e| format!("bad cents: {e}"))?,
        _ => return Err(format!("too many decimal places: '{s}'")),
    };

    let minor = units
        .checked_mul(100)
        .and_then(|u| u.checked_add(cents))
        .ok_or_else(|| format!("amount out of range: '{s}'"))?;
    Ok(if negative { -minor } else { minor })
}

/// Parse a whole, non-negative count such as days present.
pub fn parse_count(s: &str) -> Result<u32, String> {
    let s = s.trim();
    // Spreadsheet exports often write integers as "18.0"
    let s = s.strip_suffix(".0").unwrap_or(s);
    s.parse::<u32>().map_err(|_| format!("not a whole non-negative number: '{s}'"))
}

/// Format cents as a plain decimal string ("-50.25").
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// `gross * (1 - bps/10000)`, rounded half up.
pub fn apply_deduction(gross_cents: i64, deduction_bps: i64) -> i64 {
    let kept = 10_000 - deduction_bps;
    let scaled = gross_cents as i128 * kept as i128;
    let rounded = if scaled >= 0 {
        (scaled + 5_000) / 10_000
    } else {
        (scaled - 5_000) / 10_000
    };
    rounded as i64
}
