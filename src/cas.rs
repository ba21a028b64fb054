//! CAS registry number validation.
//!
//! SimaPro stores CAS numbers with or without hyphens and with zero padding.
//! Valid numbers are normalized to `NNNNNNN-NN-N` without leading zeros;
//! invalid ones are dropped with a warning.

use tracing::warn;

/// Check digit over the digits before it, weighted from the right
pub fn check_digit(digits: &str) -> Option<u32> {
    let mut total = 0;
    for (position, c) in digits.chars().rev().enumerate() {
        total += (position as u32 + 1) * c.to_digit(10)?;
    }
    Some(total % 10)
}

/// Normalize a CAS number, or `None` when it's missing or invalid
pub fn validate_cas(raw: &str) -> Option<String> {
    let cas = raw.trim();
    if cas.is_empty() {
        return None;
    }

    let parts: Vec<&str> = cas.split('-').collect();
    match parts.as_slice() {
        [compact] => {
            if compact.len() < 4 || !compact.chars().all(|c| c.is_ascii_digit()) {
                warn!("Removing invalid CAS number {}", cas);
                return None;
            }
            let (body, check) = compact.split_at(compact.len() - 1);
            let (first, second) = body.split_at(body.len() - 2);
            verified(cas, first, second, check)
        }
        [first, second, ""] => {
            let expected = check_digit(&format!("{first}{second}"))?;
            let fixed = format!("{cas}{expected}");
            warn!("Adding missing CAS check digit, {} -> {}", cas, fixed);
            Some(fixed)
        }
        [first, second, check] => verified(cas, first, second, check),
        _ => {
            warn!(
                "Given CAS can't be validated, wrong number of hyphens are present: {}",
                cas
            );
            None
        }
    }
}

fn verified(cas: &str, first: &str, second: &str, check: &str) -> Option<String> {
    match check_digit(&format!("{first}{second}")) {
        Some(expected) if check == expected.to_string() => {
            Some(format!("{first}-{second}-{check}").trim_start_matches('0').to_string())
        }
        Some(expected) => {
            warn!(
                "Removing invalid CAS number {}; last digit should be {}",
                cas, expected
            );
            None
        }
        None => {
            warn!("Removing invalid CAS number {}", cas);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_cas() {
        assert_eq!(validate_cas("7782425"), Some("7782-42-5".to_string()));
        assert_eq!(validate_cas("007782425"), Some("7782-42-5".to_string()));
    }

    #[test]
    fn test_hyphenated_cas() {
        assert_eq!(validate_cas("7782-42-5"), Some("7782-42-5".to_string()));
        assert_eq!(validate_cas("014255-04-0"), Some("14255-04-0".to_string()));
        assert_eq!(validate_cas("7782-42-4"), None);
    }

    #[test]
    fn test_invalid_cas() {
        assert_eq!(validate_cas("7782-425"), None);
        assert_eq!(validate_cas(""), None);
        assert_eq!(validate_cas("   "), None);
        assert_eq!(validate_cas("7782424"), None);
        assert_eq!(validate_cas("77a2425"), None);
    }

    #[test]
    fn test_missing_check_digit_added() {
        assert_eq!(validate_cas("1228284-64-"), Some("1228284-64-7".to_string()));
    }
}
