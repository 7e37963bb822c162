//! Password rule candidates
//!
//! Candidates are derived from the baseline password so each one breaks only
//! the rule under test.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::baseline::Baseline;
use super::{CaseSink, TestCase};
use crate::errors::ProbeError;
use crate::schema::FieldParameters;

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d").expect("digit pattern compiles"));
static SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("special pattern compiles"));

/// `base` truncated or cyclically extended to `len` characters
pub fn fit_length(base: &str, len: usize) -> String {
    if base.is_empty() {
        return "a".repeat(len);
    }
    base.chars().cycle().take(len).collect()
}

/// `candidate` brought back inside the declared length bounds
pub fn refit(candidate: &str, min_length: Option<usize>, max_length: Option<usize>) -> String {
    let len = candidate.chars().count();
    match (min_length, max_length) {
        (Some(min), _) if len < min => fit_length(candidate, min),
        (_, Some(max)) if len > max => candidate.chars().take(max).collect(),
        _ => candidate.to_string(),
    }
}

pub fn strip_digits(s: &str) -> String {
    DIGITS.replace_all(s, "").into_owned()
}

pub fn strip_special(s: &str) -> String {
    SPECIAL.replace_all(s, "").into_owned()
}

/// Cases contributed by the password rules
pub fn expected_count(params: &FieldParameters) -> usize {
    params.min_length.map_or(0, |min| min + 2)
        + params.max_length.map_or(0, |_| 3)
        + [
            params.upper_case,
            params.lower_case,
            params.number,
            params.special_character,
        ]
        .iter()
        .filter(|rule| **rule)
        .count()
}

pub(crate) fn push_cases(
    sink: &mut CaseSink<'_>,
    baseline: &Baseline<'_>,
    params: &FieldParameters,
) -> Result<(), ProbeError> {
    if expected_count(params) == 0 {
        return Ok(());
    }

    let current = baseline.current()?;
    let password = current.as_str().ok_or_else(|| {
        ProbeError::schema(format!(
            "field '{}': baseline password must be a string",
            sink.field_name()
        ))
    })?;

    if let Some(min) = params.min_length {
        for len in 0..=min + 1 {
            let candidate = fit_length(password, len);
            let accepted = len >= min;
            let error = if accepted {
                format!("password of length {len} rejected (minimum {min}): '{candidate}'")
            } else {
                format!("password of length {len} accepted (minimum {min}): '{candidate}'")
            };
            sink.push(
                TestCase::request("password: min length", accepted, error)
                    .with_body(baseline.with_value(&json!(candidate))),
            );
        }
    }

    if let Some(max) = params.max_length {
        for len in max.saturating_sub(1)..=max + 1 {
            let candidate = fit_length(password, len);
            let accepted = len <= max;
            let error = if accepted {
                format!("password of length {len} rejected (maximum {max}): '{candidate}'")
            } else {
                format!("password of length {len} accepted (maximum {max}): '{candidate}'")
            };
            sink.push(
                TestCase::request("password: max length", accepted, error)
                    .with_body(baseline.with_value(&json!(candidate))),
            );
        }
    }

    let rules: [(bool, &str, String); 4] = [
        (
            params.upper_case,
            "password: upper case required",
            password.to_lowercase(),
        ),
        (
            params.lower_case,
            "password: lower case required",
            password.to_uppercase(),
        ),
        (
            params.number,
            "password: number required",
            refit(&strip_digits(password), params.min_length, params.max_length),
        ),
        (
            params.special_character,
            "password: special character required",
            refit(&strip_special(password), params.min_length, params.max_length),
        ),
    ];

    for (enabled, name, candidate) in rules {
        if !enabled {
            continue;
        }
        sink.push(
            TestCase::request(
                name,
                false,
                format!("password accepted without the required class: '{candidate}'"),
            )
            .with_body(baseline.with_value(&json!(candidate))),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_length_truncates_and_cycles() {
        assert_eq!(fit_length("abc", 2), "ab");
        assert_eq!(fit_length("abc", 7), "abcabca");
        assert_eq!(fit_length("abc", 0), "");
        assert_eq!(fit_length("", 3), "aaa");
    }

    #[test]
    fn strip_character_classes() {
        assert_eq!(strip_digits("Pa55word!"), "Paword!");
        assert_eq!(strip_special("P@ss-word!1"), "Pssword1");
        assert_eq!(strip_digits("no digits"), "no digits");
        assert_eq!(strip_special(""), "");
    }

    #[test]
    fn refit_respects_bounds() {
        assert_eq!(refit("abc", Some(8), None), "abcabcab");
        assert_eq!(refit("abcdefghij", None, Some(4)), "abcd");
        assert_eq!(refit("abcd", Some(2), Some(6)), "abcd");
    }

    #[test]
    fn digit_stripped_candidate_keeps_min_length() {
        let candidate = refit(&strip_digits("Passw0rd12"), Some(8), None);
        assert!(candidate.chars().count() >= 8);
        assert!(!candidate.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn counts_each_rule() {
        let params = FieldParameters {
            min_length: Some(8),
            max_length: Some(20),
            number: true,
            upper_case: true,
            ..Default::default()
        };
        assert_eq!(expected_count(&params), 10 + 3 + 2);
        assert_eq!(expected_count(&FieldParameters::default()), 0);
    }
}
