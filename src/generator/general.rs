//! Endpoint-wide cases: baseline, auth-token tampering, URL-id tampering

use serde_json::Value;

use super::{CaseSource, TestCase, GENERAL_FIELD};
use crate::reference::{Transform, ValueSpec};
use crate::schema::CallSpec;

/// Number of general cases for a test call
pub fn expected_general_count(test: &CallSpec, auth_header: &str) -> usize {
    1 + if test.headers.contains_key(auth_header) {
        4
    } else {
        0
    } + 3 * test.url_ids.len()
}

/// Ordered general cases for a test call
pub fn general_cases(test: &CallSpec, auth_header: &str, placeholder: &str) -> Vec<TestCase> {
    let mut cases = vec![TestCase::request(
        "acceptable base case",
        true,
        "baseline request rejected",
    )];

    if let Some(token) = test.headers.get(auth_header) {
        let mut removed = test.headers.clone();
        removed.remove(auth_header);
        cases.push(
            TestCase::request(
                "auth token removed",
                false,
                format!("request accepted without {auth_header}"),
            )
            .with_header(removed),
        );

        let mut nulled = test.headers.clone();
        nulled.insert(auth_header.to_string(), ValueSpec::Literal(Value::Null));
        cases.push(
            TestCase::request(
                "auth token null",
                false,
                format!("request accepted with null {auth_header}"),
            )
            .with_header(nulled),
        );

        for (transform, name, error) in [
            (
                Transform::Shorten,
                "auth token shortened",
                "request accepted with a shortened token",
            ),
            (
                Transform::Lengthen,
                "auth token lengthened",
                "request accepted with a lengthened token",
            ),
        ] {
            let mut tampered = test.headers.clone();
            tampered.insert(auth_header.to_string(), token.tampered(transform));
            cases.push(TestCase::request(name, false, error).with_header(tampered));
        }
    }

    for (i, _) in test.url_ids.iter().enumerate() {
        let mut remaining = test.url_ids.clone();
        remaining.remove(i);
        cases.push(
            TestCase::request(
                format!("url id #{i} removed"),
                false,
                format!("request accepted with url id #{i} removed"),
            )
            .with_url_template(remove_placeholder(&test.url, i, placeholder))
            .with_url_ids(remaining),
        );

        for (transform, verb) in [(Transform::Lengthen, "lengthened"), (Transform::Shorten, "shortened")] {
            let mut tampered = test.url_ids.clone();
            tampered[i] = tampered[i].tampered(transform);
            cases.push(
                TestCase::request(
                    format!("url id #{i} {verb}"),
                    false,
                    format!("request accepted with url id #{i} {verb}"),
                )
                .with_url_ids(tampered),
            );
        }
    }

    cases
        .into_iter()
        .map(|case| case.in_field(GENERAL_FIELD, CaseSource::General))
        .collect()
}

/// `template` without its `index`-th placeholder and the slash before it
pub(crate) fn remove_placeholder(template: &str, index: usize, placeholder: &str) -> String {
    let Some((start, _)) = template.match_indices(placeholder).nth(index) else {
        return template.to_string();
    };
    let end = start + placeholder.len();
    let start = if template[..start].ends_with('/') {
        start - 1
    } else {
        start
    };
    format!("{}{}", &template[..start], &template[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::CaseKind;
    use crate::reference::{Component, Phase, Reference};
    use crate::schema::HttpMethod;

    fn call() -> CallSpec {
        CallSpec::new(HttpMethod::Get, "/orgs/<id>/users/<id>")
            .with_header("X-Auth-Token", ValueSpec::literal("tok123"))
            .with_url_ids(vec![
                ValueSpec::literal("org1"),
                ValueSpec::reference(Phase::Predo, Component::Response, "_id"),
            ])
    }

    #[test]
    fn count_matches_generation() {
        let call = call();
        let cases = general_cases(&call, "X-Auth-Token", "<id>");
        assert_eq!(cases.len(), expected_general_count(&call, "X-Auth-Token"));
        assert_eq!(cases.len(), 1 + 4 + 6);
        assert!(cases[0].expected_success);
        assert!(cases[1..].iter().all(|c| !c.expected_success));
        assert!(cases
            .iter()
            .all(|c| c.field == GENERAL_FIELD && c.source == CaseSource::General));
        assert!(cases.iter().all(|c| c.kind == CaseKind::Request));
    }

    #[test]
    fn no_auth_header_no_token_cases() {
        let call = CallSpec::new(HttpMethod::Get, "/health");
        let cases = general_cases(&call, "X-Auth-Token", "<id>");
        assert_eq!(cases.len(), 1);
        assert_eq!(expected_general_count(&call, "Authorization"), 1);
    }

    #[test]
    fn token_tamper_literal_and_reference() {
        let cases = general_cases(&call(), "X-Auth-Token", "<id>");
        let header = |i: usize| cases[i].header_override.as_ref().unwrap();

        assert!(!header(1).contains_key("X-Auth-Token"));
        assert_eq!(header(2)["X-Auth-Token"], ValueSpec::Literal(Value::Null));
        assert_eq!(header(3)["X-Auth-Token"], ValueSpec::literal("tok12"));
        assert_eq!(header(4)["X-Auth-Token"], ValueSpec::literal("tok123a"));

        let referenced = CallSpec::new(HttpMethod::Get, "/me").with_header(
            "X-Auth-Token",
            ValueSpec::reference(Phase::Predo, Component::Response, "token"),
        );
        let cases = general_cases(&referenced, "X-Auth-Token", "<id>");
        let shortened = &cases[3].header_override.as_ref().unwrap()["X-Auth-Token"];
        assert_eq!(
            shortened,
            &ValueSpec::Reference(
                Reference::new(Phase::Predo, Component::Response, "token")
                    .with_transform(Transform::Shorten)
            )
        );
    }

    #[test]
    fn url_id_removal_drops_segment() {
        let cases = general_cases(&call(), "X-Auth-Token", "<id>");
        let removed_first = &cases[5];
        assert_eq!(
            removed_first.url_template_override.as_deref(),
            Some("/orgs/users/<id>")
        );
        assert_eq!(removed_first.url_ids_override.as_ref().unwrap().len(), 1);

        let removed_second = &cases[8];
        assert_eq!(
            removed_second.url_template_override.as_deref(),
            Some("/orgs/<id>/users")
        );
        assert_eq!(
            removed_second.url_ids_override.as_ref().unwrap()[0],
            ValueSpec::literal("org1")
        );

        let lengthened = &cases[6];
        assert_eq!(
            lengthened.url_ids_override.as_ref().unwrap()[0],
            ValueSpec::literal("org1a")
        );
        assert!(lengthened.url_template_override.is_none());
    }

    #[test]
    fn remove_placeholder_cases() {
        assert_eq!(remove_placeholder("/users/<id>", 0, "<id>"), "/users");
        assert_eq!(remove_placeholder("<id>/x", 0, "<id>"), "/x");
        assert_eq!(remove_placeholder("/a/<id>", 3, "<id>"), "/a/<id>");
    }
}
