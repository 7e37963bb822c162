//! End-to-end runs against an in-memory user service
//!
//! The service behind `MockTransport` keeps real state: predo creates a user,
//! the test call updates it and undo deletes it, so references and cleanup
//! are exercised the way a live API would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use apiprobe::generator::CaseSource;
use apiprobe::reference::{literal_map, Component, Phase, ValueSpec};
use apiprobe::runner::Runner;
use apiprobe::schema::{
    CallSpec, EndpointSpec, FieldDescriptor, FieldParameters, FieldType, HttpMethod, Suite,
};
use apiprobe::transport::{HttpReply, HttpRequest, MockTransport};
use serde_json::{json, Value};

type Users = Arc<Mutex<HashMap<String, Value>>>;

fn valid_update(body: &Value) -> bool {
    let name_ok = body
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty());
    let age_ok = body
        .get("age")
        .and_then(Value::as_i64)
        .is_some_and(|age| (18..=120).contains(&age));
    let active_ok = body.get("active").is_some_and(Value::is_boolean);
    name_ok && age_ok && active_ok
}

/// Strict service: validates every field and 404s unknown users
fn user_service(users: Users, strict: bool) -> MockTransport {
    let next_id = Arc::new(Mutex::new(0u32));
    MockTransport::with_handler(move |req: &HttpRequest| {
        let path = req.url.trim_start_matches("http://api");
        let mut users = users.lock().unwrap();
        let reply = match (req.method, path.strip_prefix("/users/")) {
            (HttpMethod::Post, None) if path == "/users" => {
                let mut id = next_id.lock().unwrap();
                *id += 1;
                let key = format!("u{id}");
                users.insert(key.clone(), req.body.clone());
                HttpReply::json(201, &json!({"_id": key}))
            }
            (HttpMethod::Put, Some(id)) => match users.get_mut(id) {
                None => HttpReply::json(404, &json!({"error": "no such user"})),
                Some(_) if strict && !valid_update(&req.body) => {
                    HttpReply::json(400, &json!({"error": "invalid body"}))
                }
                Some(user) => {
                    *user = req.body.clone();
                    HttpReply::json(200, user)
                }
            },
            (HttpMethod::Delete, Some(id)) => match users.remove(id) {
                Some(_) => HttpReply::new(204, ""),
                None => HttpReply::new(404, ""),
            },
            _ => HttpReply::new(404, ""),
        };
        Ok(reply)
    })
}

fn user_id() -> ValueSpec {
    ValueSpec::reference(Phase::Predo, Component::Response, "_id")
}

fn suite() -> Suite {
    let predo = CallSpec::new(HttpMethod::Post, "/users")
        .with_body(literal_map(&json!({"name": "ann", "age": 30, "active": true})));
    let test = CallSpec::new(HttpMethod::Put, "/users/<id>")
        .with_url_ids(vec![user_id()])
        .with_body(literal_map(&json!({"name": "bob", "age": 40, "active": false})));
    let undo = CallSpec::new(HttpMethod::Delete, "/users/<id>").with_url_ids(vec![user_id()]);

    Suite::new(
        EndpointSpec::new("http://api", test)
            .with_predo(predo)
            .with_undo(undo),
    )
    .with_field(FieldDescriptor::new("name", FieldType::String))
    .with_field(
        FieldDescriptor::new("age", FieldType::Integer)
            .with_parameters(FieldParameters::default().with_min(18).with_max(120)),
    )
    .with_field(FieldDescriptor::new("active", FieldType::Boolean))
}

#[tokio::test]
async fn strict_service_behaves_as_expected() {
    let users = Users::default();
    let transport = user_service(users.clone(), true);
    let mut runner = Runner::new(suite(), transport.clone());

    let report = runner.run_all().await.unwrap();

    assert!(report.all_passed(), "{:#?}", report.failed_test);
    assert_eq!(report.summary.total_tests, report.summary.expected_tests);
    assert_eq!(report.issues.total(), 0);
    assert!(report.failed_predo.is_empty());
    assert!(report.failed_undo.is_empty());

    let labels: Vec<_> = report.by_field.iter().map(|b| b.field.as_str()).collect();
    assert_eq!(labels, vec!["**general**", "name", "age", "active"]);

    // every created user was removed again
    assert!(users.lock().unwrap().is_empty());

    let sent = transport.sent_requests().await;
    assert!(sent.iter().any(|r| r.url == "http://api/users/u1"));
    assert!(sent.iter().any(|r| r.method == HttpMethod::Delete));
}

#[tokio::test]
async fn lenient_service_is_flagged_per_field() {
    let users = Users::default();
    let mut runner = Runner::new(suite(), user_service(users, false));

    let report = runner.run_all().await.unwrap();
    assert!(!report.all_passed());

    let age = report.by_field.iter().find(|b| b.field == "age").unwrap();
    // null, omitted, three wrong types, below min and above max get through
    assert_eq!(age.summary.total_tests - age.summary.passed_tests, 7);

    let general = &report.by_field[0];
    assert_eq!(general.summary.passed_tests, general.summary.total_tests);

    assert!(report
        .failed_test
        .iter()
        .all(|r| r.test_source == CaseSource::Field && !r.expected_api_success));
    assert_eq!(report.issues.test, report.failed_test.len());
}

#[tokio::test]
async fn report_serializes_for_ci() {
    let users = Users::default();
    let mut runner = Runner::new(suite(), user_service(users, true));
    let report = runner.run_all().await.unwrap();

    let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["tool"], "apiprobe");
    assert_eq!(json["endpoint"], "http://api/users/<id>");
    let first = &json["results"][0];
    assert_eq!(first["test_name"], "acceptable base case");
    assert_eq!(first["predo"]["status"], "predo successful");
    assert_eq!(first["test"]["input"]["url"], "http://api/users/u1");
    assert_eq!(first["undo"]["status_code"], 204);
}
