use chrono::{TimeZone, Utc};
use serde_json::Value;

use super::*;
use crate::schema::FIELDS;

fn populated_record() -> AccessRecord {
    AccessRecord {
        time: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        client_time: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 52).unwrap(),
        region: "eu-west".into(),
        location: "dub-1".into(),
        host: "api.example.com".into(),
        method: "POST".into(),
        request_uri: "/v2/orders".into(),
        version: "HTTP/1.1".into(),
        remote_addr: "203.0.113.7".into(),
        content_length: 512,
        os: "Linux".into(),
        browser: "Firefox".into(),
        country: "Ireland".into(),
        city: "Dublin".into(),
        latitude: 53.3498,
        longitude: -6.2603,
        eu_member: true,
        duration_us: 18_345,
        db_duration_us: 2_101,
        user: "alice".into(),
        user_agent: "Mozilla/5.0".into(),
        source: Some("web".into()),
        target: Some("orders".into()),
        params: Some(r#"{"page":1}"#.into()),
        status: 201,
        response: None,
        response_length: 274,
        error: None,
    }
}

#[test]
fn default_record_has_zero_values() {
    let record = AccessRecord::default();
    assert_eq!(record.host, "");
    assert_eq!(record.status, 0);
    assert_eq!(record.content_length, 0);
    assert_eq!(record.latitude, 0.0);
    assert!(!record.eu_member);
    assert_eq!(record.response, None);
    assert_eq!(record.time, chrono::DateTime::<Utc>::default());
}

#[test]
fn json_round_trip_preserves_every_field() {
    let record = populated_record();
    let json = serde_json::to_string(&record).expect("serialize");
    let parsed: AccessRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, record);
}

#[test]
fn json_round_trip_of_default_record() {
    let record = AccessRecord::default();
    let json = serde_json::to_string(&record).expect("serialize");
    let parsed: AccessRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, record);
}

#[test]
fn serialized_keys_match_declared_schema() {
    let value = serde_json::to_value(AccessRecord::default()).expect("serialize");
    let Value::Object(map) = value else {
        panic!("record must serialize to a JSON object");
    };

    assert_eq!(map.len(), FIELDS.len());
    for field in FIELDS {
        assert!(map.contains_key(field.name), "missing field {}", field.name);
    }
}

#[test]
fn nullable_fields_serialize_as_null_when_absent() {
    let value = serde_json::to_value(AccessRecord::default()).expect("serialize");
    assert_eq!(value["response"], Value::Null);
    assert_eq!(value["error"], Value::Null);
    assert_eq!(value["status"], Value::from(0));
}
