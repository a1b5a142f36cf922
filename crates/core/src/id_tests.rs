// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::flow_run::FlowRunId;
use std::str::FromStr;

#[test]
fn new_ids_are_unique() {
    let a = FlowRunId::new();
    let b = FlowRunId::new();
    assert_ne!(a, b);
}

#[test]
fn display_round_trips_through_from_str() {
    let id = FlowRunId::new();
    let parsed = FlowRunId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn serializes_as_bare_uuid() {
    let id = FlowRunId::new();
    let json = serde_json::to_value(id).unwrap();
    assert_eq!(json, serde_json::Value::String(id.to_string()));
}

#[test]
fn rejects_malformed_input() {
    assert!(FlowRunId::from_str("not-a-uuid").is_err());
}
