// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pending_constructor_sets_type_only() {
    let state = State::pending();
    assert!(state.is_pending());
    assert!(state.name.is_none());
    assert!(state.message.is_none());
    assert!(state.data.is_none());
}

#[test]
fn failed_carries_message_and_payload() {
    let payload = serde_json::json!({"type": "SubmitError", "message": "boom"});
    let state = State::failed("Submission failed.", Some(payload.clone()));
    assert_eq!(state.state_type, StateType::Failed);
    assert_eq!(state.message.as_deref(), Some("Submission failed."));
    assert_eq!(state.data, Some(payload));
}

#[yare::parameterized(
    completed = { StateType::Completed, true },
    failed = { StateType::Failed, true },
    cancelled = { StateType::Cancelled, true },
    crashed = { StateType::Crashed, true },
    scheduled = { StateType::Scheduled, false },
    pending = { StateType::Pending, false },
    running = { StateType::Running, false },
)]
fn finality(state_type: StateType, is_final: bool) {
    assert_eq!(State::new(state_type).is_final(), is_final);
}

#[test]
fn type_field_serializes_screaming() {
    let json = serde_json::to_value(State::pending()).unwrap();
    assert_eq!(json["type"], "PENDING");
}

#[test]
fn display_matches_wire_form() {
    assert_eq!(StateType::Running.to_string(), "RUNNING");
}

#[test]
fn deserializes_without_optional_fields() {
    let state: State = serde_json::from_value(serde_json::json!({
        "type": "SCHEDULED",
        "timestamp": "2026-01-01T00:00:00Z",
    }))
    .unwrap();
    assert!(state.is_scheduled());
    assert!(state.message.is_none());
}
