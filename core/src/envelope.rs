//! JSON form of the result envelope.
//!
//! `{"ok": true, "value": ...}` on success,
//! `{"ok": false, "kind": ..., "httpStatus": ..., "message": ..., "details": ...}`
//! on failure.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiFailure;

#[derive(Serialize)]
struct FailureEnvelope<'a> {
    ok: bool,
    #[serde(flatten)]
    failure: &'a ApiFailure,
}

pub fn to_envelope<T: Serialize>(result: &Result<T, ApiFailure>) -> Value {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => json!({ "ok": true, "value": value }),
            Err(e) => failure_envelope(&ApiFailure::encode(e)),
        },
        Err(failure) => failure_envelope(failure),
    }
}

fn failure_envelope(failure: &ApiFailure) -> Value {
    serde_json::to_value(FailureEnvelope { ok: false, failure }).unwrap_or_else(|_| {
        json!({ "ok": false, "kind": failure.kind, "message": failure.message })
    })
}
