//! Endpoint wrappers.
//!
//! Each wrapper only knows its path, query shape, header profile and
//! unwrap key. Everything else goes through `GhlClient::send`.

mod contacts;
mod conversations;
mod locations;

use serde::Serialize;

/// Request body with the client's `locationId` added alongside the
/// caller's fields.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationScoped<'a, T: Serialize> {
    location_id: &'a str,
    #[serde(flatten)]
    inner: &'a T,
}
