//! The records API seam and response decoding.

use std::future::Future;

use fra_atlas_core::{AtlasError, ClaimRecord, Result, SearchParams};
use serde_json::Value;
use tracing::warn;

/// Where claim records come from. The HTTP implementation talks to the
/// records API; tests substitute scripted sources.
pub trait ClaimSource: Send + Sync {
    /// The unfiltered claim set (`GET /upload/all`).
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<ClaimRecord>>> + Send;

    /// Claims matching `params` (`GET /search`).
    fn search(&self, params: &SearchParams) -> impl Future<Output = Result<Vec<ClaimRecord>>> + Send;
}

/// Decode a records response: either `{ "results": [...] }` or a bare array.
///
/// Entries that don't decode as a [`ClaimRecord`] are skipped with a warning;
/// only an unrecognized overall shape fails the response.
pub fn decode_claims(body: &[u8]) -> Result<Vec<ClaimRecord>> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AtlasError::decode(format!("invalid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(_) => return Err(AtlasError::decode("'results' is not an array")),
            None => return Err(AtlasError::decode("object without 'results'")),
        },
        _ => return Err(AtlasError::decode("expected an array or an object with 'results'")),
    };

    let total = items.len();
    let records: Vec<ClaimRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<ClaimRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index = idx, error = %e, "Skipping malformed claim record");
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(skipped = total - records.len(), kept = records.len(), "Response had malformed records");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wrapped_and_bare_arrays() {
        let wrapped = br#"{"count": 1, "results": [{"id": 1, "patta_holder_name": "A"}]}"#;
        let bare = br#"[{"id": 2, "patta_holder_name": "B"}]"#;
        assert_eq!(decode_claims(wrapped).unwrap()[0].id, 1);
        assert_eq!(decode_claims(bare).unwrap()[0].id, 2);
    }

    #[test]
    fn null_results_is_empty() {
        assert!(decode_claims(br#"{"results": null}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_records_are_skipped_individually() {
        let body = br#"[{"id": 1}, {"id": "not-a-number"}, {"patta_holder_name": "no id"}, {"id": 4}]"#;
        let records = decode_claims(body).unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn unrecognized_shapes_fail() {
        assert!(matches!(decode_claims(b"<html>"), Err(AtlasError::Decode { .. })));
        assert!(matches!(decode_claims(br#"{"detail": "x"}"#), Err(AtlasError::Decode { .. })));
        assert!(matches!(decode_claims(br#"{"results": 3}"#), Err(AtlasError::Decode { .. })));
        assert!(matches!(decode_claims(b"42"), Err(AtlasError::Decode { .. })));
    }
}
