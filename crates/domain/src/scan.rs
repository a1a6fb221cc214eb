use serde_json::Value;

use crate::student::StudentId;

/// Encodes the QR payload embedded in a student credential.
#[must_use]
pub fn encode_scan_payload(id: &StudentId) -> String {
    serde_json::json!({ "id": id.as_str() }).to_string()
}

/// Extracts a student identifier from a decoded scan payload.
///
/// The payload should be the JSON object produced by
/// [`encode_scan_payload`], but decoders hand us whatever the camera saw:
/// anything unparsable, or parsable without an `id` field, falls back to
/// the raw trimmed text as a literal identifier. Scans never hard-fail on
/// input shape; an unknown identifier simply misses the roster.
#[must_use]
pub fn parse_scan_payload(text: &str) -> StudentId {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text)
        && let Some(id) = map.get("id").and_then(Value::as_str)
        && !id.trim().is_empty()
    {
        return StudentId::from_raw(id);
    }

    StudentId::from_raw(text.trim())
}
