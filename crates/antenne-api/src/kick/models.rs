// Kick channel payloads
//
// Only the fields the relay reasons about are typed; everything else the
// API sends is kept in `extra` so nothing is silently dropped. Descriptive
// fields decode leniently: a type change there must not turn a live
// stream into a parse failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decode `T`, reading a value of any other shape as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode the `is_live` flag from a boolean or its string form.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => s
            .trim()
            .to_ascii_lowercase()
            .parse::<bool>()
            .map(Some)
            .map_err(D::Error::custom),
    }
}

/// Response body of `GET /api/v1/channels/{slug}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u64>,

    #[serde(default, deserialize_with = "lenient")]
    pub slug: Option<String>,

    /// Current livestream record. `null` or absent when offline.
    #[serde(default)]
    pub livestream: Option<Livestream>,
}

impl ChannelResponse {
    /// Whether the payload describes an active livestream.
    ///
    /// A record without an explicit `is_live` flag counts as live; an
    /// explicit `false` or a missing record counts as offline.
    pub fn is_live(&self) -> bool {
        self.livestream.as_ref().is_some_and(Livestream::is_active)
    }
}

/// A livestream record attached to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Livestream {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<u64>,

    #[serde(default, deserialize_with = "lenient")]
    pub session_title: Option<String>,

    #[serde(default, deserialize_with = "flag")]
    pub is_live: Option<bool>,

    #[serde(default, deserialize_with = "lenient")]
    pub viewer_count: Option<u64>,

    /// All remaining fields the API sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Livestream {
    pub fn is_active(&self) -> bool {
        self.is_live.unwrap_or(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ChannelResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_livestream_is_offline() {
        assert!(!parse(json!({ "slug": "triskel" })).is_live());
    }

    #[test]
    fn null_livestream_is_offline() {
        assert!(!parse(json!({ "slug": "triskel", "livestream": null })).is_live());
    }

    #[test]
    fn explicit_flag_wins() {
        let on = parse(json!({ "livestream": { "is_live": true } }));
        let off = parse(json!({ "livestream": { "is_live": false } }));
        assert!(on.is_live());
        assert!(!off.is_live());
    }

    #[test]
    fn record_without_flag_counts_as_live() {
        let resp = parse(json!({
            "livestream": { "id": 42, "session_title": "late night", "viewer_count": 12 }
        }));
        assert!(resp.is_live());
        let stream = resp.livestream.unwrap();
        assert_eq!(stream.session_title.as_deref(), Some("late night"));
        assert_eq!(stream.viewer_count, Some(12));
    }

    #[test]
    fn unexpected_field_types_do_not_hide_a_live_stream() {
        let resp = parse(json!({
            "id": "668",
            "livestream": {
                "id": "99",
                "session_title": 7,
                "viewer_count": "1.2k",
                "is_live": true
            }
        }));
        assert!(resp.is_live());
        assert_eq!(resp.id, None);
        let stream = resp.livestream.unwrap();
        assert_eq!(stream.id, None);
        assert_eq!(stream.session_title, None);
        assert_eq!(stream.viewer_count, None);
    }

    #[test]
    fn string_flag_is_read() {
        assert!(!parse(json!({ "livestream": { "is_live": "false" } })).is_live());
        assert!(parse(json!({ "livestream": { "is_live": "True" } })).is_live());
    }

    #[test]
    fn unknown_fields_are_kept() {
        let resp = parse(json!({
            "livestream": { "is_live": true, "language": "fr" }
        }));
        let stream = resp.livestream.unwrap();
        assert_eq!(stream.extra["language"], "fr");
    }
}
