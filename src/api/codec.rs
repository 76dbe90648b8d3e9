//! Wire codec between desired-state documents and API bodies.
//!
//! Encoding always emits the destination list as an array of objects.
//! Decoding accepts the two shapes the API has been seen to emit for
//! `destination`: an array of objects, or a single URL string.

use serde_json::value::RawValue;
use tracing::trace;

use crate::config::{Destination, RedirectSpec};
use crate::error::{ApiError, DecodeError};

use super::types::{DestinationRecord, Envelope, RedirectAttributes, RedirectPayload, RemoteRedirect};

/// Encodes a desired state into a create/replace request body.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn encode(spec: &RedirectSpec) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(&RedirectPayload::from_spec(spec)).map_err(|e| ApiError::Encode {
        message: e.to_string(),
    })
}

/// Decodes a response body into the in-memory model.
///
/// # Errors
///
/// Returns an error if the envelope is malformed or the destination field
/// matches neither accepted shape.
pub fn decode(body: &[u8]) -> Result<RemoteRedirect, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(|e| DecodeError::Envelope {
        message: e.to_string(),
    })?;
    let data = envelope.data;

    let destinations = data
        .destination
        .as_deref()
        .map(decode_destination_field)
        .transpose()?;
    let destination_url_only = destinations
        .as_ref()
        .is_some_and(|(_, shape)| *shape == DestinationShape::Url);

    Ok(RemoteRedirect {
        id: data.id.into(),
        attributes: RedirectAttributes {
            sources: data
                .sources
                .map(|sources| sources.into_iter().map(|s| s.into_url()).collect()),
            destinations: destinations.map(|(destinations, _)| destinations),
            redirect_type: data.redirect_type,
            keep_query_string: data.keep_query_string,
            uri_forwarding: data.uri_forwarding,
            tracking: data.tracking,
            tags: data.tags.map(|tags| tags.into_iter().collect()),
            destination_url_only,
        },
        domains: data.domains,
    })
}

/// Decodes the polymorphic `destination` field.
///
/// # Errors
///
/// Returns an error carrying both underlying failures if neither shape matches.
pub fn decode_destinations(raw: &RawValue) -> Result<Vec<Destination>, DecodeError> {
    decode_destination_field(raw).map(|(destinations, _)| destinations)
}

/// Shape the `destination` field arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DestinationShape {
    List,
    Url,
}

fn decode_destination_field(
    raw: &RawValue,
) -> Result<(Vec<Destination>, DestinationShape), DecodeError> {
    match serde_json::from_str::<Vec<DestinationRecord>>(raw.get()) {
        Ok(records) => Ok((
            records.into_iter().map(Destination::from).collect(),
            DestinationShape::List,
        )),
        Err(list_err) => match serde_json::from_str::<String>(raw.get()) {
            Ok(url) => {
                trace!("destination field arrived as a bare string");
                Ok((vec![Destination::new(url)], DestinationShape::Url))
            }
            Err(string_err) => Err(DecodeError::Destination {
                as_list: list_err.to_string(),
                as_string: string_err.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::RedirectId;
    use crate::config::Monitoring;
    use serde_json::json;

    fn sample_spec() -> RedirectSpec {
        RedirectSpec::new(
            ["www.example.com", "example.com"],
            vec![
                Destination::new("https://example.org/en")
                    .with_expression("language == \"en\"")
                    .with_monitoring(Monitoring::Enabled),
                Destination::new("https://example.org/de").with_expression("language == \"de\""),
                Destination::new("https://example.org"),
            ],
        )
        .with_redirect_type("temporary:307")
        .with_tags(["campaign"])
    }

    fn envelope(destination: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "data": {
                "id": 4711,
                "sources": [
                    { "id": 1, "url": "example.com" },
                    { "id": 2, "url": "www.example.com" }
                ],
                "domains": [{
                    "id": 9,
                    "fqdn": "example.com",
                    "is_root_domain": true,
                    "dns": { "verified": false, "required_settings": [{ "type": "A", "value": "1.2.3.4" }] },
                    "security": { "hsts": true, "prevent_foreign_embedding": false },
                    "created_at": "2024-01-02T03:04:05Z",
                    "updated_at": "2024-01-02T03:04:05Z"
                }],
                "destination": destination,
                "redirect_type": "temporary:307",
                "uri_forwarding": false,
                "keep_query_string": false,
                "tracking": true,
                "tags": ["campaign"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_encode_shape() {
        let body = encode(&sample_spec()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["sources"], json!(["example.com", "www.example.com"]));
        assert_eq!(json["merge"], json!(false));
        assert_eq!(json["redirect_type"], json!("temporary:307"));
        assert_eq!(json["tracking"], json!(true));
        assert_eq!(json["tags"], json!(["campaign"]));
        assert_eq!(
            json["destination"],
            json!([
                { "url": "https://example.org/en", "expression": "language == \"en\"", "monitoring": "enabled" },
                { "url": "https://example.org/de", "expression": "language == \"de\"", "monitoring": "inherit" },
                { "url": "https://example.org", "monitoring": "inherit" }
            ])
        );
    }

    #[test]
    fn test_single_destination_is_never_collapsed() {
        let spec = RedirectSpec::new(["example.com"], vec![Destination::new("https://example.org")]);
        let json: serde_json::Value = serde_json::from_slice(&encode(&spec).unwrap()).unwrap();
        assert!(json["destination"].is_array());
    }

    #[test]
    fn test_destinations_round_trip_in_order() {
        let spec = sample_spec();
        let sent: serde_json::Value = serde_json::from_slice(&encode(&spec).unwrap()).unwrap();

        let decoded = decode(&envelope(&sent["destination"])).unwrap();
        assert_eq!(decoded.attributes.destinations, Some(spec.destinations.clone()));
        assert!(decoded.attributes.drift_from(&spec).is_empty());
    }

    #[test]
    fn test_bare_string_destination() {
        let decoded = decode(&envelope(&json!("https://example.com"))).unwrap();
        let destinations = decoded.attributes.destinations.unwrap();

        assert_eq!(destinations.len(), 1);
        assert_eq!(destinations[0].url, "https://example.com");
        assert_eq!(destinations[0].expression, "");
        assert_eq!(destinations[0].monitoring, Monitoring::Inherit);
        assert!(decoded.attributes.destination_url_only);
    }

    #[test]
    fn test_bare_string_echo_is_not_drift() {
        let spec = RedirectSpec::new(
            ["example.com", "www.example.com"],
            vec![Destination::new("https://example.com").with_monitoring(Monitoring::Enabled)],
        )
        .with_redirect_type("temporary:307")
        .with_tags(["campaign"]);

        let decoded = decode(&envelope(&json!("https://example.com"))).unwrap();
        assert!(decoded.attributes.drift_from(&spec).is_empty());

        let moved = decode(&envelope(&json!("https://example.net"))).unwrap();
        assert_eq!(moved.attributes.drift_from(&spec), vec!["destinations"]);
    }

    #[test]
    fn test_destination_matching_neither_shape() {
        let err = decode(&envelope(&json!({ "url": 42 }))).unwrap_err();
        match err {
            DecodeError::Destination { as_list, as_string } => {
                assert!(as_list.contains("invalid type"));
                assert!(as_string.contains("invalid type"));
            }
            other @ DecodeError::Envelope { .. } => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_server_fields() {
        let decoded = decode(&envelope(&json!("https://example.com"))).unwrap();

        assert_eq!(decoded.id, RedirectId::from(4711));
        assert_eq!(
            decoded.attributes.sources.unwrap().into_iter().collect::<Vec<_>>(),
            vec!["example.com", "www.example.com"]
        );
        assert_eq!(decoded.domains.len(), 1);
        assert!(!decoded.domains[0].dns.verified);
        assert_eq!(decoded.domains[0].dns.required_settings[0].record_type, "A");
        assert!(decoded.domains[0].security.hsts);
    }

    #[test]
    fn test_missing_fields_stay_unset() {
        let body = br#"{ "data": { "id": "abc", "tracking": false } }"#;
        let decoded = decode(body).unwrap();

        assert_eq!(decoded.id.as_str(), "abc");
        assert_eq!(decoded.attributes.tracking, Some(false));
        assert!(decoded.attributes.sources.is_none());
        assert!(decoded.attributes.destinations.is_none());
        assert!(decoded.attributes.redirect_type.is_none());
        assert!(decoded.attributes.tags.is_none());
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Envelope { .. })));
        assert!(matches!(
            decode(br#"{ "id": 1 }"#),
            Err(DecodeError::Envelope { .. })
        ));
    }
}
