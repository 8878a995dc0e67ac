use std::collections::HashMap;
use std::time::Duration;

/// Status code recorded when no response was obtained at all.
pub const NO_RESPONSE: i32 = -1;

/// What a transport hands back for one request: the undecoded wire-level
/// view. Duplicate header names are preserved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The finalized result of sending one request copy.
///
/// Created once per dispatch cycle and immutable afterwards. `status` is
/// [`NO_RESPONSE`] exactly when `error` is populated. The header map keys
/// names case-sensitively as received and keeps the last value on duplicate
/// names, a known lossy simplification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseOutcome {
    pub status: i32,
    pub body_length: u64,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl ResponseOutcome {
    /// Empty slot used before a request has been dispatched.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn from_response(raw: &RawResponse, elapsed: Duration) -> Self {
        let mut headers = HashMap::with_capacity(raw.headers.len());
        for (name, value) in &raw.headers {
            headers.insert(name.clone(), value.clone());
        }

        Self {
            status: i32::from(raw.status),
            body_length: raw.body.len() as u64,
            body: decode_body(&raw.body, declared_charset(&raw.headers).as_deref()),
            headers,
            elapsed_ms: elapsed.as_millis() as u64,
            error: None,
        }
    }

    pub fn from_error(message: impl Into<String>, elapsed: Duration) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty());
        Self {
            status: NO_RESPONSE,
            elapsed_ms: elapsed.as_millis() as u64,
            error: Some(message),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

fn declared_charset(headers: &[(String, String)]) -> Option<String> {
    let (_, content_type) = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_owned())
    })
}

/// UTF-8 (lossy) unless the response declares a latin-style single-byte
/// charset, which is decoded bytewise. Windows-1252 is approximated as
/// ISO-8859-1.
fn decode_body(body: &[u8], charset: Option<&str>) -> String {
    let latin = charset.is_some_and(|cs| {
        cs.eq_ignore_ascii_case("iso-8859-1")
            || cs.eq_ignore_ascii_case("latin1")
            || cs.eq_ignore_ascii_case("windows-1252")
    });
    if latin {
        body.iter().map(|&b| b as char).collect()
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_not_an_error() {
        let slot = ResponseOutcome::placeholder();
        assert_eq!(slot.status, 0);
        assert_eq!(slot.body_length, 0);
        assert!(slot.body.is_empty());
        assert!(slot.headers.is_empty());
        assert!(!slot.is_error());
    }

    #[test]
    fn test_from_response_maps_fields() {
        let raw = RawResponse {
            status: 429,
            headers: vec![
                ("Content-Type".into(), "text/plain".into()),
                ("X-RateLimit".into(), "0".into()),
            ],
            body: b"slow down".to_vec(),
        };

        let outcome = ResponseOutcome::from_response(&raw, Duration::from_micros(2500));
        assert_eq!(outcome.status, 429);
        assert_eq!(outcome.body_length, 9);
        assert_eq!(outcome.body, "slow down");
        assert_eq!(outcome.headers.get("X-RateLimit").map(String::as_str), Some("0"));
        assert_eq!(outcome.elapsed_ms, 2);
        assert!(!outcome.is_error());
    }

    #[test]
    fn test_duplicate_header_names_keep_last_value() {
        let raw = RawResponse {
            status: 200,
            headers: vec![
                ("Set-Cookie".into(), "a=1".into()),
                ("Set-Cookie".into(), "b=2".into()),
            ],
            body: Vec::new(),
        };

        let outcome = ResponseOutcome::from_response(&raw, Duration::ZERO);
        assert_eq!(outcome.headers.len(), 1);
        assert_eq!(outcome.headers.get("Set-Cookie").map(String::as_str), Some("b=2"));
    }

    #[test]
    fn test_latin1_body_is_decoded_bytewise() {
        let raw = RawResponse {
            status: 200,
            headers: vec![(
                "Content-Type".into(),
                "text/html; charset=ISO-8859-1".into(),
            )],
            body: vec![0x63, 0x61, 0x66, 0xE9],
        };

        let outcome = ResponseOutcome::from_response(&raw, Duration::ZERO);
        assert_eq!(outcome.body, "café");
        assert_eq!(outcome.body_length, 4);
    }

    #[test]
    fn test_error_outcome_invariant() {
        let outcome = ResponseOutcome::from_error("connection refused", Duration::from_millis(3));
        assert_eq!(outcome.status, NO_RESPONSE);
        assert_eq!(outcome.elapsed_ms, 3);
        assert!(outcome.is_error());
        assert!(!outcome.error.as_deref().unwrap().is_empty());
    }

    #[test]
    fn test_quoted_charset_parameter() {
        let headers = vec![(
            "content-type".into(),
            "text/plain; charset=\"latin1\"".into(),
        )];
        assert_eq!(declared_charset(&headers).as_deref(), Some("latin1"));
    }
}
