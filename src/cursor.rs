//! Cursor codecs.
//!
//! A cursor is an opaque, URL-safe token naming the position of the last
//! event on a page. Each backend owns its codec and its position type; the
//! shared envelope is `base64url("<tag>|<body>")`, where the tag identifies
//! the backend kind so a token minted elsewhere fails to decode.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::interfaces::{Result, StorageError};
use crate::model::{EventId, OrderingKey};

/// Encodes a backend scan position into a token and back.
pub trait CursorCodec {
    /// Position the cursor resumes from.
    type Position;

    fn encode(&self, position: &Self::Position) -> String;

    /// Fails with [`StorageError::InvalidCursor`] for tokens this codec did
    /// not mint.
    fn decode(&self, token: &str) -> Result<Self::Position>;
}

/// Wrap a body in the tagged envelope.
pub(crate) fn seal(tag: &str, body: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}|{}", tag, body))
}

/// Open a tagged envelope, returning the body.
pub(crate) fn open(tag: &str, token: &str) -> Result<String> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| invalid(token, "not base64url"))?;
    let raw = String::from_utf8(raw).map_err(|_| invalid(token, "not utf-8"))?;

    match raw.split_once('|') {
        Some((found, body)) if found == tag => Ok(body.to_string()),
        Some((found, _)) => Err(invalid(
            token,
            &format!("minted by backend '{}', expected '{}'", found, tag),
        )),
        None => Err(invalid(token, "missing backend tag")),
    }
}

/// Split a `first|second` body.
pub(crate) fn split_pair<'a>(token: &str, body: &'a str) -> Result<(&'a str, &'a str)> {
    body.split_once('|')
        .ok_or_else(|| invalid(token, "malformed position"))
}

/// Body for a sequential-id ordering key: nanosecond RFC 3339 instant and id.
pub(crate) fn key_body(key: &OrderingKey) -> String {
    format!("{}|{}", key.at.to_rfc3339_opts(SecondsFormat::Nanos, true), key.id)
}

/// Parse a [`key_body`] back into an ordering key.
pub(crate) fn parse_key(token: &str, body: &str) -> Result<OrderingKey> {
    let (at, id) = split_pair(token, body)?;
    let at = DateTime::parse_from_rfc3339(at)
        .map_err(|_| invalid(token, "bad instant"))?
        .with_timezone(&Utc);
    let id = id
        .parse::<u64>()
        .map_err(|_| invalid(token, "bad identifier"))?;
    Ok(OrderingKey::new(at, EventId::Seq(id)))
}

pub(crate) fn invalid(token: &str, reason: &str) -> StorageError {
    StorageError::InvalidCursor(format!("{:?}: {}", token, reason))
}
