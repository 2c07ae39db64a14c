//! Transport encoding of extended build information.
//!
//! Wire format:
//!
//! ```text
//! X_BI_KEY_KV_PAIR:base64("KEY1:value1,KEY2:value2,...")
//! ```
//!
//! Values of [`FieldKey::is_wrapped`] keys are base64-encoded individually
//! before joining, so newlines, commas and colons in command output never
//! reach the outer framing.

mod fields;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

pub use fields::{ENVELOPE_KEY, FieldKey, Fields, KEY_PREFIX};

const PAIR_SEPARATOR: char = ',';
const KEY_SEPARATOR: char = ':';

/// Encode `fields` into a single envelope string.
///
/// Unwrapped values containing `,` cannot be framed and are skipped.
#[must_use]
pub fn encode(fields: &Fields) -> String {
    let mut joined = String::new();

    for (key, value) in fields.iter() {
        let value = if key.is_wrapped() {
            STANDARD.encode(value)
        } else if value.contains(PAIR_SEPARATOR) {
            tracing::warn!(key = %key, "skipping field containing ','");
            continue;
        } else {
            value.to_string()
        };

        joined.push_str(key.as_str());
        joined.push(KEY_SEPARATOR);
        joined.push_str(&value);
        joined.push(PAIR_SEPARATOR);
    }

    format!("{ENVELOPE_KEY}{KEY_SEPARATOR}{}", STANDARD.encode(joined))
}

/// Decode an envelope (or a single `key:value` item) into fields.
///
/// Never fails: malformed pieces are dropped and logged, so a corrupted
/// artifact degrades to fewer fields rather than a failed start.
#[must_use]
pub fn decode(input: &str) -> Fields {
    let mut fields = Fields::new();
    decode_into(&mut fields, input);
    fields
}

/// Decode `input` and merge the result into `fields`.
pub fn decode_into(fields: &mut Fields, input: &str) {
    let pieces = match unwrap_envelope(input) {
        Ok(Some(pieces)) => pieces,
        Ok(None) => vec![input.to_string()],
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed envelope");
            return;
        }
    };

    for piece in pieces.iter().filter(|p| !p.is_empty()) {
        match decode_field(piece) {
            Ok((key, value)) => {
                fields.insert(key, value);
            }
            Err(e) => tracing::warn!(error = %e, "dropping malformed field"),
        }
    }
}

/// First pass: if `input` is an envelope, return its comma-separated pieces.
///
/// Returns `Ok(None)` when `input` is a plain item rather than an envelope.
fn unwrap_envelope(input: &str) -> Result<Option<Vec<String>>> {
    let Some((key, payload)) = input.split_once(KEY_SEPARATOR) else {
        return Err(Error::MissingSeparator(input.to_string()));
    };
    if key != ENVELOPE_KEY {
        return Ok(None);
    }

    let joined = decode_base64(key, payload)?;
    Ok(Some(
        joined
            .split(PAIR_SEPARATOR)
            .map(str::to_string)
            .collect(),
    ))
}

/// Second pass: decode one `key:value` piece.
///
/// # Errors
///
/// Fails on a missing separator, an unknown or nested envelope key, or a
/// wrapped value that is not valid base64 UTF-8.
pub fn decode_field(piece: &str) -> Result<(FieldKey, String)> {
    let (key, value) = piece
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| Error::MissingSeparator(piece.to_string()))?;

    if key == ENVELOPE_KEY {
        return Err(Error::NestedEnvelope);
    }
    let key: FieldKey = key.parse()?;

    let value = if key.is_wrapped() {
        decode_base64(key.as_str(), value)?
    } else {
        value.to_string()
    };

    Ok((key, value))
}

fn decode_base64(key: &str, payload: &str) -> Result<String> {
    let bytes = STANDARD.decode(payload).map_err(|source| Error::Encoding {
        key: key.to_string(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| Error::Utf8 {
        key: key.to_string(),
        source,
    })
}
