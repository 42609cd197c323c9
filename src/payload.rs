//! Turns whatever a scanner produced into the key used to look up a
//! roster member.
//!
//! Badges either print a bare external id (`S100`) or a JSON record
//! that embeds it (`{"idno":"S100","name":"Jane Doe"}`). Anything that
//! is not a JSON object carrying an `idno` field is used verbatim, so
//! resolution never fails.
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Field of a structured payload holding the external id.
pub const IDENTIFIER_FIELD: &str = "idno";

#[derive(Debug, Clone, PartialEq)]
pub enum ScanPayload<'a> {
    Structured {
        raw: &'a str,
        fields: Map<String, Value>,
    },
    Raw(&'a str),
}

impl<'a> ScanPayload<'a> {
    #[must_use]
    pub fn parse(input: &'a str) -> Self {
        match serde_json::from_str::<Value>(input) {
            Ok(Value::Object(fields)) => Self::Structured { raw: input, fields },
            _ => Self::Raw(input),
        }
    }

    #[must_use]
    pub fn raw(&self) -> &'a str {
        match self {
            Self::Structured { raw, .. } | Self::Raw(raw) => *raw,
        }
    }

    /// Canonical lookup key of this payload, falling back to the raw
    /// input when there is no usable identifier field.
    #[must_use]
    pub fn canonical_key(&self) -> Cow<'a, str> {
        let Self::Structured { raw, fields } = self else {
            return Cow::Borrowed(self.raw());
        };

        match fields.get(IDENTIFIER_FIELD) {
            Some(Value::String(id)) => Cow::Owned(id.clone()),
            Some(Value::Number(id)) if id.is_i64() || id.is_u64() => Cow::Owned(id.to_string()),
            _ => Cow::Borrowed(*raw),
        }
    }
}

/// Shorthand for `ScanPayload::parse(input).canonical_key()`.
#[must_use]
pub fn resolve(input: &str) -> Cow<'_, str> {
    ScanPayload::parse(input).canonical_key()
}
