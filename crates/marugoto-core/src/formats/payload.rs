//! # Payload Format
//!
//! The flat, addressable wire representation of a content graph.
//!
//! ```text
//! {
//!   "version": 1,
//!   "roots":   ["<uid>"],
//!   "records": [
//!     { "id": "<uid>", "kind": "waypoint",
//!       "fields": { "destinations": [{"ref": "<uid>"}], "name": "start", ... } }
//!   ]
//! }
//! ```
//!
//! Field values are scalars, references (`{"ref": id}`) or flat lists of
//! either. Field maps are `BTreeMap`s, so the JSON bytes of a payload are a
//! pure function of its records.
//!
//! ## Errors
//!
//! Text that is not JSON, or whose envelope (`version`, `roots`, `records`,
//! record `id`/`kind`/`fields`) is malformed, is a `SerializationError`. A
//! well-formed record whose field value is none of the shapes above (e.g.
//! `{"nested": 1}` or `[[1]]`) is a `SchemaViolation` naming that record.
//!
//! ## Security
//!
//! `Payload::from_json` validates the input size before parsing and the
//! version and record count right after, before anything is decoded.

use crate::MarugotoError;
use crate::primitives::{FORMAT_VERSION, MAX_PAYLOAD_BYTES, MAX_PAYLOAD_RECORDS};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// FIELD VALUES
// =============================================================================

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Text scalar from anything string-like.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// `Null` for `None`, `Text` otherwise.
    pub fn optional_text(value: Option<&str>) -> Self {
        value.map_or(Self::Null, Self::text)
    }
}

/// A reference to another record of the same payload.
///
/// Deserializes from a `{"ref": id}` map only, never from a sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Reference {
    /// Identity of the referenced record.
    #[serde(rename = "ref")]
    pub target: String,
}

impl Reference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReferenceVisitor;

        impl<'de> Visitor<'de> for ReferenceVisitor {
            type Value = Reference;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a reference object {\"ref\": id}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Reference, A::Error> {
                let mut target: Option<String> = None;
                while let Some(key) = map.next_key::<String>()? {
                    if key != "ref" {
                        return Err(de::Error::unknown_field(&key, &["ref"]));
                    }
                    if target.is_some() {
                        return Err(de::Error::duplicate_field("ref"));
                    }
                    target = Some(map.next_value()?);
                }
                target
                    .map(Reference::new)
                    .ok_or_else(|| de::Error::missing_field("ref"))
            }
        }

        deserializer.deserialize_map(ReferenceVisitor)
    }
}

/// One element of a list field.
///
/// `R` is the reference representation: `NodeId` in memory, `Reference` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item<R> {
    Ref(R),
    Scalar(Scalar),
}

/// A field value: scalar, reference, or flat list of either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field<R> {
    Ref(R),
    List(Vec<Item<R>>),
    Scalar(Scalar),
}

impl<R> Field<R> {
    /// Convert every reference with `f`, keeping scalars and list shape.
    pub fn try_map<S, E>(self, mut f: impl FnMut(R) -> Result<S, E>) -> Result<Field<S>, E> {
        Ok(match self {
            Field::Ref(r) => Field::Ref(f(r)?),
            Field::Scalar(s) => Field::Scalar(s),
            Field::List(items) => Field::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Item::Ref(r) => f(r).map(Item::Ref),
                        Item::Scalar(s) => Ok(Item::Scalar(s)),
                    })
                    .collect::<Result<_, E>>()?,
            ),
        })
    }

    /// References carried by this field, in order.
    pub fn references(&self) -> Vec<&R> {
        match self {
            Field::Ref(r) => vec![r],
            Field::Scalar(_) => Vec::new(),
            Field::List(items) => items
                .iter()
                .filter_map(|item| match item {
                    Item::Ref(r) => Some(r),
                    Item::Scalar(_) => None,
                })
                .collect(),
        }
    }
}

// =============================================================================
// RECORDS & PAYLOAD
// =============================================================================

/// One flat record: a node's identity, kind tag and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub kind: String,
    pub fields: BTreeMap<String, Field<Reference>>,
}

/// The ordered record sequence produced by the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Format version for compatibility.
    pub version: u8,
    /// Identities of the encoded roots, in the order they were given.
    pub roots: Vec<String>,
    /// One record per distinct reachable node, in first-visit order.
    pub records: Vec<Record>,
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl Payload {
    /// The payload of an absent root.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: FORMAT_VERSION,
            roots: Vec::new(),
            records: Vec::new(),
        }
    }

    /// True when no root was encoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.records.is_empty()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Find a record by identity.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Number of records carrying the given kind tag.
    #[must_use]
    pub fn count_kind(&self, kind: &str) -> usize {
        self.records.iter().filter(|record| record.kind == kind).count()
    }

    /// Compact JSON text.
    pub fn to_json(&self) -> Result<String, MarugotoError> {
        serde_json::to_string(self).map_err(|e| MarugotoError::SerializationError(e.to_string()))
    }

    /// Indented JSON text, for files meant to be read by people.
    pub fn to_json_pretty(&self) -> Result<String, MarugotoError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MarugotoError::SerializationError(e.to_string()))
    }

    /// Parse and validate JSON text.
    ///
    /// Validates, in order:
    /// 1. Maximum input size (before any parsing)
    /// 2. Envelope shape
    /// 3. Format version
    /// 4. Maximum record count
    /// 5. Field value shapes
    pub fn from_json(text: &str) -> Result<Self, MarugotoError> {
        if text.len() > MAX_PAYLOAD_BYTES {
            return Err(MarugotoError::SerializationError(format!(
                "Payload size {} bytes exceeds maximum allowed {} bytes",
                text.len(),
                MAX_PAYLOAD_BYTES
            )));
        }

        let envelope: Envelope = serde_json::from_str(text).map_err(|e| {
            MarugotoError::SerializationError(format!("Failed to parse payload: {}", e))
        })?;
        let mut payload = Payload {
            version: envelope.version,
            roots: envelope.roots,
            records: Vec::new(),
        };
        payload.validate_counts(envelope.records.len())?;
        payload.records = envelope
            .records
            .into_iter()
            .map(RawRecord::into_record)
            .collect::<Result<_, _>>()?;
        Ok(payload)
    }

    /// Check version and size limits.
    pub fn validate(&self) -> Result<(), MarugotoError> {
        self.validate_counts(self.records.len())
    }

    fn validate_counts(&self, records: usize) -> Result<(), MarugotoError> {
        if self.version != FORMAT_VERSION {
            return Err(MarugotoError::SerializationError(format!(
                "Unsupported payload version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        if records > MAX_PAYLOAD_RECORDS {
            return Err(MarugotoError::SerializationError(format!(
                "Payload holds {} records, maximum is {}",
                records, MAX_PAYLOAD_RECORDS
            )));
        }
        Ok(())
    }
}

/// Payload with field values not yet checked against the field shapes.
#[derive(Deserialize)]
struct Envelope {
    version: u8,
    roots: Vec<String>,
    records: Vec<RawRecord>,
}

#[derive(Deserialize)]
struct RawRecord {
    id: String,
    kind: String,
    fields: BTreeMap<String, serde_json::Value>,
}

impl RawRecord {
    fn into_record(self) -> Result<Record, MarugotoError> {
        let mut fields = BTreeMap::new();
        for (name, value) in self.fields {
            let field = serde_json::from_value::<Field<Reference>>(value).map_err(|_| {
                MarugotoError::schema(
                    &self.id,
                    format!("field '{}' is not a scalar, a reference or a flat list", name),
                )
            })?;
            fields.insert(name, field);
        }
        Ok(Record {
            id: self.id,
            kind: self.kind,
            fields,
        })
    }
}

/// BLAKE3 digest of the canonical (compact JSON) payload bytes, hex encoded.
#[cfg(feature = "crypto-hash")]
pub fn payload_digest(payload: &Payload) -> Result<String, MarugotoError> {
    let text = payload.to_json()?;
    Ok(blake3::hash(text.as_bytes()).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
