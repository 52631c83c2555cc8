//! Dataset records and their catalog payload form.
//!
//! A [`DatasetRecord`] is the in-memory shape of one country's dataset.
//! It only becomes a catalog payload at the boundary, through
//! [`DatasetRecord::to_payload`], where the single [`LabelStyle`] policy
//! decides how groups and tags are written.

pub mod builder;
pub mod urls;

pub use builder::{build_record, BuildOutcome, BuildSettings, DatasetDefaults, ProxySettings};

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::SyncError;
use crate::hxl::{HxlRow, TagPattern};

/// A JSON object as exchanged with the catalog.
pub type JsonObject = serde_json::Map<String, Value>;

/// Prefix for every dataset identifier.
pub const IDENTIFIER_PREFIX: &str = "ngoaidmap-";

/// Canonical dataset identifier for an M49 code.
pub fn dataset_identifier(m49_code: &str) -> String {
    format!("{}{}", IDENTIFIER_PREFIX, m49_code.to_lowercase())
}

/// Output format of a downloadable resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceFormat {
    Csv,
    Xls,
    Kml,
    Json,
}

impl ResourceFormat {
    /// Lowercase name used in URLs and the catalog `format` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xls => "xls",
            Self::Kml => "kml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ResourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How group and tag lists are written into catalog payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// `["ken", "3w"]`
    Bare,
    /// `[{"name": "ken"}, {"name": "3w"}]`
    #[default]
    Object,
}

/// A single downloadable file attached to a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: String,
    pub description: String,
    pub url: String,
    pub format: ResourceFormat,
}

/// One country's dataset, ready to be pushed to the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatasetRecord {
    /// Stable identifier; the upsert key.
    pub name: String,
    pub title: String,
    pub notes: String,
    pub dataset_source: String,
    pub owner_org: String,
    pub private: bool,
    pub maintainer: String,
    pub package_creator: String,
    pub license_id: String,
    pub methodology: String,
    pub data_update_frequency: String,
    pub dataset_date: String,
    pub caveats: String,
    #[serde(skip)]
    pub groups: Vec<String>,
    #[serde(skip)]
    pub tags: Vec<String>,
    pub resources: Vec<Resource>,
}

impl DatasetRecord {
    /// The identifier this record is synchronised under.
    pub fn identifier(&self) -> &str {
        &self.name
    }

    /// Encode the record as a catalog payload.
    pub fn to_payload(&self, style: LabelStyle) -> Result<JsonObject, SyncError> {
        let payload = Payload {
            record: self,
            groups: Labels {
                names: &self.groups,
                style,
            },
            tags: Labels {
                names: &self.tags,
                style,
            },
        };

        let encode_error = |source| SyncError::PayloadEncode {
            identifier: self.name.clone(),
            source,
        };
        match serde_json::to_value(payload).map_err(encode_error)? {
            Value::Object(map) => Ok(map),
            other => Err(SyncError::PayloadShape {
                identifier: self.name.clone(),
                message: format!("encoded as {other}"),
            }),
        }
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(flatten)]
    record: &'a DatasetRecord,
    groups: Labels<'a>,
    tags: Labels<'a>,
}

struct Labels<'a> {
    names: &'a [String],
    style: LabelStyle,
}

#[derive(Serialize)]
struct NamedLabel<'a> {
    name: &'a str,
}

impl Serialize for Labels<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.names.len()))?;
        for name in self.names {
            match self.style {
                LabelStyle::Bare => seq.serialize_element(name)?,
                LabelStyle::Object => seq.serialize_element(&NamedLabel { name })?,
            }
        }
        seq.end()
    }
}

/// Tag patterns used to pull country fields out of an HXL row.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RowTags {
    pub country_name: TagPattern,
    pub m49_code: TagPattern,
    pub interaction_code: TagPattern,
}

impl Default for RowTags {
    fn default() -> Self {
        Self {
            country_name: TagPattern::from_parts("country", &["name", "interaction"]),
            m49_code: TagPattern::from_parts("country", &["code", "m49"]),
            interaction_code: TagPattern::from_parts("country", &["code", "interaction"]),
        }
    }
}

/// The country fields of one input row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountryRow {
    pub country_name: Option<String>,
    pub m49_code: Option<String>,
    pub interaction_code: Option<String>,
}

impl CountryRow {
    /// Extract the country fields from an HXL row. Empty cells become `None`.
    pub fn from_hxl(row: &HxlRow, tags: &RowTags) -> Self {
        let field = |pattern: &TagPattern| row.get(pattern).map(str::to_string);
        Self {
            country_name: field(&tags.country_name),
            m49_code: field(&tags.m49_code),
            interaction_code: field(&tags.interaction_code),
        }
    }

    /// Convenience constructor, mostly for tests.
    pub fn new(country_name: &str, m49_code: &str, interaction_code: &str) -> Self {
        let present = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        Self {
            country_name: present(country_name),
            m49_code: present(m49_code),
            interaction_code: present(interaction_code),
        }
    }
}
