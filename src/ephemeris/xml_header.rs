//! Serde model of the XEPH XML header.
//!
//! The header is a small XML document placed right after the binary
//! signature:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <xeph version="1.0">
//!    <Metadata>
//!       <CreationTime>2460000.5</CreationTime>
//!       <CreatorApplication>xeph 0.1.0</CreatorApplication>
//!    </Metadata>
//!    <TimeSpan start="2451545.0" end="2451560.0"/>
//!    <Constants>AU=149597870.7,
//! EMRAT=81.30056</Constants>
//!    <Object id="Ea" origin="SSB" name="Earth">
//!       <Index order="0" position="1024" numberOfExpansions="2"/>
//!    </Object>
//! </xeph>
//! ```
//!
//! Unknown elements and attributes are ignored when reading. The documents
//! are (de)serialized with `quick_xml`'s serde support; semantic validation
//! happens in [`super::ephemeris_file`] and [`super::serializer`].
use serde::{Deserialize, Serialize};

use crate::xeph_errors::XephError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "xeph")]
pub(crate) struct XephDocument {
    #[serde(rename = "@version", default)]
    pub(crate) version: String,

    #[serde(
        rename = "Metadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) metadata: Option<MetadataElement>,

    #[serde(
        rename = "TimeSpan",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) time_span: Option<TimeSpanElement>,

    #[serde(
        rename = "Constants",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) constants: Option<String>,

    #[serde(rename = "Object", default)]
    pub(crate) objects: Vec<ObjectElement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MetadataElement {
    #[serde(rename = "CreationTime", default, skip_serializing_if = "Option::is_none")]
    pub(crate) creation_time: Option<String>,
    #[serde(rename = "CreatorOS", default, skip_serializing_if = "Option::is_none")]
    pub(crate) creator_os: Option<String>,
    #[serde(rename = "CreatorApplication", default, skip_serializing_if = "Option::is_none")]
    pub(crate) creator_application: Option<String>,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,
    #[serde(rename = "BriefDescription", default, skip_serializing_if = "Option::is_none")]
    pub(crate) brief_description: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(rename = "OrganizationName", default, skip_serializing_if = "Option::is_none")]
    pub(crate) organization_name: Option<String>,
    #[serde(rename = "Authors", default, skip_serializing_if = "Option::is_none")]
    pub(crate) authors: Option<String>,
    #[serde(rename = "Copyright", default, skip_serializing_if = "Option::is_none")]
    pub(crate) copyright: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TimeSpanElement {
    #[serde(rename = "@start", default)]
    pub(crate) start: String,
    #[serde(rename = "@end", default)]
    pub(crate) end: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ObjectElement {
    #[serde(rename = "@id", default)]
    pub(crate) id: String,
    #[serde(rename = "@origin", default)]
    pub(crate) origin: String,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(rename = "@H", default, skip_serializing_if = "Option::is_none")]
    pub(crate) h: Option<f64>,
    #[serde(rename = "@G", default, skip_serializing_if = "Option::is_none")]
    pub(crate) g: Option<f64>,
    #[serde(rename = "@BV", default, skip_serializing_if = "Option::is_none")]
    pub(crate) b_v: Option<f64>,
    #[serde(rename = "@D", default, skip_serializing_if = "Option::is_none")]
    pub(crate) d: Option<f64>,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,

    #[serde(rename = "Index", default)]
    pub(crate) indexes: Vec<IndexElement>,
}

/// One `<Index>` element: where the binary nodes of one derivative order live.
///
/// Only `order`, `position` and `numberOfExpansions` are read back; the other
/// attributes are informative summaries written by the serializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct IndexElement {
    #[serde(rename = "@order", default)]
    pub(crate) order: i64,
    #[serde(rename = "@position", default, skip_serializing_if = "Option::is_none")]
    pub(crate) position: Option<u64>,
    #[serde(
        rename = "@numberOfExpansions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) number_of_expansions: Option<i64>,
    #[serde(
        rename = "@smallestTimeSpan",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) smallest_time_span: Option<f64>,
    #[serde(
        rename = "@largestTimeSpan",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) largest_time_span: Option<f64>,
    #[serde(rename = "@dimensions", default, skip_serializing_if = "Option::is_none")]
    pub(crate) dimensions: Option<usize>,
    #[serde(
        rename = "@largestTruncationErrors",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) largest_truncation_errors: Option<String>,
    #[serde(
        rename = "@totalCoefficients",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) total_coefficients: Option<usize>,
}

impl XephDocument {
    pub(crate) fn parse(text: &str) -> Result<Self, XephError> {
        quick_xml::de::from_str(text).map_err(|e| XephError::XmlParse(e.to_string()))
    }

    /// Serialize to a complete header: XML declaration, comment and root element.
    pub(crate) fn to_xml(&self, comment: &str) -> Result<String, XephError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 3);
        self.serialize(serializer)
            .map_err(|e| XephError::XmlSerialize(e.to_string()))?;

        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!--{comment}-->\n{body}\n"
        ))
    }
}

/// Break a `Constants` element text into `(name, value)` text pairs.
///
/// Items are separated by commas, name and value by `=`; whitespace around
/// both is ignored.
pub(crate) fn parse_constants(text: &str) -> Result<Vec<(String, f64)>, XephError> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let tokens: Vec<&str> = item.split('=').map(str::trim).collect();
            if tokens.len() != 2 {
                return Err(XephError::InvalidHeader(format!(
                    "invalid ephemeris constant specification '{item}'"
                )));
            }
            if tokens[0].is_empty() {
                return Err(XephError::InvalidHeader(format!(
                    "empty ephemeris constant name: '{item}'"
                )));
            }
            if tokens[1].is_empty() {
                return Err(XephError::InvalidHeader(format!(
                    "missing value of ephemeris constant '{}'",
                    tokens[0]
                )));
            }
            let value = tokens[1].parse::<f64>().map_err(|_| {
                XephError::InvalidHeader(format!(
                    "invalid value of ephemeris constant '{}': '{}'",
                    tokens[0], tokens[1]
                ))
            })?;
            Ok((tokens[0].to_string(), value))
        })
        .collect()
}

/// Text form of a constant value that parses back to the same `f64`.
pub(crate) fn format_constant_value(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 || (1e-5..1e16).contains(&magnitude) {
        format!("{value}")
    } else {
        format!("{value:e}")
    }
}
