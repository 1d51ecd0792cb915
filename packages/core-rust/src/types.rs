use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP method a request arrived with.
///
/// Only the two methods the catalogue protocol binds operations to are
/// representable; anything else is rejected by the transport before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
}

impl HttpVerb {
    /// Canonical upper-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a method other than GET or POST is converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedVerb(pub String);

impl FromStr for HttpVerb {
    type Err = UnsupportedVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Self::Post)
        } else {
            Err(UnsupportedVerb(s.to_string()))
        }
    }
}

impl TryFrom<&http::Method> for HttpVerb {
    type Error = UnsupportedVerb;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        if *method == http::Method::GET {
            Ok(Self::Get)
        } else if *method == http::Method::POST {
            Ok(Self::Post)
        } else {
            Err(UnsupportedVerb(method.as_str().to_string()))
        }
    }
}

/// How a request encodes its operation: flat key-value pairs or an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Key-value pairs from a query string.
    Kvp,
    /// Parsed XML request body.
    StructuredBody,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kvp => f.write_str("KVP"),
            Self::StructuredBody => f.write_str("structured body"),
        }
    }
}

/// A catalogue record as returned by the repository.
///
/// Placeholder shape: carries the core Dublin Core fields the dispatch layer
/// needs to answer `GetRecordById`. Rendering to an output schema happens
/// outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier (`dc:identifier`).
    pub identifier: String,
    /// Human-readable title (`dc:title`).
    pub title: String,
    /// Record type name, e.g. `csw:Record`.
    pub type_name: String,
    /// Optional abstract (`dct:abstract`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#abstract: Option<String>,
    /// Subject keywords (`dc:subject`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl Record {
    /// Creates a `csw:Record` with the given identifier and title.
    #[must_use]
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            type_name: "csw:Record".to_string(),
            r#abstract: None,
            keywords: Vec::new(),
        }
    }
}
