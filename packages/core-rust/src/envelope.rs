//! Normalized view over an inbound catalogue request.
//!
//! A [`RequestEnvelope`] is built once from transport input ([`RawRequest`])
//! and never mutated afterwards. It exposes either key-value fields (KVP
//! encoding) or an owned XML element tree (structured body encoding).
//! Malformed bodies are rejected at construction time, so everything
//! downstream can assume a well-formed document.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Encoding;

// ---------------------------------------------------------------------------
// RawRequest
// ---------------------------------------------------------------------------

/// Undigested request input as supplied by the transport layer.
#[derive(Debug, Clone)]
pub enum RawRequest {
    /// A raw query string, with or without the leading `?`.
    Query(String),
    /// Already-decoded key-value pairs, in arrival order.
    Pairs(Vec<(String, String)>),
    /// An XML request body.
    Body(Bytes),
}

// ---------------------------------------------------------------------------
// MalformedRequest
// ---------------------------------------------------------------------------

/// A request (or a processor's view of it) lacks what is needed to identify
/// the operation.
///
/// Raised at envelope construction for unparsable bodies, and by schema
/// processors when an envelope does not fit their encoding or misses a
/// required field. The resolver treats the latter as "this candidate does
/// not match" and moves on.
#[derive(Debug, thiserror::Error)]
pub enum MalformedRequest {
    #[error("request body is empty")]
    EmptyBody,
    #[error("request body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("request body is not well-formed XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),
    #[error("expected a {expected} request, got a {actual} request")]
    EncodingMismatch { expected: Encoding, actual: Encoding },
    #[error("missing required {kind} `{name}`")]
    Missing { kind: &'static str, name: &'static str },
    #[error("root element namespace `{actual}` does not match `{expected}`")]
    NamespaceMismatch { expected: String, actual: String },
    #[error("request body nests elements deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Deepest element nesting accepted in a request body. Catalogue requests
/// rarely go beyond a dozen levels; filters are the deepest part.
pub const MAX_ELEMENT_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// XmlElement
// ---------------------------------------------------------------------------

/// Owned copy of one element of a parsed request document.
///
/// Only unqualified attributes are kept; namespaced attributes such as
/// `xsi:schemaLocation` carry nothing the dispatch layer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlElement {
    /// Namespace URI of the element, if any.
    pub namespace: Option<String>,
    /// Local element name.
    pub name: String,
    /// Unqualified attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Concatenated, trimmed direct text content. `None` when blank.
    pub text: Option<String>,
}

impl XmlElement {
    fn from_node(node: roxmltree::Node<'_, '_>, depth: usize) -> Result<Self, MalformedRequest> {
        if depth > MAX_ELEMENT_DEPTH {
            return Err(MalformedRequest::TooDeep {
                limit: MAX_ELEMENT_DEPTH,
            });
        }
        let attributes = node
            .attributes()
            .filter(|attr| attr.namespace().is_none())
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect();

        let children = node
            .children()
            .filter(roxmltree::Node::is_element)
            .map(|child| Self::from_node(child, depth + 1))
            .collect::<Result<_, _>>()?;

        let text: String = node
            .children()
            .filter(roxmltree::Node::is_text)
            .filter_map(|child| child.text())
            .collect();
        let text = text.trim();

        Ok(Self {
            namespace: node.tag_name().namespace().map(str::to_string),
            name: node.tag_name().name().to_string(),
            attributes,
            children,
            text: (!text.is_empty()).then(|| text.to_string()),
        })
    }

    /// Value of the unqualified attribute `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child element with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All child elements with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Trimmed text content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

// ---------------------------------------------------------------------------
// RequestEnvelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Kvp(Vec<(String, String)>),
    Structured(XmlElement),
}

/// Immutable, encoding-tagged view of one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    content: Content,
}

impl RequestEnvelope {
    /// Builds a KVP envelope from decoded pairs.
    ///
    /// Pairs keep their arrival order; when a name repeats, lookups return
    /// the first occurrence.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            content: Content::Kvp(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Builds a KVP envelope from an undecoded query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }

    /// Parses an XML request body.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRequest`] when the body is empty, not UTF-8, nests
    /// deeper than [`MAX_ELEMENT_DEPTH`], or is not well-formed XML.
    pub fn from_xml(body: &[u8]) -> Result<Self, MalformedRequest> {
        let text = std::str::from_utf8(body)?;
        if text.trim().is_empty() {
            return Err(MalformedRequest::EmptyBody);
        }
        // The parser recurses per element, so depth is bounded before it runs.
        check_nesting_depth(text.as_bytes(), MAX_ELEMENT_DEPTH).inspect_err(|e| {
            debug!(error = %e, "rejecting deeply nested request body");
        })?;
        let document = roxmltree::Document::parse(text).inspect_err(|e| {
            debug!(error = %e, "rejecting unparsable request body");
        })?;
        Ok(Self::from_document(XmlElement::from_node(
            document.root_element(),
            1,
        )?))
    }

    /// Wraps an already-parsed document root.
    #[must_use]
    pub fn from_document(root: XmlElement) -> Self {
        Self {
            content: Content::Structured(root),
        }
    }

    /// Which encoding this request uses.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        match self.content {
            Content::Kvp(_) => Encoding::Kvp,
            Content::Structured(_) => Encoding::StructuredBody,
        }
    }

    /// KVP field lookup. Names compare case-insensitively, as the catalogue
    /// protocol's KVP binding requires. Always `None` for structured bodies.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match &self.content {
            Content::Kvp(pairs) => pairs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            Content::Structured(_) => None,
        }
    }

    /// All KVP fields in arrival order. Empty for structured bodies.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        match &self.content {
            Content::Kvp(pairs) => pairs,
            Content::Structured(_) => &[],
        }
    }

    /// Root element of a structured body.
    #[must_use]
    pub fn document(&self) -> Option<&XmlElement> {
        match &self.content {
            Content::Kvp(_) => None,
            Content::Structured(root) => Some(root),
        }
    }

    /// Local name of the root element of a structured body.
    #[must_use]
    pub fn root_element_name(&self) -> Option<&str> {
        self.document().map(|root| root.name.as_str())
    }

    /// Namespace URI of the root element of a structured body.
    #[must_use]
    pub fn root_namespace(&self) -> Option<&str> {
        self.document().and_then(|root| root.namespace.as_deref())
    }

    /// Attribute of the root element of a structured body.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.document().and_then(|root| root.attribute(name))
    }
}

/// Scans markup for element nesting without building a tree.
///
/// Comments, CDATA sections, processing instructions and declarations are
/// skipped; quoted attribute values may contain `>`. Anything the scan cannot
/// make sense of is left for the parser to reject.
fn check_nesting_depth(bytes: &[u8], limit: usize) -> Result<(), MalformedRequest> {
    let find = |from: usize, needle: &[u8]| {
        bytes
            .get(from..)
            .and_then(|rest| rest.windows(needle.len()).position(|w| w == needle))
            .map(|pos| from + pos + needle.len())
    };

    let mut depth = 0usize;
    let mut pos = 0usize;
    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<') {
        let start = pos + offset;
        let rest = &bytes[start..];
        let end = if rest.starts_with(b"<!--") {
            find(start + 4, b"-->")
        } else if rest.starts_with(b"<![CDATA[") {
            find(start + 9, b"]]>")
        } else if rest.starts_with(b"<?") {
            find(start + 2, b"?>")
        } else if rest.starts_with(b"<!") || rest.starts_with(b"</") {
            if rest.starts_with(b"</") {
                depth = depth.saturating_sub(1);
            }
            find(start + 2, b">")
        } else {
            let tag_end = start_tag_end(bytes, start + 1);
            if let Some(end) = tag_end {
                if bytes[end - 2] != b'/' {
                    depth += 1;
                    if depth > limit {
                        return Err(MalformedRequest::TooDeep { limit });
                    }
                }
            }
            tag_end
        };
        let Some(end) = end else {
            break;
        };
        pos = end;
    }
    Ok(())
}

/// Index just past the `>` closing a start tag, honouring quoted values.
fn start_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if b == q => quote = None,
            (None, b'>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

impl TryFrom<RawRequest> for RequestEnvelope {
    type Error = MalformedRequest;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        match raw {
            RawRequest::Query(query) => Ok(Self::from_query(&query)),
            RawRequest::Pairs(pairs) => Ok(Self::from_pairs(pairs)),
            RawRequest::Body(body) => Self::from_xml(&body),
        }
    }
}

// ---------------------------------------------------------------------------
// GeneralRequestInfo
// ---------------------------------------------------------------------------

/// The three facts every schema processor extracts before anything else:
/// which operation, which service, and (optionally) which protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneralRequestInfo {
    pub operation_name: String,
    pub service_name: String,
    pub protocol_version: Option<String>,
}
