use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Namespace of CSW 2.0.2 request and response documents.
pub const CSW_202_NAMESPACE: &str = "http://www.opengis.net/cat/csw/2.0.2";
/// Namespace of OWS common elements (`Sections`, `AcceptVersions`, ...).
pub const OWS_NAMESPACE: &str = "http://www.opengis.net/ows";

/// Output schema a schema processor targets: its namespace, the record type
/// names it serves, how queryables map onto repository fields, and which
/// element set names it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    pub namespace: String,
    /// Record type names in declaration order.
    pub type_names: Vec<String>,
    /// Queryable name -> repository field.
    pub record_mapping: BTreeMap<String, String>,
    /// Accepted `ElementSetName` values. Empty means unrestricted.
    pub element_set_names: BTreeSet<String>,
}

impl SchemaSettings {
    /// Settings for the CSW 2.0.2 `csw:Record` schema.
    #[must_use]
    pub fn csw_record() -> Self {
        let record_mapping = [
            ("dc:identifier", "identifier"),
            ("dc:title", "title"),
            ("dc:type", "type_name"),
            ("dct:abstract", "abstract"),
            ("dc:subject", "keywords"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            namespace: CSW_202_NAMESPACE.to_string(),
            type_names: vec!["csw:Record".to_string()],
            record_mapping,
            element_set_names: ["brief", "summary", "full"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Whether `name` is an acceptable element set for this schema.
    #[must_use]
    pub fn accepts_element_set(&self, name: &str) -> bool {
        self.element_set_names.is_empty() || self.element_set_names.contains(name)
    }
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self::csw_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csw_record_defaults() {
        let settings = SchemaSettings::default();
        assert_eq!(settings.namespace, CSW_202_NAMESPACE);
        assert_eq!(settings.type_names, vec!["csw:Record"]);
        assert_eq!(settings.record_mapping["dc:title"], "title");
        assert!(settings.accepts_element_set("full"));
        assert!(!settings.accepts_element_set("everything"));
    }

    #[test]
    fn empty_element_sets_accept_anything() {
        let settings = SchemaSettings {
            element_set_names: BTreeSet::new(),
            ..SchemaSettings::default()
        };
        assert!(settings.accepts_element_set("whatever"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let settings: SchemaSettings =
            serde_json::from_str(r#"{"namespace": "http://www.isotc211.org/2005/gmd"}"#).unwrap();
        assert_eq!(settings.namespace, "http://www.isotc211.org/2005/gmd");
        assert_eq!(settings.type_names, vec!["csw:Record"]);
    }
}
