//! Result rows produced by the extraction phase.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use super::link::LinkRecord;
use super::schema::FieldSchema;

/// Text reported for a field whose extraction mechanism failed.
pub const EXTRACTION_FAILED: &str = "Failed to extract";

/// Bookkeeping column carrying the link's label.
pub const LINK_LABEL_COLUMN: &str = "link_label";

/// Bookkeeping column carrying the link's URL.
pub const LINK_URL_COLUMN: &str = "link_url";

/// Bookkeeping column carrying the failure description.
pub const ERROR_COLUMN: &str = "error";

/// Outcome for one field of one page.
///
/// `Missing` means the page has no such data; `Failed` means we could not
/// find out. Consumers rely on the difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Value(String),
    Missing,
    Failed,
}

impl FieldValue {
    /// Text for tabular output (`Missing` renders empty).
    pub fn as_text(&self) -> &str {
        match self {
            Self::Value(v) => v,
            Self::Missing => "",
            Self::Failed => EXTRACTION_FAILED,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_str(v),
            Self::Missing => serializer.serialize_none(),
            Self::Failed => serializer.serialize_str(EXTRACTION_FAILED),
        }
    }
}

/// One extracted (or failed) record for one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    /// Link this row was extracted from
    pub link: LinkRecord,

    /// Values keyed by the user's original column names, in schema order
    pub values: IndexMap<String, FieldValue>,

    /// Failure description when extraction failed for this link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRow {
    /// Successful row.
    pub fn new(link: LinkRecord, values: IndexMap<String, FieldValue>) -> Self {
        Self {
            link,
            values,
            error: None,
        }
    }

    /// Row for a link whose extraction failed: every field is `Failed`.
    ///
    /// A declared `url` column still carries the link's URL, since it
    /// replaces the `link_url` column in the output.
    pub fn failed(link: LinkRecord, schema: &FieldSchema, error: impl Into<String>) -> Self {
        let values = schema
            .fields()
            .iter()
            .map(|field| {
                let value = if field.key == "url" {
                    FieldValue::Value(link.url.clone())
                } else {
                    FieldValue::Failed
                };
                (field.name.clone(), value)
            })
            .collect();
        Self {
            link,
            values,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Value for a column name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Cell text for one of the shared columns (see [`columns`]).
    pub fn cell(&self, column: &str) -> &str {
        if let Some(value) = self.values.get(column) {
            return value.as_text();
        }
        match column {
            LINK_LABEL_COLUMN => &self.link.label,
            LINK_URL_COLUMN => &self.link.url,
            ERROR_COLUMN => self.error.as_deref().unwrap_or(""),
            _ => "",
        }
    }
}

/// Column set shared by every row of a run.
///
/// `link_label`/`link_url` lead unless the user declared a `url` column,
/// then the declared fields, then `error`.
pub fn columns(schema: &FieldSchema) -> Vec<String> {
    let mut columns = Vec::with_capacity(schema.len() + 3);
    if !schema.declares_url() {
        columns.push(LINK_LABEL_COLUMN.to_string());
        columns.push(LINK_URL_COLUMN.to_string());
    }
    columns.extend(schema.names().map(str::to_string));
    columns.push(ERROR_COLUMN.to_string());
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> FieldSchema {
        FieldSchema::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn test_columns_with_bookkeeping() {
        let cols = columns(&schema(&["Name", "Revenue"]));
        assert_eq!(
            cols,
            vec!["link_label", "link_url", "Name", "Revenue", "error"]
        );
    }

    #[test]
    fn test_columns_when_url_declared() {
        let cols = columns(&schema(&["Name", "URL"]));
        assert_eq!(cols, vec!["Name", "URL", "error"]);
    }

    #[test]
    fn test_failed_row_fills_sentinel() {
        let link = LinkRecord::new("Acme", "https://a.com/acme");
        let row = ResultRow::failed(link, &schema(&["Name", "Revenue"]), "boom");

        assert!(row.is_error());
        assert_eq!(row.get("Name"), Some(&FieldValue::Failed));
        assert_eq!(row.cell("Revenue"), EXTRACTION_FAILED);
        assert_eq!(row.cell("error"), "boom");
        assert_eq!(row.cell("link_url"), "https://a.com/acme");
    }

    #[test]
    fn test_failed_row_keeps_url_in_declared_column() {
        let link = LinkRecord::new("Acme", "https://a.com/acme");
        let schema = schema(&["Name", "URL"]);
        let row = ResultRow::failed(link, &schema, "fetch failed: 502");

        let cells: Vec<&str> = columns(&schema).iter().map(|c| row.cell(c)).collect();
        assert_eq!(
            cells,
            vec![EXTRACTION_FAILED, "https://a.com/acme", "fetch failed: 502"]
        );
    }

    #[test]
    fn test_serialize_distinguishes_missing_and_failed() {
        let mut values = IndexMap::new();
        values.insert("Name".to_string(), FieldValue::Value("Acme".to_string()));
        values.insert("Revenue".to_string(), FieldValue::Missing);
        values.insert("CEO".to_string(), FieldValue::Failed);
        let row = ResultRow::new(LinkRecord::new("Acme", "https://a.com/acme"), values);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["values"]["Name"], "Acme");
        assert!(json["values"]["Revenue"].is_null());
        assert_eq!(json["values"]["CEO"], EXTRACTION_FAILED);
        assert!(json.get("error").is_none());
    }
}
