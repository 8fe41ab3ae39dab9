//! Tabular export of result rows.
//!
//! CSV quotes any cell holding a comma, quote or newline and doubles inner
//! quotes. TSV (opens in spreadsheet apps as `.xls`) replaces tabs and line
//! breaks inside cells with spaces. Lines are joined with `\n`.

use crate::types::row::ResultRow;

/// Render rows as CSV under the given header.
pub fn to_csv(rows: &[ResultRow], columns: &[String]) -> String {
    render(rows, columns, ",", csv_cell)
}

/// Render rows as tab-separated values under the given header.
pub fn to_tsv(rows: &[ResultRow], columns: &[String]) -> String {
    render(rows, columns, "\t", tsv_cell)
}

fn render(rows: &[ResultRow], columns: &[String], sep: &str, cell: fn(&str) -> String) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(columns.iter().map(|c| cell(c)).collect::<Vec<_>>().join(sep));
    for row in rows {
        lines.push(
            columns
                .iter()
                .map(|c| cell(row.cell(c)))
                .collect::<Vec<_>>()
                .join(sep),
        );
    }
    lines.join("\n")
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn tsv_cell(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::link::LinkRecord;
    use crate::types::row::{columns, FieldValue};
    use crate::types::schema::FieldSchema;
    use indexmap::IndexMap;

    fn rows() -> (Vec<ResultRow>, Vec<String>) {
        let schema = FieldSchema::new(["Name", "Note"]).unwrap();
        let mut values = IndexMap::new();
        values.insert("Name".to_string(), FieldValue::Value("A, Inc.".to_string()));
        values.insert("Note".to_string(), FieldValue::Missing);
        let ok = ResultRow::new(LinkRecord::new("A", "https://a.com/a"), values);
        let failed = ResultRow::failed(
            LinkRecord::new("B", "https://a.com/b"),
            &schema,
            "fetch failed",
        );
        (vec![ok, failed], columns(&schema))
    }

    #[test]
    fn test_csv_quoting() {
        let (rows, cols) = rows();
        let csv = to_csv(&rows, &cols);

        assert_eq!(
            csv,
            "link_label,link_url,Name,Note,error\n\
             A,https://a.com/a,\"A, Inc.\",,\n\
             B,https://a.com/b,Failed to extract,Failed to extract,fetch failed"
        );
    }

    #[test]
    fn test_csv_doubles_quotes() {
        assert_eq!(csv_cell(r#"say "hi""#), r#""say ""hi""""#);
        assert_eq!(csv_cell("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_tsv_flattens_tabs() {
        let (rows, cols) = rows();
        let tsv = to_tsv(&rows, &cols);

        assert!(tsv.starts_with("link_label\tlink_url\tName\tNote\terror\n"));
        assert!(tsv.contains("A\thttps://a.com/a\tA, Inc.\t\t"));
        assert_eq!(tsv_cell("a\tb\nc"), "a b c");
    }
}
