use std::fmt::Write as _;

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::{PropValue, Props, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn format_error(code: &str, message: impl Into<String>, key: &str) -> LadderError {
    LadderError::Store(ErrorInfo::new(code, message).with_context("key", key))
}

/// Stored result: an optional numeric table plus its header properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entry {
    /// Numeric payload, absent when the evaluation produced no table.
    pub table: Option<Table>,
    /// Header properties.
    pub props: Props,
}

impl Entry {
    /// Creates an entry.
    pub fn new(table: Option<Table>, props: Props) -> Self {
        Self { table, props }
    }
}

fn encode_value(key: &str, value: &PropValue) -> Result<String, LadderError> {
    match value {
        PropValue::Float(value) => Ok(format!("{value:?}")),
        PropValue::Text(text) => {
            if text.contains('"') || text.contains('\n') {
                return Err(format_error(
                    "unencodable-property",
                    "string properties may not contain quotes or newlines",
                    key,
                ));
            }
            Ok(format!("\"{text}\""))
        }
        PropValue::Array(values) => {
            let items: Vec<String> = values.iter().map(|value| format!("{value:?}")).collect();
            Ok(format!("[{}]", items.join(", ")))
        }
    }
}

fn decode_value(raw: &str) -> Option<PropValue> {
    if let Some(text) = raw.strip_prefix('"') {
        return text.strip_suffix('"').map(|text| PropValue::Text(text.to_string()));
    }
    if let Some(items) = raw.strip_prefix('[') {
        let items = items.strip_suffix(']')?.trim();
        if items.is_empty() {
            return Some(PropValue::Array(Vec::new()));
        }
        return items
            .split(',')
            .map(|item| item.trim().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(PropValue::Array);
    }
    raw.parse::<f64>().ok().map(PropValue::Float)
}

/// Renders properties as `# name = value` lines in key order.
pub fn write_header(props: &Props) -> Result<String, LadderError> {
    let mut out = String::new();
    for (key, value) in props {
        if key.is_empty() || key.trim() != key || key.contains('=') || key.contains('\n') {
            return Err(format_error(
                "unencodable-property",
                "property names must be non-empty, unpadded and free of '=' or newlines",
                key,
            ));
        }
        let encoded = encode_value(key, value)?;
        let _ = writeln!(out, "# {key} = {encoded}");
    }
    Ok(out)
}

/// Collects every decodable `# name = value` line of `text`.
///
/// Comment lines without a decodable value are skipped.
pub fn parse_header(text: &str) -> Props {
    let mut props = Props::new();
    for line in text.lines() {
        let Some(comment) = line.trim_start().strip_prefix('#') else {
            continue;
        };
        let Some((name, raw)) = comment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        match decode_value(raw.trim()) {
            Some(value) if !name.is_empty() => props.insert(name, value),
            _ => debug!(line, "skipping undecodable header line"),
        }
    }
    props
}

fn parse_table(text: &str) -> Option<Table> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|cell| cell.parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        rows.push(row);
    }
    if rows.is_empty() {
        return None;
    }
    Table::new(rows).ok()
}

/// Serialises an entry: provenance line, sorted header, then table rows.
///
/// An entry without properties would read back as malformed and is refused.
pub fn render_entry(entry: &Entry, generated_on: &str) -> Result<String, LadderError> {
    if entry.props.is_empty() {
        return Err(LadderError::Store(ErrorInfo::new(
            "empty-entry",
            "results without header properties cannot be stored",
        )));
    }
    let mut out = format!("# Generated on {generated_on}\n");
    out.push_str(&write_header(&entry.props)?);
    if let Some(table) = &entry.table {
        for row in table.rows() {
            let cells: Vec<String> = row.iter().map(|value| format!("{value:.18e}")).collect();
            let _ = writeln!(out, "{}", cells.join(" "));
        }
    }
    Ok(out)
}

/// Parses a stored entry.
///
/// A file without any header property is malformed. A header followed by a
/// missing or unreadable table yields an entry without a table.
pub fn parse_entry(text: &str) -> Result<Entry, LadderError> {
    let props = parse_header(text);
    if props.is_empty() {
        return Err(LadderError::Store(
            ErrorInfo::new("malformed-cache", "cache file carries no header properties")
                .with_hint("delete the file to force recomputation"),
        ));
    }
    let has_rows = text
        .lines()
        .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'));
    let table = parse_table(text);
    if has_rows && table.is_none() {
        warn!("cache table is unreadable, returning header only");
    }
    Ok(Entry::new(table, props))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lines_match_expected_layout() {
        let props = Props::new()
            .with("fitted_r2", 0.5)
            .with("extrap_type", "extrap_variance_deg2_numAll")
            .with("bond_dims", vec![1200.0, 1600.0]);
        let header = write_header(&props).unwrap();
        assert_eq!(
            header,
            "# bond_dims = [1200.0, 1600.0]\n\
             # extrap_type = \"extrap_variance_deg2_numAll\"\n\
             # fitted_r2 = 0.5\n"
        );
    }

    #[test]
    fn quotes_in_strings_are_rejected() {
        let props = Props::new().with("label", "say \"hi\"");
        let err = write_header(&props).unwrap_err();
        assert_eq!(err.info().code, "unencodable-property");
    }

    #[test]
    fn padded_names_are_rejected() {
        for key in [" L", "L ", "\tL"] {
            let err = write_header(&Props::new().with(key, 32.0)).unwrap_err();
            assert_eq!(err.info().code, "unencodable-property", "key {key:?}");
        }
    }

    #[test]
    fn entries_without_props_are_refused() {
        let table = Table::new(vec![vec![1.0]]).unwrap();
        let err = render_entry(&Entry::new(Some(table), Props::new()), "now").unwrap_err();
        assert_eq!(err.info().code, "empty-entry");
    }

    #[test]
    fn unrelated_comments_are_ignored() {
        let props = parse_header("# Generated on 2026-01-01 10:00:00\n# L = 32.0\n1 2\n");
        assert_eq!(props.len(), 1);
        assert_eq!(props.float("L"), Some(32.0));
    }

    #[test]
    fn corrupt_table_keeps_header() {
        let entry = parse_entry("# L = 32.0\n1.0 abc\n").unwrap();
        assert!(entry.table.is_none());
        assert_eq!(entry.props.float("L"), Some(32.0));
    }

    #[test]
    fn special_floats_survive() {
        let props = Props::new()
            .with("nan", f64::NAN)
            .with("inf", f64::INFINITY)
            .with("tiny", 1e-300);
        let parsed = parse_header(&write_header(&props).unwrap());
        assert!(parsed.float("nan").unwrap().is_nan());
        assert_eq!(parsed.float("inf"), Some(f64::INFINITY));
        assert_eq!(parsed.float("tiny"), Some(1e-300));
    }
}
