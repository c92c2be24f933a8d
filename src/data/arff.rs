//! Minimal ARFF (attribute-relation file format) reader
//!
//! Supports dense files with `numeric`/`real`/`integer` and nominal
//! attributes. `?` is read as a missing value (`NaN`).

use std::fs;
use std::path::Path;

use crate::{Error, Matrix, Result};

/// Declared type of an ARFF attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    /// `numeric`, `real` or `integer`
    Numeric,
    /// `{a, b, c}`
    Nominal(Vec<String>),
}

/// One `@attribute` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Attribute type
    pub kind: AttributeType,
}

/// A parsed ARFF file.
#[derive(Debug, Clone)]
pub struct ArffTable {
    /// `@relation` name
    pub relation: String,
    /// Attributes in column order
    pub attributes: Vec<Attribute>,
    /// Data section
    pub data: Matrix,
}

/// Read and parse an ARFF file.
///
/// # Errors
///
/// Returns [`Error::DataLoad`] if the file is missing or malformed
pub fn read_arff(path: &Path) -> Result<ArffTable> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::data_load(path, format!("cannot read file: {e}")))?;
    parse_arff(&text).map_err(|reason| Error::data_load(path, reason))
}

/// Parse ARFF text. Errors are plain messages; [`read_arff`] attaches the path.
///
/// # Errors
///
/// Returns a description of the first malformed line
pub fn parse_arff(text: &str) -> std::result::Result<ArffTable, String> {
    let mut relation = String::new();
    let mut attributes = Vec::new();
    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut in_data = false;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let lineno = lineno + 1;

        if in_data {
            if line.starts_with('{') {
                return Err(format!("line {lineno}: sparse ARFF data is not supported"));
            }
            let fields = split_fields(line);
            if fields.len() != attributes.len() {
                return Err(format!(
                    "line {lineno}: expected {} values, found {}",
                    attributes.len(),
                    fields.len()
                ));
            }
            for (field, attr) in fields.iter().zip(&attributes) {
                values.push(
                    parse_value(field, attr).map_err(|e| format!("line {lineno}: {e}"))?,
                );
            }
            rows += 1;
            continue;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with("@relation") {
            relation = unquote(line["@relation".len()..].trim()).to_string();
        } else if lower.starts_with("@attribute") {
            let attr = parse_attribute(line["@attribute".len()..].trim())
                .map_err(|e| format!("line {lineno}: {e}"))?;
            attributes.push(attr);
        } else if lower.starts_with("@data") {
            if attributes.is_empty() {
                return Err(format!("line {lineno}: @data before any @attribute"));
            }
            in_data = true;
        } else {
            return Err(format!("line {lineno}: unexpected header line \"{line}\""));
        }
    }

    if !in_data {
        return Err("missing @data section".to_string());
    }

    let data = Matrix::new(rows, attributes.len(), values).map_err(|e| e.to_string())?;
    Ok(ArffTable {
        relation,
        attributes,
        data,
    })
}

fn parse_attribute(decl: &str) -> std::result::Result<Attribute, String> {
    let (name, rest) = split_name(decl)?;
    let rest = rest.trim();
    let kind = if rest.starts_with('{') {
        let close = rest
            .rfind('}')
            .ok_or_else(|| format!("unterminated nominal list for attribute {name}"))?;
        let labels = split_fields(&rest[1..close]);
        AttributeType::Nominal(labels)
    } else {
        match rest.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => AttributeType::Numeric,
            other => return Err(format!("unsupported type \"{other}\" for attribute {name}")),
        }
    };
    Ok(Attribute { name, kind })
}

/// Split `name type` where `name` may be quoted.
fn split_name(decl: &str) -> std::result::Result<(String, &str), String> {
    let first = decl.chars().next().ok_or("empty @attribute declaration")?;
    if first == '\'' || first == '"' {
        let end = decl[1..]
            .find(first)
            .ok_or("unterminated quoted attribute name")?;
        Ok((decl[1..=end].to_string(), &decl[end + 2..]))
    } else {
        let end = decl
            .find(char::is_whitespace)
            .ok_or_else(|| format!("attribute \"{decl}\" has no type"))?;
        Ok((decl[..end].to_string(), &decl[end..]))
    }
}

/// Split a comma-separated line, honoring single and double quotes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, ',') => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '\'' || c == '"')
}

fn parse_value(field: &str, attr: &Attribute) -> std::result::Result<f64, String> {
    if field == "?" {
        return Ok(f64::NAN);
    }
    match &attr.kind {
        AttributeType::Numeric => field
            .parse::<f64>()
            .map_err(|_| format!("\"{field}\" is not numeric (attribute {})", attr.name)),
        AttributeType::Nominal(labels) => {
            let index = labels.iter().position(|l| l == field).ok_or_else(|| {
                format!("\"{field}\" is not a declared value of attribute {}", attr.name)
            })?;
            // Labels keep their numeric value only when the whole list is numeric,
            // otherwise codes from the two spaces could collide
            if all_numeric(labels) {
                if let Ok(value) = field.parse::<f64>() {
                    return Ok(value);
                }
            }
            #[allow(clippy::cast_precision_loss)]
            Ok(index as f64)
        }
    }
}

fn all_numeric(labels: &[String]) -> bool {
    labels.iter().all(|l| l.parse::<f64>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
% comment
@relation 'toy data'

@attribute x numeric
@attribute 'the color' {red, green, blue}
@attribute level {0,1,2}

@data
1.5, red, 2
-2, blue, 0
?, 'green', 1
";

    #[test]
    fn test_parse_sample() {
        let table = parse_arff(SAMPLE).unwrap();
        assert_eq!(table.relation, "toy data");
        assert_eq!(table.attributes.len(), 3);
        assert_eq!(table.attributes[1].name, "the color");
        assert_eq!(table.data.rows(), 3);

        assert_eq!(table.data.row(0), &[1.5, 0.0, 2.0]);
        assert_eq!(table.data.row(1), &[-2.0, 2.0, 0.0]);
        assert!(table.data.get(2, 0).is_nan());
        assert!((table.data.get(2, 1) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mixed_nominal_labels_use_indices() {
        let text = "\
@relation cars
@attribute doors {2,3,4,5more}
@attribute persons {2,4,more}
@data
3,2
5more,more
2,4
";
        let table = parse_arff(text).unwrap();
        assert_eq!(table.data.row(0), &[1.0, 0.0]);
        assert_eq!(table.data.row(1), &[3.0, 2.0]);
        assert_eq!(table.data.row(2), &[0.0, 1.0]);
        assert_ne!(table.data.row(0), table.data.row(1));
    }

    #[test]
    fn test_numeric_nominal_labels_keep_values() {
        let text = "@relation r\n@attribute a {1,5,9}\n@data\n9\n5\n";
        let table = parse_arff(text).unwrap();
        assert_eq!(table.data.column(0).collect::<Vec<_>>(), vec![9.0, 5.0]);
    }

    #[test]
    fn test_wrong_value_count() {
        let text = "@relation r\n@attribute a numeric\n@data\n1,2\n";
        let err = parse_arff(text).unwrap_err();
        assert!(err.contains("expected 1 values"));
    }

    #[test]
    fn test_unknown_nominal_value() {
        let text = "@relation r\n@attribute a {x,y}\n@data\nz\n";
        assert!(parse_arff(text).unwrap_err().contains("not a declared value"));
    }

    #[test]
    fn test_missing_data_section() {
        assert!(parse_arff("@relation r\n@attribute a numeric\n").is_err());
    }

    #[test]
    fn test_sparse_rejected() {
        let text = "@relation r\n@attribute a numeric\n@data\n{0 1}\n";
        assert!(parse_arff(text).unwrap_err().contains("sparse"));
    }

    #[test]
    fn test_missing_file_is_data_load_error() {
        let err = read_arff(Path::new("/definitely/not/here.arff")).unwrap_err();
        assert!(err.is_configuration());
    }
}
