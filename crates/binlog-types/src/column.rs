//! Column metadata carried by row-change events.
//!
//! `ColumnKind` is the coarse wire classification the coercion gates on.
//! It is derived from `information_schema.COLUMNS` when the client loads
//! table metadata.

use serde::{Deserialize, Serialize};

/// Coarse physical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// TINYINT, SMALLINT, INT, BIGINT, YEAR
    Number,
    MediumInt,
    /// FLOAT, DOUBLE
    Float,
    Decimal,
    Enum,
    Set,
    String,
    DateTime,
    Timestamp,
    Date,
    Time,
    Bit,
    Json,
    Binary,
    Point,
}

impl ColumnKind {
    /// Map an `information_schema` DATA_TYPE / COLUMN_TYPE pair to a kind.
    pub fn from_data_type(data_type: &str, column_type: &str) -> Self {
        let data_type = data_type.to_lowercase();
        match data_type.as_str() {
            "tinyint" | "smallint" | "int" | "integer" | "bigint" | "year" => {
                ColumnKind::Number
            }
            "mediumint" => ColumnKind::MediumInt,
            "float" | "double" | "real" => ColumnKind::Float,
            "decimal" | "numeric" => ColumnKind::Decimal,
            "enum" => ColumnKind::Enum,
            "set" => ColumnKind::Set,
            "datetime" => ColumnKind::DateTime,
            "timestamp" => ColumnKind::Timestamp,
            "date" => ColumnKind::Date,
            "time" => ColumnKind::Time,
            "bit" => ColumnKind::Bit,
            "json" => ColumnKind::Json,
            "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
                ColumnKind::Binary
            }
            "point" | "geometry" | "linestring" | "polygon" | "multipoint"
            | "multilinestring" | "multipolygon" | "geometrycollection" => ColumnKind::Point,
            _ if column_type.to_lowercase().starts_with("enum(") => ColumnKind::Enum,
            _ => ColumnKind::String,
        }
    }

    /// Integer coercion only reads columns of these kinds.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Number | ColumnKind::MediumInt)
    }

    pub fn is_float(self) -> bool {
        matches!(self, ColumnKind::Float)
    }

    /// DATETIME, TIMESTAMP, DATE or TIME.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            ColumnKind::DateTime | ColumnKind::Timestamp | ColumnKind::Date | ColumnKind::Time
        )
    }
}

/// Metadata for one column of a table, in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Ordered ENUM labels; the stored value is a 1-based index into this list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_labels: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enum_labels: Vec::new(),
        }
    }

    pub fn with_enum_labels(mut self, labels: Vec<String>) -> Self {
        self.enum_labels = labels;
        self
    }

    /// Build column metadata from an `information_schema.COLUMNS` row.
    pub fn from_information_schema(name: String, data_type: &str, column_type: &str) -> Self {
        let kind = ColumnKind::from_data_type(data_type, column_type);
        let labels = match kind {
            ColumnKind::Enum | ColumnKind::Set => parse_enum_labels(column_type),
            _ => Vec::new(),
        };
        Self::new(name, kind).with_enum_labels(labels)
    }
}

/// Extract the quoted labels of an `enum('a','b')` or `set('a','b')` column type.
///
/// Doubled single quotes inside a label are unescaped. Anything that is not
/// an enum or set definition yields no labels.
pub fn parse_enum_labels(column_type: &str) -> Vec<String> {
    let trimmed = column_type.trim();
    let Some(body) = strip_prefix_ignore_case(trimmed, "enum(")
        .or_else(|| strip_prefix_ignore_case(trimmed, "set("))
    else {
        return Vec::new();
    };
    let body = body.strip_suffix(')').unwrap_or(body);

    let mut labels = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quote) {
            ('\'', false) => in_quote = true,
            ('\'', true) => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quote = false;
                    labels.push(std::mem::take(&mut current));
                }
            }
            ('\\', true) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (c, true) => current.push(c),
            (_, false) => {}
        }
    }

    labels
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_data_type() {
        assert_eq!(ColumnKind::from_data_type("INT", "int(11)"), ColumnKind::Number);
        assert_eq!(
            ColumnKind::from_data_type("mediumint", "mediumint(8) unsigned"),
            ColumnKind::MediumInt
        );
        assert_eq!(ColumnKind::from_data_type("double", "double"), ColumnKind::Float);
        assert_eq!(ColumnKind::from_data_type("varchar", "varchar(32)"), ColumnKind::String);
        assert_eq!(ColumnKind::from_data_type("longblob", "longblob"), ColumnKind::Binary);
        assert_eq!(ColumnKind::from_data_type("datetime", "datetime(6)"), ColumnKind::DateTime);
    }

    #[test]
    fn test_kind_gates() {
        assert!(ColumnKind::Number.is_numeric());
        assert!(ColumnKind::MediumInt.is_numeric());
        assert!(!ColumnKind::Decimal.is_numeric());
        assert!(ColumnKind::Float.is_float());
        assert!(!ColumnKind::Decimal.is_float());
        for kind in [
            ColumnKind::DateTime,
            ColumnKind::Timestamp,
            ColumnKind::Date,
            ColumnKind::Time,
        ] {
            assert!(kind.is_temporal());
        }
        assert!(!ColumnKind::String.is_temporal());
    }

    #[test]
    fn test_parse_enum_labels() {
        assert_eq!(
            parse_enum_labels("enum('pending','shipped','cancelled')"),
            vec!["pending", "shipped", "cancelled"]
        );
        assert_eq!(parse_enum_labels("set('a','b')"), vec!["a", "b"]);
        assert_eq!(parse_enum_labels("enum('it''s','a,b')"), vec!["it's", "a,b"]);
        assert!(parse_enum_labels("varchar(10)").is_empty());
    }

    #[test]
    fn test_column_from_information_schema() {
        let column = Column::from_information_schema(
            "status".to_string(),
            "enum",
            "enum('pending','shipped')",
        );
        assert_eq!(column.kind, ColumnKind::Enum);
        assert_eq!(column.enum_labels, vec!["pending", "shipped"]);

        let column = Column::from_information_schema("id".to_string(), "bigint", "bigint(20)");
        assert_eq!(column.kind, ColumnKind::Number);
        assert!(column.enum_labels.is_empty());
    }
}
