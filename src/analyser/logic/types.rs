use polars::prelude::{DataFrame, DataType};
use serde::{Deserialize, Serialize};

/// Semantic type of a column in the working table.
#[derive(Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    #[serde(rename = "datetime")]
    Temporal,
    Boolean,
    Categorical,
    Text,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Temporal => "datetime",
            Self::Boolean => "boolean",
            Self::Categorical => "categorical",
            Self::Text => "text",
        }
    }

    /// Resolves the semantic type held by a polars dtype. Anything that is not
    /// numeric, temporal, boolean or categorical is free text.
    pub fn from_dtype(dtype: &DataType) -> Self {
        if dtype.is_primitive_numeric() {
            Self::Numeric
        } else if dtype.is_temporal() {
            Self::Temporal
        } else if dtype.is_bool() {
            Self::Boolean
        } else if matches!(dtype, DataType::Categorical(_, _)) {
            Self::Categorical
        } else {
            Self::Text
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Categorical | Self::Text)
    }
}

/// Label returned by a [`TypeClassifier`](super::classify::TypeClassifier)
/// for one ambiguous column. Consumed straight away by coercion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeLabel {
    Numeric,
    Datetime,
    Boolean,
    Categorical,
    Id,
    Code,
    Text,
    Unknown,
}

impl TypeLabel {
    /// Parses a free-form classifier reply. Labels outside the known set map
    /// to [`TypeLabel::Unknown`], which coerces like free text.
    pub fn parse(raw: &str) -> Self {
        let label = raw
            .trim()
            .trim_matches(|c: char| c == '.' || c == '"' || c == '\'' || c == '`')
            .to_lowercase();
        match label.as_str() {
            "numeric" | "number" | "numerical" => Self::Numeric,
            "datetime" | "date" | "time" | "timestamp" => Self::Datetime,
            "boolean" | "bool" => Self::Boolean,
            "categorical" | "category" => Self::Categorical,
            "id" | "identifier" | "id/code" => Self::Id,
            "code" => Self::Code,
            "text" | "string" | "free text" => Self::Text,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Categorical => "categorical",
            Self::Id => "id",
            Self::Code => "code",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }

    /// Semantic type the column ends up with after coercion.
    pub fn target_kind(&self) -> ColumnKind {
        match self {
            Self::Numeric => ColumnKind::Numeric,
            Self::Datetime => ColumnKind::Temporal,
            Self::Boolean => ColumnKind::Boolean,
            Self::Categorical | Self::Id | Self::Code => ColumnKind::Categorical,
            Self::Text | Self::Unknown => ColumnKind::Text,
        }
    }
}

impl std::fmt::Display for TypeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `{name, type}` entry of the schema handed to downstream consumers.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq, Debug)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

/// Derives the `{name, type}` list from a frame, in column order.
pub fn derive_schema(df: &DataFrame) -> Vec<ColumnSchema> {
    df.get_columns()
        .iter()
        .map(|column| ColumnSchema {
            name: column.name().to_string(),
            kind: ColumnKind::from_dtype(column.dtype()),
        })
        .collect()
}

/// Options for [`load_df`](super::io::load_df).
#[derive(Clone, Default, Debug)]
pub struct LoadOptions {
    /// Read at most this many data rows. `None` loads the complete file.
    pub preview_rows: Option<usize>,
    /// Positional header override, one name per column.
    pub column_names: Option<Vec<String>>,
    pub infer_schema_length: Option<usize>,
}

#[derive(Clone, Default, Deserialize, Serialize, Debug)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_in: usize,
    pub columns_out: usize,
    pub dropped_columns: Vec<String>,
    pub processing_steps: Vec<String>,
}

impl CleaningReport {
    pub fn step(&mut self, msg: impl Into<String>) {
        self.processing_steps.push(msg.into());
    }
}

/// Output of a successful pipeline run.
pub struct CleanedDataset {
    pub df: DataFrame,
    pub schema: Vec<ColumnSchema>,
    pub report: CleaningReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!(TypeLabel::parse("Numeric"), TypeLabel::Numeric);
        assert_eq!(TypeLabel::parse(" datetime.\n"), TypeLabel::Datetime);
        assert_eq!(TypeLabel::parse("ID/code"), TypeLabel::Id);
        assert_eq!(TypeLabel::parse("`boolean`"), TypeLabel::Boolean);
        assert_eq!(TypeLabel::parse("geo-coordinates"), TypeLabel::Unknown);
    }

    #[test]
    fn test_unknown_label_coerces_to_text() {
        assert_eq!(TypeLabel::Unknown.target_kind(), ColumnKind::Text);
        assert_eq!(TypeLabel::Code.target_kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_kind_from_dtype() {
        assert_eq!(ColumnKind::from_dtype(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::from_dtype(&DataType::Int32), ColumnKind::Numeric);
        assert_eq!(
            ColumnKind::from_dtype(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            ColumnKind::Temporal
        );
        assert_eq!(ColumnKind::from_dtype(&DataType::Boolean), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_dtype(&DataType::String), ColumnKind::Text);
    }

    #[test]
    fn test_schema_serializes_type_field() -> anyhow::Result<()> {
        let df = df!(
            "price" => &[1.0, 2.0],
            "city" => &["a", "b"]
        )?;
        let schema = derive_schema(&df);
        let json = serde_json::to_string(&schema)?;
        assert_eq!(
            json,
            r#"[{"name":"price","type":"numeric"},{"name":"city","type":"text"}]"#
        );
        Ok(())
    }
}
