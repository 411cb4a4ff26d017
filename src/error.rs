use thiserror::Error;

/// Failures raised by the analysis stages.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// `row` is the 1-based data row, known only once the value is parsed as
    /// part of a table.
    #[error("{}column {column} has malformed value {value:?} (expected {expected})", row_prefix(.row))]
    Parse {
        column: String,
        row: Option<usize>,
        value: String,
        expected: &'static str,
    },

    #[error("required column {column} is missing from the dataset")]
    Schema { column: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("extremum query {query} over zero groups")]
    EmptyGroup { query: &'static str },
}

impl AnalysisError {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }

    /// Attaches a data-row number to a `Parse` error; other kinds pass through.
    pub fn at_row(self, row_number: usize) -> Self {
        match self {
            Self::Parse {
                column,
                value,
                expected,
                ..
            } => Self::Parse {
                column,
                row: Some(row_number),
                value,
                expected,
            },
            other => other,
        }
    }
}

fn row_prefix(row: &Option<usize>) -> String {
    row.map(|row| format!("row {row}: ")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_date() -> AnalysisError {
        AnalysisError::Parse {
            column: "OCCUR_DATE".to_string(),
            row: None,
            value: "2020-13-01".to_string(),
            expected: "MM/DD/YYYY",
        }
    }

    #[test]
    fn parse_message_names_row_only_when_known() {
        assert_eq!(
            bad_date().to_string(),
            "column OCCUR_DATE has malformed value \"2020-13-01\" (expected MM/DD/YYYY)"
        );
        assert_eq!(
            bad_date().at_row(12).to_string(),
            "row 12: column OCCUR_DATE has malformed value \"2020-13-01\" (expected MM/DD/YYYY)"
        );
    }

    #[test]
    fn at_row_leaves_other_kinds_alone() {
        let err = AnalysisError::insufficient("too few records");
        assert_eq!(err.clone().at_row(3), err);
    }
}
