use thiserror::Error;

/// Bison verbose errors stop listing alternatives past this many.
const MAX_EXPECTED_LISTED: usize = 4;

/// A lexing or grammar failure, positioned at the offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{}:{}: syntax error, unexpected {}{}",
    .line,
    .column,
    .unexpected,
    expecting_suffix(.expected)
)]
pub struct SyntaxError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    pub unexpected: String,
    pub expected: Vec<String>,
}

fn expecting_suffix(expected: &[String]) -> String {
    if expected.is_empty() || expected.len() > MAX_EXPECTED_LISTED {
        return String::new();
    }
    format!(", expecting {}", expected.join(" or "))
}

/// Semantic failure of column type inference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Cannot find column {0}")]
    UnknownColumn(String),

    #[error("Unknown table {0}")]
    UnknownTable(String),

    #[error("Type mismatch between {0} and {1}")]
    TypeMismatch(String, String),
}

/// A virtual-layer definition that is malformed or inconsistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Malformed definition: {0}")]
    Malformed(String),

    #[error("Don't know how to join layers, please specify a query")]
    MissingQuery,

    #[error("Please specify a 'uid' column name")]
    MissingUid,

    #[error("Please specify the geometry column name and type")]
    MissingGeometry,

    #[error("Unknown source layer {0}")]
    UnknownSource(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_lists_few_alternatives() {
        let err = SyntaxError {
            line: 1,
            column: 10,
            unexpected: "IDENTIFIER".into(),
            expected: vec!["$end".into()],
        };
        assert_eq!(
            err.to_string(),
            "1:10: syntax error, unexpected IDENTIFIER, expecting $end"
        );
    }

    #[test]
    fn test_syntax_error_omits_long_expected_list() {
        let err = SyntaxError {
            line: 2,
            column: 3,
            unexpected: "FROM".into(),
            expected: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
        };
        assert_eq!(err.to_string(), "2:3: syntax error, unexpected FROM");

        let err = SyntaxError {
            expected: Vec::new(),
            ..err
        };
        assert_eq!(err.to_string(), "2:3: syntax error, unexpected FROM");
        let as_dyn: &dyn std::error::Error = &err;
        assert!(as_dyn.source().is_none());
    }

    #[test]
    fn test_wrapped_errors_keep_message() {
        let err: Error = TypeError::UnknownColumn("c".into()).into();
        assert_eq!(err.to_string(), "Cannot find column c");
    }
}
