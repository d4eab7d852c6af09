use std::time::Duration;
use thiserror::Error;

/// JSON text that could not be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid JSON at line {line}, column {column}: {message}")]
pub struct InputError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::Error> for InputError {
    fn from(err: serde_json::Error) -> Self {
        InputError {
            // serde_json appends the location to its message; keep only the cause
            message: err
                .to_string()
                .split(" at line ")
                .next()
                .unwrap_or_default()
                .to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// Failures reported by the relational engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("engine failed to start: {0}")]
    Startup(String),

    #[error("engine did not start within {0:?}")]
    StartupTimeout(Duration),

    #[error("failed to materialize table \"{table}\": {message}")]
    Materialize { table: String, message: String },

    #[error("{0}")]
    Execution(String),
}

// Markers the engines put in parser and tokenizer failures
const SYNTAX_MARKERS: [&str; 3] = ["Parser Error", "ParserError", "TokenizerError"];

/// A query failure, normalized for display next to the query box
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Parser or tokenizer failure, reduced to the first line of the message
    #[error("SQL Syntax Error: {0}")]
    Syntax(String),

    /// Any other engine failure, passed through verbatim
    #[error("{0}")]
    Execution(String),

    #[error("engine not ready: {0}")]
    NotReady(String),
}

impl QueryError {
    pub fn from_engine_message(message: &str) -> Self {
        if SYNTAX_MARKERS.iter().any(|marker| message.contains(marker)) {
            let first_line = message.lines().next().unwrap_or_default();
            QueryError::Syntax(first_line.to_string())
        } else {
            QueryError::Execution(message.to_string())
        }
    }
}

impl From<EngineError> for QueryError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Execution(message) => QueryError::from_engine_message(&message),
            other @ (EngineError::Startup(_) | EngineError::StartupTimeout(_)) => {
                QueryError::NotReady(other.to_string())
            }
            other @ EngineError::Materialize { .. } => QueryError::Execution(other.to_string()),
        }
    }
}

/// Failure of a load: either the input or the engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_errors_become_syntax_errors() {
        let err = QueryError::from_engine_message(
            "SQL error: ParserError(\"Expected: an SQL statement, found: SELEC\")\nmore detail",
        );
        assert_eq!(
            err.to_string(),
            "SQL Syntax Error: SQL error: ParserError(\"Expected: an SQL statement, found: SELEC\")"
        );
    }

    #[test]
    fn test_duckdb_style_parser_message() {
        let err = QueryError::from_engine_message("Parser Error: syntax error at or near \"FORM\"\nLINE 1: ...");
        assert_eq!(
            err,
            QueryError::Syntax("Parser Error: syntax error at or near \"FORM\"".to_string())
        );
    }

    #[test]
    fn test_other_errors_pass_through() {
        let msg = "Schema error: No field named nope.\nValid fields are t._row_id.";
        assert_eq!(
            QueryError::from_engine_message(msg),
            QueryError::Execution(msg.to_string())
        );
    }

    #[test]
    fn test_startup_failure_maps_to_not_ready() {
        let err: QueryError = EngineError::StartupTimeout(Duration::from_secs(3)).into();
        assert!(matches!(err, QueryError::NotReady(_)));
    }

    #[test]
    fn test_input_error_location() {
        let err: InputError = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }")
            .unwrap_err()
            .into();
        assert_eq!(err.line, 2);
        assert!(err.column > 0);
        assert!(!err.message.contains("at line"));
    }
}
