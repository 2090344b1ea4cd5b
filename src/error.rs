use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslateError>;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    #[error("Unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("MySQL field type cannot be translated to SQLite: {0}")]
    UnknownDataType(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("SQLite error: {source} (query: {sql})")]
    Engine {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database stayed busy after {attempts} attempts (query: {sql})")]
    BusyTimeout { sql: String, attempts: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TranslateError {
    pub fn engine(sql: impl Into<String>, source: rusqlite::Error) -> Self {
        TranslateError::Engine {
            sql: sql.into(),
            source,
        }
    }

    /// MySQL-style error code for callers that mimic the client protocol.
    pub fn mysql_code(&self) -> u16 {
        match self {
            TranslateError::UnexpectedCharacter { .. }
            | TranslateError::UnterminatedString { .. }
            | TranslateError::Parse(_) => 1064,
            TranslateError::Unsupported(_) | TranslateError::UnknownDataType(_) => 1235,
            TranslateError::BusyTimeout { .. } => 1205,
            TranslateError::Transaction(_) => 1399,
            _ => 1105,
        }
    }
}
