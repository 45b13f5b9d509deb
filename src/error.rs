use thiserror::Error;

/// Fatal pipeline errors. Brand-group resolution failures are not errors;
/// they are reported through `ExecutionReport::brand_group_errors`.
#[derive(Debug, Error)]
pub enum UploaderError {
    #[error("{0}")]
    Configuration(String),

    #[error("Failed to connect to database '{database}': {message}")]
    Connection { database: String, message: String },

    #[error(
        "Record {index} for io_id '{identifier}' has fields [{found}], expected [{expected}]"
    )]
    NonUniformRecords {
        identifier: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("S3 Upload Error: {message}")]
    Write { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, UploaderError>;
