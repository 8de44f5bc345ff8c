use thiserror::Error;

/// Unified error type for query templating and execution
#[derive(Error, Debug)]
pub enum QueryError {
    /// A binding name does not occur anywhere in the template text
    #[error("Binding '{name}' does not appear in the query template")]
    BindingName { name: String },

    /// A bound value has no SQL rendering rule
    #[error("Invalid type for binding '{name}': {type_name}")]
    InvalidBindingType { name: String, type_name: String },

    /// Dataset batches are inconsistent with each other
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Opening the connection, loading extensions, credentials, or init SQL failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The engine rejected a table registration
    #[error("Failed to register table '{alias}': {message}")]
    RegistrationFailed { alias: String, message: String },

    /// The engine rejected the rendered SQL
    #[error("Query failed: {0}")]
    ExecutionFailed(String),

    /// Closing the connection failed
    #[error("Failed to close connection: {0}")]
    CloseFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Converting or formatting result data failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl QueryError {
    /// Create a connection failure error
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        QueryError::ConnectionFailed(msg.into())
    }

    /// Create a registration failure for the given alias
    pub fn registration_failed(alias: impl Into<String>, msg: impl Into<String>) -> Self {
        QueryError::RegistrationFailed {
            alias: alias.into(),
            message: msg.into(),
        }
    }

    /// Create an execution failure error
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        QueryError::ExecutionFailed(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        QueryError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
