use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("unknown endpoint '{0}'")]
    UnknownEndpoint(String),

    #[error("endpoint '{endpoint}' requires parameter '{param}'")]
    MissingParam { endpoint: String, param: String },
}
