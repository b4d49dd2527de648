use hyper::http;
use std::{fmt::Display, io, sync};

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    PoisonedLock,
    MalformedCache(serde_json::Error),
    SerializationError(serde_json::Error),
    InvalidJsonBody(serde_json::Error),
    InvalidHeaderName,
    InvalidHeaderValue,
    InvalidBody,
    InvalidUrl(url::ParseError),
    HyperError(hyper::Error),
    HttpError(http::Error),
    TaskFailed(tokio::task::JoinError),
}

impl Error {
    /// Whether the error was caused by the client rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidJsonBody(_) | Error::InvalidBody | Error::InvalidUrl(_)
        )
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IoError: {}", e),
            Error::PoisonedLock => write!(f, "The lock was poisoned"),
            Error::MalformedCache(e) => write!(f, "The cache file is malformed: {}", e),
            Error::SerializationError(e) => write!(f, "Serialization error: {}", e),
            Error::InvalidJsonBody(e) => write!(f, "The request body is not valid JSON: {}", e),
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::InvalidBody => write!(f, "Invalid body"),
            Error::InvalidUrl(e) => write!(f, "Invalid request url: {}", e),
            Error::HyperError(e) => write!(f, "Hyper error: {}", e),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
            Error::TaskFailed(e) => write!(f, "The server task failed: {}", e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e)
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::HyperError(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::TaskFailed(e)
    }
}
