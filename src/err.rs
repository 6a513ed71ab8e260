#![allow(non_snake_case)]

use std::fmt;

use crate::{IntoResponse, Uri};

use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFoundError {
            message: format!("Invalid path: {}", path),
        }),
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Maybe<T> {
    Nothing(Error),
    Fine(Success<T>),
}

pub fn Fine<V>(v: V) -> Maybe<V>
where
    V: Serialize,
{
    Maybe::Fine(Success::of(v))
}

pub fn Nothing<V>(err: Error) -> Maybe<V> {
    Maybe::Nothing(err)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    /// Malformed or empty input, e.g. a blank student name.
    ValidationError { message: String },
    /// A referenced course or enrollment does not exist.
    NotFoundError { message: String },
    /// Duplicate enrollment or duplicate feedback.
    ConflictError { message: String },
    /// The record exists but is not in a state that allows the operation.
    PreconditionError { message: String },
    /// Storage failures. These abort the current operation entirely.
    InternalError { kind: &'static str, message: String },
    Unknown { message: String },
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_fatal() {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
        } else {
            Json::into_response(Json(self))
        }
    }
}

impl Error {
    pub fn unknown<S: Into<String>>(msg: S) -> Error {
        Error::Unknown {
            message: msg.into(),
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::ValidationError {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFoundError {
            message: msg.into(),
        }
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Error {
        Error::ConflictError {
            message: msg.into(),
        }
    }

    pub fn precondition<S: Into<String>>(msg: S) -> Error {
        Error::PreconditionError {
            message: msg.into(),
        }
    }

    /// Fatal errors are not answered as a regular rejection, they abort the request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InternalError { .. } | Error::Unknown { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ValidationError { message } => write!(f, "ValidationError: {}", message),
            Error::NotFoundError { message } => write!(f, "NotFoundError: {}", message),
            Error::ConflictError { message } => write!(f, "ConflictError: {}", message),
            Error::PreconditionError { message } => write!(f, "PreconditionError: {}", message),
            Error::InternalError { kind, message } => write!(f, "{}: {}", kind, message),
            Error::Unknown { message } => write!(f, "Unknown: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::InternalError {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError {
            kind: "SerializationError",
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Unknown {
            message: err.to_string(),
        }
    }
}
