use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use std::io;
use std::sync::PoisonError;

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, i64),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Password hashing error: {0}")]
    Password(String),

    #[error("Generic internal error: {0}")]
    Internal(String),
}

impl InternalError {
    pub fn validation(what: impl Into<String>) -> InternalError {
        InternalError::Validation(what.into())
    }

    pub fn status(&self) -> Status {
        match self {
            InternalError::Validation(_) => Status::BadRequest,
            InternalError::Unauthorized(_) => Status::Unauthorized,
            InternalError::NotFound(..) => Status::NotFound,
            _ => Status::InternalServerError,
        }
    }
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::Internal(e.to_string())
    }
}

impl From<argon2::password_hash::Error> for InternalError {
    fn from(e: argon2::password_hash::Error) -> InternalError {
        InternalError::Password(e.to_string())
    }
}

impl From<&str> for InternalError {
    fn from(s: &str) -> InternalError {
        InternalError::Internal(s.to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for InternalError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();

        if status.code >= 500 {
            error!(uri = %request.uri(), "{}", self);
        } else {
            debug!(uri = %request.uri(), status = status.code, "{}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        Response::build_from(body.respond_to(request)?)
            .status(status)
            .ok()
    }
}

pub type InternalResult<T> = Result<T, InternalError>;
