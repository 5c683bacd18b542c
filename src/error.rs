use std::fmt::{Display, Formatter};

use stmt_table::ExtractError;
use worker::{Response, Result};

use crate::models::ErrorResponse;

#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    MalformedInput(String),
    NoDataFound(String),
    Unavailable(String),
    Timeout(String),
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::MalformedInput(_) => "malformed_input",
            Self::NoDataFound(_) => "no_data_found",
            Self::Unavailable(_) => "extraction_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::MalformedInput(message)
            | Self::NoDataFound(message)
            | Self::Unavailable(message)
            | Self::Timeout(message)
            | Self::Internal(message) => message,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::MalformedInput(_) => 400,
            Self::NoDataFound(_) => 422,
            Self::Unavailable(_) => 502,
            Self::Timeout(_) => 504,
            Self::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> Result<Response> {
        let mut response = Response::from_json(&ErrorResponse {
            code: self.code().to_string(),
            message: self.message().to_string(),
        })?;
        response.headers_mut().set("Cache-Control", "no-store")?;
        Ok(response.with_status(self.status_code()))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<ExtractError> for ApiError {
    fn from(error: ExtractError) -> Self {
        let message = error.to_string();
        match error {
            ExtractError::MalformedInput(_) => Self::MalformedInput(message),
            ExtractError::NoDataFound => Self::NoDataFound(message),
            ExtractError::ExtractionUnavailable(_) => Self::Unavailable(message),
            ExtractError::Timeout { .. } => Self::Timeout(message),
            ExtractError::InvalidPageSelection(_) | ExtractError::InvalidOption(_) => {
                Self::BadRequest(message)
            }
            ExtractError::Io(_)
            | ExtractError::Csv(_)
            | ExtractError::Json(_)
            | ExtractError::Xlsx(_) => Self::Internal(message),
        }
    }
}

impl From<worker::Error> for ApiError {
    fn from(error: worker::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Internal(error.to_string())
    }
}
