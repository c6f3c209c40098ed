use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use time::Date;
use utoipa::ToSchema;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid date range: {0}")]
    InvalidRange(String),
    #[error("city {0} not found")]
    UnknownCity(i64),
    #[error("unknown sort column: {0}")]
    UnknownSortColumn(String),
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
    #[error("observation {0} not found")]
    ObservationNotFound(i64),
    #[error("path id {path} does not match body id {body}")]
    IdMismatch { path: i64, body: i64 },
    #[error("city {city_id} already has an observation for {date}")]
    DuplicateObservation { city_id: i64, date: Date },
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Storage(value.into())
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRange(_)
            | Error::UnknownSortColumn(_)
            | Error::InvalidPageSize
            | Error::InvalidObservation(_)
            | Error::IdMismatch { .. } => StatusCode::BAD_REQUEST,
            Error::UnknownCity(_) | Error::ObservationNotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateObservation { .. } => StatusCode::CONFLICT,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {:?}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
