use std::borrow::Cow;
use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{BlockingError, JsonPayloadError, PathError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derivative::Derivative;
use r2d2::Error as PoolError;
use rusqlite::Error as DatabaseError;
use serde::Serialize;

use crate::campaign::CampaignId;
use crate::config::ConfigError;

#[derive(Debug, Derivative)]
#[derivative(PartialEq)]
pub enum Error {
    // 422
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_id: CampaignId,
    },

    // 405
    MethodNotAllowed,

    // 500
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    FailedToAcquireSession(#[derivative(PartialEq = "ignore")] PoolError),
    BlockingCallFailed(#[derivative(PartialEq = "ignore")] BlockingError),
    InvalidConfig(#[derivative(PartialEq = "ignore")] ConfigError),
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_message(&self) -> Cow<'static, str> {
        match self {
            Error::InvalidJson(err) => Cow::Owned(err.to_string()),
            Error::InvalidPath(err) => Cow::Owned(err.to_string()),
            Error::PathNotFound => Cow::Borrowed("Not Found"),
            Error::CampaignNotFound { .. } => Cow::Borrowed("Campaign not found"),
            Error::MethodNotAllowed => Cow::Borrowed("Method Not Allowed"),
            Error::FailedDatabaseCall(_) => {
                Cow::Borrowed("An error occurred when communicating with the database")
            }
            Error::FailedToAcquireSession(_) => {
                Cow::Borrowed("A database session could not be acquired")
            }
            Error::BlockingCallFailed(_) => {
                Cow::Borrowed("A database call was interrupted before it completed")
            }
            Error::InvalidConfig(_) => Cow::Borrowed("The server configuration is invalid"),
            Error::IoError(_) => Cow::Borrowed("An error occurred during an I/O operation"),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidPath(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToAcquireSession(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BlockingCallFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Detail {
            detail: Cow<'static, str>,
        }

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(status).json(&Detail {
            detail: self.error_message(),
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<PoolError> for Error {
    fn from(error: PoolError) -> Error {
        Error::FailedToAcquireSession(error)
    }
}

impl From<BlockingError> for Error {
    fn from(error: BlockingError) -> Error {
        Error::BlockingCallFailed(error)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Error {
        Error::InvalidConfig(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToAcquireSession(err) => Some(err),
            Error::BlockingCallFailed(err) => Some(err),
            Error::InvalidConfig(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn campaign_not_found_renders_detail() {
        let error = Error::CampaignNotFound {
            campaign_id: CampaignId::from_raw(99999),
        };

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({ "detail": "Campaign not found" }));
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let error = Error::from(DatabaseError::QueryReturnedNoRows);

        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error.error_message(),
            "An error occurred when communicating with the database"
        );
    }
}
