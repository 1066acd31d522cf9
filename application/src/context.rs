//! [`Context`]-related definitions.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::domain::user;

use crate::{define_error, Error, JuniperResponse, Service};

/// Name of the HTTP header carrying the ID of an already authenticated user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Application context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .expect("invalid status code")
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Returns the [`user::Id`] of the caller.
    ///
    /// Authentication happens in front of this server, so the
    /// [`USER_ID_HEADER`] is trusted as is.
    ///
    /// # Errors
    ///
    /// Errors if the [`USER_ID_HEADER`] is missing or malformed.
    pub fn user_id(&self) -> Result<user::Id, Error> {
        user_id_from(&self.parts.headers).map_err(self.error())
    }
}

/// Extracts a [`user::Id`] from the provided [`http::HeaderMap`].
fn user_id_from(headers: &http::HeaderMap) -> Result<user::Id, Error> {
    let header = headers
        .get(USER_ID_HEADER)
        .ok_or(UserIdError::Required)?;
    header
        .to_str()
        .ok()
        .and_then(user::Id::new)
        .ok_or_else(|| UserIdError::Invalid.into())
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service =
            parts.extensions.get::<Service>().cloned().ok_or_else(|| {
                JuniperResponse {
                    status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
                    response: GraphQLBatchResponse::Single(
                        GraphQLResponse::error(
                            Error::internal(&"missing `Service` extension")
                                .into_field_error(),
                        ),
                    ),
                }
            })?;

        Ok(Self {
            service,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
        })
    }
}

define_error! {
    enum UserIdError {
        #[code = "USER_ID_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "`X-User-Id` header is required"]
        Required,

        #[code = "INVALID_USER_ID"]
        #[status = BAD_REQUEST]
        #[message = "`X-User-Id` header is not a valid user ID"]
        Invalid,
    }
}

#[cfg(test)]
mod spec {
    use super::{user_id_from, USER_ID_HEADER};

    #[test]
    fn reads_user_id_header() {
        let mut headers = http::HeaderMap::new();
        assert_eq!(
            user_id_from(&headers).unwrap_err().code,
            "USER_ID_REQUIRED",
        );

        drop(headers.insert(USER_ID_HEADER, "  ".parse().unwrap()));
        let err = user_id_from(&headers).unwrap_err();
        assert_eq!(err.code, "INVALID_USER_ID");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);

        drop(headers.insert(USER_ID_HEADER, "alice".parse().unwrap()));
        assert_eq!(user_id_from(&headers).unwrap().to_string(), "alice");
    }
}
