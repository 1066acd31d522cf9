//! [`Error`]s the GraphQL API reports to its clients.
//!
//! Every failure carries a machine-readable [`Code`] in the `code`
//! extension of the GraphQL error, and the [`http::StatusCode`] the
//! response is sent with. Expected purchase outcomes like `SOLD_OUT` are
//! errors too, so clients branch on the code only.

use std::fmt;

use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Defines an error enum whose variants convert into [`Error`]s with the
/// provided code, status and message.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// Error reported by the GraphQL API.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// Machine-readable [`Code`] of this [`Error`].
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Where this [`Error`] was raised, if traced.
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// Human-readable message.
    pub message: String,
}

impl Error {
    /// Creates a new [`Error`] for a failure the client can't do anything
    /// about, besides retrying.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let mut ext = juniper::Object::with_capacity(1);
        drop(
            ext.add_field("code", juniper::Value::scalar(self.code.to_owned())),
        );
        drop(
            ext.add_field(
                "backtrace",
                juniper::Value::list(
                    self.backtrace
                        .iter()
                        .flat_map(|trace| trace.iter())
                        .map(|frame| juniper::Value::scalar(frame.to_string()))
                        .collect(),
                ),
            ),
        );
        juniper::FieldError::new(self.message, juniper::Value::object(ext))
    }
}

/// `SCREAMING_SNAKE_CASE` code of an [`Error`], like `ALREADY_PURCHASED`.
pub type Code = &'static str;

/// Conversion of service errors into [`Error`]s.
pub trait AsError {
    /// Returns the [`Error`] this one is reported as.
    ///
    /// [`None`] means an internal error, reported with the [`fmt::Display`]
    /// of the original one.
    fn try_as_error(&self) -> Option<Error>;

    /// Converts this error into an [`Error`], falling back to
    /// [`Error::internal()`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Same as [`AsError::as_error()`], but consumes this error.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        self.is_lock_timeout().then(|| StorageError::Busy.into())
    }
}

define_error! {
    enum StorageError {
        #[code = "STORAGE_BUSY"]
        #[status = INTERNAL_SERVER_ERROR]
        #[message = "Storage is too busy at the moment, retry later"]
        Busy,
    }
}

#[cfg(test)]
mod spec {
    use super::{AsError, Error};

    #[derive(Debug, derive_more::Display)]
    #[display("connection reset")]
    struct Unknown;

    impl AsError for Unknown {
        fn try_as_error(&self) -> Option<Error> {
            None
        }
    }

    #[test]
    fn reports_unknown_errors_as_internal() {
        let err = Unknown.into_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "[INTERNAL_SERVER_ERROR]: connection reset",
        );
    }

    #[test]
    fn drops_trace_of_internal_errors() {
        let err = tracerr::new!(Unknown).as_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert!(err.backtrace.is_none());
    }
}
