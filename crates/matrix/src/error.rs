//! Homeserver client error types

use serde::Deserialize;

/// Client result type
pub type Result<T> = std::result::Result<T, Error>;

/// Homeserver client errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Homeserver returned {status}: {errcode} {message}")]
    Api {
        status: u16,
        errcode: String,
        message: String,
    },

    #[error("Invalid homeserver URL: {0}")]
    Url(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Standard Matrix error body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

impl Error {
    pub(crate) fn api(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        Error::Api {
            status,
            errcode: if parsed.errcode.is_empty() {
                "M_UNKNOWN".to_string()
            } else {
                parsed.errcode
            },
            message: parsed.error,
        }
    }

    /// Whether the homeserver could not be reached or failed on its side
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::Transport(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<Error> for notifier_core::Error {
    fn from(err: Error) -> Self {
        use notifier_core::Error as Core;

        if err.is_unavailable() {
            return Core::UpstreamUnavailable(err.to_string());
        }

        match err {
            Error::Api {
                status: 401,
                message,
                ..
            } => Core::Unauthenticated(message),
            Error::Api {
                status: 403,
                message,
                ..
            } => Core::Unauthorized(message),
            Error::Api {
                status: 404,
                message,
                ..
            } => Core::NotFound(message),
            Error::Api {
                status: 400,
                errcode,
                ..
            } => Core::Registration(errcode),
            Error::Url(url) => Core::InvalidConfig(format!("Invalid homeserver URL: {}", url)),
            other => Core::unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifier_core::{Error as Core, ErrorKind};

    #[test]
    fn test_api_error_body() {
        let err = Error::api(403, r#"{"errcode":"M_FORBIDDEN","error":"You are not in this room"}"#);
        match &err {
            Error::Api {
                status,
                errcode,
                message,
            } => {
                assert_eq!(*status, 403);
                assert_eq!(errcode, "M_FORBIDDEN");
                assert_eq!(message, "You are not in this room");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = Error::api(502, "<html>Bad Gateway</html>");
        assert!(matches!(err, Error::Api { ref errcode, .. } if errcode == "M_UNKNOWN"));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_core_mapping() {
        let core: Core = Error::Timeout("5s".into()).into();
        assert!(matches!(core, Core::UpstreamUnavailable(_)));

        let core: Core = Error::api(401, r#"{"errcode":"M_UNKNOWN_TOKEN","error":"Invalid"}"#).into();
        assert!(matches!(core, Core::Unauthenticated(_)));

        let core: Core = Error::api(400, r#"{"errcode":"M_USER_IN_USE","error":"Taken"}"#).into();
        assert!(matches!(core, Core::Registration(ref code) if code == "M_USER_IN_USE"));

        let core: Core = Error::api(503, "").into();
        assert_eq!(core.kind(), ErrorKind::Unavailable);

        let core: Core = Error::Decode("expected value".into()).into();
        assert_eq!(core.kind(), ErrorKind::Internal);
    }
}
