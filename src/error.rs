use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Upstream answered with a non-2xx status.
    Status(u16),
    /// Request went out but no response came back.
    NoResponse(String),
    /// Request could not be built or sent.
    Request(String),
    Parse(String),
    Storage(String),
    Config(String),
    Io(std::io::Error),
}

/// Coarse failure category, used when deciding how loudly to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamStatus,
    UpstreamUnreachable,
    RequestSetup,
    Parse,
    Storage,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Status(_) => ErrorKind::UpstreamStatus,
            Error::NoResponse(_) => ErrorKind::UpstreamUnreachable,
            Error::Request(_) => ErrorKind::RequestSetup,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Storage(_) | Error::Io(_) => ErrorKind::Storage,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Status(code) => write!(f, "upstream returned status {code}"),
            Error::NoResponse(msg) => write!(f, "no response from upstream: {msg}"),
            Error::Request(msg) => write!(f, "request setup failed: {msg}"),
            Error::Parse(msg) => write!(f, "unexpected response shape: {msg}"),
            Error::Storage(msg) => write!(f, "storage error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Error::Status(status.as_u16())
        } else if e.is_builder() || e.is_redirect() {
            Error::Request(e.to_string())
        } else {
            Error::NoResponse(e.to_string())
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
    fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Error::Parse(format!("{} at `{}`", e.inner(), e.path()))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(Error::Status(500).kind(), ErrorKind::UpstreamStatus);
        assert_eq!(
            Error::NoResponse("reset".into()).kind(),
            ErrorKind::UpstreamUnreachable
        );
        assert_eq!(Error::Request("bad url".into()).kind(), ErrorKind::RequestSetup);
        assert_eq!(Error::Parse("x".into()).kind(), ErrorKind::Parse);
    }

    #[test]
    fn parse_error_carries_path() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Outer {
            homes: Vec<Inner>,
        }
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Inner {
            id: i64,
        }

        let de = &mut serde_json::Deserializer::from_str(r#"{"homes":[{"id":"x"}]}"#);
        let err: Error = serde_path_to_error::deserialize::<_, Outer>(de)
            .unwrap_err()
            .into();
        assert!(err.to_string().contains("homes[0].id"), "{err}");
    }
}
