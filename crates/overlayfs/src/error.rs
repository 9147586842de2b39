use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by overlay operations.
///
/// Only conditions that are specific to the virtual tree are reported
/// natively. Everything the real filesystem says is carried unchanged in
/// `Delegated`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// A file was used where a folder is required, or the reverse
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("No more files")]
    NoMoreFiles,

    #[error("{0}")]
    Delegated(#[from] io::Error),
}

// Win32 last-error values reported at the interception boundary.
const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_NO_MORE_FILES: u32 = 18;
const ERROR_DIR_NOT_EMPTY: u32 = 145;
const ERROR_ALREADY_EXISTS: u32 = 183;

impl Error {
    pub fn not_found<S: AsRef<str>>(path: S) -> Self {
        Error::NotFound(path.as_ref().to_string())
    }

    pub fn already_exists<S: AsRef<str>>(path: S) -> Self {
        Error::AlreadyExists(path.as_ref().to_string())
    }

    pub fn access_denied<S: AsRef<str>>(path: S) -> Self {
        Error::AccessDenied(path.as_ref().to_string())
    }

    pub fn not_empty<S: AsRef<str>>(path: S) -> Self {
        Error::NotEmpty(path.as_ref().to_string())
    }

    /// True when the error came from the real filesystem
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        matches!(self, Error::Delegated(_))
    }

    /// The value a hooked Win32 call would leave in the thread's last-error slot
    #[must_use]
    pub fn last_error_code(&self) -> u32 {
        match self {
            Error::NotFound(_) => ERROR_FILE_NOT_FOUND,
            Error::AlreadyExists(_) => ERROR_ALREADY_EXISTS,
            Error::AccessDenied(_) => ERROR_ACCESS_DENIED,
            Error::NotEmpty(_) => ERROR_DIR_NOT_EMPTY,
            Error::NoMoreFiles => ERROR_NO_MORE_FILES,
            Error::Delegated(err) => err
                .raw_os_error()
                .and_then(|code| u32::try_from(code).ok())
                .unwrap_or(0),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        if let Error::Delegated(inner) = err {
            return inner;
        }
        let kind = match &err {
            Error::NotFound(_) => io::ErrorKind::NotFound,
            Error::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            Error::AccessDenied(_) => io::ErrorKind::PermissionDenied,
            Error::NotEmpty(_) => io::ErrorKind::DirectoryNotEmpty,
            Error::NoMoreFiles | Error::Delegated(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_codes() {
        assert_eq!(Error::not_found("a").last_error_code(), 2);
        assert_eq!(Error::access_denied("a").last_error_code(), 5);
        assert_eq!(Error::NoMoreFiles.last_error_code(), 18);
        assert_eq!(Error::not_empty("a").last_error_code(), 145);
        assert_eq!(Error::already_exists("a").last_error_code(), 183);

        let delegated = Error::from(io::Error::from_raw_os_error(32));
        assert!(delegated.is_delegated());
        assert_eq!(delegated.last_error_code(), 32);

        let opaque = Error::from(io::Error::other("boom"));
        assert_eq!(opaque.last_error_code(), 0);
    }

    #[test]
    fn test_into_io_error() {
        let err: io::Error = Error::not_empty("C:\\game\\saves").into();
        assert_eq!(err.kind(), io::ErrorKind::DirectoryNotEmpty);

        let err: io::Error = Error::access_denied("x").into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let inner = io::Error::new(io::ErrorKind::TimedOut, "slow disk");
        let err: io::Error = Error::Delegated(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(err.to_string(), "slow disk");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::not_found("C:\\game\\x").to_string(),
            "Path not found: C:\\game\\x"
        );
        assert_eq!(Error::NoMoreFiles.to_string(), "No more files");
    }
}
