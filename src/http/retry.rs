//! Transient-failure classification for responses and errors.

use reqwest::StatusCode;

/// Whether a failed outcome is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network errors, timeouts, 5xx and 408. Likely to succeed on retry.
    Transient,
    /// Everything else. Retrying won't help.
    Permanent,
}

/// Anything that carries an HTTP status the retry policy can inspect.
pub trait HttpOutcome {
    fn status(&self) -> StatusCode;
}

impl HttpOutcome for reqwest::Response {
    fn status(&self) -> StatusCode {
        reqwest::Response::status(self)
    }
}

impl HttpOutcome for StatusCode {
    fn status(&self) -> StatusCode {
        *self
    }
}

/// Classifies an HTTP status.
/// Returns None for statuses that are not failures.
pub fn classify_status(status: StatusCode) -> Option<FailureKind> {
    match status {
        StatusCode::REQUEST_TIMEOUT => Some(FailureKind::Transient),
        s if s.is_server_error() => Some(FailureKind::Transient),
        s if s.is_client_error() => Some(FailureKind::Permanent),
        _ => None,
    }
}

/// Classifies an error by walking its cause chain.
///
/// The first recognised cause decides. Errors with no recognised cause are
/// permanent.
pub fn classify_error(error: &anyhow::Error) -> FailureKind {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return classify_reqwest_error(e);
        }
        if cause.is::<tokio::time::error::Elapsed>() {
            return FailureKind::Transient;
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return classify_io_error(e);
        }
    }
    FailureKind::Permanent
}

/// Only connection-level I/O failures are transient; local file errors are not.
fn classify_io_error(error: &std::io::Error) -> FailureKind {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe
        | ErrorKind::TimedOut
        | ErrorKind::UnexpectedEof
        | ErrorKind::AddrNotAvailable
        | ErrorKind::Interrupted => FailureKind::Transient,
        _ => FailureKind::Permanent,
    }
}

fn classify_reqwest_error(error: &reqwest::Error) -> FailureKind {
    if let Some(status) = error.status() {
        return classify_status(status).unwrap_or(FailureKind::Permanent);
    }

    // Malformed requests and undecodable bodies fail the same way every time
    if error.is_builder() || error.is_decode() || error.is_redirect() {
        return FailureKind::Permanent;
    }

    // Connection errors, timeouts, etc.
    FailureKind::Transient
}
