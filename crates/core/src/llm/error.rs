use std::fmt;

pub const MAX_DETAILS_CHARS: usize = 2000;

/// The upstream model answered with a non-success HTTP status.
#[derive(Debug, Clone)]
pub struct UpstreamStatusError {
    pub status: u16,
    /// Response body, already truncated to [`MAX_DETAILS_CHARS`].
    pub details: String,
}

impl UpstreamStatusError {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            details: crate::domain::contract::truncate_chars(body, MAX_DETAILS_CHARS),
        }
    }
}

impl fmt::Display for UpstreamStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upstream model error (status={})", self.status)
    }
}

impl std::error::Error for UpstreamStatusError {}
