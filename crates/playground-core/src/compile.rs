//! Compile service contract: request tickets, responses and build results.

use thiserror::Error;

/// Identifies one in-flight compile request.
///
/// The controller only accepts a completion carrying the ticket it handed
/// out last; anything else is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompileTicket(pub(crate) u64);

impl CompileTicket {
    /// Raw sequence number, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Work the host must perform asynchronously for a run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Ticket to hand back with the result.
    pub ticket: CompileTicket,
    /// Source snapshot taken when the run was requested.
    pub source: String,
}

/// Response body of the compile service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompileResponse {
    /// Intel HEX image, present when the build succeeded.
    pub hex: Option<String>,
    /// Compiler standard error.
    pub stderr: Option<String>,
    /// Compiler standard output.
    pub stdout: Option<String>,
}

/// Immutable outcome of one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    /// Hex-encoded firmware image, when one was produced.
    pub binary_image: Option<String>,
    /// Diagnostics to show the user; may be non-empty on success.
    pub diagnostic_text: String,
}

impl BuildResult {
    /// Returns the image text when it is present and non-blank.
    #[must_use]
    pub fn image_text(&self) -> Option<&str> {
        self.binary_image
            .as_deref()
            .filter(|hex| !hex.trim().is_empty())
    }
}

impl From<CompileResponse> for BuildResult {
    /// Diagnostics come from stderr when it has content, else stdout.
    fn from(response: CompileResponse) -> Self {
        let diagnostic_text = response
            .stderr
            .filter(|text| !text.is_empty())
            .or(response.stdout)
            .unwrap_or_default();
        Self {
            binary_image: response.hex,
            diagnostic_text,
        }
    }
}

/// The compile call itself failed (network rejection, bad response body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileTransportError {
    message: String,
}

impl CompileTransportError {
    /// Wraps a transport failure description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
