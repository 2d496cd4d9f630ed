use thiserror::Error;

/// One-line usage banner appended to argument errors
pub const USAGE: &str = "Usage: artping [OPTIONS] <HOST>";

/// Failure classes at the binary boundary, each with a fixed exit code
#[derive(Debug, Error)]
pub enum RunError {
    /// Bad or missing CLI arguments
    #[error("{0}")]
    Argument(String),

    /// Art file missing, unreadable, or empty
    #[error("failed to load art file: {0:#}")]
    Art(anyhow::Error),

    /// Host resolution or socket setup failed before any packet was sent
    #[error("failed to initialize ping session: {0:#}")]
    Init(anyhow::Error),

    /// The engine reported a fatal send/receive error mid-run
    #[error("ping run failed: {0:#}")]
    Runtime(anyhow::Error),
}

impl RunError {
    /// Argument error with the usage banner appended
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(format!("{}\n\n{}", message.into(), USAGE))
    }

    /// Process exit code for this failure.
    ///
    /// Init failures deliberately map to 0: the original tool printed the
    /// error but exited successfully, and that behavior is preserved until
    /// clarified (see DESIGN.md).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Argument(_) | Self::Art(_) => 1,
            Self::Init(_) => 0,
            Self::Runtime(_) => 2,
        }
    }
}
