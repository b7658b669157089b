/// Convenience result type used across Mixel.
pub type MixelResult<T> = Result<T, MixelError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Per-layer failures are never fatal to the render loop: `Source` and
/// `Init` abort opening that one layer, `Filter` is logged and skipped for
/// the frame it occurred in, and `UnknownBlitMode` leaves the previously
/// selected mode active.
#[derive(thiserror::Error, Debug)]
pub enum MixelError {
    /// The source descriptor could not be located or parsed.
    #[error("source error: {0}")]
    Source(String),

    /// Resources for a layer could not be allocated or sized.
    #[error("init error: {0}")]
    Init(String),

    /// A filter rejected its input for this frame.
    #[error("filter error: {0}")]
    Filter(String),

    /// A blend mode name was not recognized.
    #[error("unknown blit mode: {0}")]
    UnknownBlitMode(String),

    /// A parameter write or lookup was invalid.
    #[error("parameter error: {0}")]
    Param(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MixelError {
    /// Build a [`MixelError::Source`] value.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`MixelError::Init`] value.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Build a [`MixelError::Filter`] value.
    pub fn filter(msg: impl Into<String>) -> Self {
        Self::Filter(msg.into())
    }

    /// Build a [`MixelError::Param`] value.
    pub fn param(msg: impl Into<String>) -> Self {
        Self::Param(msg.into())
    }
}
