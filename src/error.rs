use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Bad hyperparameters or builder settings.
    InvalidConfig(String),
    /// Dimension or id-sequence mismatch.
    InvalidShape(String),
    /// Dataset values or layer parameters that cannot be used, including a layer
    /// chain that would break the autoregressive ordering.
    InvalidData(String),
    /// `Sampler::finish` called before every position was drawn.
    UnfinishedSampler { position: usize, input_dim: usize },
    /// Checkpoint could not be read, written or parsed.
    Checkpoint(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::UnfinishedSampler {
                position,
                input_dim,
            } => write!(
                f,
                "sampler stopped at position {position} of {input_dim}"
            ),
            Error::Checkpoint(msg) => write!(f, "checkpoint: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
