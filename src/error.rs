use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Malformed codestream: {0}")]
  MalformedCodestream(String),

  #[error("Codec failed to decode: {0}")]
  DecodeError(String),

  #[error("Codec failed to encode: {0}")]
  EncodeError(String),

  #[error("Buffer too small: required {required} bytes, got {actual}")]
  BufferSizeError { required: usize, actual: usize },

  #[error("Null pointer from openjpeg-sys")]
  NullPointerError(&'static str),

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl Error {
  pub(crate) fn malformed(msg: impl Into<String>) -> Self {
    Self::MalformedCodestream(msg.into())
  }

  pub(crate) fn decode(msg: impl Into<String>) -> Self {
    Self::DecodeError(msg.into())
  }

  pub(crate) fn encode(msg: impl Into<String>) -> Self {
    Self::EncodeError(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
