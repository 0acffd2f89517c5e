use thiserror::Error;

pub type Result<T> = std::result::Result<T, LecternError>;

#[derive(Error, Debug)]
pub enum LecternError {
  #[error("Invalid input: {message}")]
  Input { message: String },

  #[error("Embedding failed: {message}")]
  Embedding { message: String },

  #[error("Invalid configuration: {message}")]
  InvalidConfig { message: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Yaml(#[from] serde_yaml::Error),
}

impl LecternError {
  pub fn input(message: impl Into<String>) -> Self {
    Self::Input { message: message.into() }
  }

  pub fn embedding(message: impl Into<String>) -> Self {
    Self::Embedding { message: message.into() }
  }

  pub fn invalid_config(message: impl Into<String>) -> Self {
    Self::InvalidConfig { message: message.into() }
  }
}
