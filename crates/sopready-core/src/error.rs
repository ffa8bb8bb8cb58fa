//! Error types for `sopready-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("facility not found: {0}")]
  FacilityNotFound(Uuid),

  #[error("requirement not found: {0}")]
  RequirementNotFound(Uuid),

  #[error("invalid request: {0}")]
  Validation(String),

  #[error("already exists: {0}")]
  Duplicate(String),

  /// A collaborator (facility, requirement, review or snapshot source)
  /// failed. Never retried here; the caller decides.
  #[error("upstream failure: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  pub fn upstream<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Upstream(Box::new(err))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::FacilityNotFound(_) | Self::RequirementNotFound(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
