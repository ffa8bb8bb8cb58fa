//! A site that must maintain its SOP catalog.
//!
//! Facilities are owned by the surrounding tenant system. The readiness engine
//! only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
  pub facility_id: Uuid,
  pub name:        String,
  /// Short code, unique across facilities (e.g. `"PLT-02"`).
  pub code:        String,
  pub created_at:  DateTime<Utc>,
}

/// Input for registering a facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFacility {
  pub name: String,
  pub code: String,
}

impl NewFacility {
  pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
    Self { name: name.into(), code: code.into() }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("facility name must not be empty"));
    }
    if self.code.trim().is_empty() {
      return Err(Error::validation("facility code must not be empty"));
    }
    Ok(())
  }
}
