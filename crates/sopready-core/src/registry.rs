//! Administration operations: facilities, the SOP catalog and the review
//! ledger.
//!
//! Validation lives here so every backend enforces the same rules; the
//! backend's [`Registry`] impl only persists.

use uuid::Uuid;

use crate::{
  Error, Result,
  clock::Clock,
  facility::{Facility, NewFacility},
  gap::{GapAnalysis, duplicate_or_upstream, upstream},
  requirement::{Applicability, NewRequirement, SopRequirement},
  review::{NewReview, ReviewRecord},
  store::{ComplianceStore, ReadinessSource},
};

impl<S, C> GapAnalysis<S, C>
where
  S: ReadinessSource,
  C: Clock,
{
  pub async fn list_facilities(&self) -> Result<Vec<Facility>> {
    let mut facilities = self.store.list_facilities().await.map_err(upstream)?;
    facilities.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
    Ok(facilities)
  }

  pub async fn get_facility(&self, facility_id: Uuid) -> Result<Facility> {
    self.facility(facility_id).await
  }

  /// The whole catalog, ordered by code.
  pub async fn list_requirements(&self) -> Result<Vec<SopRequirement>> {
    let mut requirements = self.store.list_requirements().await.map_err(upstream)?;
    requirements.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(requirements)
  }

  /// Every review recorded for the pair, newest first.
  pub async fn review_history(
    &self,
    facility_id: Uuid,
    requirement_id: Uuid,
  ) -> Result<Vec<ReviewRecord>> {
    self.facility(facility_id).await?;
    self.requirement(requirement_id).await?;
    self
      .store
      .review_history(facility_id, requirement_id)
      .await
      .map_err(upstream)
  }

  async fn requirement(&self, requirement_id: Uuid) -> Result<SopRequirement> {
    self
      .store
      .list_requirements()
      .await
      .map_err(upstream)?
      .into_iter()
      .find(|r| r.requirement_id == requirement_id)
      .ok_or(Error::RequirementNotFound(requirement_id))
  }
}

impl<S, C> GapAnalysis<S, C>
where
  S: ComplianceStore,
  C: Clock,
{
  /// Register a facility. Codes are unique ignoring ASCII case; a taken code
  /// is [`Error::Duplicate`], including when a concurrent write wins the race.
  pub async fn add_facility(&self, input: NewFacility) -> Result<Facility> {
    input.validate()?;
    let code = input.code.trim();
    let taken = self
      .store
      .list_facilities()
      .await
      .map_err(upstream)?
      .iter()
      .any(|f| f.code.eq_ignore_ascii_case(code));
    if taken {
      return Err(Error::Duplicate(format!("facility code {code:?}")));
    }

    let input = NewFacility::new(input.name.trim(), code);
    let facility = self
      .store
      .add_facility(input, self.clock.now())
      .await
      .map_err(|e| duplicate_or_upstream(e, || format!("facility code {code:?}")))?;
    tracing::info!(facility = %facility.code, id = %facility.facility_id, "added facility");
    Ok(facility)
  }

  pub async fn add_requirement(&self, mut input: NewRequirement) -> Result<SopRequirement> {
    input.validate()?;
    let code = input.code.trim().to_owned();
    let taken = self
      .store
      .list_requirements()
      .await
      .map_err(upstream)?
      .iter()
      .any(|r| r.code.eq_ignore_ascii_case(&code));
    if taken {
      return Err(Error::Duplicate(format!("requirement code {code:?}")));
    }

    if let Applicability::Facilities(ids) = &mut input.applicability {
      ids.sort();
      ids.dedup();
      for id in ids.iter() {
        self
          .store
          .get_facility(*id)
          .await
          .map_err(upstream)?
          .ok_or_else(|| Error::validation(format!("unknown facility {id} in applicability")))?;
      }
    }

    let input = NewRequirement { code: code.clone(), ..input };
    let requirement = self
      .store
      .add_requirement(input, self.clock.now())
      .await
      .map_err(|e| duplicate_or_upstream(e, || format!("requirement code {code:?}")))?;
    tracing::info!(
      requirement = %requirement.code,
      cadence = %requirement.cadence,
      "added SOP requirement"
    );
    Ok(requirement)
  }

  /// Append a completed review to the ledger.
  pub async fn record_review(&self, input: NewReview) -> Result<ReviewRecord> {
    input.validate(self.clock.now().date_naive())?;
    let facility = self.facility(input.facility_id).await?;
    let requirement = self.requirement(input.requirement_id).await?;
    if !requirement.applies_to(facility.facility_id) {
      return Err(Error::validation(format!(
        "requirement {} does not apply to facility {}",
        requirement.code, facility.code
      )));
    }

    let input = NewReview { reviewer: input.reviewer.trim().to_owned(), ..input };
    let review = self
      .store
      .record_review(input, self.clock.now())
      .await
      .map_err(upstream)?;
    tracing::info!(
      facility = %facility.code,
      requirement = %requirement.code,
      reviewed_on = %review.reviewed_on,
      "recorded review"
    );
    Ok(review)
  }
}
