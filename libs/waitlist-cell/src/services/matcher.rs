// libs/waitlist-cell/src/services/matcher.rs
use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{MatchTier, SlotCriteria, WaitlistError, WaitlistMatch, WaitlistStatus};
use crate::services::store::WaitlistStore;

/// Picks who gets a freed slot. Read-only: never mutates an entry.
///
/// Tier 1 looks for active entries that asked for exactly this specialty,
/// doctor and facility. Only when nobody did does tier 2 open the slot to the
/// whole specialty queue. Within a tier the queue order is priority
/// descending, then registration time ascending.
pub struct WaitlistMatcher {
    store: Arc<dyn WaitlistStore>,
}

impl WaitlistMatcher {
    pub fn new(store: Arc<dyn WaitlistStore>) -> Self {
        Self { store }
    }

    pub async fn find_candidate(
        &self,
        criteria: &SlotCriteria,
    ) -> Result<Option<WaitlistMatch>, WaitlistError> {
        self.find_candidate_excluding(criteria, &[]).await
    }

    /// Same as `find_candidate`, passing over the entries in `excluded`.
    #[instrument(skip(self))]
    pub async fn find_candidate_excluding(
        &self,
        criteria: &SlotCriteria,
        excluded: &[Uuid],
    ) -> Result<Option<WaitlistMatch>, WaitlistError> {
        let exact = self
            .store
            .find_by_filters(WaitlistStatus::Active, &criteria.exact_filter())
            .await?;

        if let Some(entry) = exact.into_iter().find(|entry| !excluded.contains(&entry.id)) {
            debug!("Tier 1 candidate {} (priority {})", entry.id, entry.priority);
            return Ok(Some(WaitlistMatch { entry, tier: MatchTier::Exact }));
        }

        let specialty = self
            .store
            .find_by_filters(WaitlistStatus::Active, &criteria.specialty_filter())
            .await?;

        match specialty.into_iter().find(|entry| !excluded.contains(&entry.id)) {
            Some(entry) => {
                debug!("Tier 2 candidate {} (priority {})", entry.id, entry.priority);
                Ok(Some(WaitlistMatch { entry, tier: MatchTier::SpecialtyOnly }))
            }
            None => {
                debug!("No eligible waitlist entry for specialty {}", criteria.specialty_id);
                Ok(None)
            }
        }
    }
}
