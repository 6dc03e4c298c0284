use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{RatingSummary, Supplier},
    traits::{MatchingEngineError, RatingStore, SupplierDirectory},
};

pub const DEFAULT_CAPACITY: u32 = 5;
/// The rating every featured supplier is shown with.
pub const FEATURED_DISPLAY_RATING: f64 = 5.0;

/// The number of slots a supplier has left. Always in `[0, capacity]`, whatever the load.
pub fn remaining_slots(capacity: u32, load: i64) -> u32 {
    let remaining = i64::from(capacity) - load.max(0);
    remaining.clamp(0, i64::from(capacity)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    /// The maximum number of candidates to return.
    pub count: usize,
    /// Overrides the default capacity for this query.
    pub capacity: Option<u32>,
    /// Drops candidates with no remaining slots.
    #[serde(default)]
    pub only_available: bool,
}

impl CandidateQuery {
    pub fn new(count: usize) -> Self {
        Self { count, capacity: None, only_available: false }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn only_available(mut self) -> Self {
        self.only_available = true;
        self
    }
}

/// A ranked supplier, with the numbers the consumer is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub supplier: Supplier,
    /// Active work the supplier is already committed to.
    pub load: i64,
    pub remaining_slots: u32,
    /// The supplier's true aggregate rating.
    pub rating: RatingSummary,
    /// The rating to display. Featured suppliers always show [`FEATURED_DISPLAY_RATING`].
    pub display_rating: f64,
}

/// Ranks eligible producers for a consumer.
///
/// Approved suppliers are fetched most-recently-featured first (over-fetching twice the requested count), and each
/// one's load is read fresh from the database. Nothing is reserved, so `remaining_slots` is an estimate that may
/// already be stale by the time the consumer acts on it. Candidates are returned in fetch order.
pub struct AllocatorApi<B> {
    db: B,
    default_capacity: u32,
}

impl<B> Debug for AllocatorApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllocatorApi (capacity: {})", self.default_capacity)
    }
}

impl<B> AllocatorApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, default_capacity: DEFAULT_CAPACITY }
    }

    pub fn with_default_capacity(mut self, capacity: u32) -> Self {
        self.default_capacity = capacity;
        self
    }

    pub fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> AllocatorApi<B>
where B: SupplierDirectory + RatingStore
{
    pub async fn rank_candidates(&self, query: CandidateQuery) -> Result<Vec<Candidate>, MatchingEngineError> {
        if query.count == 0 {
            return Ok(Vec::new());
        }
        let capacity = query.capacity.unwrap_or(self.default_capacity);
        let fetch_limit = i64::try_from(query.count.saturating_mul(2)).unwrap_or(i64::MAX);
        let suppliers = self.db.fetch_approved_suppliers(fetch_limit).await?;
        trace!("🧮️ {} approved suppliers fetched for a request of {}", suppliers.len(), query.count);
        let mut candidates = Vec::with_capacity(query.count);
        for supplier in suppliers {
            if candidates.len() >= query.count {
                break;
            }
            let load = self.db.active_load(supplier.actor_id).await?;
            let slots = remaining_slots(capacity, load);
            if query.only_available && slots == 0 {
                trace!("🧮️ {} is fully booked. Skipping", supplier.actor_id);
                continue;
            }
            let rating = self.db.rating_summary(supplier.actor_id).await?;
            let display_rating = if supplier.featured { FEATURED_DISPLAY_RATING } else { rating.mean };
            candidates.push(Candidate { supplier, load, remaining_slots: slots, rating, display_rating });
        }
        debug!("🧮️ Ranked {} candidates (capacity {capacity})", candidates.len());
        Ok(candidates)
    }
}
