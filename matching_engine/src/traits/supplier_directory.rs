use chrono::{DateTime, Utc};

use crate::{
    db_types::{ActorId, Supplier, SupplierStatus},
    traits::MatchingEngineError,
};

/// The directory of producers that the candidate allocator draws from.
#[allow(async_fn_in_trait)]
pub trait SupplierDirectory: Clone {
    /// Registers the producer with status `pending`. Registering twice is an [`MatchingEngineError::InvalidState`].
    async fn register_supplier(
        &self,
        actor: ActorId,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Supplier, MatchingEngineError>;

    async fn fetch_supplier(&self, actor: ActorId) -> Result<Option<Supplier>, MatchingEngineError>;

    async fn update_supplier_status(
        &self,
        actor: ActorId,
        status: SupplierStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Supplier>, MatchingEngineError>;

    /// Sets or clears the featured flag. Featuring stamps `featured_at` with `now`; unfeaturing clears it.
    async fn set_supplier_featured(
        &self,
        actor: ActorId,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Supplier>, MatchingEngineError>;

    /// Approved suppliers, most recently featured first, then newest first.
    async fn fetch_approved_suppliers(&self, limit: i64) -> Result<Vec<Supplier>, MatchingEngineError>;

    /// The number of `active` positive responses by `actor` on solicitations that are `active` or `accepted`.
    async fn active_load(&self, actor: ActorId) -> Result<i64, MatchingEngineError>;
}
