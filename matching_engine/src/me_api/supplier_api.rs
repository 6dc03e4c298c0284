use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{ActorId, Supplier, SupplierStatus},
    traits::{MatchingEngineError, SupplierDirectory},
};

/// Administration of the supplier directory that the allocator draws candidates from.
pub struct SupplierApi<B> {
    db: B,
}

impl<B> Debug for SupplierApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SupplierApi")
    }
}

impl<B> SupplierApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> SupplierApi<B>
where B: SupplierDirectory
{
    pub async fn register_supplier(&self, actor: ActorId, name: &str) -> Result<Supplier, MatchingEngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MatchingEngineError::invalid_input("A supplier needs a name"));
        }
        let supplier = self.db.register_supplier(actor, name, Utc::now()).await?;
        info!("🏭️ Supplier '{name}' registered for {actor}. Awaiting approval");
        Ok(supplier)
    }

    pub async fn fetch_supplier(&self, actor: ActorId) -> Result<Supplier, MatchingEngineError> {
        self.db.fetch_supplier(actor).await?.ok_or_else(|| not_found(actor))
    }

    pub async fn set_supplier_status(
        &self,
        actor: ActorId,
        status: SupplierStatus,
    ) -> Result<Supplier, MatchingEngineError> {
        let supplier = self.db.update_supplier_status(actor, status, Utc::now()).await?.ok_or_else(|| not_found(actor))?;
        info!("🏭️ Supplier {actor} is now {status}");
        Ok(supplier)
    }

    pub async fn set_supplier_featured(&self, actor: ActorId, featured: bool) -> Result<Supplier, MatchingEngineError> {
        let supplier =
            self.db.set_supplier_featured(actor, featured, Utc::now()).await?.ok_or_else(|| not_found(actor))?;
        info!("🏭️ Supplier {actor} {} featured", if featured { "is now" } else { "is no longer" });
        Ok(supplier)
    }
}

fn not_found(actor: ActorId) -> MatchingEngineError {
    MatchingEngineError::NotFound(format!("Supplier {actor}"))
}
