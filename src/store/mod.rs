//! Storage backends. Handlers only ever see `dyn ProductStore`.

mod memory;
mod postgres;

pub use memory::MemoryProductStore;
pub use postgres::PgProductStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{NewProduct, Product, ProductFilter, ProductPatch};

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Readiness check; `Err` means the backend cannot serve traffic.
    async fn ping(&self) -> AppResult<()>;

    /// Products matching every predicate, oldest first.
    async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn insert(&self, new: NewProduct) -> AppResult<Product>;

    /// `None` when no product has this id.
    async fn update(&self, id: Uuid, patch: ProductPatch) -> AppResult<Option<Product>>;

    /// `false` when no product has this id.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}
