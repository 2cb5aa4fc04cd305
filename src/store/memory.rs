use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ProductStore;
use crate::error::AppResult;
use crate::models::{NewProduct, Product, ProductFilter, ProductPatch};

/// Process-local store. IndexMap keeps insertion order, which is creation
/// order, so listing needs no sort.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: Mutex<IndexMap<Uuid, Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let products = self.products.lock().await;
        Ok(products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.products.lock().await.get(&id).cloned())
    }

    async fn insert(&self, new: NewProduct) -> AppResult<Product> {
        let mut products = self.products.lock().await;
        let mut product = Product::from_new(new, Utc::now());
        while products.contains_key(&product.id) {
            product.id = Uuid::new_v4();
        }
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> AppResult<Option<Product>> {
        let mut products = self.products.lock().await;
        Ok(products.get_mut(&id).map(|product| {
            product.apply(patch, Utc::now());
            product.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        // shift_remove keeps the remaining products in creation order
        Ok(self.products.lock().await.shift_remove(&id).is_some())
    }
}
