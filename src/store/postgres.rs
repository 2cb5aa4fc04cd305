use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::ProductStore;
use crate::error::AppResult;
use crate::models::{NewProduct, Predicate, Product, ProductFilter, ProductPatch};

const COLUMNS: &str =
    "id, name, description, price, category, stock, image_url, created_at, updated_at";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name        TEXT NOT NULL,
        description TEXT NOT NULL,
        price       DOUBLE PRECISION NOT NULL CHECK (price > 0),
        category    TEXT NOT NULL,
        stock       INTEGER NOT NULL CHECK (stock >= 0),
        image_url   TEXT,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
    "CREATE INDEX IF NOT EXISTS idx_products_created_at ON products (created_at)",
];

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the `products` table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Products schema ready.");
        Ok(())
    }
}

/// Escapes LIKE metacharacters so the term matches as a literal substring.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Category(category) => {
            qb.push("category = ").push_bind(category.clone());
        }
        Predicate::Search(term) => {
            let pattern = like_pattern(term);
            qb.push("(name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        Predicate::MinPrice(min) => {
            qb.push("price >= ").push_bind(*min);
        }
        Predicate::MaxPrice(max) => {
            qb.push("price <= ").push_bind(*max);
        }
    }
}

fn list_query(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM products"));
    for (i, predicate) in filter.predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(&mut qb, predicate);
    }
    qb.push(" ORDER BY created_at ASC, id ASC");
    qb
}

fn update_query(id: Uuid, patch: ProductPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "UPDATE products SET updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')",
    );
    if let Some(name) = patch.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(description) = patch.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(price) = patch.price {
        qb.push(", price = ").push_bind(price);
    }
    if let Some(category) = patch.category {
        qb.push(", category = ").push_bind(category);
    }
    if let Some(stock) = patch.stock {
        qb.push(", stock = ").push_bind(stock);
    }
    if let Some(image_url) = patch.image_url {
        qb.push(", image_url = ").push_bind(image_url);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {COLUMNS}"));
    qb
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let mut qb = list_query(filter);
        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn insert(&self, new: NewProduct) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, description, price, category, stock, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.category)
        .bind(new.stock)
        .bind(&new.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> AppResult<Option<Product>> {
        let mut qb = update_query(id, patch);
        let product = qb
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("lamp"), "%lamp%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn unfiltered_list_has_no_where_clause() {
        let qb = list_query(&ProductFilter::default());
        assert_eq!(
            qb.sql(),
            format!("SELECT {COLUMNS} FROM products ORDER BY created_at ASC, id ASC")
        );
    }

    #[test]
    fn filters_are_bound_not_interpolated() {
        let filter = ProductFilter {
            predicates: vec![
                Predicate::Category("'; DROP TABLE products; --".to_string()),
                Predicate::Search("lamp".to_string()),
                Predicate::MinPrice(10.0),
                Predicate::MaxPrice(20.0),
            ],
        };
        let qb = list_query(&filter);
        let sql = qb.sql();

        assert!(!sql.contains("DROP TABLE"));
        assert!(!sql.contains("lamp"));
        assert!(sql.contains(
            " WHERE category = $1 AND (name ILIKE $2 OR description ILIKE $3) \
             AND price >= $4 AND price <= $5 ORDER BY"
        ));
    }

    #[test]
    fn update_sets_only_supplied_columns() {
        let patch = ProductPatch {
            price: Some(12.0),
            image_url: Some(None),
            ..Default::default()
        };
        let qb = update_query(Uuid::nil(), patch);
        let sql = qb.sql();

        assert!(sql.contains(", price = $1, image_url = $2 WHERE id = $3 RETURNING"));
        assert!(!sql.contains("name ="));
        assert!(!sql.contains("stock ="));
    }
}
