//! PostgreSQL `CatalogStore` backed by a `sqlx` pool.
//!
//! Parent columns are plain `uuid` values without foreign keys: deleting a parent never
//! touches its products, which is the documented cascade behaviour. Product images and
//! specs are `jsonb`, money columns are `numeric`. Schema lives in `sql/schema.sql`.

use super::{CatalogStore, StoreFuture};
use crate::catalog::model::{
    AssetRef, Brand, Category, Discount, DiscountType, Lookup, Page, ParentRef, Product,
    ProductQuery, ProductSummary, SubCategory,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, types::Json, FromRow, PgPool, Row};
use uuid::Uuid;

/// Idempotent DDL for every catalog table.
pub const SCHEMA: &str = include_str!("../../sql/schema.sql");

const CATEGORY_COLUMNS: &str = "id, name, slug, short_id, image_url, image_key";
const SUB_CATEGORY_COLUMNS: &str = "id, name, slug, short_id, image_url, image_key, category_id";
const BRAND_COLUMNS: &str =
    "id, name, slug, short_id, image_url, image_key, category_id, sub_category_id";
const PRODUCT_COLUMNS: &str = "id, title, slug, overview, badge, specs, stock, price, \
     discount_amount, discount_type, applied_price, images, short_id, category_id, \
     sub_category_id, brand_id";
const SUMMARY_COLUMNS: &str =
    "id, title, slug, overview, badge, stock, price, discount_amount, discount_type, applied_price";

/// Equality filter shared by every single-record lookup. `$1`..`$3` are id, name, slug.
fn lookup_clause(name_column: &str) -> String {
    format!(
        "($1::uuid IS NULL OR id = $1) \
         AND ($2::text IS NULL OR {name_column} = $2) \
         AND ($3::text IS NULL OR slug = $3)"
    )
}

fn image_from_row(row: &PgRow) -> Result<AssetRef, sqlx::Error> {
    Ok(AssetRef {
        remote_url: row.try_get("image_url")?,
        storage_key: row.try_get("image_key")?,
    })
}

fn discount_from_row(row: &PgRow) -> Result<Option<Discount>, sqlx::Error> {
    let amount: Option<Decimal> = row.try_get("discount_amount")?;
    let kind: Option<String> = row.try_get("discount_type")?;
    match (amount, kind) {
        (Some(amount), Some(kind)) => {
            let kind = DiscountType::parse(&kind).ok_or_else(|| {
                sqlx::Error::Decode(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid products.discount_type value: {kind}"),
                )))
            })?;
            Ok(Some(Discount { amount, kind }))
        }
        _ => Ok(None),
    }
}

impl<'r> FromRow<'r, PgRow> for Category {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            short_id: row.try_get("short_id")?,
            image: image_from_row(row)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for SubCategory {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            short_id: row.try_get("short_id")?,
            image: image_from_row(row)?,
            category_id: row.try_get("category_id")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Brand {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            short_id: row.try_get("short_id")?,
            image: image_from_row(row)?,
            category_id: row.try_get("category_id")?,
            sub_category_id: row.try_get("sub_category_id")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(specs): Json<Map<String, Value>> = row.try_get("specs")?;
        let Json(images): Json<Vec<AssetRef>> = row.try_get("images")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            overview: row.try_get("overview")?,
            badge: row.try_get("badge")?,
            specs,
            stock: row.try_get("stock")?,
            price: row.try_get("price")?,
            discount: discount_from_row(row)?,
            applied_price: row.try_get("applied_price")?,
            images,
            short_id: row.try_get("short_id")?,
            category_id: row.try_get("category_id")?,
            sub_category_id: row.try_get("sub_category_id")?,
            brand_id: row.try_get("brand_id")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ProductSummary {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            overview: row.try_get("overview")?,
            badge: row.try_get("badge")?,
            stock: row.try_get("stock")?,
            price: row.try_get("price")?,
            discount: discount_from_row(row)?,
            applied_price: row.try_get("applied_price")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates missing tables and indexes.
    ///
    /// # Errors
    /// Returns the database error if any statement fails.
    pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_one<T>(
        &self,
        table: &str,
        columns: &str,
        name_column: &str,
        lookup: &Lookup,
    ) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let query = format!(
            "SELECT {columns} FROM {table} WHERE {} ORDER BY created_at, id LIMIT 1",
            lookup_clause(name_column)
        );
        sqlx::query_as::<_, T>(&query)
            .bind(lookup.id)
            .bind(lookup.name.as_deref())
            .bind(lookup.slug.as_deref())
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_where(&self, table: &str, column: &str, id: Uuid) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM {table} WHERE {column} = $1");
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

impl CatalogStore for PgCatalogStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn insert_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO categories (id, name, slug, short_id, image_url, image_key)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.short_id)
            .bind(&category.image.remote_url)
            .bind(&category.image.storage_key)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn find_category<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Category>> {
        Box::pin(async move {
            Ok(self
                .find_one("categories", CATEGORY_COLUMNS, "name", lookup)
                .await?)
        })
    }

    fn save_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE categories
                SET name = $2, slug = $3, image_url = $4, image_key = $5, updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.image.remote_url)
            .bind(&category.image.storage_key)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn delete_category(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.delete_where("categories", "id", id).await? > 0) })
    }

    fn insert_sub_category<'a>(&'a self, sub_category: &'a SubCategory) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO sub_categories
                (id, name, slug, short_id, image_url, image_key, category_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(sub_category.id)
            .bind(&sub_category.name)
            .bind(&sub_category.slug)
            .bind(&sub_category.short_id)
            .bind(&sub_category.image.remote_url)
            .bind(&sub_category.image.storage_key)
            .bind(sub_category.category_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn find_sub_category<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<SubCategory>> {
        Box::pin(async move {
            Ok(self
                .find_one("sub_categories", SUB_CATEGORY_COLUMNS, "name", lookup)
                .await?)
        })
    }

    fn save_sub_category<'a>(&'a self, sub_category: &'a SubCategory) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE sub_categories
                SET name = $2, slug = $3, image_url = $4, image_key = $5, updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(sub_category.id)
            .bind(&sub_category.name)
            .bind(&sub_category.slug)
            .bind(&sub_category.image.remote_url)
            .bind(&sub_category.image.storage_key)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn delete_sub_category(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.delete_where("sub_categories", "id", id).await? > 0) })
    }

    fn delete_sub_categories_by_category(&self, category_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            Ok(self
                .delete_where("sub_categories", "category_id", category_id)
                .await?)
        })
    }

    fn insert_brand<'a>(&'a self, brand: &'a Brand) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO brands
                (id, name, slug, short_id, image_url, image_key, category_id, sub_category_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(brand.id)
            .bind(&brand.name)
            .bind(&brand.slug)
            .bind(&brand.short_id)
            .bind(&brand.image.remote_url)
            .bind(&brand.image.storage_key)
            .bind(brand.category_id)
            .bind(brand.sub_category_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn find_brand<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Brand>> {
        Box::pin(async move { Ok(self.find_one("brands", BRAND_COLUMNS, "name", lookup).await?) })
    }

    fn save_brand<'a>(&'a self, brand: &'a Brand) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE brands
                SET name = $2, slug = $3, image_url = $4, image_key = $5, updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(brand.id)
            .bind(&brand.name)
            .bind(&brand.slug)
            .bind(&brand.image.remote_url)
            .bind(&brand.image.storage_key)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn delete_brand(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.delete_where("brands", "id", id).await? > 0) })
    }

    fn delete_brands_by_category(&self, category_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move { Ok(self.delete_where("brands", "category_id", category_id).await?) })
    }

    fn delete_brands_by_sub_category(&self, sub_category_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            Ok(self
                .delete_where("brands", "sub_category_id", sub_category_id)
                .await?)
        })
    }

    fn insert_product<'a>(&'a self, product: &'a Product) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO products
                (id, title, slug, overview, badge, specs, stock, price, discount_amount,
                 discount_type, applied_price, images, short_id, category_id, sub_category_id,
                 brand_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                ",
            )
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.slug)
            .bind(&product.overview)
            .bind(product.badge.as_deref())
            .bind(Json(&product.specs))
            .bind(product.stock)
            .bind(product.price)
            .bind(product.discount.map(|d| d.amount))
            .bind(product.discount.map(|d| d.kind.as_str()))
            .bind(product.applied_price)
            .bind(Json(&product.images))
            .bind(&product.short_id)
            .bind(product.category_id)
            .bind(product.sub_category_id)
            .bind(product.brand_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn find_product<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Product>> {
        Box::pin(async move {
            Ok(self
                .find_one("products", PRODUCT_COLUMNS, "title", lookup)
                .await?)
        })
    }

    fn save_product<'a>(&'a self, product: &'a Product) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE products
                SET title = $2, slug = $3, overview = $4, badge = $5, specs = $6, stock = $7,
                    price = $8, discount_amount = $9, discount_type = $10, applied_price = $11,
                    images = $12, updated_at = NOW()
                WHERE id = $1
                ",
            )
            .bind(product.id)
            .bind(&product.title)
            .bind(&product.slug)
            .bind(&product.overview)
            .bind(product.badge.as_deref())
            .bind(Json(&product.specs))
            .bind(product.stock)
            .bind(product.price)
            .bind(product.discount.map(|d| d.amount))
            .bind(product.discount.map(|d| d.kind.as_str()))
            .bind(product.applied_price)
            .bind(Json(&product.images))
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn delete_product(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.delete_where("products", "id", id).await? > 0) })
    }

    fn list_products(&self, query: ProductQuery) -> StoreFuture<'_, Page<ProductSummary>> {
        Box::pin(async move {
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE applied_price >= $1")
                    .bind(query.min_applied_price)
                    .fetch_one(&self.pool)
                    .await?;

            let select = format!(
                "SELECT {SUMMARY_COLUMNS} FROM products WHERE applied_price >= $1 \
                 ORDER BY applied_price ASC, created_at ASC, id ASC LIMIT $2 OFFSET $3"
            );
            let docs = sqlx::query_as::<_, ProductSummary>(&select)
                .bind(query.min_applied_price)
                .bind(i64::from(query.limit))
                .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
                .fetch_all(&self.pool)
                .await?;

            Ok(Page::new(
                docs,
                u64::try_from(total).unwrap_or_default(),
                query.page,
                query.limit,
            ))
        })
    }

    fn count_products_referencing(&self, parent: ParentRef) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let (column, id) = match parent {
                ParentRef::Category(id) => ("category_id", id),
                ParentRef::SubCategory(id) => ("sub_category_id", id),
                ParentRef::Brand(id) => ("brand_id", id),
            };
            let query = format!("SELECT COUNT(*) FROM products WHERE {column} = $1");
            let count: i64 = sqlx::query_scalar(&query)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_clause_uses_name_column() {
        let clause = lookup_clause("title");
        assert!(clause.contains("title = $2"));
        assert!(clause.contains("$1::uuid IS NULL"));
        assert!(clause.contains("slug = $3"));
    }

    #[test]
    fn schema_is_idempotent_and_has_no_foreign_keys() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS products"));
        assert!(!SCHEMA.to_uppercase().contains("REFERENCES"));
    }

    #[test]
    fn summary_columns_skip_heavy_fields() {
        for column in ["images", "specs", "category_id", "sub_category_id", "brand_id"] {
            assert!(!SUMMARY_COLUMNS.split(", ").any(|c| c == column));
        }
    }
}
