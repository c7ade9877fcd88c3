//! In-memory `CatalogStore`. Records keep insertion order, so lookups return the
//! oldest match the way an unsorted `findOne` would.

use super::{CatalogStore, StoreFuture};
use crate::catalog::model::{
    Brand, Category, Lookup, Page, ParentRef, Product, ProductQuery, ProductSummary, SubCategory,
};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    sub_categories: Vec<SubCategory>,
    brands: Vec<Brand>,
    products: Vec<Product>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    tables: RwLock<Tables>,
}

fn matches(lookup: &Lookup, id: Uuid, name: &str, slug: &str) -> bool {
    lookup.id.map_or(true, |wanted| wanted == id)
        && lookup.name.as_deref().map_or(true, |wanted| wanted == name)
        && lookup.slug.as_deref().map_or(true, |wanted| wanted == slug)
}

fn replace<T: Clone>(rows: &mut [T], record: &T, same: impl Fn(&T) -> bool) -> bool {
    match rows.iter_mut().find(|row| same(row)) {
        Some(row) => {
            *row = record.clone();
            true
        }
        None => false,
    }
}

fn remove_where<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> u64 {
    let before = rows.len();
    rows.retain(|row| !pred(row));
    (before - rows.len()) as u64
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.tables.read().await.categories.clone()
    }

    pub async fn sub_categories(&self) -> Vec<SubCategory> {
        self.tables.read().await.sub_categories.clone()
    }

    pub async fn brands(&self) -> Vec<Brand> {
        self.tables.read().await.brands.clone()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.tables.read().await.products.clone()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn insert_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.categories.push(category.clone());
            Ok(())
        })
    }

    fn find_category<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Category>> {
        Box::pin(async move {
            Ok(self
                .tables
                .read()
                .await
                .categories
                .iter()
                .find(|c| matches(lookup, c.id, &c.name, &c.slug))
                .cloned())
        })
    }

    fn save_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(replace(&mut tables.categories, category, |c| c.id == category.id))
        })
    }

    fn delete_category(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.categories, |c| c.id == id) > 0)
        })
    }

    fn insert_sub_category<'a>(&'a self, sub_category: &'a SubCategory) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables
                .write()
                .await
                .sub_categories
                .push(sub_category.clone());
            Ok(())
        })
    }

    fn find_sub_category<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<SubCategory>> {
        Box::pin(async move {
            Ok(self
                .tables
                .read()
                .await
                .sub_categories
                .iter()
                .find(|s| matches(lookup, s.id, &s.name, &s.slug))
                .cloned())
        })
    }

    fn save_sub_category<'a>(&'a self, sub_category: &'a SubCategory) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(replace(&mut tables.sub_categories, sub_category, |s| {
                s.id == sub_category.id
            }))
        })
    }

    fn delete_sub_category(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.sub_categories, |s| s.id == id) > 0)
        })
    }

    fn delete_sub_categories_by_category(&self, category_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.sub_categories, |s| {
                s.category_id == category_id
            }))
        })
    }

    fn insert_brand<'a>(&'a self, brand: &'a Brand) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.brands.push(brand.clone());
            Ok(())
        })
    }

    fn find_brand<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Brand>> {
        Box::pin(async move {
            Ok(self
                .tables
                .read()
                .await
                .brands
                .iter()
                .find(|b| matches(lookup, b.id, &b.name, &b.slug))
                .cloned())
        })
    }

    fn save_brand<'a>(&'a self, brand: &'a Brand) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(replace(&mut tables.brands, brand, |b| b.id == brand.id))
        })
    }

    fn delete_brand(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.brands, |b| b.id == id) > 0)
        })
    }

    fn delete_brands_by_category(&self, category_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.brands, |b| b.category_id == category_id))
        })
    }

    fn delete_brands_by_sub_category(&self, sub_category_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.brands, |b| {
                b.sub_category_id == sub_category_id
            }))
        })
    }

    fn insert_product<'a>(&'a self, product: &'a Product) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.tables.write().await.products.push(product.clone());
            Ok(())
        })
    }

    fn find_product<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Product>> {
        Box::pin(async move {
            Ok(self
                .tables
                .read()
                .await
                .products
                .iter()
                .find(|p| matches(lookup, p.id, &p.title, &p.slug))
                .cloned())
        })
    }

    fn save_product<'a>(&'a self, product: &'a Product) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(replace(&mut tables.products, product, |p| p.id == product.id))
        })
    }

    fn delete_product(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            Ok(remove_where(&mut tables.products, |p| p.id == id) > 0)
        })
    }

    fn list_products(&self, query: ProductQuery) -> StoreFuture<'_, Page<ProductSummary>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut eligible: Vec<&Product> = tables
                .products
                .iter()
                .filter(|p| p.applied_price >= query.min_applied_price)
                .collect();
            // stable: equal prices keep insertion order
            eligible.sort_by(|a, b| a.applied_price.cmp(&b.applied_price));

            let total = eligible.len() as u64;
            let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
            let docs = eligible
                .into_iter()
                .skip(offset)
                .take(query.limit as usize)
                .map(ProductSummary::from)
                .collect();
            Ok(Page::new(docs, total, query.page, query.limit))
        })
    }

    fn count_products_referencing(&self, parent: ParentRef) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let count = tables
                .products
                .iter()
                .filter(|p| match parent {
                    ParentRef::Category(id) => p.category_id == id,
                    ParentRef::SubCategory(id) => p.sub_category_id == id,
                    ParentRef::Brand(id) => p.brand_id == id,
                })
                .count();
            Ok(count as u64)
        })
    }
}
