use super::{
    clean_name,
    model::{Discount, DiscountType, Lookup, Page, Product, ProductQuery, ProductSummary},
    pricing, require_filter, Catalog, CatalogError, Result,
};
use crate::objects::StagedFile;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{info, instrument};
use uuid::Uuid;

/// Upper bound on images attached at product creation.
pub const MAX_PRODUCT_IMAGES: usize = 5;
/// Only products at or above this applied price are listed.
pub const LISTING_PRICE_FLOOR: i64 = 20_000;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 5;

/// Parent ids a product is created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductParents {
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub brand_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub title: String,
    pub overview: String,
    pub badge: Option<String>,
    pub specs: Map<String, Value>,
    pub stock: i32,
    pub price: Decimal,
    pub discount_amount: Option<Decimal>,
    pub discount_type: Option<DiscountType>,
}

/// Product fields to change; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub badge: Option<String>,
    pub specs: Option<Map<String, Value>>,
    pub stock: Option<i32>,
    pub price: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub discount_type: Option<DiscountType>,
}

impl ProductUpdate {
    fn touches_price(&self) -> bool {
        self.price.is_some() || self.discount_amount.is_some() || self.discount_type.is_some()
    }
}

/// A new file for the stored image whose key is `image_key`.
#[derive(Debug, Clone, Copy)]
pub struct ImageReplacement<'a> {
    pub image_key: &'a str,
    pub file: &'a StagedFile,
}

/// Combines a partial discount with the stored one; each missing half falls back to
/// what is stored.
fn merge_discount(
    amount: Option<Decimal>,
    kind: Option<DiscountType>,
    stored: Option<Discount>,
) -> Result<Option<Discount>> {
    let amount = amount.or(stored.map(|d| d.amount));
    let kind = kind.or(stored.map(|d| d.kind));
    match (amount, kind) {
        (None, None) => Ok(None),
        (Some(amount), Some(kind)) => pricing::validate_discount(Discount { amount, kind }).map(Some),
        (Some(_), None) => Err(CatalogError::validation(
            "discountType is required with discountAmount",
        )),
        (None, Some(_)) => Err(CatalogError::validation(
            "discountAmount is required with discountType",
        )),
    }
}

fn validate_stock(stock: i32) -> Result<i32> {
    if stock < 0 {
        return Err(CatalogError::validation("Stock must not be negative"));
    }
    Ok(stock)
}

impl Catalog {
    /// Creates a product under a consistent category/sub-category/brand chain.
    ///
    /// Images are uploaded one by one into the product folder. If any upload fails the
    /// folder is removed best-effort and nothing is written.
    ///
    /// # Errors
    /// `NotFound` for a missing parent, `Validation` for inconsistent parents, bad
    /// fields, or an image count outside `1..=MAX_PRODUCT_IMAGES`; `Upload`/`Store` as
    /// for categories.
    #[instrument(skip(self, product, images), fields(images = images.len()))]
    pub async fn create_product(
        &self,
        parents: ProductParents,
        product: NewProduct,
        images: &[StagedFile],
    ) -> Result<Product> {
        let lineage = self
            .resolve_brand_lineage(parents.category_id, parents.sub_category_id, parents.brand_id)
            .await?;

        let (title, slug) = clean_name(&product.title, "Title")?;
        let stock = validate_stock(product.stock)?;
        let price = pricing::validate_price(product.price)?;
        let discount = merge_discount(product.discount_amount, product.discount_type, None)?;
        let applied_price = pricing::applied_price(price, discount.as_ref())?;
        if images.is_empty() {
            return Err(CatalogError::validation("Please upload at least one image"));
        }
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(CatalogError::validation(format!(
                "At most {MAX_PRODUCT_IMAGES} images are allowed"
            )));
        }

        let short_id = self.identity.new_short_id();
        let folder = lineage.folder(&self.assets.root()).product(&short_id);
        let mut stored = Vec::with_capacity(images.len());
        for image in images {
            match self.assets.store(image, &folder).await {
                Ok(asset) => stored.push(asset),
                Err(err) => {
                    if !stored.is_empty() {
                        self.discard_uploads(&folder).await;
                    }
                    return Err(err);
                }
            }
        }

        let product = Product {
            id: Uuid::new_v4(),
            title,
            slug,
            overview: product.overview.trim().to_string(),
            badge: product.badge.filter(|badge| !badge.trim().is_empty()),
            specs: product.specs,
            stock,
            price,
            applied_price,
            discount,
            images: stored,
            short_id,
            category_id: lineage.category.id,
            sub_category_id: lineage.sub_category.id,
            brand_id: lineage.brand.id,
        };
        if let Err(err) = self.store.insert_product(&product).await {
            self.discard_uploads(&folder).await;
            return Err(err.into());
        }

        info!(id = %product.id, brand = %product.brand_id, "product created");
        Ok(product)
    }

    /// Looks a product up by id, title (`lookup.name`) or slug.
    ///
    /// # Errors
    /// `Validation` for an empty lookup, `NotFound` when nothing matches.
    #[instrument(skip(self))]
    pub async fn find_product(&self, lookup: &Lookup) -> Result<Product> {
        require_filter(lookup)?;
        self.store
            .find_product(lookup)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product not found"))
    }

    /// Applies `update`. A change to price or either half of the discount recomputes the
    /// applied price from the merged values; `replacement` overwrites one stored image
    /// in place.
    ///
    /// # Errors
    /// `NotFound` for a missing product, an unknown `image_key`, or (with a replacement)
    /// missing parents; `Validation` for bad fields; `Upload` when the replacement fails.
    #[instrument(skip(self, update, replacement))]
    pub async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
        replacement: Option<ImageReplacement<'_>>,
    ) -> Result<Product> {
        let mut product = self.require_product(id).await?;

        if update.touches_price() {
            let price = pricing::validate_price(update.price.unwrap_or(product.price))?;
            let discount =
                merge_discount(update.discount_amount, update.discount_type, product.discount)?;
            product.applied_price = pricing::applied_price(price, discount.as_ref())?;
            product.price = price;
            product.discount = discount;
        }
        if let Some(title) = update.title {
            let (title, slug) = clean_name(&title, "Title")?;
            product.title = title;
            product.slug = slug;
        }
        if let Some(stock) = update.stock {
            product.stock = validate_stock(stock)?;
        }
        if let Some(overview) = update.overview {
            product.overview = overview.trim().to_string();
        }
        if let Some(badge) = update.badge {
            product.badge = Some(badge).filter(|badge| !badge.trim().is_empty());
        }
        if let Some(specs) = update.specs {
            product.specs = specs;
        }

        if let Some(replacement) = replacement {
            let index = product
                .images
                .iter()
                .position(|image| image.storage_key == replacement.image_key)
                .ok_or_else(|| CatalogError::not_found("Image not found"))?;
            let folder = self.product_folder(&product).await?;
            product.images[index] = self
                .assets
                .replace(replacement.file, &folder, replacement.image_key)
                .await?;
        }

        if !self.store.save_product(&product).await? {
            return Err(CatalogError::not_found("Product not found"));
        }
        info!(id = %product.id, applied_price = %product.applied_price, "product updated");
        Ok(product)
    }

    /// Lists products priced at or above the listing floor, cheapest first.
    ///
    /// # Errors
    /// `Validation` when `page` or `limit` is zero.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<ProductSummary>> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 || limit == 0 {
            return Err(CatalogError::validation("page and limit must be positive"));
        }
        let query = ProductQuery {
            min_applied_price: Decimal::from(LISTING_PRICE_FLOOR),
            page,
            limit,
        };
        Ok(self.store.list_products(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        model::{Brand, Category, SubCategory},
        testing::{memory_catalog, png},
    };

    async fn chain(catalog: &Catalog) -> (Category, SubCategory, Brand) {
        let Ok(category) = catalog.create_category("Video", Some(&png(vec![1]))).await else {
            panic!("category");
        };
        let Ok(sub) = catalog
            .create_sub_category(category.id, "TVs", Some(&png(vec![1])))
            .await
        else {
            panic!("sub-category");
        };
        let Ok(brand) = catalog
            .create_brand(category.id, sub.id, "Acme", Some(&png(vec![1])))
            .await
        else {
            panic!("brand");
        };
        (category, sub, brand)
    }

    fn parents(category: &Category, sub: &SubCategory, brand: &Brand) -> ProductParents {
        ProductParents {
            category_id: category.id,
            sub_category_id: sub.id,
            brand_id: brand.id,
        }
    }

    fn new_product(title: &str, price: i64) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            overview: "A product".to_string(),
            stock: 3,
            price: Decimal::from(price),
            ..NewProduct::default()
        }
    }

    #[tokio::test]
    async fn create_computes_applied_price_and_folder() {
        let (catalog, _, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let mut input = new_product("OLED 55", 100);
        input.discount_amount = Some(Decimal::from(10));
        input.discount_type = Some(DiscountType::Percentage);

        let Ok(product) = catalog
            .create_product(parents(&category, &sub, &brand), input, &[png(vec![1]), png(vec![2])])
            .await
        else {
            panic!("create");
        };
        assert_eq!(product.applied_price, Decimal::from(90));
        assert_eq!(product.slug, "oled_55");
        assert_eq!(product.images.len(), 2);
        let prefix = format!(
            "catalog/Categories/{}/SubCategories/{}/Brands/{}/Products/{}/",
            category.short_id, sub.short_id, brand.short_id, product.short_id
        );
        assert!(product.images.iter().all(|i| i.storage_key.starts_with(&prefix)));
    }

    #[tokio::test]
    async fn create_requires_images() {
        let (catalog, store, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let result = catalog
            .create_product(parents(&category, &sub, &brand), new_product("x", 1), &[])
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));

        let six: Vec<StagedFile> = (0..6).map(|i| png(vec![i])).collect();
        let result = catalog
            .create_product(parents(&category, &sub, &brand), new_product("x", 1), &six)
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert!(store.products().await.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_brand_from_other_chain() {
        let (catalog, _, objects) = memory_catalog();
        let (category, sub, _) = chain(&catalog).await;
        let (_, _, other_brand) = chain(&catalog).await;
        let uploads = objects.upload_count();
        let result = catalog
            .create_product(
                parents(&category, &sub, &other_brand),
                new_product("x", 1),
                &[png(vec![1])],
            )
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert_eq!(objects.upload_count(), uploads);
    }

    #[tokio::test]
    async fn price_update_reuses_stored_discount() {
        let (catalog, _, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let mut input = new_product("OLED", 100);
        input.discount_amount = Some(Decimal::from(30));
        input.discount_type = Some(DiscountType::Fixed);
        let Ok(product) = catalog
            .create_product(parents(&category, &sub, &brand), input, &[png(vec![1])])
            .await
        else {
            panic!("create");
        };
        assert_eq!(product.applied_price, Decimal::from(70));

        let update = ProductUpdate {
            price: Some(Decimal::from(200)),
            ..ProductUpdate::default()
        };
        let Ok(updated) = catalog.update_product(product.id, update, None).await else {
            panic!("update");
        };
        assert_eq!(updated.applied_price, Decimal::from(170));
        assert_eq!(updated.discount, product.discount);

        let update = ProductUpdate {
            discount_type: Some(DiscountType::Percentage),
            ..ProductUpdate::default()
        };
        let Ok(updated) = catalog.update_product(product.id, update, None).await else {
            panic!("update");
        };
        assert_eq!(updated.applied_price, Decimal::from(140));
    }

    #[tokio::test]
    async fn discount_above_price_clamps_to_zero() {
        let (catalog, _, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let mut input = new_product("Freebie", 100);
        input.discount_amount = Some(Decimal::from(150));
        input.discount_type = Some(DiscountType::Fixed);
        let result = catalog
            .create_product(parents(&category, &sub, &brand), input, &[png(vec![1])])
            .await;
        assert!(matches!(result, Ok(p) if p.applied_price == Decimal::ZERO));
    }

    #[tokio::test]
    async fn half_discount_without_stored_value_is_rejected() {
        let (catalog, _, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let mut input = new_product("OLED", 100);
        input.discount_amount = Some(Decimal::from(5));
        let result = catalog
            .create_product(parents(&category, &sub, &brand), input, &[png(vec![1])])
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn failed_image_upload_cleans_partial_folder() {
        let (catalog, store, objects) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let before = objects.keys().await.len();
        objects.fail_uploads(true);
        let result = catalog
            .create_product(
                parents(&category, &sub, &brand),
                new_product("OLED", 100),
                &[png(vec![1])],
            )
            .await;
        assert!(matches!(result, Err(CatalogError::Upload(_))));
        assert_eq!(objects.keys().await.len(), before);
        assert!(store.products().await.is_empty());
    }

    #[tokio::test]
    async fn replace_one_image_in_place() {
        let (catalog, _, objects) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let Ok(product) = catalog
            .create_product(
                parents(&category, &sub, &brand),
                new_product("OLED", 100),
                &[png(vec![1]), png(vec![2])],
            )
            .await
        else {
            panic!("create");
        };
        let key = product.images[1].storage_key.clone();
        let file = png(vec![9]);
        let replacement = ImageReplacement {
            image_key: &key,
            file: &file,
        };
        let Ok(updated) = catalog
            .update_product(product.id, ProductUpdate::default(), Some(replacement))
            .await
        else {
            panic!("update");
        };
        assert_eq!(updated.images[0], product.images[0]);
        assert_eq!(updated.images[1].storage_key, key);
        assert_ne!(updated.images[1].remote_url, product.images[1].remote_url);
        assert_eq!(objects.get(&key).await.map(|o| o.bytes), Some(vec![9]));

        let unknown = ImageReplacement {
            image_key: "catalog/nope",
            file: &file,
        };
        let result = catalog
            .update_product(product.id, ProductUpdate::default(), Some(unknown))
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn listing_applies_floor_and_order() {
        let (catalog, _, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        for (title, price) in [("c", 30_000), ("cheap", 19_999), ("a", 20_000), ("b", 25_000)] {
            let created = catalog
                .create_product(
                    parents(&category, &sub, &brand),
                    new_product(title, price),
                    &[png(vec![1])],
                )
                .await;
            assert!(created.is_ok());
        }

        let Ok(first) = catalog.list_products(None, Some(2)).await else {
            panic!("list");
        };
        let titles: Vec<&str> = first.docs.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(first.total_docs, 3);
        assert!(first.has_next_page);

        let Ok(second) = catalog.list_products(Some(2), Some(2)).await else {
            panic!("list");
        };
        assert_eq!(second.docs.len(), 1);
        assert_eq!(second.docs[0].title, "c");

        assert!(matches!(
            catalog.list_products(Some(0), None).await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_money_is_rejected_before_upload() {
        let (catalog, store, objects) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let uploads = objects.upload_count();

        let mut huge = new_product("Huge", 0);
        huge.price = Decimal::MAX;
        huge.discount_amount = Some(Decimal::from(10));
        huge.discount_type = Some(DiscountType::Percentage);
        let result = catalog
            .create_product(parents(&category, &sub, &brand), huge, &[png(vec![1])])
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));

        let trillion = new_product("Trillion", 1_000_000_000_000);
        let result = catalog
            .create_product(parents(&category, &sub, &brand), trillion, &[png(vec![1])])
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));

        assert_eq!(objects.upload_count(), uploads);
        assert!(store.products().await.is_empty());

        let Ok(product) = catalog
            .create_product(parents(&category, &sub, &brand), new_product("Ok", 100), &[png(vec![1])])
            .await
        else {
            panic!("create");
        };
        let update = ProductUpdate {
            price: Some(Decimal::MAX),
            ..ProductUpdate::default()
        };
        let result = catalog.update_product(product.id, update, None).await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn stored_money_matches_returned_money() {
        let (catalog, store, _) = memory_catalog();
        let (category, sub, brand) = chain(&catalog).await;
        let mut input = new_product("Cents", 0);
        input.price = Decimal::new(9999, 2);
        input.discount_amount = Some(Decimal::new(125, 1));
        input.discount_type = Some(DiscountType::Percentage);

        let Ok(product) = catalog
            .create_product(parents(&category, &sub, &brand), input, &[png(vec![1])])
            .await
        else {
            panic!("create");
        };
        assert_eq!(product.applied_price, Decimal::new(8749, 2));
        assert_eq!(product.applied_price.scale(), 2);
        let stored = store.products().await;
        assert_eq!(stored.first().map(|p| p.applied_price), Some(product.applied_price));
    }
}
