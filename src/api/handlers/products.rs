//! Product routes.
//!
//! Numeric and JSON form fields arrive as text; they are parsed here and a malformed
//! value is a 400 with the field named. Range checks belong to the catalog.

use super::{
    success,
    upload::{UploadForm, UploadPolicy},
    Envelope, ErrorBody,
};
use crate::catalog::{
    model::{DiscountType, Lookup, Page, Product, ProductSummary},
    products::{ImageReplacement, NewProduct, ProductParents, ProductUpdate},
    Catalog, CatalogError, DeleteReport,
};
use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{str::FromStr, sync::Arc};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ProductForm {
    title: String,
    overview: String,
    /// JSON object, stored verbatim.
    specs: Option<String>,
    price: String,
    discount_amount: Option<String>,
    discount_type: Option<DiscountType>,
    stock: i32,
    badge: Option<String>,
    /// One to five files under the same field name.
    #[schema(value_type = Vec<String>)]
    image: Vec<Vec<u8>>,
}

#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ProductUpdateForm {
    title: Option<String>,
    overview: Option<String>,
    specs: Option<String>,
    price: Option<String>,
    discount_amount: Option<String>,
    discount_type: Option<DiscountType>,
    stock: Option<i32>,
    badge: Option<String>,
    /// Storage key of the image `image` replaces.
    image_key: Option<String>,
    #[schema(value_type = Option<String>)]
    image: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ProductParentsQuery {
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub brand_id: Uuid,
}

/// Single-product lookup; at least one filter is required.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductLookup {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub slug: Option<String>,
}

impl From<ProductLookup> for Lookup {
    fn from(lookup: ProductLookup) -> Self {
        Self {
            id: lookup.id,
            name: lookup.title,
            slug: lookup.slug,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Defaults to 1.
    pub page: Option<u32>,
    /// Defaults to 5.
    pub limit: Option<u32>,
}

fn parse_field<T: FromStr>(form: &UploadForm, field: &str) -> Result<Option<T>, CatalogError> {
    form.non_blank(field)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| CatalogError::validation(format!("Invalid {field}")))
        })
        .transpose()
}

fn parse_discount_type(form: &UploadForm) -> Result<Option<DiscountType>, CatalogError> {
    form.non_blank("discountType")
        .map(|value| {
            DiscountType::parse(value)
                .ok_or_else(|| CatalogError::validation("discountType must be percentage or fixed"))
        })
        .transpose()
}

fn parse_specs(form: &UploadForm) -> Result<Option<Map<String, Value>>, CatalogError> {
    form.non_blank("specs")
        .map(|value| match serde_json::from_str::<Value>(value) {
            Ok(Value::Object(specs)) => Ok(specs),
            _ => Err(CatalogError::validation("specs must be a JSON object")),
        })
        .transpose()
}

fn new_product(form: &UploadForm) -> Result<NewProduct, CatalogError> {
    Ok(NewProduct {
        title: form.text("title").unwrap_or_default().to_string(),
        overview: form.text("overview").unwrap_or_default().to_string(),
        badge: form.non_blank("badge").map(str::to_string),
        specs: parse_specs(form)?.unwrap_or_default(),
        stock: parse_field::<i32>(form, "stock")?
            .ok_or_else(|| CatalogError::validation("stock is required"))?,
        price: parse_field::<Decimal>(form, "price")?
            .ok_or_else(|| CatalogError::validation("price is required"))?,
        discount_amount: parse_field::<Decimal>(form, "discountAmount")?,
        discount_type: parse_discount_type(form)?,
    })
}

fn product_update(form: &UploadForm) -> Result<ProductUpdate, CatalogError> {
    Ok(ProductUpdate {
        title: form.text("title").map(str::to_string),
        overview: form.text("overview").map(str::to_string),
        badge: form.text("badge").map(str::to_string),
        specs: parse_specs(form)?,
        stock: parse_field::<i32>(form, "stock")?,
        price: parse_field::<Decimal>(form, "price")?,
        discount_amount: parse_field::<Decimal>(form, "discountAmount")?,
        discount_type: parse_discount_type(form)?,
    })
}

#[utoipa::path(
    post,
    path = "/products",
    params(ProductParentsQuery),
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product created", body = Envelope<Product>),
        (status = 400, description = "Invalid fields, images or parents", body = ErrorBody),
        (status = 404, description = "Parent not found", body = ErrorBody),
        (status = 502, description = "Image upload failed", body = ErrorBody),
    ),
    tag = "products"
)]
/// Create a product under a brand; the applied price is derived from price and discount.
pub async fn create_product(
    catalog: Extension<Catalog>,
    policy: Extension<Arc<UploadPolicy>>,
    Query(parents): Query<ProductParentsQuery>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match UploadForm::read(multipart, &policy).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let images = form.take_files("image");
    let product = match new_product(&form) {
        Ok(product) => product,
        Err(err) => return err.into_response(),
    };
    let parents = ProductParents {
        category_id: parents.category_id,
        sub_category_id: parents.sub_category_id,
        brand_id: parents.brand_id,
    };

    match catalog.create_product(parents, product, &images).await {
        Ok(product) => success(StatusCode::CREATED, "Product created successfully", product),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/products",
    params(ProductLookup),
    responses(
        (status = 200, description = "Matching product", body = Envelope<Product>),
        (status = 400, description = "No filter given", body = ErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn get_product(
    catalog: Extension<Catalog>,
    Query(lookup): Query<ProductLookup>,
) -> impl IntoResponse {
    match catalog.find_product(&lookup.into()).await {
        Ok(product) => success(StatusCode::OK, "Product found", product),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body(content = ProductUpdateForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Product updated", body = Envelope<Product>),
        (status = 400, description = "Invalid fields", body = ErrorBody),
        (status = 404, description = "Product or image not found", body = ErrorBody),
        (status = 502, description = "Image upload failed", body = ErrorBody),
    ),
    tag = "products"
)]
/// Update product fields; with `imageKey` and `image`, overwrite that stored image in place.
pub async fn update_product(
    catalog: Extension<Catalog>,
    policy: Extension<Arc<UploadPolicy>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match UploadForm::read(multipart, &policy).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let image = form.take_file("image");
    let update = match product_update(&form) {
        Ok(update) => update,
        Err(err) => return err.into_response(),
    };
    let replacement = match (form.non_blank("imageKey"), image.as_ref()) {
        (Some(image_key), Some(file)) => Some(ImageReplacement { image_key, file }),
        (None, None) => None,
        (None, Some(_)) => {
            return CatalogError::validation("imageKey is required to replace an image")
                .into_response()
        }
        (Some(_), None) => {
            return CatalogError::validation("image is required with imageKey").into_response()
        }
    };

    match catalog.update_product(id, update, replacement).await {
        Ok(product) => success(StatusCode::OK, "Product updated successfully", product),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/products/list",
    params(ListParams),
    responses(
        (status = 200, description = "Products at or above the listing floor, cheapest first", body = Envelope<Page<ProductSummary>>),
        (status = 400, description = "Zero page or limit", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn list_products(
    catalog: Extension<Catalog>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match catalog.list_products(params.page, params.limit).await {
        Ok(page) => success(StatusCode::OK, "Products list", page),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product and its images removed", body = Envelope<DeleteReport>),
        (status = 404, description = "Product not found", body = ErrorBody),
    ),
    tag = "products"
)]
pub async fn delete_product(catalog: Extension<Catalog>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match catalog.delete_product(id).await {
        Ok(report) => success(StatusCode::OK, "Product deleted successfully", report),
        Err(err) => err.into_response(),
    }
}
