use super::{
    success,
    upload::{UploadForm, UploadPolicy},
    Envelope, ErrorBody,
};
use crate::catalog::{
    categories::CategoryUpdate,
    model::{Category, Lookup},
    Catalog, DeleteReport,
};
use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Multipart body for category create and update.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct CategoryForm {
    name: String,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body(content = CategoryForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Category created", body = Envelope<Category>),
        (status = 400, description = "Missing name or image", body = ErrorBody),
        (status = 502, description = "Image upload failed", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Create a category; the image lands in the new category folder.
pub async fn create_category(
    catalog: Extension<Catalog>,
    policy: Extension<Arc<UploadPolicy>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match UploadForm::read(multipart, &policy).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let image = form.take_file("image");
    let name = form.text("name").unwrap_or_default();

    match catalog.create_category(name, image.as_ref()).await {
        Ok(category) => success(StatusCode::CREATED, "Category created successfully", category),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/categories",
    params(Lookup),
    responses(
        (status = 200, description = "Matching category", body = Envelope<Category>),
        (status = 400, description = "No filter given", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Find one category by id, name or slug.
pub async fn get_category(
    catalog: Extension<Catalog>,
    Query(lookup): Query<Lookup>,
) -> impl IntoResponse {
    match catalog.find_category(&lookup).await {
        Ok(category) => success(StatusCode::OK, "Category found", category),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body(content = CategoryForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Category updated", body = Envelope<Category>),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Rename a category and/or replace its image under the same storage key.
pub async fn update_category(
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
    let update = CategoryUpdate {
        name: form.text("name").map(str::to_string),
    };
    match catalog.update_category(id, update, image.as_ref()).await {
        Ok(category) => success(StatusCode::OK, "Category updated successfully", category),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category removed; cascade outcome in the report", body = Envelope<DeleteReport>),
        (status = 404, description = "Category not found", body = ErrorBody),
    ),
    tag = "categories"
)]
/// Delete a category, its asset folder, and its sub-categories and brands.
pub async fn delete_category(catalog: Extension<Catalog>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match catalog.delete_category(id).await {
        Ok(report) => success(StatusCode::OK, "Category deleted successfully", report),
        Err(err) => err.into_response(),
    }
}
