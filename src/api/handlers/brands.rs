use super::{
    success,
    upload::{UploadForm, UploadPolicy},
    Envelope, ErrorBody,
};
use crate::catalog::{
    brands::BrandUpdate,
    model::{Brand, Lookup},
    Catalog, DeleteReport,
};
use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct BrandForm {
    name: String,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// Parents of a new brand. The sub-category must belong to the category.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct BrandParents {
    pub category: Uuid,
    pub sub_category: Uuid,
}

#[utoipa::path(
    post,
    path = "/brands",
    params(BrandParents),
    request_body(content = BrandForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Brand created", body = Envelope<Brand>),
        (status = 400, description = "Missing fields or mismatched parents", body = ErrorBody),
        (status = 404, description = "Parent not found", body = ErrorBody),
        (status = 502, description = "Image upload failed", body = ErrorBody),
    ),
    tag = "brands"
)]
/// Create a brand under a category and one of its sub-categories.
pub async fn create_brand(
    catalog: Extension<Catalog>,
    policy: Extension<Arc<UploadPolicy>>,
    Query(parents): Query<BrandParents>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match UploadForm::read(multipart, &policy).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let image = form.take_file("image");
    let name = form.text("name").unwrap_or_default();

    match catalog
        .create_brand(parents.category, parents.sub_category, name, image.as_ref())
        .await
    {
        Ok(brand) => success(StatusCode::CREATED, "Brand created successfully", brand),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/brands",
    params(Lookup),
    responses(
        (status = 200, description = "Matching brand", body = Envelope<Brand>),
        (status = 400, description = "No filter given", body = ErrorBody),
        (status = 404, description = "Brand not found", body = ErrorBody),
    ),
    tag = "brands"
)]
pub async fn get_brand(catalog: Extension<Catalog>, Query(lookup): Query<Lookup>) -> impl IntoResponse {
    match catalog.find_brand(&lookup).await {
        Ok(brand) => success(StatusCode::OK, "Brand found", brand),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand id")),
    request_body(content = BrandForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Brand updated", body = Envelope<Brand>),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 404, description = "Brand or a parent not found", body = ErrorBody),
    ),
    tag = "brands"
)]
pub async fn update_brand(
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
    let update = BrandUpdate {
        name: form.text("name").map(str::to_string),
    };

    match catalog.update_brand(id, update, image.as_ref()).await {
        Ok(brand) => success(StatusCode::OK, "Brand updated successfully", brand),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Brand removed; products left behind are reported", body = Envelope<DeleteReport>),
        (status = 404, description = "Brand not found", body = ErrorBody),
    ),
    tag = "brands"
)]
/// Delete a brand and its asset folder.
pub async fn delete_brand(catalog: Extension<Catalog>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match catalog.delete_brand(id).await {
        Ok(report) => success(StatusCode::OK, "Brand deleted successfully", report),
        Err(err) => err.into_response(),
    }
}
