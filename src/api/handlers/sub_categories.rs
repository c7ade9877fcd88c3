use super::{
    success,
    upload::{UploadForm, UploadPolicy},
    Envelope, ErrorBody,
};
use crate::catalog::{
    model::{Lookup, SubCategory},
    sub_categories::SubCategoryUpdate,
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
pub struct SubCategoryForm {
    name: String,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct SubCategoryParent {
    pub category_id: Uuid,
}

#[utoipa::path(
    post,
    path = "/sub-categories",
    params(SubCategoryParent),
    request_body(content = SubCategoryForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Sub-category created", body = Envelope<SubCategory>),
        (status = 400, description = "Missing name or image", body = ErrorBody),
        (status = 404, description = "Category not found", body = ErrorBody),
        (status = 502, description = "Image upload failed", body = ErrorBody),
    ),
    tag = "sub-categories"
)]
/// Create a sub-category inside an existing category.
pub async fn create_sub_category(
    catalog: Extension<Catalog>,
    policy: Extension<Arc<UploadPolicy>>,
    Query(parent): Query<SubCategoryParent>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut form = match UploadForm::read(multipart, &policy).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    let image = form.take_file("image");
    let name = form.text("name").unwrap_or_default();

    match catalog
        .create_sub_category(parent.category_id, name, image.as_ref())
        .await
    {
        Ok(sub_category) => success(
            StatusCode::CREATED,
            "Sub-Category created successfully",
            sub_category,
        ),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/sub-categories",
    params(Lookup),
    responses(
        (status = 200, description = "Matching sub-category", body = Envelope<SubCategory>),
        (status = 400, description = "No filter given", body = ErrorBody),
        (status = 404, description = "Sub-category not found", body = ErrorBody),
    ),
    tag = "sub-categories"
)]
/// Find one sub-category by id, name or slug.
pub async fn get_sub_category(
    catalog: Extension<Catalog>,
    Query(lookup): Query<Lookup>,
) -> impl IntoResponse {
    match catalog.find_sub_category(&lookup).await {
        Ok(sub_category) => success(StatusCode::OK, "SubCategory found", sub_category),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/sub-categories/{id}",
    params(("id" = Uuid, Path, description = "Sub-category id")),
    request_body(content = SubCategoryForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Sub-category updated", body = Envelope<SubCategory>),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 404, description = "Sub-category or its category not found", body = ErrorBody),
    ),
    tag = "sub-categories"
)]
pub async fn update_sub_category(
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
    let update = SubCategoryUpdate {
        name: form.text("name").map(str::to_string),
    };

    match catalog.update_sub_category(id, update, image.as_ref()).await {
        Ok(sub_category) => success(
            StatusCode::OK,
            "SubCategory updated successfully",
            sub_category,
        ),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/sub-categories/{id}",
    params(("id" = Uuid, Path, description = "Sub-category id")),
    responses(
        (status = 200, description = "Sub-category removed; cascade outcome in the report", body = Envelope<DeleteReport>),
        (status = 404, description = "Sub-category not found", body = ErrorBody),
    ),
    tag = "sub-categories"
)]
/// Delete a sub-category, its asset folder and its brands.
pub async fn delete_sub_category(
    catalog: Extension<Catalog>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match catalog.delete_sub_category(id).await {
        Ok(report) => success(StatusCode::OK, "SubCategory deleted successfully", report),
        Err(err) => err.into_response(),
    }
}
