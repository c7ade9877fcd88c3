#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode},
    Router,
};
use catalog::{
    api::{self, UploadPolicy},
    catalog::{AssetConfig, Catalog, IdentityConfig},
    objects::MemoryObjectStore,
    store::MemoryCatalogStore,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "catalog-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryCatalogStore>,
    pub objects: Arc<MemoryObjectStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn id(&self) -> Result<String> {
        self.data()["id"]
            .as_str()
            .map(str::to_string)
            .context("response carries no data.id")
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCatalogStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let catalog = Catalog::new(
            store.clone(),
            objects.clone(),
            AssetConfig::default(),
            IdentityConfig::default(),
        );
        let router = api::app(catalog, UploadPolicy::default(), None);
        Self {
            router,
            store,
            objects,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Request::builder().uri(uri).body(Body::empty())?)
            .await
    }

    pub async fn delete(&self, uri: &str) -> Result<TestResponse> {
        self.send(
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())?,
        )
        .await
    }

    pub async fn multipart(&self, method: Method, uri: &str, form: Form) -> Result<TestResponse> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(form.finish()))?,
        )
        .await
    }

    pub async fn create_category(&self, name: &str) -> Result<TestResponse> {
        self.multipart(
            Method::POST,
            "/categories",
            Form::new().text("name", name).png("image", &[1]),
        )
        .await
    }

    pub async fn create_sub_category(&self, category_id: &str, name: &str) -> Result<TestResponse> {
        self.multipart(
            Method::POST,
            &format!("/sub-categories?categoryId={category_id}"),
            Form::new().text("name", name).png("image", &[2]),
        )
        .await
    }

    pub async fn create_brand(
        &self,
        category_id: &str,
        sub_category_id: &str,
        name: &str,
    ) -> Result<TestResponse> {
        self.multipart(
            Method::POST,
            &format!("/brands?category={category_id}&subCategory={sub_category_id}"),
            Form::new().text("name", name).png("image", &[3]),
        )
        .await
    }

    pub async fn create_product(
        &self,
        parents: (&str, &str, &str),
        form: Form,
    ) -> Result<TestResponse> {
        let (category_id, sub_category_id, brand_id) = parents;
        self.multipart(
            Method::POST,
            &format!(
                "/products?categoryId={category_id}&subCategoryId={sub_category_id}&brandId={brand_id}"
            ),
            form,
        )
        .await
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn png(self, name: &str, bytes: &[u8]) -> Self {
        self.file(name, "image.png", "image/png", bytes)
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Category, sub-category and brand ids of a freshly created chain.
pub struct Chain {
    pub category: String,
    pub category_short_id: String,
    pub sub_category: String,
    pub brand: String,
}

impl Chain {
    pub fn parents(&self) -> (&str, &str, &str) {
        (
            self.category.as_str(),
            self.sub_category.as_str(),
            self.brand.as_str(),
        )
    }
}

pub async fn chain(app: &TestApp, name: &str) -> Result<Chain> {
    let category = app.create_category(name).await?;
    anyhow::ensure!(category.status == StatusCode::CREATED, "category: {:?}", category.body);
    let category_id = category.id()?;
    let sub_category = app.create_sub_category(&category_id, "Sub").await?;
    anyhow::ensure!(
        sub_category.status == StatusCode::CREATED,
        "sub-category: {:?}",
        sub_category.body
    );
    let sub_category_id = sub_category.id()?;
    let brand = app
        .create_brand(&category_id, &sub_category_id, "Brand")
        .await?;
    anyhow::ensure!(brand.status == StatusCode::CREATED, "brand: {:?}", brand.body);

    Ok(Chain {
        category_short_id: category.data()["shortId"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        category: category_id,
        sub_category: sub_category_id,
        brand: brand.id()?,
    })
}

/// A product form with the required fields and one image.
pub fn product_form(title: &str, price: &str) -> Form {
    Form::new()
        .text("title", title)
        .text("overview", "A product")
        .text("price", price)
        .text("stock", "3")
        .text("specs", r#"{"color":"black"}"#)
        .png("image", &[9])
}
