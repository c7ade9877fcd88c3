use super::handlers::{brands, categories, health, products, sub_categories};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Routes registered here via `.routes(routes!(...))` are both served and documented.
/// Routes added outside (`OPTIONS /health`, `/assets`, `/docs`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(
            categories::create_category,
            categories::get_category
        ))
        .routes(routes!(
            categories::update_category,
            categories::delete_category
        ))
        .routes(routes!(
            sub_categories::create_sub_category,
            sub_categories::get_sub_category
        ))
        .routes(routes!(
            sub_categories::update_sub_category,
            sub_categories::delete_sub_category
        ))
        .routes(routes!(brands::create_brand, brands::get_brand))
        .routes(routes!(brands::update_brand, brands::delete_brand))
        .routes(routes!(products::create_product, products::get_product))
        .routes(routes!(products::list_products))
        .routes(routes!(
            products::update_product,
            products::delete_product
        ));

    router.get_openapi_mut().tags = Some(vec![
        tag("health", "Service status"),
        tag("categories", "Top level of the catalog hierarchy"),
        tag("sub-categories", "Groupings inside a category"),
        tag("brands", "Brands inside a sub-category"),
        tag("products", "Products, pricing and listing"),
    ]);

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Catalog <team@catalog.dev>"),
            (Some("Team Catalog"), Some("team@catalog.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<ops@catalog.dev>"), (None, Some("ops@catalog.dev")));
        assert_eq!(parse_author("  "), (None, None));
    }

    #[test]
    fn document_carries_cargo_metadata_and_routes() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert!(doc.info.license.is_some());

        for path in [
            "/health",
            "/categories",
            "/categories/{id}",
            "/sub-categories",
            "/sub-categories/{id}",
            "/brands",
            "/brands/{id}",
            "/products",
            "/products/{id}",
            "/products/list",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "products"));
    }
}
