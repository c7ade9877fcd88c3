use crate::{
    api::{self, UploadPolicy},
    catalog::{AssetConfig, Catalog, IdentityConfig},
    cli::{
        commands::{catalog, storage},
        telemetry,
    },
    objects::{CloudinaryStore, LocalObjectStore, ObjectStore},
    store::PgCatalogStore,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub storage: storage::Options,
    pub catalog: catalog::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied, the
/// object store cannot be built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(args.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = PgCatalogStore::new(pool);
    store
        .apply_schema()
        .await
        .context("Failed to apply database schema")?;

    let (objects, assets_dir) = object_store(args.storage.backend, args.storage.timeout).await?;

    let catalog = Catalog::new(
        Arc::new(store),
        objects,
        AssetConfig {
            uploads_folder: args.storage.uploads_folder,
            timeout: args.storage.timeout,
        },
        IdentityConfig::new(args.catalog.short_id_length),
    );
    let policy = UploadPolicy::new(
        args.catalog.allowed_image_types,
        args.catalog.max_upload_bytes,
    );

    let app = api::app(catalog, policy, assets_dir.as_deref());
    let result = api::serve(args.port, app).await;
    telemetry::shutdown_tracer();
    result
}

async fn object_store(
    backend: storage::Backend,
    timeout: Duration,
) -> Result<(Arc<dyn ObjectStore>, Option<PathBuf>)> {
    match backend {
        storage::Backend::Local {
            dir,
            public_base_url,
        } => {
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let store = LocalObjectStore::new(dir.clone(), &public_base_url);
            Ok((Arc::new(store), Some(dir)))
        }
        storage::Backend::Cloudinary(config) => {
            let store = CloudinaryStore::new(config, timeout)
                .context("Failed to build Cloudinary client")?;
            Ok((Arc::new(store), None))
        }
    }
}

fn log_startup_args(args: &Args) {
    let backend = match &args.storage.backend {
        storage::Backend::Local {
            dir,
            public_base_url,
        } => format!("local ({} -> {public_base_url})", dir.display()),
        storage::Backend::Cloudinary(config) => format!("cloudinary ({})", config.cloud_name),
    };
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("object_store", backend),
        ("uploads_folder", args.storage.uploads_folder.clone()),
        (
            "storage_timeout",
            format!("{}s", args.storage.timeout.as_secs()),
        ),
        ("short_id_length", args.catalog.short_id_length.to_string()),
        ("max_upload_bytes", args.catalog.max_upload_bytes.to_string()),
        (
            "allowed_image_types",
            args.catalog.allowed_image_types.join(","),
        ),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
