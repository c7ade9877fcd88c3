use crate::{
    catalog::assets::{DEFAULT_TIMEOUT, DEFAULT_UPLOADS_FOLDER},
    objects::{cloudinary::DEFAULT_API_URL, CloudinaryConfig},
};
use anyhow::{anyhow, Context};
use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

pub const ARG_OBJECT_STORE: &str = "object-store";
pub const ARG_UPLOADS_FOLDER: &str = "uploads-folder";
pub const ARG_STORAGE_TIMEOUT_SECONDS: &str = "storage-timeout-seconds";
pub const ARG_LOCAL_STORAGE_DIR: &str = "local-storage-dir";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_CLOUDINARY_CLOUD_NAME: &str = "cloudinary-cloud-name";
pub const ARG_CLOUDINARY_API_KEY: &str = "cloudinary-api-key";
pub const ARG_CLOUDINARY_API_SECRET: &str = "cloudinary-api-secret";
pub const ARG_CLOUDINARY_API_URL: &str = "cloudinary-api-url";

const BACKEND_LOCAL: &str = "local";
const BACKEND_CLOUDINARY: &str = "cloudinary";

/// Which object store holds the catalog images.
#[derive(Debug)]
pub enum Backend {
    Local {
        dir: PathBuf,
        public_base_url: String,
    },
    Cloudinary(CloudinaryConfig),
}

impl Backend {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local { .. } => BACKEND_LOCAL,
            Self::Cloudinary(_) => BACKEND_CLOUDINARY,
        }
    }
}

#[derive(Debug)]
pub struct Options {
    pub backend: Backend,
    pub uploads_folder: String,
    pub timeout: Duration,
}

impl Options {
    /// Parse object store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Cloudinary backend is selected without its credentials.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let uploads_folder = matches
            .get_one::<String>(ARG_UPLOADS_FOLDER)
            .map(|folder| folder.trim().trim_matches('/').to_string())
            .filter(|folder| !folder.is_empty())
            .context("uploads folder must not be empty")?;
        let timeout = matches
            .get_one::<u64>(ARG_STORAGE_TIMEOUT_SECONDS)
            .copied()
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let backend = match matches
            .get_one::<String>(ARG_OBJECT_STORE)
            .map_or(BACKEND_LOCAL, String::as_str)
        {
            BACKEND_CLOUDINARY => Backend::Cloudinary(cloudinary(matches)?),
            _ => Backend::Local {
                dir: matches
                    .get_one::<String>(ARG_LOCAL_STORAGE_DIR)
                    .map(PathBuf::from)
                    .context("missing required argument: --local-storage-dir")?,
                public_base_url: matches
                    .get_one::<String>(ARG_PUBLIC_BASE_URL)
                    .cloned()
                    .context("missing required argument: --public-base-url")?,
            },
        };

        Ok(Self {
            backend,
            uploads_folder,
            timeout,
        })
    }
}

fn cloudinary(matches: &ArgMatches) -> anyhow::Result<CloudinaryConfig> {
    let read_required = |id: &str| -> anyhow::Result<String> {
        matches
            .get_one::<String>(id)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| anyhow!("missing required argument: --{id} (object store is cloudinary)"))
    };

    Ok(CloudinaryConfig {
        api_url: matches
            .get_one::<String>(ARG_CLOUDINARY_API_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        cloud_name: read_required(ARG_CLOUDINARY_CLOUD_NAME)?,
        api_key: read_required(ARG_CLOUDINARY_API_KEY)?,
        api_secret: SecretString::from(read_required(ARG_CLOUDINARY_API_SECRET)?),
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OBJECT_STORE)
                .long(ARG_OBJECT_STORE)
                .help("Object store backend for images")
                .env("CATALOG_OBJECT_STORE")
                .default_value(BACKEND_LOCAL)
                .value_parser(PossibleValuesParser::new([BACKEND_LOCAL, BACKEND_CLOUDINARY])),
        )
        .arg(
            Arg::new(ARG_UPLOADS_FOLDER)
                .long(ARG_UPLOADS_FOLDER)
                .help("Root folder of every asset path")
                .env("CATALOG_UPLOADS_FOLDER")
                .default_value(DEFAULT_UPLOADS_FOLDER),
        )
        .arg(
            Arg::new(ARG_STORAGE_TIMEOUT_SECONDS)
                .long(ARG_STORAGE_TIMEOUT_SECONDS)
                .help("Upper bound for each object store call, in seconds")
                .env("CATALOG_STORAGE_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCAL_STORAGE_DIR)
                .long(ARG_LOCAL_STORAGE_DIR)
                .help("Directory holding assets when the local backend is used")
                .env("CATALOG_LOCAL_STORAGE_DIR")
                .default_value("uploads"),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("URL prefix under which local assets are served")
                .env("CATALOG_PUBLIC_BASE_URL")
                .default_value("http://localhost:8080/assets"),
        )
        .arg(
            Arg::new(ARG_CLOUDINARY_CLOUD_NAME)
                .long(ARG_CLOUDINARY_CLOUD_NAME)
                .help("Cloudinary cloud name")
                .env("CATALOG_CLOUDINARY_CLOUD_NAME"),
        )
        .arg(
            Arg::new(ARG_CLOUDINARY_API_KEY)
                .long(ARG_CLOUDINARY_API_KEY)
                .help("Cloudinary API key")
                .env("CATALOG_CLOUDINARY_API_KEY"),
        )
        .arg(
            Arg::new(ARG_CLOUDINARY_API_SECRET)
                .long(ARG_CLOUDINARY_API_SECRET)
                .help("Cloudinary API secret")
                .env("CATALOG_CLOUDINARY_API_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_CLOUDINARY_API_URL)
                .long(ARG_CLOUDINARY_API_URL)
                .help("Cloudinary REST API base URL")
                .env("CATALOG_CLOUDINARY_API_URL")
                .default_value(DEFAULT_API_URL),
        )
}
