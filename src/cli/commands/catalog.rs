use crate::catalog::identity::{SHORT_ID_MAX_LENGTH, SHORT_ID_MIN_LENGTH};
use anyhow::Context;
use clap::{Arg, ArgMatches, Command};

pub const ARG_SHORT_ID_LENGTH: &str = "short-id-length";
pub const ARG_MAX_UPLOAD_BYTES: &str = "max-upload-bytes";
pub const ARG_ALLOWED_IMAGE_TYPES: &str = "allowed-image-types";

pub const DEFAULT_ALLOWED_IMAGE_TYPES: &str =
    "image/png,image/jpeg,image/jpg,image/gif,image/webp";

#[derive(Debug, Clone)]
pub struct Options {
    pub short_id_length: usize,
    pub max_upload_bytes: usize,
    pub allowed_image_types: Vec<String>,
}

impl Options {
    /// Parse identity and upload intake arguments from matches.
    ///
    /// # Errors
    /// Returns an error if no image type is accepted.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let short_id_length = matches
            .get_one::<u8>(ARG_SHORT_ID_LENGTH)
            .copied()
            .map_or(4, usize::from);
        let max_upload_bytes = matches
            .get_one::<u64>(ARG_MAX_UPLOAD_BYTES)
            .copied()
            .and_then(|bytes| usize::try_from(bytes).ok())
            .context("invalid --max-upload-bytes")?;
        let allowed_image_types: Vec<String> = matches
            .get_many::<String>(ARG_ALLOWED_IMAGE_TYPES)
            .into_iter()
            .flatten()
            .map(|mime| mime.trim().to_ascii_lowercase())
            .filter(|mime| !mime.is_empty())
            .collect();
        if allowed_image_types.is_empty() {
            anyhow::bail!("--allowed-image-types must name at least one MIME type");
        }

        Ok(Self {
            short_id_length,
            max_upload_bytes,
            allowed_image_types,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let short_id_range = i64::try_from(SHORT_ID_MIN_LENGTH).unwrap_or(1)
        ..=i64::try_from(SHORT_ID_MAX_LENGTH).unwrap_or(21);

    command
        .arg(
            Arg::new(ARG_SHORT_ID_LENGTH)
                .long(ARG_SHORT_ID_LENGTH)
                .help("Length of the short id assigned to every entity")
                .env("CATALOG_SHORT_ID_LENGTH")
                .default_value("4")
                .value_parser(clap::value_parser!(u8).range(short_id_range)),
        )
        .arg(
            Arg::new(ARG_MAX_UPLOAD_BYTES)
                .long(ARG_MAX_UPLOAD_BYTES)
                .help("Maximum request body size for uploads, in bytes")
                .env("CATALOG_MAX_UPLOAD_BYTES")
                .default_value("5242880")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ALLOWED_IMAGE_TYPES)
                .long(ARG_ALLOWED_IMAGE_TYPES)
                .help("Comma separated MIME types accepted for images")
                .env("CATALOG_ALLOWED_IMAGE_TYPES")
                .value_delimiter(',')
                .default_value(DEFAULT_ALLOWED_IMAGE_TYPES),
        )
}
