use crate::{env_or_default, env_parse, ConfigError, FromEnv};
use std::path::PathBuf;

/// 10 MiB
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_IMAGES_PER_PRODUCT: usize = 5;

/// Where uploaded images land and how large/how many they may be.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_file_bytes: u64,
    pub max_images_per_product: usize,
}

impl UploadConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_images_per_product: DEFAULT_MAX_IMAGES_PER_PRODUCT,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self::new("uploads")
    }
}

impl FromEnv for UploadConfig {
    /// - UPLOAD_DIR: defaults to `uploads` (relative to the working directory)
    /// - UPLOAD_MAX_FILE_BYTES: defaults to 10 MiB
    /// - UPLOAD_MAX_IMAGES_PER_PRODUCT: defaults to 5
    fn from_env() -> Result<Self, ConfigError> {
        let max_images_per_product: usize = env_parse(
            "UPLOAD_MAX_IMAGES_PER_PRODUCT",
            &DEFAULT_MAX_IMAGES_PER_PRODUCT.to_string(),
        )?;
        if max_images_per_product == 0 {
            return Err(ConfigError::ParseError {
                key: "UPLOAD_MAX_IMAGES_PER_PRODUCT".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            dir: PathBuf::from(env_or_default("UPLOAD_DIR", "uploads")),
            max_file_bytes: env_parse(
                "UPLOAD_MAX_FILE_BYTES",
                &DEFAULT_MAX_FILE_BYTES.to_string(),
            )?,
            max_images_per_product,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_config_defaults() {
        temp_env::with_vars(
            [
                ("UPLOAD_DIR", None::<&str>),
                ("UPLOAD_MAX_FILE_BYTES", None),
                ("UPLOAD_MAX_IMAGES_PER_PRODUCT", None),
            ],
            || {
                let config = UploadConfig::from_env().unwrap();
                assert_eq!(config.dir, PathBuf::from("uploads"));
                assert_eq!(config.max_file_bytes, 10 * 1024 * 1024);
                assert_eq!(config.max_images_per_product, 5);
            },
        );
    }

    #[test]
    fn test_upload_config_overrides() {
        temp_env::with_vars(
            [
                ("UPLOAD_DIR", Some("/var/lib/shop/images")),
                ("UPLOAD_MAX_FILE_BYTES", Some("2048")),
                ("UPLOAD_MAX_IMAGES_PER_PRODUCT", Some("8")),
            ],
            || {
                let config = UploadConfig::from_env().unwrap();
                assert_eq!(config.dir, PathBuf::from("/var/lib/shop/images"));
                assert_eq!(config.max_file_bytes, 2048);
                assert_eq!(config.max_images_per_product, 8);
            },
        );
    }

    #[test]
    fn test_upload_config_rejects_zero_images() {
        temp_env::with_var("UPLOAD_MAX_IMAGES_PER_PRODUCT", Some("0"), || {
            let err = UploadConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("UPLOAD_MAX_IMAGES_PER_PRODUCT"));
        });
    }
}
