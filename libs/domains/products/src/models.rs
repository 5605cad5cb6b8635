use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub category_id: i64,
    /// Filename or URL of the product's cover image
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    /// Stored filename, servable under `/products/images/{image_url}`
    pub image_url: String,
}

/// Request body for creating or fully replacing a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductPayload {
    #[validate(length(
        min = 3,
        max = 200,
        message = "Name must be between 3 and 200 characters"
    ))]
    #[schema(example = "Desk Lamp")]
    pub name: String,

    #[validate(range(
        min = 0.0,
        max = 10_000_000.0,
        message = "Price must be between 0 and 10,000,000"
    ))]
    #[schema(example = 49.9)]
    pub price: f64,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    #[serde(default)]
    pub description: Option<String>,

    #[validate(length(max = 300, message = "Thumbnail must be at most 300 characters"))]
    #[serde(default)]
    pub thumbnail: Option<String>,

    #[validate(range(min = 1, message = "Category id must be greater than 0"))]
    #[schema(example = 2)]
    pub category_id: i64,
}

/// Page selection for listing; results are always ordered newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    /// Zero-based page index
    pub page: u64,
    /// Items per page, at least 1
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Number of pages needed to hold `total_items` at this page size.
    pub fn total_pages(&self, total_items: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total_items.div_ceil(self.limit)
    }

    /// Rows skipped before this page. `None` when the offset or `limit` does
    /// not fit a PostgreSQL BIGINT.
    pub fn offset(&self) -> Option<u64> {
        let max = i64::MAX as u64;
        if self.limit > max {
            return None;
        }
        self.page.checked_mul(self.limit).filter(|offset| *offset <= max)
    }
}

/// One page of results plus the totals needed to navigate the rest
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Response body of the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl From<Page<Product>> for ProductListResponse {
    fn from(page: Page<Product>) -> Self {
        Self {
            products: page.items,
            total_pages: page.total_pages,
        }
    }
}

/// Input for registering a stored image against a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductImage {
    pub product_id: i64,
    pub image_url: String,
}

/// Multipart form accepted by the upload endpoint (OpenAPI only)
#[derive(ToSchema)]
pub struct UploadImagesForm {
    /// Up to the configured number of image files
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<Vec<u8>>,
}
