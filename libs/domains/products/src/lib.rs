//! Products Domain
//!
//! Product catalogue management: paginated listing, CRUD and image upload.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, multipart reading
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Business rules, upload limits
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┬──────────────┐
//! │ Repository  │  ImageStore  │  ← Data access and file storage (traits + implementations)
//! └──────┬──────┴──────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{
//!     handlers,
//!     repository::InMemoryProductRepository,
//!     service::ProductService,
//!     storage::LocalImageStore,
//! };
//!
//! let repository = InMemoryProductRepository::new();
//! let store = LocalImageStore::new("uploads");
//! let service = ProductService::new(repository, store);
//!
//! let router = handlers::router_with_images(service, "uploads");
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod storage;
pub mod upload;

// Re-export commonly used types
pub use error::{ProductError, ProductResult};
pub use models::{
    NewProductImage, Page, PageRequest, Product, ProductImage, ProductListResponse,
    ProductPayload,
};
pub use postgres::PgProductRepository;
pub use repository::{InMemoryProductRepository, ProductRepository};
pub use service::ProductService;
pub use storage::{ImageStore, LocalImageStore, StorageError};
pub use upload::{UploadLimits, UploadedFile};
