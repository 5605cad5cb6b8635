use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ProductError, ProductResult};
use crate::models::{NewProductImage, Page, PageRequest, Product, ProductImage, ProductPayload};

/// Repository trait for Product persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fetch one page of products, newest first
    async fn list_page(&self, page: PageRequest) -> ProductResult<Page<Product>>;

    /// Get a product by ID
    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>>;

    /// Insert a new product
    async fn create(&self, input: ProductPayload) -> ProductResult<Product>;

    /// Replace the mutable fields of a product; `None` if it does not exist
    async fn update(&self, id: i64, input: ProductPayload) -> ProductResult<Option<Product>>;

    /// Delete a product (and its image rows); `false` if it did not exist
    async fn delete(&self, id: i64) -> ProductResult<bool>;

    /// Check if a product name is already taken
    async fn exists_by_name(&self, name: &str) -> ProductResult<bool>;

    /// Register a stored image against a product
    async fn create_image(&self, input: NewProductImage) -> ProductResult<ProductImage>;

    /// Number of images registered for a product
    async fn count_images(&self, product_id: i64) -> ProductResult<u64>;
}

#[derive(Debug, Default)]
struct Store {
    products: HashMap<i64, Product>,
    images: Vec<ProductImage>,
    next_product_id: i64,
    next_image_id: i64,
}

/// In-memory implementation of ProductRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list_page(&self, page: PageRequest) -> ProductResult<Page<Product>> {
        let store = self.store.read().await;

        let mut products: Vec<Product> = store.products.values().cloned().collect();
        // Newest first; ids break ties between products created in the same instant
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total_items = products.len() as u64;
        let offset = page.page.saturating_mul(page.limit);
        let items = products
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect();

        Ok(Page {
            items,
            total_items,
            total_pages: page.total_pages(total_items),
        })
    }

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let store = self.store.read().await;
        Ok(store.products.get(&id).cloned())
    }

    async fn create(&self, input: ProductPayload) -> ProductResult<Product> {
        let mut store = self.store.write().await;

        if store.products.values().any(|p| p.name == input.name) {
            return Err(ProductError::DuplicateName(input.name));
        }

        store.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: store.next_product_id,
            name: input.name,
            price: input.price,
            description: input.description,
            category_id: input.category_id,
            thumbnail: input.thumbnail,
            created_at: now,
            updated_at: now,
        };
        store.products.insert(product.id, product.clone());

        tracing::info!(product_id = product.id, "Created product");
        Ok(product)
    }

    async fn update(&self, id: i64, input: ProductPayload) -> ProductResult<Option<Product>> {
        let mut store = self.store.write().await;

        let Some(product) = store.products.get_mut(&id) else {
            return Ok(None);
        };

        product.name = input.name;
        product.price = input.price;
        product.description = input.description;
        product.category_id = input.category_id;
        product.thumbnail = input.thumbnail;
        product.updated_at = Utc::now();

        tracing::info!(product_id = id, "Updated product");
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: i64) -> ProductResult<bool> {
        let mut store = self.store.write().await;

        if store.products.remove(&id).is_some() {
            store.images.retain(|image| image.product_id != id);
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let store = self.store.read().await;
        Ok(store.products.values().any(|p| p.name == name))
    }

    async fn create_image(&self, input: NewProductImage) -> ProductResult<ProductImage> {
        let mut store = self.store.write().await;

        if !store.products.contains_key(&input.product_id) {
            return Err(ProductError::NotFound(input.product_id));
        }

        store.next_image_id += 1;
        let image = ProductImage {
            id: store.next_image_id,
            product_id: input.product_id,
            image_url: input.image_url,
        };
        store.images.push(image.clone());

        tracing::info!(product_id = image.product_id, image_id = image.id, "Created product image");
        Ok(image)
    }

    async fn count_images(&self, product_id: i64) -> ProductResult<u64> {
        let store = self.store.read().await;
        Ok(store
            .images
            .iter()
            .filter(|image| image.product_id == product_id)
            .count() as u64)
    }
}
