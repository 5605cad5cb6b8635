use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{NewProductImage, Page, PageRequest, Product, ProductImage, ProductPayload};
use crate::repository::ProductRepository;
use crate::storage::ImageStore;
use crate::upload::{UploadLimits, UploadedFile};

/// Service layer for Product business logic
pub struct ProductService<R: ProductRepository, S: ImageStore> {
    repository: Arc<R>,
    store: Arc<S>,
    limits: UploadLimits,
    max_page_limit: Option<u64>,
}

impl<R: ProductRepository, S: ImageStore> Clone for ProductService<R, S> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            store: Arc::clone(&self.store),
            limits: self.limits,
            max_page_limit: self.max_page_limit,
        }
    }
}

impl<R: ProductRepository, S: ImageStore> ProductService<R, S> {
    pub fn new(repository: R, store: S) -> Self {
        Self {
            repository: Arc::new(repository),
            store: Arc::new(store),
            limits: UploadLimits::default(),
            max_page_limit: None,
        }
    }

    pub fn with_upload_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Reject list requests whose `limit` exceeds `max`. Unbounded when `None`.
    pub fn with_max_page_limit(mut self, max: Option<u64>) -> Self {
        self.max_page_limit = max;
        self
    }

    pub fn upload_limits(&self) -> UploadLimits {
        self.limits
    }

    /// List one page of products, newest first
    #[instrument(skip(self))]
    pub async fn list_products(&self, page: PageRequest) -> ProductResult<Page<Product>> {
        if page.limit == 0 {
            return Err(ProductError::Validation(
                "limit must be greater than 0".to_string(),
            ));
        }
        if let Some(max) = self.max_page_limit {
            if page.limit > max {
                return Err(ProductError::Validation(format!(
                    "limit must not exceed {}",
                    max
                )));
            }
        }

        if page.offset().is_none() {
            return Err(ProductError::Validation(
                "page and limit are out of range".to_string(),
            ));
        }

        self.repository.list_page(page).await
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: i64) -> ProductResult<Product> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Create a new product with a unique name
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: ProductPayload) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        if self.repository.exists_by_name(&input.name).await? {
            return Err(ProductError::DuplicateName(input.name));
        }

        self.repository.create(input).await
    }

    /// Replace the mutable fields of an existing product
    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: i64, input: ProductPayload) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        let existing = self.get_product(id).await?;
        if existing.name != input.name && self.repository.exists_by_name(&input.name).await? {
            return Err(ProductError::DuplicateName(input.name));
        }

        self.repository
            .update(id, input)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Delete a product
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: i64) -> ProductResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(ProductError::NotFound(id));
        }

        Ok(())
    }

    /// Register an already stored image, refusing once the product is at its limit
    #[instrument(skip(self))]
    pub async fn create_product_image(
        &self,
        product_id: i64,
        image_url: String,
    ) -> ProductResult<ProductImage> {
        let max = self.limits.max_images_per_product;
        let existing = self.repository.count_images(product_id).await?;
        if existing >= max as u64 {
            return Err(ProductError::TooManyImages(max));
        }

        self.repository
            .create_image(NewProductImage {
                product_id,
                image_url,
            })
            .await
    }

    /// Validate, store and register uploaded images in submission order.
    ///
    /// The first oversize or non-image file aborts the request; files before
    /// it stay stored and registered, later ones are never written. A file
    /// whose registration fails is removed again before the error returns.
    #[instrument(skip(self, files), fields(file_count = files.len()))]
    pub async fn upload_images(
        &self,
        product_id: i64,
        files: Vec<UploadedFile>,
    ) -> ProductResult<Vec<ProductImage>> {
        let product = self.get_product(product_id).await?;
        let max = self.limits.max_images_per_product;

        if files.len() > max {
            return Err(ProductError::TooManyImages(max));
        }

        let incoming = files.iter().filter(|f| !f.is_empty()).count() as u64;
        if incoming > 0 {
            let existing = self.repository.count_images(product.id).await?;
            if existing + incoming > max as u64 {
                return Err(ProductError::TooManyImages(max));
            }
        }

        let mut images = Vec::with_capacity(files.len());
        for file in &files {
            if file.is_empty() {
                continue;
            }
            if file.size > self.limits.max_file_bytes {
                return Err(ProductError::FileTooLarge(self.limits.max_file_bytes));
            }
            if !file.is_image() {
                return Err(ProductError::UnsupportedMediaType);
            }

            let filename = self.store.store(file).await?;

            match self.create_product_image(product.id, filename.clone()).await {
                Ok(image) => images.push(image),
                Err(e) => {
                    if let Err(remove_err) = self.store.remove(&filename).await {
                        tracing::warn!(
                            filename = %filename,
                            error = %remove_err,
                            "Failed to remove image after registration error"
                        );
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(product_id = product.id, count = images.len(), "Uploaded images");
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockProductRepository;
    use crate::storage::MockImageStore;
    use chrono::Utc;
    use mockall::predicate;
    use mockall::Sequence;

    fn product(id: i64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            price: 10.0,
            description: None,
            category_id: 1,
            thumbnail: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payload(name: &str) -> ProductPayload {
        ProductPayload {
            name: name.to_string(),
            price: 10.0,
            description: None,
            thumbnail: None,
            category_id: 1,
        }
    }

    fn png(name: &str, size: usize) -> UploadedFile {
        UploadedFile::new(Some(name), Some("image/png"), vec![1u8; size])
    }

    fn repo_with_product(id: i64) -> MockProductRepository {
        let mut repo = MockProductRepository::new();
        repo.expect_get_by_id()
            .with(predicate::eq(id))
            .returning(move |id| Ok(Some(product(id, "Desk Lamp"))));
        repo
    }

    #[tokio::test]
    async fn test_list_rejects_zero_limit() {
        let service = ProductService::new(MockProductRepository::new(), MockImageStore::new());
        let result = service.list_products(PageRequest::new(0, 0)).await;
        assert!(matches!(result, Err(ProductError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_rejects_offset_overflow_without_touching_repo() {
        let mut repo = MockProductRepository::new();
        repo.expect_list_page().never();
        let service = ProductService::new(repo, MockImageStore::new());

        for page in [
            PageRequest::new(2, u64::MAX),
            PageRequest::new(0, u64::MAX),
            PageRequest::new(u64::MAX, 2),
            PageRequest::new(1 << 32, 1 << 32),
        ] {
            assert!(matches!(
                service.list_products(page).await,
                Err(ProductError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_list_enforces_configured_max_limit() {
        let mut repo = MockProductRepository::new();
        repo.expect_list_page().times(1).returning(|page| {
            Ok(Page {
                items: vec![],
                total_items: 0,
                total_pages: page.total_pages(0),
            })
        });
        let service =
            ProductService::new(repo, MockImageStore::new()).with_max_page_limit(Some(50));

        assert!(service.list_products(PageRequest::new(0, 50)).await.is_ok());
        assert!(matches!(
            service.list_products(PageRequest::new(0, 51)).await,
            Err(ProductError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing_product_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_get_by_id()
            .with(predicate::eq(9))
            .returning(|_| Ok(None));
        let service = ProductService::new(repo, MockImageStore::new());

        let result = service.get_product(9).await;
        assert!(matches!(result, Err(ProductError::NotFound(9))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let mut repo = MockProductRepository::new();
        repo.expect_exists_by_name()
            .with(predicate::eq("Desk Lamp"))
            .returning(|_| Ok(true));
        repo.expect_create().never();
        let service = ProductService::new(repo, MockImageStore::new());

        let result = service.create_product(payload("Desk Lamp")).await;
        assert!(matches!(result, Err(ProductError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload_without_touching_repo() {
        let service = ProductService::new(MockProductRepository::new(), MockImageStore::new());
        let result = service.create_product(payload("ab")).await;
        assert!(matches!(result, Err(ProductError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_allows_keeping_own_name() {
        let mut repo = repo_with_product(1);
        repo.expect_exists_by_name().never();
        repo.expect_update()
            .with(predicate::eq(1), predicate::always())
            .returning(|id, input| {
                let mut p = product(id, &input.name);
                p.price = input.price;
                Ok(Some(p))
            });
        let service = ProductService::new(repo, MockImageStore::new());

        let mut input = payload("Desk Lamp");
        input.price = 20.0;
        let updated = service.update_product(1, input).await.unwrap();
        assert_eq!(updated.price, 20.0);
    }

    #[tokio::test]
    async fn test_update_rejects_rename_onto_taken_name() {
        let mut repo = repo_with_product(1);
        repo.expect_exists_by_name()
            .with(predicate::eq("Floor Lamp"))
            .returning(|_| Ok(true));
        repo.expect_update().never();
        let service = ProductService::new(repo, MockImageStore::new());

        let result = service.update_product(1, payload("Floor Lamp")).await;
        assert!(matches!(result, Err(ProductError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_delete().returning(|_| Ok(false));
        let service = ProductService::new(repo, MockImageStore::new());

        assert!(matches!(
            service.delete_product(4).await,
            Err(ProductError::NotFound(4))
        ));
    }

    #[tokio::test]
    async fn test_upload_to_missing_product_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));
        let mut store = MockImageStore::new();
        store.expect_store().never();
        let service = ProductService::new(repo, store);

        let result = service.upload_images(1, vec![png("a.png", 3)]).await;
        assert!(matches!(result, Err(ProductError::NotFound(1))));
    }

    #[tokio::test]
    async fn test_upload_with_no_files_returns_empty() {
        let service = ProductService::new(repo_with_product(1), MockImageStore::new());
        let images = service.upload_images(1, vec![]).await.unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_more_than_max_files() {
        let mut store = MockImageStore::new();
        store.expect_store().never();
        let service = ProductService::new(repo_with_product(1), store);

        let files = (0..6).map(|i| png(&format!("{i}.png"), 3)).collect();
        let result = service.upload_images(1, files).await;
        assert!(matches!(result, Err(ProductError::TooManyImages(5))));
    }

    #[tokio::test]
    async fn test_upload_counts_existing_images() {
        let mut repo = repo_with_product(1);
        repo.expect_count_images().returning(|_| Ok(4));
        let mut store = MockImageStore::new();
        store.expect_store().never();
        let service = ProductService::new(repo, store);

        let result = service
            .upload_images(1, vec![png("a.png", 3), png("b.png", 3)])
            .await;
        assert!(matches!(result, Err(ProductError::TooManyImages(5))));
    }

    #[tokio::test]
    async fn test_upload_stores_and_registers_each_file() {
        let mut repo = repo_with_product(1);
        repo.expect_count_images().returning(|_| Ok(0));
        repo.expect_create_image().times(2).returning(|input| {
            Ok(ProductImage {
                id: 10,
                product_id: input.product_id,
                image_url: input.image_url,
            })
        });
        let mut store = MockImageStore::new();
        store
            .expect_store()
            .times(2)
            .returning(|file| Ok(format!("uuid_{}", file.file_name.clone().unwrap())));
        let service = ProductService::new(repo, store);

        let files = vec![
            png("a.png", 3),
            UploadedFile::new(Some("empty.png"), Some("image/png"), Vec::new()),
            png("b.png", 3),
        ];
        let images = service.upload_images(1, files).await.unwrap();
        assert_eq!(
            images.iter().map(|i| i.image_url.as_str()).collect::<Vec<_>>(),
            vec!["uuid_a.png", "uuid_b.png"]
        );
    }

    #[tokio::test]
    async fn test_upload_stops_at_oversize_file() {
        let mut repo = repo_with_product(1);
        repo.expect_count_images().returning(|_| Ok(0));
        repo.expect_create_image().times(1).returning(|input| {
            Ok(ProductImage {
                id: 1,
                product_id: input.product_id,
                image_url: input.image_url,
            })
        });
        let mut store = MockImageStore::new();
        store
            .expect_store()
            .times(1)
            .returning(|_| Ok("uuid_a.png".to_string()));
        let limits = UploadLimits {
            max_file_bytes: 8,
            max_images_per_product: 5,
        };
        let service = ProductService::new(repo, store).with_upload_limits(limits);

        let files = vec![png("a.png", 4), png("big.png", 9), png("c.png", 4)];
        let result = service.upload_images(1, files).await;
        assert!(matches!(result, Err(ProductError::FileTooLarge(8))));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image() {
        let mut repo = repo_with_product(1);
        repo.expect_count_images().returning(|_| Ok(0));
        let mut store = MockImageStore::new();
        store.expect_store().never();
        let service = ProductService::new(repo, store);

        let text = UploadedFile::new(Some("notes.txt"), Some("text/plain"), vec![1u8; 3]);
        let result = service.upload_images(1, vec![text]).await;
        assert!(matches!(result, Err(ProductError::UnsupportedMediaType)));
    }

    #[tokio::test]
    async fn test_upload_removes_file_when_registration_fails() {
        let mut repo = repo_with_product(1);
        repo.expect_count_images().returning(|_| Ok(0));
        repo.expect_create_image()
            .returning(|_| Err(ProductError::Internal("insert failed".to_string())));

        let mut seq = Sequence::new();
        let mut store = MockImageStore::new();
        store
            .expect_store()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("uuid_a.png".to_string()));
        store
            .expect_remove()
            .with(predicate::eq("uuid_a.png"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let service = ProductService::new(repo, store);

        let result = service.upload_images(1, vec![png("a.png", 3)]).await;
        assert!(matches!(result, Err(ProductError::Internal(_))));
    }

    #[tokio::test]
    async fn test_create_product_image_refuses_when_full() {
        let mut repo = MockProductRepository::new();
        repo.expect_count_images()
            .with(predicate::eq(1))
            .returning(|_| Ok(5));
        repo.expect_create_image().never();
        let service = ProductService::new(repo, MockImageStore::new());

        let result = service.create_product_image(1, "x.png".to_string()).await;
        assert!(matches!(result, Err(ProductError::TooManyImages(5))));
    }
}
