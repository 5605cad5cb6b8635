use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, SqlErr,
};

use crate::{
    entity::{product, product_image},
    error::{ProductError, ProductResult},
    models::{NewProductImage, Page, PageRequest, Product, ProductImage, ProductPayload},
    repository::ProductRepository,
};

/// PostgreSQL implementation of ProductRepository
#[derive(Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// A write that lost a race on the unique `name` index is a duplicate, not a
/// database failure.
fn name_write_error(err: DbErr, name: &str) -> ProductError {
    classify_name_write_error(err.sql_err(), err, name)
}

fn classify_name_write_error(sql_err: Option<SqlErr>, err: DbErr, name: &str) -> ProductError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => ProductError::DuplicateName(name.to_string()),
        _ => ProductError::Database(err),
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list_page(&self, page: PageRequest) -> ProductResult<Page<Product>> {
        if page.offset().is_none() {
            return Err(ProductError::Validation(
                "page and limit are out of range".to_string(),
            ));
        }

        let paginator = product::Entity::find()
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .paginate(&self.db, page.limit);

        let totals = paginator.num_items_and_pages().await?;
        let models = paginator.fetch_page(page.page).await?;

        Ok(Page {
            items: models.into_iter().map(Into::into).collect(),
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    async fn get_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let model = product::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn create(&self, input: ProductPayload) -> ProductResult<Product> {
        let now = Utc::now();
        let name = input.name.clone();
        let active_model = product::ActiveModel {
            id: NotSet,
            name: Set(input.name),
            price: Set(input.price),
            description: Set(input.description),
            category_id: Set(input.category_id),
            thumbnail: Set(input.thumbnail),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| name_write_error(e, &name))?;

        tracing::info!(product_id = model.id, "Created product");
        Ok(model.into())
    }

    async fn update(&self, id: i64, input: ProductPayload) -> ProductResult<Option<Product>> {
        let Some(model) = product::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let name = input.name.clone();
        let mut active_model = model.into_active_model();
        active_model.name = Set(input.name);
        active_model.price = Set(input.price);
        active_model.description = Set(input.description);
        active_model.category_id = Set(input.category_id);
        active_model.thumbnail = Set(input.thumbnail);
        active_model.updated_at = Set(Utc::now().into());

        let updated = active_model
            .update(&self.db)
            .await
            .map_err(|e| name_write_error(e, &name))?;

        tracing::info!(product_id = id, "Updated product");
        Ok(Some(updated.into()))
    }

    async fn delete(&self, id: i64) -> ProductResult<bool> {
        let result = product::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected > 0 {
            tracing::info!(product_id = id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let count = product::Entity::find()
            .filter(product::Column::Name.eq(name))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn create_image(&self, input: NewProductImage) -> ProductResult<ProductImage> {
        let active_model = product_image::ActiveModel {
            id: NotSet,
            product_id: Set(input.product_id),
            image_url: Set(input.image_url),
        };

        let model = active_model.insert(&self.db).await?;

        tracing::info!(
            product_id = model.product_id,
            image_id = model.id,
            "Created product image"
        );
        Ok(model.into())
    }

    async fn count_images(&self, product_id: i64) -> ProductResult<u64> {
        let count = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}
