//! Products API routes

use axum::Router;
use domain_products::{
    handlers, LocalImageStore, PgProductRepository, ProductService, UploadLimits,
};

use crate::state::AppState;

/// Create products router backed by PostgreSQL and the local upload directory
pub fn router(state: &AppState) -> Router {
    let uploads = &state.config.uploads;

    let repository = PgProductRepository::new(state.db.clone());
    let store = LocalImageStore::new(uploads.dir.clone());
    let service = ProductService::new(repository, store)
        .with_upload_limits(UploadLimits::from(uploads))
        .with_max_page_limit(state.config.max_page_limit);

    handlers::router_with_images(service, &uploads.dir)
}

/// Create the upload directory if it does not exist yet
pub async fn init_upload_dir(state: &AppState) -> eyre::Result<()> {
    LocalImageStore::new(state.config.uploads.dir.clone())
        .ensure_dir()
        .await?;
    Ok(())
}
