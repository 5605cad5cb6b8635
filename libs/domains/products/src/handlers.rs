use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, DefaultBodyLimit, Multipart,
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestIdResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse, PayloadTooLargeResponse,
        UnsupportedMediaTypeResponse,
    },
    AppError, IdPath, ValidatedJson,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;

use crate::error::ProductResult;
use crate::models::{
    PageRequest, Product, ProductImage, ProductListResponse, ProductPayload, UploadImagesForm,
};
use crate::repository::ProductRepository;
use crate::service::ProductService;
use crate::storage::ImageStore;
use crate::upload::read_files;

const TAG: &str = "products";

/// OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        create_product,
        get_product,
        update_product,
        delete_product,
        upload_images,
    ),
    components(
        schemas(
            Product,
            ProductImage,
            ProductPayload,
            ProductListResponse,
            PageRequest,
            UploadImagesForm
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestIdResponse,
            ConflictResponse,
            PayloadTooLargeResponse,
            UnsupportedMediaTypeResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Product management endpoints")
    )
)]
pub struct ApiDoc;

type SharedService<R, S> = Arc<ProductService<R, S>>;

/// Create the product router with all HTTP endpoints
pub fn router<R, S>(service: ProductService<R, S>) -> Router
where
    R: ProductRepository + 'static,
    S: ImageStore + 'static,
{
    let body_limit = service.upload_limits().body_limit();
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/uploads/{id}",
            post(upload_images).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(shared_service)
}

/// Product router plus read-only serving of stored images at `/images/{filename}`
pub fn router_with_images<R, S>(service: ProductService<R, S>, images_dir: impl AsRef<Path>) -> Router
where
    R: ProductRepository + 'static,
    S: ImageStore + 'static,
{
    router(service).nest_service("/images", ServeDir::new(images_dir.as_ref()))
}

/// List products, newest first
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(PageRequest),
    responses(
        (status = 200, description = "One page of products", body = ProductListResponse),
        (status = 400, description = "Missing or invalid page/limit"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository, S: ImageStore>(
    State(service): State<SharedService<R, S>>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<ProductListResponse>, AppError> {
    let Query(page) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let products = service.list_products(page).await?;
    Ok(Json(products.into()))
}

/// Create a new product
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Product created successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository, S: ImageStore>(
    State(service): State<SharedService<R, S>>,
    ValidatedJson(input): ValidatedJson<ProductPayload>,
) -> ProductResult<Json<Product>> {
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository, S: ImageStore>(
    State(service): State<SharedService<R, S>>,
    IdPath(id): IdPath,
) -> ProductResult<Json<Product>> {
    let product = service.get_product(id).await?;
    Ok(Json(product))
}

/// Replace a product's fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<R: ProductRepository, S: ImageStore>(
    State(service): State<SharedService<R, S>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<ProductPayload>,
) -> ProductResult<Json<Product>> {
    let product = service.update_product(id, input).await?;
    Ok(Json(product))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted successfully", body = String, content_type = "text/plain"),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository, S: ImageStore>(
    State(service): State<SharedService<R, S>>,
    IdPath(id): IdPath,
) -> ProductResult<String> {
    service.delete_product(id).await?;
    Ok(format!("Product with id = {} deleted successfully", id))
}

/// Upload images for a product
///
/// Files are sent in the multipart field `files`; empty entries are ignored.
#[utoipa::path(
    post,
    path = "/uploads/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body(content = UploadImagesForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Images stored and registered", body = Vec<ProductImage>),
        (status = 400, description = "Too many images or malformed multipart body"),
        (status = 404, response = NotFoundResponse),
        (status = 413, response = PayloadTooLargeResponse),
        (status = 415, response = UnsupportedMediaTypeResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn upload_images<R: ProductRepository, S: ImageStore>(
    State(service): State<SharedService<R, S>>,
    IdPath(id): IdPath,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<ProductImage>>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    service.get_product(id).await?;
    let files = read_files(&mut multipart, service.upload_limits()).await?;
    let images = service.upload_images(id, files).await?;
    Ok(Json(images))
}
