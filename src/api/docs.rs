//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::{dto, handlers};

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "stockpic-storefront",
        description = "Credit-metered text-to-image storefront"
    ),
    paths(
        handlers::system::health_handler,
        handlers::system::catalog_handler,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::admin_login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::plans::list_plans,
        handlers::generations::create_generation,
        handlers::generations::list_generations,
        handlers::generations::get_generation,
        handlers::generations::download_image,
        handlers::generations::export_images,
        handlers::purchases::submit_purchase,
        handlers::purchases::list_own_purchases,
        handlers::admin::list_accounts,
        handlers::admin::toggle_ban,
        handlers::admin::delete_account,
        handlers::admin::create_plan,
        handlers::admin::delete_plan,
        handlers::admin::list_purchases,
        handlers::admin::approve_purchase,
    ),
    components(
        schemas(
            dto::SignupRequest,
            dto::LoginRequest,
            dto::AuthResponse,
            dto::AdminAuthResponse,
            dto::AccountDto,
            dto::AccountListResponse,
            dto::PlanDto,
            dto::CreatePlanRequest,
            dto::GenerateRequest,
            dto::GenerationDto,
            dto::SubmitPurchaseRequest,
            dto::PurchaseDto,
            dto::ApprovalResponse,
            dto::PaginationMeta,
            handlers::system::HealthResponse,
            handlers::system::GenerationCatalog,
            handlers::system::QualityInfo,
            crate::domain::AspectRatio,
            crate::domain::DownloadQuality,
            crate::domain::JobStatus,
            crate::domain::PurchaseStatus,
            crate::error::ErrorResponse,
            crate::error::ErrorBody,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Health and generation options"),
        (name = "Auth", description = "Signup, login and sessions"),
        (name = "Plans", description = "Credit plan catalog"),
        (name = "Generations", description = "Image generation, download and export"),
        (name = "Purchases", description = "Plan purchase requests"),
        (name = "Admin", description = "Account moderation, catalog and approvals")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by protected endpoints.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}
