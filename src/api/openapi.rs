//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the t212-export REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the t212-export REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "t212-export REST API",
        version = "0.1.0",
        description = "Fetch Trading 212 account state and export trading history to CSV",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local server")
    ),
    paths(
        // Account
        crate::api::routes::get_cash,
        crate::api::routes::sync,

        // Reports
        crate::api::routes::create_report,
        crate::api::routes::list_reports,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ReportId,
        crate::types::JobStatus,
        crate::types::SyncSummary,
        crate::types::Event,

        // API response types from routes
        crate::api::routes::ReportResponse,
        crate::api::routes::ReportFile,
        crate::api::routes::ReportListResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "account", description = "Account state - Cash snapshot and combined sync"),
        (name = "reports", description = "History exports - Run an export, list saved reports"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
