use actix_web::{web, HttpResponse};
use mongodb::bson::doc;
use serde_json::json;

use crate::{
    auth::AuthUser,
    db::{parse_id, Store},
    error::{json_error_handler, path_error_handler, query_error_handler, ApiError},
    models::{ApiResponse, Organization, Owned, User},
};

pub mod auth;
pub mod bookings;
pub mod bus_types;
pub mod onboarding;
pub mod organizations;
pub mod routes;
pub mod storefront;
pub mod tenants;

/// Registers every endpoint under `/api`. The caller supplies `S` and
/// `Config` as app data.
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health))
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(auth::register::<S>))
                        .route("/login", web::post().to(auth::login::<S>))
                        .route("/logout", web::post().to(auth::logout))
                        .route("/me", web::get().to(auth::me::<S>)),
                )
                .service(
                    web::scope("/organizations")
                        .route("", web::get().to(organizations::list_organizations::<S>))
                        .route("", web::post().to(organizations::create_organization::<S>))
                        .route("/{id}", web::get().to(organizations::get_organization::<S>))
                        .route("/{id}", web::put().to(organizations::update_organization::<S>))
                        .route("/{id}", web::delete().to(organizations::delete_organization::<S>))
                        .route(
                            "/{id}/primary",
                            web::post().to(organizations::make_primary::<S>),
                        ),
                )
                .service(
                    web::scope("/bus-types")
                        .route("", web::get().to(bus_types::list_bus_types::<S>))
                        .route("", web::post().to(bus_types::create_bus_type::<S>))
                        .route("/{id}", web::get().to(bus_types::get_bus_type::<S>))
                        .route("/{id}", web::put().to(bus_types::update_bus_type::<S>))
                        .route("/{id}", web::delete().to(bus_types::delete_bus_type::<S>)),
                )
                .service(
                    web::scope("/routes")
                        .route("", web::get().to(routes::list_routes::<S>))
                        .route("", web::post().to(routes::create_route::<S>))
                        .route("/{id}", web::get().to(routes::get_route::<S>))
                        .route("/{id}", web::put().to(routes::update_route::<S>))
                        .route("/{id}", web::delete().to(routes::delete_route::<S>)),
                )
                .service(
                    web::scope("/onboarding")
                        .route("/status", web::get().to(onboarding::status::<S>))
                        .route("/validate", web::post().to(onboarding::validate_step))
                        .route("/complete", web::post().to(onboarding::complete::<S>)),
                )
                .service(
                    web::scope("/tenant")
                        .route("", web::get().to(tenants::get_tenant::<S>))
                        .route("", web::put().to(tenants::update_tenant::<S>)),
                )
                .route("/bookings", web::get().to(bookings::list_bookings::<S>))
                .route("/trips", web::get().to(bookings::list_trips::<S>))
                .service(
                    web::scope("/public")
                        .route(
                            "/auth/register",
                            web::post().to(auth::register_customer::<S>),
                        )
                        .route("/search", web::get().to(storefront::search::<S>))
                        .route("/tenants/{slug}", web::get().to(tenants::get_public_tenant::<S>)),
                ),
        );
}

async fn health() -> HttpResponse {
    ApiResponse::new(json!({ "status": "ok" })).ok()
}

/// Loads a record by its path id and checks the caller may touch it.
pub(crate) async fn load_owned<S, E>(store: &S, user: &AuthUser, id: &str) -> Result<E, ApiError>
where
    S: Store,
    E: Owned,
{
    let oid = parse_id(id)?;
    let record = store
        .find_by_id::<E>(oid)
        .await?
        .ok_or_else(|| ApiError::not_found(E::LABEL))?;

    if !user.can_access(&record) {
        return Err(ApiError::forbidden(&E::LABEL.to_lowercase()));
    }
    Ok(record)
}

/// Resolves the `organizationId` a bus type or route is filed under. The
/// organization must exist and belong to the caller.
pub(crate) async fn owned_organization<S: Store>(
    store: &S,
    user: &AuthUser,
    organization_id: Option<&str>,
) -> Result<Organization, ApiError> {
    let Some(organization_id) = organization_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Err(ApiError::Validation(vec![crate::error::FieldError::new(
            "organizationId",
            "Organization is required",
        )]));
    };
    load_owned::<S, Organization>(store, user, organization_id).await
}

/// The caller's user record; a token for a deleted account is rejected.
pub(crate) async fn current_user<S: Store>(store: &S, user: &AuthUser) -> Result<User, ApiError> {
    store
        .find_by_id::<User>(user.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".into()))
}

/// Owner filter for list endpoints, optionally narrowed to one organization.
pub(crate) fn owner_filter(
    user: &AuthUser,
    organization_id: Option<&str>,
) -> Result<mongodb::bson::Document, ApiError> {
    let mut filter = doc! { "ownerId": user.id };
    if let Some(organization_id) = organization_id.filter(|id| !id.is_empty()) {
        filter.insert("organizationId", parse_id(organization_id)?);
    }
    Ok(filter)
}
