use actix_web::{web, HttpResponse};
use log::info;
use mongodb::bson::doc;

use super::current_user;
use crate::{
    auth::{AuthUser, OperatorUser},
    db::Store,
    error::ApiError,
    models::{
        record_id, ApiResponse, PublicTenantResponse, Tenant, TenantResponse, TenantUpdate,
        ValidateRequest,
    },
};

async fn tenant_of<S: Store>(store: &S, user: &AuthUser) -> Result<Tenant, ApiError> {
    let record = current_user(store, user).await?;
    let tenant_id = record
        .tenant_id
        .ok_or_else(|| ApiError::NotFound("No tenant yet; finish onboarding first".into()))?;
    store
        .find_by_id::<Tenant>(tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))
}

pub async fn get_tenant<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let tenant = tenant_of(store.get_ref(), &user).await?;
    let id = record_id(&tenant)?;
    Ok(ApiResponse::new(TenantResponse::new(tenant, id)).ok())
}

pub async fn update_tenant<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    update: web::Json<TenantUpdate>,
) -> Result<HttpResponse, ApiError> {
    let mut tenant = tenant_of(store.get_ref(), &user).await?;
    if !tenant.is_owned_by(user.id) && !user.role.is_admin() {
        return Err(ApiError::Forbidden(
            "Only the tenant owner can change tenant settings".into(),
        ));
    }
    update.check()?;

    tenant.apply(&update);
    let errors = tenant.gateway_errors();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let tenant = store
        .replace(tenant)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))?;
    let id = record_id(&tenant)?;

    info!("User {} updated tenant '{}'", user.id, tenant.slug);
    Ok(ApiResponse::new(TenantResponse::new(tenant, id)).ok())
}

pub async fn get_public_tenant<S: Store>(
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner().to_lowercase();
    let tenant = store
        .find_one::<Tenant>(doc! { "slug": &slug, "isActive": true })
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))?;
    Ok(ApiResponse::new(PublicTenantResponse::from(tenant)).ok())
}
