use actix_web::{web, HttpResponse};
use log::info;
use mongodb::bson::{doc, oid::ObjectId, DateTime};

use super::{current_user, load_owned};
use crate::{
    auth::OperatorUser,
    db::Store,
    error::ApiError,
    models::{
        record_id, ApiResponse, BusType, Organization, OrganizationInput, OrganizationResponse,
        Route, ValidateRequest,
    },
};

fn respond(org: Organization) -> Result<OrganizationResponse, ApiError> {
    let id = record_id(&org)?;
    Ok(OrganizationResponse::new(org, id))
}

/// Clears `isPrimary` on every organization of `owner_id` except `keep`.
/// Each demoted id is pushed to `demoted` as soon as it is saved.
pub(crate) async fn demote_other_primaries<S: Store>(
    store: &S,
    owner_id: ObjectId,
    keep: ObjectId,
    demoted: &mut Vec<ObjectId>,
) -> Result<(), ApiError> {
    let primaries = store
        .find_many::<Organization>(doc! { "ownerId": owner_id, "isPrimary": true })
        .await?;
    for mut org in primaries {
        let Some(id) = org.id.filter(|id| *id != keep) else {
            continue;
        };
        org.is_primary = false;
        org.updated_at = DateTime::now();
        if store.replace(org).await?.is_some() {
            demoted.push(id);
        }
    }
    Ok(())
}

pub(crate) async fn clear_other_primaries<S: Store>(
    store: &S,
    owner_id: ObjectId,
    keep: ObjectId,
) -> Result<(), ApiError> {
    demote_other_primaries(store, owner_id, keep, &mut Vec::new()).await
}

pub async fn list_organizations<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let organizations = store
        .find_many::<Organization>(doc! { "ownerId": user.id })
        .await?
        .into_iter()
        .map(respond)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::new(organizations).ok())
}

pub async fn create_organization<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    input: web::Json<OrganizationInput>,
) -> Result<HttpResponse, ApiError> {
    input.check()?;

    let owner = current_user(store.get_ref(), &user).await?;
    let existing = store
        .count::<Organization>(doc! { "ownerId": user.id })
        .await?;

    let mut org = Organization::new(user.id, owner.tenant_id, &input);
    // The first organization is always primary.
    org.is_primary = existing == 0 || input.is_primary.unwrap_or(false);

    let org = store.insert(org).await?;
    let id = record_id(&org)?;
    if org.is_primary {
        clear_other_primaries(store.get_ref(), user.id, id).await?;
    }

    info!("User {} created organization {}", user.id, id);
    Ok(ApiResponse::new(respond(org)?).created())
}

pub async fn get_organization<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let org = load_owned::<S, Organization>(store.get_ref(), &user, &path).await?;
    Ok(ApiResponse::new(respond(org)?).ok())
}

pub async fn update_organization<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
    input: web::Json<OrganizationInput>,
) -> Result<HttpResponse, ApiError> {
    let mut org = load_owned::<S, Organization>(store.get_ref(), &user, &path).await?;
    input.check()?;

    org.apply(&input);
    let promote = input.is_primary == Some(true) && !org.is_primary;
    if promote {
        org.is_primary = true;
    }
    // `isPrimary: false` never demotes; promote another organization instead.

    let org = store
        .replace(org)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization"))?;
    let id = record_id(&org)?;
    if promote {
        clear_other_primaries(store.get_ref(), org.owner_id, id).await?;
    }
    Ok(ApiResponse::new(respond(org)?).ok())
}

pub async fn make_primary<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let mut org = load_owned::<S, Organization>(store.get_ref(), &user, &path).await?;
    let id = record_id(&org)?;

    if !org.is_primary {
        org.is_primary = true;
        org.updated_at = DateTime::now();
        org = store
            .replace(org)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization"))?;
    }
    clear_other_primaries(store.get_ref(), org.owner_id, id).await?;

    Ok(ApiResponse::new(respond(org)?)
        .with_message("Primary organization updated")
        .ok())
}

pub async fn delete_organization<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let org = load_owned::<S, Organization>(store.get_ref(), &user, &path).await?;
    let id = record_id(&org)?;

    let bus_types = store
        .count::<BusType>(doc! { "organizationId": id })
        .await?;
    let routes = store.count::<Route>(doc! { "organizationId": id }).await?;
    if bus_types > 0 || routes > 0 {
        return Err(ApiError::Conflict(format!(
            "Organization still has {bus_types} bus type(s) and {routes} route(s)"
        )));
    }

    store.delete::<Organization>(id).await?;

    // Keep exactly one primary while the owner has organizations left.
    if org.is_primary {
        let remaining = store
            .find_many::<Organization>(doc! { "ownerId": org.owner_id })
            .await?;
        if let Some(mut oldest) = remaining.into_iter().next() {
            oldest.is_primary = true;
            oldest.updated_at = DateTime::now();
            store.replace(oldest).await?;
        }
    }

    info!("User {} deleted organization {}", user.id, id);
    Ok(ApiResponse::new(()).with_message("Organization deleted").ok())
}
