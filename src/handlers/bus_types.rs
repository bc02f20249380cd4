use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;

use super::{load_owned, owned_organization, owner_filter};
use crate::{
    auth::OperatorUser,
    db::Store,
    error::ApiError,
    models::{record_id, ApiResponse, BusType, BusTypeInput, BusTypeResponse, ValidateRequest},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusTypeQuery {
    pub organization_id: Option<String>,
}

fn respond(bus_type: BusType) -> Result<BusTypeResponse, ApiError> {
    let id = record_id(&bus_type)?;
    Ok(BusTypeResponse::new(bus_type, id))
}

pub async fn list_bus_types<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    query: web::Query<BusTypeQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = owner_filter(&user, query.organization_id.as_deref())?;
    let bus_types = store
        .find_many::<BusType>(filter)
        .await?
        .into_iter()
        .map(respond)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::new(bus_types).ok())
}

pub async fn create_bus_type<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    input: web::Json<BusTypeInput>,
) -> Result<HttpResponse, ApiError> {
    input.check()?;
    let organization =
        owned_organization(store.get_ref(), &user, input.organization_id.as_deref()).await?;
    let organization_id = record_id(&organization)?;

    let bus_type = store
        .insert(BusType::new(organization.owner_id, organization_id, &input))
        .await?;

    info!("User {} created bus type '{}'", user.id, bus_type.name);
    Ok(ApiResponse::new(respond(bus_type)?).created())
}

pub async fn get_bus_type<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let bus_type = load_owned::<S, BusType>(store.get_ref(), &user, &path).await?;
    Ok(ApiResponse::new(respond(bus_type)?).ok())
}

pub async fn update_bus_type<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
    input: web::Json<BusTypeInput>,
) -> Result<HttpResponse, ApiError> {
    let mut bus_type = load_owned::<S, BusType>(store.get_ref(), &user, &path).await?;
    input.check()?;

    // Moving to another organization requires owning that one too.
    if input.organization_id.is_some() {
        let organization =
            owned_organization(store.get_ref(), &user, input.organization_id.as_deref()).await?;
        if organization.owner_id != bus_type.owner_id {
            return Err(ApiError::forbidden("organization"));
        }
        bus_type.organization_id = record_id(&organization)?;
    }

    bus_type.apply(&input);
    let bus_type = store
        .replace(bus_type)
        .await?
        .ok_or_else(|| ApiError::not_found("Bus type"))?;
    Ok(ApiResponse::new(respond(bus_type)?).ok())
}

pub async fn delete_bus_type<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let bus_type = load_owned::<S, BusType>(store.get_ref(), &user, &path).await?;
    let id = record_id(&bus_type)?;
    store.delete::<BusType>(id).await?;

    info!("User {} deleted bus type {}", user.id, id);
    Ok(ApiResponse::new(()).with_message("Bus type deleted").ok())
}
