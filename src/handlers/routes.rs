use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;

use super::{load_owned, owned_organization, owner_filter};
use crate::{
    auth::OperatorUser,
    db::Store,
    error::ApiError,
    models::{record_id, ApiResponse, Route, RouteInput, RouteResponse, ValidateRequest},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub organization_id: Option<String>,
}

fn respond(route: Route) -> Result<RouteResponse, ApiError> {
    let id = record_id(&route)?;
    Ok(RouteResponse::new(route, id))
}

pub async fn list_routes<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    query: web::Query<RouteQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = owner_filter(&user, query.organization_id.as_deref())?;
    let routes = store
        .find_many::<Route>(filter)
        .await?
        .into_iter()
        .map(respond)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::new(routes).ok())
}

pub async fn create_route<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    input: web::Json<RouteInput>,
) -> Result<HttpResponse, ApiError> {
    input.check()?;
    let organization =
        owned_organization(store.get_ref(), &user, input.organization_id.as_deref()).await?;
    let organization_id = record_id(&organization)?;

    let route = store
        .insert(Route::new(organization.owner_id, organization_id, &input))
        .await?;

    info!(
        "User {} created route {} -> {}",
        user.id, route.origin, route.destination
    );
    Ok(ApiResponse::new(respond(route)?).created())
}

pub async fn get_route<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let route = load_owned::<S, Route>(store.get_ref(), &user, &path).await?;
    Ok(ApiResponse::new(respond(route)?).ok())
}

pub async fn update_route<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
    input: web::Json<RouteInput>,
) -> Result<HttpResponse, ApiError> {
    let mut route = load_owned::<S, Route>(store.get_ref(), &user, &path).await?;
    input.check()?;

    if input.organization_id.is_some() {
        let organization =
            owned_organization(store.get_ref(), &user, input.organization_id.as_deref()).await?;
        if organization.owner_id != route.owner_id {
            return Err(ApiError::forbidden("organization"));
        }
        route.organization_id = record_id(&organization)?;
    }

    route.apply(&input);
    let route = store
        .replace(route)
        .await?
        .ok_or_else(|| ApiError::not_found("Route"))?;
    Ok(ApiResponse::new(respond(route)?).ok())
}

pub async fn delete_route<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let route = load_owned::<S, Route>(store.get_ref(), &user, &path).await?;
    let id = record_id(&route)?;
    store.delete::<Route>(id).await?;

    info!("User {} deleted route {}", user.id, id);
    Ok(ApiResponse::new(()).with_message("Route deleted").ok())
}
