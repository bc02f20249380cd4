use actix_web::{web, HttpResponse};
use mongodb::bson::doc;

use super::current_user;
use crate::{
    auth::{AuthUser, OperatorUser},
    db::Store,
    error::ApiError,
    models::{record_id, ApiResponse, Booking, BookingResponse, Trip, TripResponse},
};

/// The caller's bookings, oldest first.
pub async fn list_bookings<S: Store>(
    user: AuthUser,
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let bookings = store
        .find_many::<Booking>(doc! { "userId": user.id })
        .await?
        .into_iter()
        .map(|booking| {
            let id = record_id(&booking)?;
            Ok(BookingResponse::new(booking, id))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(ApiResponse::new(bookings).ok())
}

/// Trips of the caller's tenant. Operators who have not finished onboarding
/// have no tenant and therefore no trips.
pub async fn list_trips<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let record = current_user(store.get_ref(), &user).await?;
    let Some(tenant_id) = record.tenant_id else {
        return Ok(ApiResponse::new(Vec::<TripResponse>::new()).ok());
    };

    let trips = store
        .find_many::<Trip>(doc! { "tenantId": tenant_id })
        .await?
        .into_iter()
        .map(|trip| {
            let id = record_id(&trip)?;
            Ok(TripResponse::new(trip, id))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(ApiResponse::new(trips).ok())
}
