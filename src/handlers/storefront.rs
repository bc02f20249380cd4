use std::collections::{HashMap, HashSet};

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::{
    db::Store,
    error::{ApiError, FieldError},
    models::{
        record_id, serialize_oid_as_hex, AcType, Amenity, ApiResponse, BusType, Organization,
        Route, RouteResponse, SeatingType, Tenant, TripResponse,
    },
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// Restricts results to one operator's storefront.
    pub tenant: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSummary {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusTypeSummary {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    pub name: String,
    pub ac_type: AcType,
    pub seating_type: SeatingType,
    pub total_capacity: u32,
    pub amenities: Vec<Amenity>,
    pub fare_from: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    #[serde(flatten)]
    pub route: RouteResponse,
    pub operator: OperatorSummary,
    pub bus_types: Vec<BusTypeSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<NaiveDate>,
    pub routes: Vec<RouteMatch>,
    /// Trip scheduling is not offered, so this is always empty.
    pub trips: Vec<TripResponse>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(|raw| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::Validation(vec![FieldError::new("date", "Date must be YYYY-MM-DD")])
        })
    })
    .transpose()
}

fn summarize(bus_type: BusType) -> Result<BusTypeSummary, ApiError> {
    let id = record_id(&bus_type)?;
    Ok(BusTypeSummary {
        id,
        name: bus_type.name,
        ac_type: bus_type.ac_type,
        seating_type: bus_type.seating_type,
        total_capacity: bus_type.decks.total_capacity(),
        fare_from: bus_type.decks.lowest_fare(),
        amenities: bus_type.amenities.into_iter().collect(),
    })
}

/// Organizations whose routes may appear in results, keyed by id. `None`
/// means every operator.
async fn tenant_organizations<S: Store>(
    store: &S,
    slug: Option<&str>,
) -> Result<Option<HashSet<ObjectId>>, ApiError> {
    let Some(slug) = slug else {
        return Ok(None);
    };
    let tenant = store
        .find_one::<Tenant>(doc! { "slug": slug.to_lowercase(), "isActive": true })
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant"))?;
    let tenant_id = record_id(&tenant)?;

    let organizations = store
        .find_many::<Organization>(doc! { "tenantId": tenant_id })
        .await?;
    Ok(Some(organizations.into_iter().filter_map(|o| o.id).collect()))
}

pub async fn search<S: Store>(
    store: web::Data<S>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let from = non_blank(&query.from);
    let to = non_blank(&query.to);
    let date = parse_date(non_blank(&query.date))?;
    let allowed = tenant_organizations(store.get_ref(), non_blank(&query.tenant)).await?;

    let routes: Vec<Route> = store
        .find_many::<Route>(doc! { "isActive": true })
        .await?
        .into_iter()
        .filter(|route| {
            allowed
                .as_ref()
                .map_or(true, |ids| ids.contains(&route.organization_id))
        })
        .filter(|route| route.serves(from, to))
        .collect();

    let mut operators: HashMap<ObjectId, Option<Organization>> = HashMap::new();
    let mut fleets: HashMap<ObjectId, Vec<BusType>> = HashMap::new();
    let mut matches = Vec::with_capacity(routes.len());

    for route in routes {
        let organization_id = route.organization_id;
        if !operators.contains_key(&organization_id) {
            let organization = store.find_by_id::<Organization>(organization_id).await?;
            operators.insert(organization_id, organization);
        }
        // Routes of a deleted operator are skipped.
        let Some(Some(operator)) = operators.get(&organization_id) else {
            continue;
        };
        let operator = OperatorSummary {
            id: organization_id,
            name: operator.name.clone(),
        };

        if !fleets.contains_key(&organization_id) {
            let fleet = store
                .find_many::<BusType>(doc! { "organizationId": organization_id, "isActive": true })
                .await?;
            fleets.insert(organization_id, fleet);
        }
        let bus_types = fleets
            .get(&organization_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(summarize)
            .collect::<Result<Vec<_>, _>>()?;

        let route_id = record_id(&route)?;
        matches.push(RouteMatch {
            route: RouteResponse::new(route, route_id),
            operator,
            bus_types,
        });
    }

    Ok(ApiResponse::new(SearchResponse {
        from: from.map(str::to_string),
        to: to.map(str::to_string),
        date,
        routes: matches,
        trips: Vec::new(),
    })
    .ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(
            parse_date(Some("2026-12-24")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 24)
        );
        assert_eq!(parse_date(None).unwrap(), None);
        assert!(matches!(
            parse_date(Some("24/12/2026")),
            Err(ApiError::Validation(_))
        ));
    }
}
