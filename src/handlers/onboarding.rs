use actix_web::{web, HttpResponse};
use log::{error, info};
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use serde_json::json;

use super::{current_user, organizations::demote_other_primaries};
use crate::{
    auth::OperatorUser,
    db::{Entity, Store},
    error::ApiError,
    models::{
        onboarding::StepProgress, record_id, ApiResponse, BusType, OnboardingRequest,
        OnboardingStatus, Organization, Route, StepValidationRequest, Tenant, TenantResponse,
        User,
    },
};

pub async fn status<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let record = current_user(store.get_ref(), &user).await?;
    let owned = doc! { "ownerId": user.id };

    let steps = StepProgress {
        organization: store.count::<Organization>(owned.clone()).await? > 0,
        bus_types: store.count::<BusType>(owned.clone()).await? > 0,
        routes: store.count::<Route>(owned).await? > 0,
        tenant: record.tenant_id.is_some(),
    };
    Ok(ApiResponse::new(OnboardingStatus::new(record.onboarding_completed, steps)).ok())
}

pub async fn validate_step(
    _user: OperatorUser,
    request: web::Json<StepValidationRequest>,
) -> Result<HttpResponse, ApiError> {
    let errors = request.field_errors()?;
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(ApiResponse::new(json!({ "valid": true, "step": request.step })).ok())
}

/// What has been written so far, undone again if a later write fails.
#[derive(Default)]
struct Written {
    tenant: Option<ObjectId>,
    organization: Option<ObjectId>,
    bus_types: Vec<ObjectId>,
    routes: Vec<ObjectId>,
    /// Earlier primary organizations that were demoted.
    demoted: Vec<ObjectId>,
    /// The owner as it was before the onboarded record was saved.
    owner: Option<User>,
}

impl Written {
    async fn roll_back<S: Store>(self, store: &S) {
        async fn remove<S: Store, E: Entity>(store: &S, id: ObjectId) {
            if let Err(e) = store.delete::<E>(id).await {
                error!("Failed to roll back {} {}: {}", E::LABEL, id, e);
            }
        }

        if let Some(owner) = self.owner {
            if let Err(e) = store.replace(owner).await {
                error!("Failed to restore user during rollback: {}", e);
            }
        }
        for id in self.demoted {
            if let Err(e) = promote(store, id).await {
                error!("Failed to restore primary organization {}: {}", id, e);
            }
        }
        for id in self.routes {
            remove::<S, Route>(store, id).await;
        }
        for id in self.bus_types {
            remove::<S, BusType>(store, id).await;
        }
        if let Some(id) = self.organization {
            remove::<S, Organization>(store, id).await;
        }
        if let Some(id) = self.tenant {
            remove::<S, Tenant>(store, id).await;
        }
    }
}

async fn promote<S: Store>(store: &S, id: ObjectId) -> Result<(), ApiError> {
    if let Some(mut org) = store.find_by_id::<Organization>(id).await? {
        org.is_primary = true;
        org.updated_at = DateTime::now();
        store.replace(org).await?;
    }
    Ok(())
}

async fn persist<S: Store>(
    store: &S,
    owner: User,
    request: &OnboardingRequest,
    written: &mut Written,
) -> Result<Tenant, ApiError> {
    let (Some(org_input), Some(tenant_input)) = (&request.organization, &request.tenant) else {
        return Err(ApiError::BadRequest("Onboarding request is incomplete".into()));
    };
    let owner_id = record_id(&owner)?;

    let tenant = store.insert(Tenant::new(owner_id, tenant_input)).await?;
    let tenant_id = record_id(&tenant)?;
    written.tenant = Some(tenant_id);

    let mut organization = Organization::new(owner_id, Some(tenant_id), org_input);
    organization.is_primary = true;
    let organization = store.insert(organization).await?;
    let organization_id = record_id(&organization)?;
    written.organization = Some(organization_id);

    for input in &request.bus_types {
        let bus_type = store
            .insert(BusType::new(owner_id, organization_id, input))
            .await?;
        written.bus_types.push(record_id(&bus_type)?);
    }
    for input in &request.routes {
        let route = store
            .insert(Route::new(owner_id, organization_id, input))
            .await?;
        written.routes.push(record_id(&route)?);
    }

    demote_other_primaries(store, owner_id, organization_id, &mut written.demoted).await?;

    // The owner goes last: once it is saved the user counts as onboarded.
    let mut onboarded = owner.clone();
    onboarded.tenant_id = Some(tenant_id);
    onboarded.onboarding_completed = true;
    onboarded.updated_at = DateTime::now();
    written.owner = Some(owner);
    store
        .replace(onboarded)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".into()))?;
    Ok(tenant)
}

pub async fn complete<S: Store>(
    OperatorUser(user): OperatorUser,
    store: web::Data<S>,
    request: web::Json<OnboardingRequest>,
) -> Result<HttpResponse, ApiError> {
    let owner = current_user(store.get_ref(), &user).await?;
    if owner.onboarding_completed {
        return Err(ApiError::Conflict("Onboarding is already complete".into()));
    }
    request.check()?;

    if let Some(tenant) = &request.tenant {
        let slug = tenant.slug.trim();
        if store
            .find_one::<Tenant>(doc! { "slug": slug })
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(format!("Tenant slug '{slug}' is taken")));
        }
    }

    // Concurrent completions by one user can both get past the checks above;
    // tenants are unique per owner, so only one tenant insert succeeds.
    let mut written = Written::default();
    let tenant = match persist(store.get_ref(), owner, &request, &mut written).await {
        Ok(tenant) => tenant,
        Err(e) => {
            error!("Onboarding for user {} failed, rolling back: {}", user.id, e);
            written.roll_back(store.get_ref()).await;
            return Err(e);
        }
    };

    let tenant_id = record_id(&tenant)?;
    info!(
        "User {} completed onboarding with tenant '{}' ({} bus types, {} routes)",
        user.id,
        tenant.slug,
        request.bus_types.len(),
        request.routes.len()
    );
    Ok(ApiResponse::new(TenantResponse::new(tenant, tenant_id))
        .with_message("Onboarding complete")
        .created())
}
