//! Onboarding wizard payloads.
//!
//! The wizard walks an operator through four steps. Each step can be checked
//! on its own while the user fills the form; the final submission is checked
//! as a whole, including rules that span several entries of a step.

use std::collections::HashSet;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{BusTypeInput, OrganizationInput, RouteInput, TenantInput, ValidateRequest};
use crate::error::{ApiError, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnboardingStep {
    Organization,
    BusTypes,
    Routes,
    Tenant,
}

impl OnboardingStep {
    pub const ORDER: [OnboardingStep; 4] = [
        OnboardingStep::Organization,
        OnboardingStep::BusTypes,
        OnboardingStep::Routes,
        OnboardingStep::Tenant,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            OnboardingStep::Organization => "organization",
            OnboardingStep::BusTypes => "busTypes",
            OnboardingStep::Routes => "routes",
            OnboardingStep::Tenant => "tenant",
        }
    }
}

/// Body of `POST /api/onboarding/validate`.
#[derive(Debug, Deserialize)]
pub struct StepValidationRequest {
    pub step: OnboardingStep,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl StepValidationRequest {
    /// Field errors for this step, prefixed with the step key.
    pub fn field_errors(&self) -> Result<Vec<FieldError>, ApiError> {
        let errors = match self.step {
            OnboardingStep::Organization => {
                organization_errors(Some(&parse::<OrganizationInput>(self.step, &self.data)?))
            }
            OnboardingStep::BusTypes => {
                bus_type_errors(&parse::<Vec<BusTypeInput>>(self.step, &self.data)?)
            }
            OnboardingStep::Routes => route_errors(&parse::<Vec<RouteInput>>(self.step, &self.data)?),
            OnboardingStep::Tenant => tenant_errors(Some(&parse::<TenantInput>(self.step, &self.data)?)),
        };
        Ok(errors)
    }
}

fn parse<T: DeserializeOwned>(step: OnboardingStep, data: &serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(data.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid {} data: {e}", step.key())))
}

/// Body of `POST /api/onboarding/complete`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[serde(default)]
    pub organization: Option<OrganizationInput>,
    #[serde(default)]
    pub bus_types: Vec<BusTypeInput>,
    #[serde(default)]
    pub routes: Vec<RouteInput>,
    #[serde(default)]
    pub tenant: Option<TenantInput>,
}

impl OnboardingRequest {
    pub fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = organization_errors(self.organization.as_ref());
        errors.extend(bus_type_errors(&self.bus_types));
        errors.extend(route_errors(&self.routes));
        errors.extend(tenant_errors(self.tenant.as_ref()));
        errors
    }

    pub fn check(&self) -> Result<(), ApiError> {
        let errors = self.field_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

fn prefixed(prefix: &str, errors: Vec<FieldError>) -> impl Iterator<Item = FieldError> + '_ {
    errors
        .into_iter()
        .map(move |e| FieldError::new(format!("{prefix}.{}", e.field), e.message))
}

fn organization_errors(organization: Option<&OrganizationInput>) -> Vec<FieldError> {
    match organization {
        Some(org) => prefixed("organization", org.field_errors()).collect(),
        None => vec![FieldError::new(
            "organization",
            "Organization details are required",
        )],
    }
}

fn bus_type_errors(bus_types: &[BusTypeInput]) -> Vec<FieldError> {
    if bus_types.is_empty() {
        return vec![FieldError::new("busTypes", "Add at least one bus type")];
    }

    let mut errors = Vec::new();
    let mut names = HashSet::new();
    for (index, bus_type) in bus_types.iter().enumerate() {
        let prefix = format!("busTypes[{index}]");
        errors.extend(prefixed(&prefix, bus_type.field_errors()));

        let name = bus_type.name.trim().to_lowercase();
        if !name.is_empty() && !names.insert(name) {
            errors.push(FieldError::new(
                format!("{prefix}.name"),
                "Bus type names must be unique",
            ));
        }
    }
    errors
}

fn route_errors(routes: &[RouteInput]) -> Vec<FieldError> {
    if routes.is_empty() {
        return vec![FieldError::new("routes", "Add at least one route")];
    }

    let mut errors = Vec::new();
    let mut pairs = HashSet::new();
    for (index, route) in routes.iter().enumerate() {
        let prefix = format!("routes[{index}]");
        errors.extend(prefixed(&prefix, route.field_errors()));

        if !pairs.insert(route.pair_key()) {
            errors.push(FieldError::new(
                format!("{prefix}.destination"),
                "This route is already listed",
            ));
        }
    }
    errors
}

fn tenant_errors(tenant: Option<&TenantInput>) -> Vec<FieldError> {
    match tenant {
        Some(tenant) => prefixed("tenant", tenant.field_errors()).collect(),
        None => vec![FieldError::new("tenant", "Tenant details are required")],
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepProgress {
    pub organization: bool,
    pub bus_types: bool,
    pub routes: bool,
    pub tenant: bool,
}

impl StepProgress {
    fn is_done(&self, step: OnboardingStep) -> bool {
        match step {
            OnboardingStep::Organization => self.organization,
            OnboardingStep::BusTypes => self.bus_types,
            OnboardingStep::Routes => self.routes,
            OnboardingStep::Tenant => self.tenant,
        }
    }
}

/// Response of `GET /api/onboarding/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    pub completed: bool,
    pub steps: StepProgress,
    pub next_step: Option<OnboardingStep>,
}

impl OnboardingStatus {
    pub fn new(completed: bool, steps: StepProgress) -> Self {
        let next_step = if completed {
            None
        } else {
            OnboardingStep::ORDER
                .into_iter()
                .find(|step| !steps.is_done(*step))
        };
        Self {
            completed,
            steps,
            next_step,
        }
    }
}
