//! Client-side view of the external identity and tenant actors.
//!
//! The records themselves live elsewhere; this module only knows the method
//! names and message shapes, plus two small in-memory grains used as
//! fixtures by the binary and the tests.

use std::collections::HashMap;
use std::sync::Arc;

use ambit_core::TenantContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::actor::{codec, ActorClient, ActorError, Grain, GrainContext, GrainId};

/// Grain type of the identity actor. Keyed by subject id.
pub const IDENTITY_GRAIN: &str = "identity";
/// Grain type of the tenant actor. Keyed by tenant name.
pub const TENANT_GRAIN: &str = "tenant";

pub mod methods {
    pub const GET_PROFILE: &str = "GetProfile";
    pub const GET_TENANT_MEMBERSHIPS: &str = "GetTenantMemberships";
    pub const GET_BY_NAME: &str = "GetByName";
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
}

/// A subject's membership in one tenant and the roles held there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMembership {
    pub tenant_name: String,
    pub roles: Vec<String>,
}

impl TenantMembership {
    #[must_use]
    pub fn new(tenant_name: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Directory traits
// ---------------------------------------------------------------------------

/// The identity actor's API.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn get_profile(&self, subject_id: &str) -> Result<Option<UserProfile>, ActorError>;

    async fn get_tenant_memberships(
        &self,
        subject_id: &str,
    ) -> Result<Vec<TenantMembership>, ActorError>;
}

/// The tenant actor's API.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<TenantContext>, ActorError>;
}

/// [`IdentityDirectory`] backed by calls to the `identity` grain.
#[derive(Debug, Clone)]
pub struct ActorIdentityDirectory {
    client: ActorClient,
}

impl ActorIdentityDirectory {
    #[must_use]
    pub fn new(client: ActorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityDirectory for ActorIdentityDirectory {
    async fn get_profile(&self, subject_id: &str) -> Result<Option<UserProfile>, ActorError> {
        self.client
            .call(GrainId::new(IDENTITY_GRAIN, subject_id), methods::GET_PROFILE, &())
            .await
    }

    async fn get_tenant_memberships(
        &self,
        subject_id: &str,
    ) -> Result<Vec<TenantMembership>, ActorError> {
        self.client
            .call(
                GrainId::new(IDENTITY_GRAIN, subject_id),
                methods::GET_TENANT_MEMBERSHIPS,
                &(),
            )
            .await
    }
}

/// [`TenantDirectory`] backed by calls to the `tenant` grain.
#[derive(Debug, Clone)]
pub struct ActorTenantDirectory {
    client: ActorClient,
}

impl ActorTenantDirectory {
    #[must_use]
    pub fn new(client: ActorClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TenantDirectory for ActorTenantDirectory {
    async fn get_by_name(&self, name: &str) -> Result<Option<TenantContext>, ActorError> {
        self.client
            .call(GrainId::new(TENANT_GRAIN, name), methods::GET_BY_NAME, &())
            .await
    }
}

// ---------------------------------------------------------------------------
// In-memory fixtures
// ---------------------------------------------------------------------------

fn unknown_method(ctx: &GrainContext) -> ActorError {
    ActorError::UnknownMethod {
        grain_type: ctx.id.grain_type.clone(),
        method: ctx.method.clone(),
    }
}

/// Identity grain answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityGrain {
    profiles: Arc<HashMap<String, UserProfile>>,
    memberships: Arc<HashMap<String, Vec<TenantMembership>>>,
}

impl InMemoryIdentityGrain {
    #[must_use]
    pub fn with_user(mut self, profile: UserProfile, memberships: Vec<TenantMembership>) -> Self {
        let subject = profile.subject_id.clone();
        Arc::make_mut(&mut self.memberships).insert(subject.clone(), memberships);
        Arc::make_mut(&mut self.profiles).insert(subject, profile);
        self
    }
}

#[async_trait]
impl Grain for InMemoryIdentityGrain {
    async fn invoke(&self, ctx: &GrainContext, _payload: &[u8]) -> Result<Vec<u8>, ActorError> {
        match ctx.method.as_str() {
            methods::GET_PROFILE => codec::encode(&self.profiles.get(&ctx.id.key)),
            methods::GET_TENANT_MEMBERSHIPS => codec::encode(
                self.memberships
                    .get(&ctx.id.key)
                    .map_or(&[][..], Vec::as_slice),
            ),
            _ => Err(unknown_method(ctx)),
        }
    }
}

/// Tenant grain answering from a fixed table keyed by tenant name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantGrain {
    tenants: Arc<HashMap<String, TenantContext>>,
}

impl InMemoryTenantGrain {
    #[must_use]
    pub fn with_tenant(mut self, tenant: TenantContext) -> Self {
        Arc::make_mut(&mut self.tenants).insert(tenant.name.clone(), tenant);
        self
    }
}

#[async_trait]
impl Grain for InMemoryTenantGrain {
    async fn invoke(&self, ctx: &GrainContext, _payload: &[u8]) -> Result<Vec<u8>, ActorError> {
        match ctx.method.as_str() {
            methods::GET_BY_NAME => codec::encode(&self.tenants.get(&ctx.id.key)),
            _ => Err(unknown_method(ctx)),
        }
    }
}
