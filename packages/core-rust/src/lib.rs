//! Ambit core: ambient context values, context kinds, and the call metadata
//! wire contract shared by every node.

pub mod baggage;
pub mod claims;
pub mod context;
pub mod metadata;
pub mod placement;

pub use claims::{claim_types, Claim, ClaimsPrincipal};
pub use context::{
    ContextKind, Correlation, CorrelationId, Identity, IdentityContext, NotResolved, Tenant,
    TenantContext,
};
pub use metadata::{keys, CallMetadata, MetadataError};
