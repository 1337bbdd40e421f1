//! ambit-server: HTTP ingress in front of an in-process actor cluster.
//!
//! Tenants, users and tokens are static fixtures given on the command line;
//! there is no storage.

use std::sync::Arc;
use std::time::Duration;

use ambit_core::{ClaimsPrincipal, TenantContext};
use ambit_server::actor::{GrainRouter, InProcessNetwork, Silo};
use ambit_server::directory::{
    ActorIdentityDirectory, ActorTenantDirectory, InMemoryIdentityGrain, InMemoryTenantGrain,
    TenantMembership, UserProfile, IDENTITY_GRAIN, TENANT_GRAIN,
};
use ambit_server::enrichment::ClaimsEnricher;
use ambit_server::http::{
    AmbientConfig, AppState, NetworkConfig, NetworkModule, StaticTokenValidator,
};
use ambit_server::resolver::ContextResolvers;
use ambit_server::telemetry::{init_tracing, JsonLinesSink, TelemetryPipeline};
use anyhow::{Context, Result};
use clap::Parser;
use http::HeaderName;
use tracing::info;

/// ambit-server - ambient context propagation demo server
#[derive(Parser, Debug)]
#[command(name = "ambit-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(long, env = "AMBIT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 = OS-assigned)
    #[arg(long, env = "AMBIT_PORT", default_value_t = 8080)]
    port: u16,

    /// Header carrying the tenant name
    #[arg(long, env = "AMBIT_TENANT_HEADER", default_value = "x-tenant-id")]
    tenant_header: String,

    /// Header carrying the correlation id
    #[arg(long, env = "AMBIT_CORRELATION_HEADER", default_value = "x-correlation-id")]
    correlation_header: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Number of silos in the in-process cluster
    #[arg(long, default_value_t = 2)]
    silos: usize,

    /// Emit logs as JSON
    #[arg(long, env = "AMBIT_LOG_JSON")]
    log_json: bool,

    /// Tenant fixture: NAME=STORAGE_ID (repeatable)
    #[arg(long = "tenant", value_parser = parse_tenant)]
    tenants: Vec<TenantContext>,

    /// Membership fixture: SUBJECT:TENANT:ROLE[,ROLE...] (repeatable)
    #[arg(long = "member", value_parser = parse_member)]
    members: Vec<(String, TenantMembership)>,

    /// Token fixture: TOKEN=SUBJECT (repeatable)
    #[arg(long = "token", value_parser = parse_token)]
    tokens: Vec<(String, String)>,
}

fn parse_tenant(raw: &str) -> Result<TenantContext, String> {
    let (name, storage) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=STORAGE_ID, got {raw:?}"))?;
    Ok(TenantContext::new(name, name, storage))
}

fn parse_member(raw: &str) -> Result<(String, TenantMembership), String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(subject), Some(tenant), Some(roles)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected SUBJECT:TENANT:ROLES, got {raw:?}"));
    };
    let roles: Vec<&str> = roles.split(',').filter(|r| !r.is_empty()).collect();
    Ok((subject.to_string(), TenantMembership::new(tenant, &roles)))
}

fn parse_token(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(token, subject)| (token.to_string(), subject.to_string()))
        .ok_or_else(|| format!("expected TOKEN=SUBJECT, got {raw:?}"))
}

fn identity_grain(args: &Args) -> InMemoryIdentityGrain {
    let mut subjects: Vec<&str> = args.members.iter().map(|(s, _)| s.as_str()).collect();
    subjects.extend(args.tokens.iter().map(|(_, s)| s.as_str()));
    subjects.sort_unstable();
    subjects.dedup();

    subjects.into_iter().fold(InMemoryIdentityGrain::default(), |grain, subject| {
        let memberships = args
            .members
            .iter()
            .filter(|(s, _)| s == subject)
            .map(|(_, m)| m.clone())
            .collect();
        let profile = UserProfile {
            subject_id: subject.to_string(),
            email: format!("{subject}@example.com"),
            display_name: subject.to_string(),
        };
        grain.with_user(profile, memberships)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolvers = ContextResolvers::standard()?;
    init_tracing(
        args.log_json,
        TelemetryPipeline::standard(&resolvers, Arc::new(JsonLinesSink::stderr())),
    )?;

    let tenant_grain = args
        .tenants
        .iter()
        .cloned()
        .fold(InMemoryTenantGrain::default(), InMemoryTenantGrain::with_tenant);
    let router = GrainRouter::new()
        .with(IDENTITY_GRAIN, identity_grain(&args))
        .with(TENANT_GRAIN, tenant_grain);

    let network = InProcessNetwork::new(resolvers.clone());
    for i in 0..args.silos.max(1) {
        network.add_silo(Silo::new(format!("silo-{i}"), router.clone()));
    }
    let client = network.client();

    let tokens = args
        .tokens
        .iter()
        .fold(StaticTokenValidator::default(), |v, (token, subject)| {
            v.with_token(token.clone(), ClaimsPrincipal::with_subject(subject.clone()))
        });

    let config = NetworkConfig {
        host: args.host.clone(),
        port: args.port,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ambient: AmbientConfig {
            tenant_header: HeaderName::try_from(args.tenant_header.as_str())
                .context("invalid --tenant-header")?,
            correlation_header: HeaderName::try_from(args.correlation_header.as_str())
                .context("invalid --correlation-header")?,
        },
        ..NetworkConfig::default()
    };

    let state = AppState {
        enricher: Arc::new(ClaimsEnricher::new(
            Arc::new(ActorIdentityDirectory::new(client.clone())),
            Arc::clone(&resolvers.tenant),
        )),
        tenants: Arc::new(ActorTenantDirectory::new(client)),
        tokens: Arc::new(tokens),
        resolvers,
        config: Arc::new(config),
    };

    let mut module = NetworkModule::new(state);
    let port = module.start().await?;
    info!(port, silos = ?network.node_ids(), "ambit-server ready");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
