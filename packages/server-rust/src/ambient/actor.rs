//! Actor-call transport: the metadata of the turn currently executing.

use std::cell::RefCell;
use std::future::Future;

use ambit_core::CallMetadata;

use super::{AmbientChannel, Transport};

tokio::task_local! {
    static CALL_METADATA: RefCell<CallMetadata>;
}

/// Handle to the actor-call slot of the current task.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorChannel;

impl ActorChannel {
    /// Runs `fut` as one actor turn whose slot holds exactly `metadata`.
    ///
    /// Whatever an enclosing scope held is invisible inside `fut`; the slot
    /// is dropped when `fut` completes.
    pub async fn scope<F>(metadata: CallMetadata, fut: F) -> F::Output
    where
        F: Future,
    {
        CALL_METADATA.scope(RefCell::new(metadata), fut).await
    }

    /// Synchronous variant of [`ActorChannel::scope`].
    pub fn sync_scope<R>(metadata: CallMetadata, f: impl FnOnce() -> R) -> R {
        CALL_METADATA.sync_scope(RefCell::new(metadata), f)
    }

    /// Copy of the current turn's metadata, for handing to a dispatcher.
    #[must_use]
    pub fn capture() -> Option<CallMetadata> {
        CALL_METADATA.try_with(|md| md.borrow().clone()).ok()
    }
}

impl AmbientChannel for ActorChannel {
    fn transport(&self) -> Transport {
        Transport::Actor
    }

    fn snapshot(&self) -> Option<CallMetadata> {
        Self::capture()
    }

    fn update(&self, f: &mut dyn FnMut(&mut CallMetadata)) -> bool {
        CALL_METADATA
            .try_with(|md| f(&mut md.borrow_mut()))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use ambit_core::{ContextKind, Correlation, CorrelationId, Tenant, TenantContext};

    use super::*;
    use crate::ambient::AmbientChannelExt;

    #[test]
    fn outside_scope_reads_nothing_and_rejects_writes() {
        let channel = ActorChannel;
        assert!(!channel.is_active());
        assert!(channel.get::<Tenant>().is_none());
        assert!(!channel.set::<Tenant>(Some(&TenantContext::named("t1"))));
    }

    #[tokio::test]
    async fn set_then_get_within_one_turn() {
        let tenant = TenantContext::new("7", "t1", "shard-7");
        let seen = ActorChannel::scope(CallMetadata::new(), async {
            assert!(ActorChannel.set::<Tenant>(Some(&tenant)));
            tokio::task::yield_now().await;
            ActorChannel.get::<Tenant>()
        })
        .await;
        assert_eq!(seen, Some(tenant));
    }

    #[tokio::test]
    async fn nested_scope_overwrites_rather_than_merges() {
        let mut outer = CallMetadata::new();
        Correlation::store(Some(&CorrelationId::new("outer")), &mut outer);

        ActorChannel::scope(outer, async {
            let inner = ActorChannel::scope(CallMetadata::new(), async {
                ActorChannel.get::<Correlation>()
            })
            .await;
            assert!(inner.is_none());
            assert_eq!(
                ActorChannel.get::<Correlation>(),
                Some(CorrelationId::new("outer"))
            );
        })
        .await;
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_slot() {
        let mut md = CallMetadata::new();
        md.insert(ambit_core::keys::TENANT_NAME, "t1");
        ActorChannel::scope(md, async {
            let inherited = tokio::spawn(async { ActorChannel::capture() })
                .await
                .unwrap();
            assert!(inherited.is_none());
        })
        .await;
    }
}
