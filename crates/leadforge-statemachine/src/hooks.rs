//! Pre/post transition hook dispatch.
//!
//! Hooks are keyed by the string `"pre_<from>_to_<to>"` / `"post_<from>_to_<to>"`,
//! so callers register against the same key shape the engine dispatches against.

use crate::context::TransitionContext;
use dashmap::DashMap;
use leadforge_types::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A hook callback: given the transition context, returns a future resolving
/// to success or an error message.
pub type Hook =
    Arc<dyn Fn(TransitionContext) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Registry of pre/post hooks, keyed by the transition key string.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Arc<DashMap<String, Vec<Hook>>>,
}

impl HookRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under an arbitrary key (typically built with
    /// [`pre_key`] or [`post_key`]).
    pub fn register(&self, key: impl Into<String>, hook: Hook) {
        self.hooks.entry(key.into()).or_default().push(hook);
    }

    /// Run every hook registered under `key` sequentially, in registration
    /// order. The first failure aborts the remaining hooks and is returned
    /// to the caller as `Error::PreHookFailed` — used for the pre-transition
    /// path, where a failure must abort the transition.
    pub async fn dispatch_sequential_failing(
        &self,
        key: &str,
        ctx: &TransitionContext,
    ) -> Result<()> {
        let Some(hooks) = self.hooks.get(key).map(|entry| entry.clone()) else {
            return Ok(());
        };
        for hook in hooks {
            hook(ctx.clone()).await.map_err(|e| Error::PreHookFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Run every hook registered under `key` as an independent spawned task,
    /// tied to `shutdown` for cancellation. A hook failure is logged and
    /// never surfaces to the caller — used for the post-transition path.
    pub fn dispatch_detached(&self, key: &str, ctx: TransitionContext, shutdown: &CancellationToken) {
        let Some(hooks) = self.hooks.get(key).map(|entry| entry.clone()) else {
            return;
        };
        for hook in hooks {
            let ctx = ctx.clone();
            let shutdown = shutdown.clone();
            let key = key.to_string();
            tokio::spawn(async move {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::warn!(hook = %key, "post-hook cancelled by shutdown before completion");
                    }
                    result = hook(ctx) => {
                        if let Err(error) = result {
                            tracing::error!(hook = %key, %error, "post-hook failed");
                        }
                    }
                }
            });
        }
    }
}

/// Build the `"pre_<from>_to_<to>"` key for a transition.
#[must_use]
pub fn pre_key(from: impl std::fmt::Display, to: impl std::fmt::Display) -> String {
    format!("pre_{from}_to_{to}")
}

/// Build the `"post_<from>_to_<to>"` key for a transition.
#[must_use]
pub fn post_key(from: impl std::fmt::Display, to: impl std::fmt::Display) -> String {
    format!("post_{from}_to_{to}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadforge_types::CampaignId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn pre_hook_failure_aborts_and_reports_pre_hook_failed() {
        let registry = HookRegistry::new();
        registry.register(
            "pre_draft_to_running",
            Arc::new(|_ctx| Box::pin(async { Err(Error::PhaseFailed("nope".into())) })),
        );
        let ctx = TransitionContext::new(CampaignId::new());
        let err = registry.dispatch_sequential_failing("pre_draft_to_running", &ctx).await.unwrap_err();
        assert!(matches!(err, Error::PreHookFailed(_)));
    }

    #[tokio::test]
    async fn pre_hooks_run_in_registration_order_and_stop_on_first_error() {
        let registry = HookRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        registry.register(
            "pre_draft_to_running",
            Arc::new(move |_ctx| {
                c1.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(()) })
            }),
        );
        let c2 = calls.clone();
        registry.register(
            "pre_draft_to_running",
            Arc::new(move |_ctx| {
                c2.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Err(Error::PhaseFailed("stop".into())) })
            }),
        );
        let c3 = calls.clone();
        registry.register(
            "pre_draft_to_running",
            Arc::new(move |_ctx| {
                c3.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(()) })
            }),
        );
        let ctx = TransitionContext::new(CampaignId::new());
        let result = registry.dispatch_sequential_failing("pre_draft_to_running", &ctx).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2, "third hook must not run after the second fails");
    }

    #[tokio::test]
    async fn post_hook_failure_never_surfaces() {
        let registry = HookRegistry::new();
        registry.register(
            "post_draft_to_running",
            Arc::new(|_ctx| Box::pin(async { Err(Error::PhaseFailed("ignored".into())) })),
        );
        let ctx = TransitionContext::new(CampaignId::new());
        let shutdown = CancellationToken::new();
        registry.dispatch_detached("post_draft_to_running", ctx, &shutdown);
        tokio::task::yield_now().await;
    }

    #[test]
    fn key_builders_match_the_spec_shape() {
        assert_eq!(pre_key("draft", "running"), "pre_draft_to_running");
        assert_eq!(post_key("completed", "archived"), "post_completed_to_archived");
    }
}
