//! Transition execution: validate, run pre-hooks, mutate, dispatch post-hooks.

use crate::context::TransitionContext;
use crate::hooks::{post_key, pre_key, HookRegistry};
use leadforge_types::Result;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Validate and execute a single transition.
///
/// `mutate` performs the caller's state change — the state machine itself
/// owns no storage. Pre-hooks run synchronously and can abort
/// the transition; post-hooks are dispatched as detached, cancellable tasks
/// and can never fail the transition.
pub async fn execute_transition<S, F, Fut>(
    hooks: &HookRegistry,
    can_transition: impl Fn(S, S) -> bool,
    from: S,
    to: S,
    ctx: TransitionContext,
    shutdown: &CancellationToken,
    mutate: F,
) -> Result<()>
where
    S: std::fmt::Display + Copy,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if !can_transition(from, to) {
        return Err(leadforge_types::Error::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    hooks.dispatch_sequential_failing(&pre_key(from, to), &ctx).await?;
    mutate().await?;
    hooks.dispatch_detached(&post_key(from, to), ctx, shutdown);
    Ok(())
}
