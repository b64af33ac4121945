// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Transactional reconciler shared by the DNS and DHCP sides.
//!
//! Every mutation follows the same sequence, serialized per reconciler instance:
//!
//! 1. read the current authoritative value
//! 2. clone it and apply a pure mutation to the clone
//! 3. push the clone into the live daemon through a [`Pusher`]
//! 4. commit the clone through the [`Authority`] only if the push succeeded
//! 5. otherwise compensate the daemon back towards the previous value and return
//!    the original error
//!
//! The authority is never touched by a failed push, so the previous value stays
//! available for compensation and for the next mutation.
//!
//! # Example
//!
//! ```rust,ignore
//! use ddi_agent::reconciler::{Reconciler, SnapshotCell};
//!
//! let reconciler = Reconciler::new(SnapshotCell::new(config));
//! reconciler
//!     .apply(&kea_pusher, |next| {
//!         next.subnets.push(subnet);
//!         Ok(())
//!     })
//!     .await?;
//! ```

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::errors::Result;
use crate::intent::{Intent, IntentStore};

/// Source of truth for the value a reconciler manages.
#[async_trait]
pub trait Authority<S: Send + Sync>: Send + Sync {
    /// Last committed value.
    async fn current(&self) -> Result<Arc<S>>;

    /// Make `next` authoritative. `base` is the value `next` was derived from.
    async fn commit(&self, base: &Arc<S>, next: S) -> Result<Arc<S>>;
}

/// Capability that drives a live daemon towards a value.
#[async_trait]
pub trait Pusher<S: Send + Sync>: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Make the live daemon reflect `desired`.
    async fn push(&self, desired: &S) -> Result<()>;

    /// Undo a failed push of `attempted`, restoring `previous`.
    ///
    /// The default re-pushes `previous` in full.
    async fn compensate(&self, previous: &S, _attempted: &S) -> Result<()> {
        self.push(previous).await
    }
}

/// Pusher for mutations with no live side effect.
pub struct NoopPusher;

#[async_trait]
impl<S: Send + Sync> Pusher<S> for NoopPusher {
    fn name(&self) -> &str {
        "noop"
    }

    async fn push(&self, _desired: &S) -> Result<()> {
        Ok(())
    }

    async fn compensate(&self, _previous: &S, _attempted: &S) -> Result<()> {
        Ok(())
    }
}

/// Result of planning a mutation: the caller's output plus the pusher that makes
/// the daemon reflect the mutated value.
pub struct Planned<T, S: Send + Sync> {
    pub output: T,
    pub pusher: Box<dyn Pusher<S>>,
}

impl<T, S: Send + Sync> Planned<T, S> {
    pub fn new(output: T, pusher: impl Pusher<S> + 'static) -> Self {
        Self {
            output,
            pusher: Box::new(pusher),
        }
    }
}

/// Serialized read-copy-mutate-push-commit engine.
pub struct Reconciler<S, A> {
    authority: A,
    lock: Mutex<()>,
    _value: PhantomData<fn() -> S>,
}

impl<S, A> Reconciler<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Authority<S>,
{
    pub fn new(authority: A) -> Self {
        Self {
            authority,
            lock: Mutex::new(()),
            _value: PhantomData,
        }
    }

    /// Last committed value.
    ///
    /// # Errors
    ///
    /// Propagates authority read failures.
    pub async fn current(&self) -> Result<Arc<S>> {
        self.authority.current().await
    }

    /// Apply `mutate` and push the result with a fixed `pusher`.
    ///
    /// # Errors
    ///
    /// Returns the mutation's error without pushing, or the push error after
    /// compensation ran.
    pub async fn apply<T, F>(&self, pusher: &dyn Pusher<S>, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T> + Send,
    {
        let _guard = self.lock.lock().await;
        let previous = self.authority.current().await?;
        let mut next = (*previous).clone();
        let output = mutate(&mut next)?;
        self.push_and_commit(pusher, &previous, next).await?;
        Ok(output)
    }

    /// Apply a mutation that chooses its own pusher from the before/after values.
    ///
    /// # Errors
    ///
    /// Returns the planning error without pushing, or the push error after
    /// compensation ran.
    pub async fn apply_planned<T, F>(&self, plan: F) -> Result<T>
    where
        F: FnOnce(&S, &mut S) -> Result<Planned<T, S>> + Send,
    {
        let _guard = self.lock.lock().await;
        let previous = self.authority.current().await?;
        let mut next = (*previous).clone();
        let Planned { output, pusher } = plan(&previous, &mut next)?;
        self.push_and_commit(pusher.as_ref(), &previous, next).await?;
        Ok(output)
    }

    /// Push the committed value again without mutating it.
    ///
    /// # Errors
    ///
    /// Returns the push error; nothing is compensated since nothing changed.
    pub async fn resync(&self, pusher: &dyn Pusher<S>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let current = self.authority.current().await?;
        debug!(pusher = pusher.name(), "Re-pushing committed value");
        pusher.push(&current).await
    }

    async fn push_and_commit(
        &self,
        pusher: &dyn Pusher<S>,
        previous: &Arc<S>,
        next: S,
    ) -> Result<Arc<S>> {
        if let Err(err) = pusher.push(&next).await {
            warn!(pusher = pusher.name(), error = %err, "Push failed, compensating");
            self.compensate(pusher, previous, &next).await;
            return Err(err);
        }

        match self.authority.commit(previous, next.clone()).await {
            Ok(committed) => {
                debug!(pusher = pusher.name(), "Committed after successful push");
                Ok(committed)
            }
            Err(err) => {
                error!(pusher = pusher.name(), error = %err, "Commit failed after push, compensating");
                self.compensate(pusher, previous, &next).await;
                Err(err)
            }
        }
    }

    async fn compensate(&self, pusher: &dyn Pusher<S>, previous: &S, attempted: &S) {
        if let Err(err) = pusher.compensate(previous, attempted).await {
            error!(
                pusher = pusher.name(),
                error = %err,
                "Compensation failed; live daemon state diverges from committed state"
            );
        }
    }
}

/// In-memory authority: an atomically swapped snapshot pointer.
#[derive(Debug)]
pub struct SnapshotCell<S> {
    current: RwLock<Arc<S>>,
}

impl<S> SnapshotCell<S> {
    pub fn new(value: S) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<S> {
        self.current.read().await.clone()
    }

    /// Replace the snapshot outside of any reconcile sequence (initial load).
    pub async fn replace(&self, value: S) {
        *self.current.write().await = Arc::new(value);
    }
}

#[async_trait]
impl<S: Send + Sync> Authority<S> for SnapshotCell<S> {
    async fn current(&self) -> Result<Arc<S>> {
        Ok(self.snapshot().await)
    }

    async fn commit(&self, _base: &Arc<S>, next: S) -> Result<Arc<S>> {
        let committed = Arc::new(next);
        *self.current.write().await = committed.clone();
        Ok(committed)
    }
}

/// Authority backed by the intent store.
pub struct IntentAuthority {
    store: Arc<dyn IntentStore>,
}

impl IntentAuthority {
    pub fn new(store: Arc<dyn IntentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authority<Intent> for IntentAuthority {
    async fn current(&self) -> Result<Arc<Intent>> {
        self.store.snapshot().await
    }

    async fn commit(&self, base: &Arc<Intent>, next: Intent) -> Result<Arc<Intent>> {
        self.store.commit(base.revision, next).await
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
