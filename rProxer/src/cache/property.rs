//! Lazily initialized, cached entity properties.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Failure, Result};

/// Async initializer that populates one or more properties of its owner.
pub type Initializer = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

type InFlight = Shared<BoxFuture<'static, Result<()>>>;

/// A property whose value is fetched on first read and cached afterwards.
///
/// Concurrent first reads share a single run of the initializer. Failures are
/// handed to every waiting caller but never cached, so the next read starts
/// over.
pub struct LazyProperty<T> {
    value: RwLock<Option<T>>,
    init: Initializer,
    in_flight: Mutex<Option<InFlight>>,
    initialize_once: bool,
}

impl<T> LazyProperty<T> {
    /// Create an uninitialized property.
    pub fn new(init: Initializer) -> Self {
        Self {
            value: RwLock::new(None),
            init,
            in_flight: Mutex::new(None),
            initialize_once: true,
        }
    }

    /// Create a property that already holds a value.
    pub fn with_value(init: Initializer, value: T) -> Self {
        let property = Self::new(init);
        *property.value.write() = Some(value);
        property
    }

    /// Allow `reset` to clear the cached value.
    pub fn reinitializable(mut self) -> Self {
        self.initialize_once = false;
        self
    }

    /// Check whether a value is cached.
    pub fn is_initialized(&self) -> bool {
        self.value.read().is_some()
    }

    /// Whether the initializer only ever runs once.
    pub fn initialize_once(&self) -> bool {
        self.initialize_once
    }

    /// Store a value without running the initializer.
    pub fn set_initialized(&self, value: T) {
        *self.value.write() = Some(value);
    }

    /// Drop the cached value so the next read fetches again.
    ///
    /// Does nothing for properties that initialize once.
    pub fn reset(&self) {
        if !self.initialize_once {
            *self.value.write() = None;
        }
    }

    /// Run the initializer unless a value is already present.
    pub async fn initialize(&self) -> Result<()> {
        let run = {
            let mut slot = self.in_flight.lock();
            if self.is_initialized() {
                return Ok(());
            }
            match slot.as_ref() {
                Some(run) => run.clone(),
                None => {
                    let run = (self.init)().shared();
                    *slot = Some(run.clone());
                    run
                }
            }
        };

        let result = run.clone().await;

        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&run)) {
            *slot = None;
        }
        result
    }
}

impl<T: Clone> LazyProperty<T> {
    /// The cached value, without fetching.
    pub fn get_if_initialized(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Read the value, fetching it first if needed.
    pub async fn get(&self) -> Result<T> {
        if let Some(value) = self.get_if_initialized() {
            return Ok(value);
        }
        self.initialize().await?;
        self.get_if_initialized()
            .ok_or_else(|| Error::Uninitialized.into())
    }

    /// Read the value, or `fallback` if fetching it failed.
    pub async fn get_or(&self, fallback: T) -> T {
        self.get().await.unwrap_or(fallback)
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProperty")
            .field("value", &*self.value.read())
            .field("initialize_once", &self.initialize_once)
            .finish()
    }
}

/// Build an initializer that runs against a weakly held owner.
///
/// Fails with [`Error::Detached`] once the owner has been dropped.
pub fn bind<O, F, Fut>(owner: Weak<O>, f: F) -> Initializer
where
    O: Send + Sync + 'static,
    F: Fn(Arc<O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || match owner.upgrade() {
        Some(owner) => f(owner).boxed(),
        None => futures::future::ready(Err(Failure::new(Error::Detached))).boxed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Owner {
        calls: AtomicUsize,
        name: LazyProperty<String>,
    }

    fn owner(once: bool, fail_first: bool) -> Arc<Owner> {
        Arc::new_cyclic(|weak: &Weak<Owner>| {
            let init = bind(weak.clone(), move |owner: Arc<Owner>| async move {
                let call = owner.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                if fail_first && call == 0 {
                    return Err(Failure::new(Error::Timeout));
                }
                owner.name.set_initialized(format!("name-{call}"));
                Ok(())
            });
            let name = LazyProperty::new(init);
            Owner {
                calls: AtomicUsize::new(0),
                name: if once { name } else { name.reinitializable() },
            }
        })
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_fetch() {
        let owner = owner(true, false);

        let reads = (0..8).map(|_| owner.name.get());
        let values = futures::future::join_all(reads).await;

        assert_eq!(owner.calls.load(Ordering::SeqCst), 1);
        for value in values {
            assert_eq!(value.unwrap(), "name-0");
        }
    }

    #[tokio::test]
    async fn test_reset_refetches_when_reinitializable() {
        let owner = owner(false, false);
        assert_eq!(owner.name.get().await.unwrap(), "name-0");

        owner.name.reset();
        assert!(!owner.name.is_initialized());
        assert_eq!(owner.name.get().await.unwrap(), "name-1");
        assert_eq!(owner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_is_ignored_when_initialized_once() {
        let owner = owner(true, false);
        assert_eq!(owner.name.get().await.unwrap(), "name-0");

        owner.name.reset();
        assert_eq!(owner.name.get().await.unwrap(), "name-0");
        assert_eq!(owner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let owner = owner(true, true);

        let failure = owner.name.get().await.unwrap_err();
        assert!(matches!(failure.first(), Some(Error::Timeout)));
        assert!(!owner.name.is_initialized());

        assert_eq!(owner.name.get().await.unwrap(), "name-1");
        assert_eq!(owner.name.get_or("fallback".into()).await, "name-1");
    }

    #[tokio::test]
    async fn test_set_initialized_skips_initializer() {
        let owner = owner(true, false);
        owner.name.set_initialized("known".into());

        assert_eq!(owner.name.get().await.unwrap(), "known");
        assert_eq!(owner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_detached_owner() {
        let weak = {
            let owner = owner(true, false);
            Arc::downgrade(&owner)
        };
        let init = bind(weak, |_owner: Arc<Owner>| async { Ok(()) });
        let orphan: LazyProperty<u32> = LazyProperty::new(init);
        let failure = orphan.get().await.unwrap_err();
        assert!(matches!(failure.first(), Some(Error::Detached)));
        assert_eq!(orphan.get_or(5).await, 5);
    }
}
