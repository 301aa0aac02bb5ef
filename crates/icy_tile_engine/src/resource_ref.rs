use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, MutexGuard};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a project resource. Links between resources are expressed as ids,
/// never as owning references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn next() -> Self {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to a mutable resource.
///
/// The id lives outside the lock so identity checks never contend with a holder of the
/// resource. The lock is not reentrant: do not call back into the same handle while a
/// guard is alive.
pub struct ResourceRef<T> {
    id: ResourceId,
    inner: Arc<Mutex<T>>,
}

impl<T> ResourceRef<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: ResourceId::next(),
            inner: Arc::new(Mutex::new(value)),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    pub fn ptr_eq(&self, other: &ResourceRef<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for ResourceRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ResourceRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResourceRef").field(&self.id).finish()
    }
}
