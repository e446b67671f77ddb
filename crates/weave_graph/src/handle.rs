// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared access to a package across threads.
//!
//! Edits and ticks both take the write lock, so a structural change can
//! never interleave with a running evaluation. Readers (e.g. a view polling
//! socket values) share the read lock.

use crate::engine::TickReport;
use crate::package::Package;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable, thread-safe handle to a package
#[derive(Debug, Clone)]
pub struct PackageHandle {
    inner: Arc<RwLock<Package>>,
}

impl PackageHandle {
    /// Wrap a package
    pub fn new(package: Package) -> Self {
        Self {
            inner: Arc::new(RwLock::new(package)),
        }
    }

    /// Apply an edit under the write lock
    pub fn edit<R>(&self, f: impl FnOnce(&mut Package) -> R) -> R {
        f(&mut *self.inner.write())
    }

    /// Inspect the package under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&Package) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Run one tick under the write lock
    pub fn tick(&self) -> TickReport {
        self.inner.write().tick()
    }
}

impl From<Package> for PackageHandle {
    fn from(package: Package) -> Self {
        Self::new(package)
    }
}
