//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

use tapbin_schema::{PackageName, Sha256Digest, Version};

/// Progress sink for the install pipeline.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Resolving", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>);

    /// The downloaded bytes matched the expected checksum.
    fn verified(&self, name: &PackageName, version: &Version, digest: &Sha256Digest);

    /// Updates the state of a package to 'installing'.
    fn installing(&self, name: &PackageName, version: &Version);

    /// Marks a package operation as successfully completed.
    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>);

    /// Marks a package operation as failed with a specific reason.
    fn failed(&self, name: &PackageName, version: &Version, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        (**self).downloading(name, version, current, total);
    }
    fn verified(&self, name: &PackageName, version: &Version, digest: &Sha256Digest) {
        (**self).verified(name, version, digest);
    }
    fn installing(&self, name: &PackageName, version: &Version) {
        (**self).installing(name, version);
    }
    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>) {
        (**self).done(name, version, detail, size);
    }
    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        (**self).failed(name, version, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &PackageName, _: &Version, _: u64, _: Option<u64>) {}
    fn verified(&self, _: &PackageName, _: &Version, _: &Sha256Digest) {}
    fn installing(&self, _: &PackageName, _: &Version) {}
    fn done(&self, _: &PackageName, _: &Version, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &PackageName, _: &Version, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
