//! Platform resolution: the first step of the pipeline.

use tracing::debug;

use crate::error::PipelineError;
use crate::formula::Formula;
use tapbin_schema::{Platform, ReleaseEntry};

/// State 1: the release entry for a platform has been selected.
///
/// # Transitions
///
/// - [`fetch_and_verify()`](Self::fetch_and_verify) -> [`VerifiedRelease`](crate::VerifiedRelease)
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRelease<'f> {
    /// Formula the entry belongs to.
    pub formula: &'f Formula,
    /// The selected entry.
    pub entry: &'f ReleaseEntry,
    /// Platform it was selected for.
    pub platform: Platform,
}

/// Select the release entry serving `platform`.
///
/// Pure lookup with no side effects. [`Formula`] guarantees entries never
/// overlap, so the first match is the only match.
///
/// # Errors
///
/// Returns [`PipelineError::NoMatchingPlatform`] if no entry covers the platform.
pub fn resolve(formula: &Formula, platform: Platform) -> Result<ResolvedRelease<'_>, PipelineError> {
    let Some(entry) = formula.entry_for(&platform) else {
        let available = formula
            .releases()
            .iter()
            .map(ReleaseEntry::selector)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PipelineError::NoMatchingPlatform {
            name: formula.name().clone(),
            version: formula.version().clone(),
            platform,
            available,
        });
    };

    debug!(
        package = %formula.name(),
        %platform,
        url = %entry.url,
        "resolved release entry"
    );

    Ok(ResolvedRelease {
        formula,
        entry,
        platform,
    })
}
