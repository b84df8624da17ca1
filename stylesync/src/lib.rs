//!
//! Keep the style block of framework components in sync with one shared stylesheet.
//!
//! Usually run as a pre-build step (`stylesync` binary), or from `build.rs`:
//! ```no_run
//! fn main() {
//!     stylesync::sync_build_rs();
//! }
//! ```
//!

use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use stylesync_core::{ComponentFile, StyleRegion, Stylesheet, SyncPlan, SyncReport};

pub mod config;
pub mod error;

pub use config::{
    ConfigSource, LoadedConfig, Overrides, ResolvedConfig, ResolvedTarget, SyncConfig,
    TargetConfig, CONFIG_FILE, PACKAGE_JSON,
};
pub use error::Error;
pub use stylesync_core;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Rewrite every component.
    Write,
    /// Only report stale components.
    Check,
}

/// Load every input and compute all rewrites.
/// Nothing is written, so a failure in any target leaves all files untouched.
pub fn plan(config: &ResolvedConfig) -> Result<Vec<SyncPlan>> {
    let mut stylesheets: BTreeMap<PathBuf, Stylesheet> = BTreeMap::new();
    let mut seen = BTreeSet::new();
    let mut plans = vec![];

    for target in &config.targets {
        // Same file may be reached through different spellings.
        let key = std::fs::canonicalize(&target.component)
            .unwrap_or_else(|_| target.component.clone());
        if !seen.insert(key) {
            tracing::warn!(
                component = %target.component.display(),
                "component listed more than once, keeping first target"
            );
            continue;
        }
        let stylesheet = match stylesheets.entry(target.stylesheet.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Stylesheet::load(&target.stylesheet)?),
        };
        let component = ComponentFile::load(&target.component)?;
        let region = StyleRegion::new(target.marker.clone())?;
        plans.push(component.plan(&region, stylesheet)?);
    }
    Ok(plans)
}

pub fn sync(config: &ResolvedConfig, mode: SyncMode) -> Result<Vec<SyncReport>> {
    let plans = plan(config)?;
    match mode {
        SyncMode::Check => Ok(plans
            .iter()
            .map(|plan| {
                if plan.is_stale() {
                    tracing::warn!(component = %plan.path().display(), "styles out of sync");
                }
                plan.report()
            })
            .collect()),
        SyncMode::Write => {
            // Stage every component before replacing any of them.
            let staged = plans
                .into_iter()
                .map(SyncPlan::stage)
                .collect::<stylesync_core::Result<Vec<_>>>()?;
            staged
                .into_iter()
                .map(|staged| staged.persist().map_err(Error::from))
                .collect()
        }
    }
}

/// Files a build script should rerun on: both config locations, even when
/// missing, so that creating one later is noticed, then the loaded config
/// and stylesheets.
pub fn build_rs_watch_list(root: &Path, config: &ResolvedConfig) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    [root.join(CONFIG_FILE), root.join(PACKAGE_JSON)]
        .into_iter()
        .chain(config.watched.iter().cloned())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Synchronize components of the current crate, for use in `build.rs`.
pub fn sync_build_rs() {
    let root: PathBuf = std::env::var("CARGO_MANIFEST_DIR")
        .expect("$CARGO_MANIFEST_DIR should exist.")
        .into();
    sync_build_rs_in(&root);
}

/// Same as [`sync_build_rs`] with an explicit package root.
pub fn sync_build_rs_in(root: &Path) -> Vec<SyncReport> {
    let config = LoadedConfig::discover(root)
        .and_then(|loaded| loaded.resolve())
        .unwrap_or_else(|e| panic!("Failed to load stylesync config: {e}"));

    // Components are written by us, watching them would retrigger the build.
    for path in build_rs_watch_list(root, &config) {
        println!("cargo:rerun-if-changed={}", path.display());
    }
    sync(&config, SyncMode::Write).unwrap_or_else(|e| panic!("Failed to synchronize styles: {e}"))
}
