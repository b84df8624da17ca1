//!
//! Copy a canonical stylesheet into the style region of a single-file component.
//!
//! The transform itself is pure (see [`StyleRegion::synchronize`]), file handling
//! is split into load, plan and commit steps, so that callers can compute every
//! change before writing anything.
//!

use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub mod error;
pub mod region;

pub use error::Error;
pub use region::{StyleMarker, StyleRegion};

pub type Result<T> = std::result::Result<T, Error>;

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::from_io(path, e))
}

/// Shared source of truth, never written.
#[derive(Clone, Debug)]
pub struct Stylesheet {
    path: PathBuf,
    css: String,
}

impl Stylesheet {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading stylesheet");
        Ok(Self {
            css: read_text(path)?,
            path: path.to_path_buf(),
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn css(&self) -> &str {
        &self.css
    }
}

#[derive(Clone, Debug)]
pub struct ComponentFile {
    path: PathBuf,
    text: String,
}

impl ComponentFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading component");
        Ok(Self {
            text: read_text(path)?,
            path: path.to_path_buf(),
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Compute new content of this component without touching the disk.
    pub fn plan(&self, region: &StyleRegion, stylesheet: &Stylesheet) -> Result<SyncPlan> {
        let updated = region
            .synchronize(&self.text, stylesheet.css())
            .ok_or_else(|| Error::NoStyleRegionFound {
                path: self.path.clone(),
                marker: region.marker().start_tag(),
            })?;
        Ok(SyncPlan {
            path: self.path.clone(),
            original: self.text.clone(),
            updated,
        })
    }
}

/// Pending rewrite of one component.
#[derive(Clone, Debug)]
pub struct SyncPlan {
    path: PathBuf,
    original: String,
    updated: String,
}

impl SyncPlan {
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn updated(&self) -> &str {
        &self.updated
    }
    /// True if the component on disk differs from the synchronized text.
    pub fn is_stale(&self) -> bool {
        self.original != self.updated
    }
    pub fn report(&self) -> SyncReport {
        SyncReport {
            component: self.path.clone(),
            changed: self.is_stale(),
        }
    }

    /// Overwrite the component. Written even if nothing changed.
    pub fn commit(self) -> Result<SyncReport> {
        self.stage()?.persist()
    }

    /// Write updated text into a temp file next to the component.
    /// The component itself is replaced only by [`StagedWrite::persist`],
    /// dropping the staged write leaves it untouched.
    pub fn stage(self) -> Result<StagedWrite> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| Error::from_io(&self.path, e))?;
        let permissions = metadata.permissions();
        if permissions.readonly() {
            return Err(Error::FileAccessDenied { path: self.path });
        }

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::from_io(parent, e))?;
        if let Err(e) = temp
            .write_all(self.updated.as_bytes())
            .and_then(|()| temp.as_file().set_permissions(permissions))
        {
            return Err(Error::from_io(&self.path, e));
        }

        Ok(StagedWrite {
            report: self.report(),
            temp,
        })
    }
}

/// Updated component waiting in a temp file.
#[derive(Debug)]
pub struct StagedWrite {
    report: SyncReport,
    temp: tempfile::NamedTempFile,
}

impl StagedWrite {
    pub fn path(&self) -> &Path {
        &self.report.component
    }

    /// Move the temp file over the component.
    pub fn persist(self) -> Result<SyncReport> {
        let Self { report, temp } = self;
        temp.persist(&report.component)
            .map_err(|e| Error::from_io(&report.component, e.error))?;
        tracing::info!(
            component = %report.component.display(),
            changed = report.changed,
            "synchronized styles"
        );
        Ok(report)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub component: PathBuf,
    pub changed: bool,
}

/// Read `stylesheet`, then `component`, replace the first style region of
/// `component` and write it back.
///
/// If the region is missing, [`Error::NoStyleRegionFound`] is returned and
/// the component is left as is.
pub fn sync_file(
    stylesheet: impl AsRef<Path>,
    component: impl AsRef<Path>,
    marker: StyleMarker,
) -> Result<SyncReport> {
    let stylesheet = Stylesheet::load(stylesheet)?;
    let component = ComponentFile::load(component)?;
    let region = StyleRegion::new(marker)?;
    component.plan(&region, &stylesheet)?.commit()
}
