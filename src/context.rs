use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Alfred cache root, relative to the user's home directory
const ALFRED_CACHE_ROOT: &str = "Library/Caches/com.runningwithcrayons.Alfred/Workflow Data";

/// Alfred data root, relative to the user's home directory
const ALFRED_DATA_ROOT: &str = "Library/Application Support/Alfred/Workflow Data";

/// Configuration Alfred exports to a running workflow, resolved once
///
/// Reads the `alfred_*` environment variables and pins down the cache and
/// data directories for this installation. Construction fails loudly when
/// the identifying variables are missing; everything downstream assumes a
/// fully resolved context.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    /// Workflow display name (shows up in the helper bundle's name)
    pub name: String,
    /// Workflow bundle identifier
    pub bundle_id: String,
    /// Workflow version, if the author set one
    pub version: Option<String>,
    /// Per-workflow cache directory
    pub cachedir: PathBuf,
    /// Per-workflow data directory
    pub datadir: PathBuf,
    /// Root of the installed workflow (where icon.png lives)
    pub workflow_dir: PathBuf,
    /// Whether the Alfred debugger is open
    pub debug: bool,
}

/// Read an environment variable, treating empty values as unset
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl WorkflowContext {
    /// Build a context from the Alfred environment
    pub fn from_env() -> Result<Self> {
        let name = env_var("alfred_workflow_name")
            .context("alfred_workflow_name is not set; not running inside a workflow?")?;
        let bundle_id = env_var("alfred_workflow_bundleid")
            .context("alfred_workflow_bundleid is not set; workflow has no bundle id")?;

        let cachedir = match env_var("alfred_workflow_cache") {
            Some(dir) => PathBuf::from(dir),
            None => default_dir(ALFRED_CACHE_ROOT, &bundle_id)?,
        };
        let datadir = match env_var("alfred_workflow_data") {
            Some(dir) => PathBuf::from(dir),
            None => default_dir(ALFRED_DATA_ROOT, &bundle_id)?,
        };

        let workflow_dir =
            env::current_dir().context("could not determine the workflow directory")?;

        Ok(Self {
            name,
            bundle_id,
            version: env_var("alfred_workflow_version"),
            cachedir,
            datadir,
            workflow_dir,
            debug: env_var("alfred_debug").as_deref() == Some("1"),
        })
    }

    /// Path to a file inside the cache directory
    pub fn cachefile(&self, name: impl AsRef<Path>) -> PathBuf {
        self.cachedir.join(name)
    }

    /// Path to a file inside the data directory
    pub fn datafile(&self, name: impl AsRef<Path>) -> PathBuf {
        self.datadir.join(name)
    }

    /// Path to the workflow's icon
    pub fn icon(&self) -> PathBuf {
        self.workflow_dir.join("icon.png")
    }

    /// Ensure the cache directory exists
    pub fn ensure_cachedir(&self) -> Result<&Path> {
        if !self.cachedir.exists() {
            std::fs::create_dir_all(&self.cachedir).with_context(|| {
                format!("failed to create directory: {}", self.cachedir.display())
            })?;
        }
        Ok(&self.cachedir)
    }
}

/// Standard Alfred location for a workflow's private directory
fn default_dir(root: &str, bundle_id: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(root).join(bundle_id))
}
