use crate::context::WorkflowContext;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Human-readable label for the helper app
pub const HELPER_LABEL: &str = "Notificator";

/// Suffix appended to the workflow's bundle id for the helper's identity
const BUNDLE_ID_SUFFIX: &str = "notificator";

/// Locations inside a provisioned helper bundle
///
/// All paths derive from the cache directory and the workflow's display
/// name, so every (installation, workflow) pair gets its own copy and
/// notifications route to the right icon and identity.
#[derive(Debug, Clone)]
pub struct HelperBundle {
    /// Root of the .app directory
    pub app_dir: PathBuf,
    /// The executable that posts the notification
    pub applet: PathBuf,
    /// Icon resource shown by Notification Center
    pub icon: PathBuf,
    /// Property list carrying the bundle identifier
    pub info_plist: PathBuf,
}

impl HelperBundle {
    /// Compute the bundle paths for a workflow installation
    pub fn for_context(ctx: &WorkflowContext) -> Self {
        let app_dir = ctx.cachefile(format!("{} for {}.app", HELPER_LABEL, ctx.name));
        Self::at(app_dir)
    }

    /// Compute the bundle paths under an explicit .app root
    pub fn at(app_dir: PathBuf) -> Self {
        let contents = app_dir.join("Contents");
        Self {
            applet: contents.join("MacOS/applet"),
            icon: contents.join("Resources/applet.icns"),
            info_plist: contents.join("Info.plist"),
            app_dir,
        }
    }

    /// Whether a complete bundle is present on disk
    pub fn is_provisioned(&self) -> bool {
        self.app_dir.exists()
            && self.applet.exists()
            && self.icon.exists()
            && self.info_plist.exists()
    }
}

/// Bundle identifier for this installation's helper
///
/// Extends the workflow's own id so the two never collide yet remain
/// recognizably related.
pub fn helper_bundle_id(workflow_bundle_id: &str) -> String {
    format!("{}.{}", workflow_bundle_id, BUNDLE_ID_SUFFIX)
}

/// Install the helper bundle if it is not already present
///
/// Copies `template` into a staging directory inside the cache root,
/// rewrites the bundle identifier, installs the workflow icon, marks the
/// applet executable, and renames the staged bundle into place. The rename
/// is the commit point: a half-copied bundle is never observable at the
/// final path, and when two callers race, the loser adopts the winner's
/// copy. Returns `true` when this call did the installation.
pub fn ensure_bundle(
    template: &Path,
    bundle: &HelperBundle,
    workflow_bundle_id: &str,
    icon_source: Option<&Path>,
) -> Result<bool> {
    if bundle.app_dir.exists() {
        return Ok(false);
    }
    if !template.exists() {
        bail!("helper template not found: {}", template.display());
    }

    let cache_root = bundle
        .app_dir
        .parent()
        .context("helper bundle path has no parent directory")?;
    fs::create_dir_all(cache_root)
        .with_context(|| format!("failed to create directory: {}", cache_root.display()))?;

    // Stage in the same filesystem as the final path so the rename is atomic
    let staging = tempfile::Builder::new()
        .prefix(".notificator-staging-")
        .tempdir_in(cache_root)
        .context("failed to create staging directory")?;
    let staged = HelperBundle::at(staging.path().join("bundle.app"));

    copy_dir(template, &staged.app_dir)
        .with_context(|| format!("failed to copy template: {}", template.display()))?;

    customize_identity(&staged, workflow_bundle_id)?;
    if let Some(src) = icon_source {
        // A failed icon install leaves the template icon in place
        if let Err(err) = install_icon(src, &staged.icon) {
            tracing::warn!("could not install workflow icon: {:#}", err);
        }
    }
    mark_executable(&staged.applet)?;

    match fs::rename(&staged.app_dir, &bundle.app_dir) {
        Ok(()) => {
            tracing::debug!("installed helper app: {}", bundle.app_dir.display());
            Ok(true)
        }
        // Lost the race: a concurrent caller already installed the bundle
        Err(_) if bundle.app_dir.exists() => Ok(false),
        Err(err) => Err(err).with_context(|| {
            format!("failed to install helper app: {}", bundle.app_dir.display())
        }),
    }
}

/// Rewrite the staged bundle's CFBundleIdentifier
fn customize_identity(staged: &HelperBundle, workflow_bundle_id: &str) -> Result<()> {
    let plist = fs::read_to_string(&staged.info_plist)
        .with_context(|| format!("failed to read {}", staged.info_plist.display()))?;
    let rewritten = rewrite_bundle_identifier(&plist, &helper_bundle_id(workflow_bundle_id))?;
    fs::write(&staged.info_plist, rewritten)
        .with_context(|| format!("failed to write {}", staged.info_plist.display()))?;
    Ok(())
}

/// Replace the value of CFBundleIdentifier in plist XML
fn rewrite_bundle_identifier(plist: &str, new_id: &str) -> Result<String> {
    let key = "<key>CFBundleIdentifier</key>";
    let key_at = plist
        .find(key)
        .context("Info.plist has no CFBundleIdentifier")?;
    let after_key = key_at + key.len();

    let open = plist[after_key..]
        .find("<string>")
        .context("CFBundleIdentifier has no value")?
        + after_key
        + "<string>".len();
    let close = plist[open..]
        .find("</string>")
        .context("CFBundleIdentifier value is unterminated")?
        + open;

    Ok(format!("{}{}{}", &plist[..open], new_id, &plist[close..]))
}

/// Put the workflow's icon into the staged bundle
///
/// macOS converts arbitrary images with sips; elsewhere only a ready-made
/// .icns file can be used as-is.
fn install_icon(source: &Path, dest: &Path) -> Result<()> {
    if !source.exists() {
        bail!("icon not found: {}", source.display());
    }

    if source.extension().and_then(|e| e.to_str()) == Some("icns") {
        fs::copy(source, dest)
            .with_context(|| format!("failed to copy icon: {}", source.display()))?;
        return Ok(());
    }
    convert_icon(source, dest)
}

/// Convert an image to .icns with sips
#[cfg(target_os = "macos")]
fn convert_icon(source: &Path, dest: &Path) -> Result<()> {
    let status = std::process::Command::new("sips")
        .args(["-s", "format", "icns"])
        .arg(source)
        .arg("--out")
        .arg(dest)
        .status()
        .context("failed to run sips")?;
    if !status.success() {
        bail!("sips exited with status {}", status);
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn convert_icon(source: &Path, _dest: &Path) -> Result<()> {
    bail!("no icon converter available for {}", source.display())
}

/// Set the owner-executable bit on the applet
fn mark_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to chmod {}", path.display()))?;
    }
    Ok(())
}

/// Recursively copy a directory tree
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;
    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}
