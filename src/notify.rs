use crate::context::WorkflowContext;
use crate::provision::{ensure_bundle, HelperBundle};
use crate::resources;
use crate::sounds::{self, SoundResolution};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Name of the helper template shipped next to the executable
pub const HELPER_TEMPLATE: &str = "Notificator.app";

/// How often a bounded wait checks on the helper
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Failures a caller is expected to handle
///
/// Everything else (helper exit status, provisioning problems) degrades to
/// a logged error and a `false` return instead of an error.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Title and text are both empty
    #[error("empty notification: title and text are both empty")]
    EmptyNotification,
    /// The helper outlived the configured deadline and was killed
    #[error("notification helper still running after {timeout:?}")]
    Timeout { timeout: Duration },
    /// The workflow context could not be constructed from the environment
    #[error("workflow context unavailable: {0}")]
    Context(String),
}

/// One notification to deliver
#[derive(Debug, Clone, Default)]
pub struct Notification {
    /// Notification title
    pub title: String,
    /// Notification body text
    pub text: String,
    /// Requested system sound name
    pub sound: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            sound: None,
        }
    }

    /// Request a system sound by name
    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.title.is_empty() && self.text.is_empty()
    }
}

/// Posts notifications through the provisioned helper app
///
/// Bound to a caller-supplied context; the helper bundle is installed on
/// the first post and reused afterwards. A single post blocks until the
/// helper exits, or until the optional timeout kills it.
pub struct Notifier<'a> {
    context: &'a WorkflowContext,
    template: PathBuf,
    timeout: Option<Duration>,
}

impl<'a> Notifier<'a> {
    pub fn new(context: &'a WorkflowContext) -> Self {
        Self {
            context,
            template: default_template(),
            timeout: None,
        }
    }

    /// Bound the wait on the helper; unbounded by default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[cfg(test)]
    fn with_template(mut self, template: PathBuf) -> Self {
        self.template = template;
        self
    }

    /// Deliver a notification
    ///
    /// Returns `Ok(true)` when the helper reported success, `Ok(false)`
    /// when it failed or could not be run (details go to the log), and an
    /// error only for an empty request or an exceeded timeout.
    pub fn post(&self, notification: &Notification) -> Result<bool, NotifyError> {
        if notification.is_empty() {
            return Err(NotifyError::EmptyNotification);
        }

        let sound = sounds::resolve(notification.sound.as_deref());
        if let SoundResolution::Unrecognized(name) = &sound {
            tracing::debug!("unknown sound {:?}, posting without sound", name);
        }

        let bundle = HelperBundle::for_context(self.context);
        if let Err(err) = ensure_bundle(
            &self.template,
            &bundle,
            &self.context.bundle_id,
            Some(&self.context.icon()),
        ) {
            tracing::error!("could not provision the notification helper: {:#}", err);
            return Ok(false);
        }

        // Argument vector only; title and text never pass through a shell
        let mut cmd = Command::new(&bundle.applet);
        cmd.arg("--title")
            .arg(&notification.title)
            .arg("--message")
            .arg(&notification.text)
            .arg("--sound")
            .arg(sound.as_argument());

        self.run(cmd)
    }

    /// Run the helper and map its exit status
    fn run(&self, mut cmd: Command) -> Result<bool, NotifyError> {
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::error!("could not run the notification helper: {}", err);
                return Ok(false);
            }
        };

        let status = match self.timeout {
            None => child.wait(),
            Some(timeout) => match wait_with_deadline(&mut child, timeout) {
                Ok(Some(status)) => Ok(status),
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(NotifyError::Timeout { timeout });
                }
                Err(err) => Err(err),
            },
        };

        let status = match status {
            Ok(status) => status,
            Err(err) => {
                tracing::error!("could not wait for the notification helper: {}", err);
                return Ok(false);
            }
        };

        if status.success() {
            return Ok(true);
        }
        match status.code() {
            Some(code) => tracing::error!("notification helper exited with status {}.", code),
            None => tracing::error!("notification helper was terminated by a signal"),
        }
        Ok(false)
    }
}

/// Post a notification using the process-wide workflow context
///
/// Convenience wrapper over [`Notifier`] with no timeout.
pub fn notify(title: &str, text: &str, sound: Option<&str>) -> Result<bool, NotifyError> {
    let context =
        resources::context().map_err(|err| NotifyError::Context(format!("{:#}", err)))?;
    let mut notification = Notification::new(title, text);
    notification.sound = sound.map(String::from);
    Notifier::new(context).post(&notification)
}

/// The template bundle sits at a fixed path next to the running executable
fn default_template() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(HELPER_TEMPLATE)))
        .unwrap_or_else(|| PathBuf::from(HELPER_TEMPLATE))
}

/// Wait for the child, giving up after `timeout`
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_at, write_template_bundle, write_template_with_applet};
    use std::fs;

    #[test]
    fn test_empty_notification_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context_at(tmp.path());
        let notifier = Notifier::new(&ctx);

        let err = notifier.post(&Notification::new("", "")).unwrap_err();
        assert!(matches!(err, NotifyError::EmptyNotification));

        // The precondition fails before any I/O
        assert!(!HelperBundle::for_context(&ctx).is_provisioned());
    }

    #[cfg(unix)]
    #[test]
    fn test_first_post_provisions_and_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let template = write_template_bundle(tmp.path(), 0);
        let ctx = context_at(tmp.path());
        let bundle = HelperBundle::for_context(&ctx);
        assert!(!bundle.app_dir.exists());

        let notifier = Notifier::new(&ctx).with_template(template);
        let posted = notifier
            .post(&Notification::new("Test Title", "Test Message"))
            .unwrap();
        assert!(posted);

        for path in [
            &bundle.app_dir,
            &bundle.applet,
            &bundle.icon,
            &bundle.info_plist,
        ] {
            assert!(path.exists(), "missing: {}", path.display());
        }

        let plist = fs::read_to_string(&bundle.info_plist).unwrap();
        assert!(plist.contains("<string>net.deanishe.herald-test.notificator</string>"));
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_receives_argument_vector() {
        let tmp = tempfile::tempdir().unwrap();
        let template = write_template_bundle(tmp.path(), 0);
        let ctx = context_at(tmp.path());
        let notifier = Notifier::new(&ctx).with_template(template);

        // Shell metacharacters must arrive untouched
        let title = "Test \"quoted\" $(title)";
        let posted = notifier
            .post(&Notification::new(title, "Test Message").sound("glass"))
            .unwrap();
        assert!(posted);

        let bundle = HelperBundle::for_context(&ctx);
        let recorded = fs::read_to_string(
            bundle.applet.parent().unwrap().join("args.txt"),
        )
        .unwrap();
        let args: Vec<&str> = recorded.lines().collect();
        assert_eq!(
            args,
            ["--title", title, "--message", "Test Message", "--sound", "Glass"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unknown_sound_does_not_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let template = write_template_bundle(tmp.path(), 0);
        let ctx = context_at(tmp.path());
        let notifier = Notifier::new(&ctx).with_template(template);

        let posted = notifier
            .post(&Notification::new("Test Title", "").sound("SPOONS"))
            .unwrap();
        assert!(posted);

        let bundle = HelperBundle::for_context(&ctx);
        let recorded = fs::read_to_string(
            bundle.applet.parent().unwrap().join("args.txt"),
        )
        .unwrap();
        let args: Vec<&str> = recorded.lines().collect();
        assert_eq!(args, ["--title", "Test Title", "--message", "", "--sound", ""]);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let template = write_template_bundle(tmp.path(), 3);
        let ctx = context_at(tmp.path());
        let notifier = Notifier::new(&ctx).with_template(template);

        let posted = notifier
            .post(&Notification::new("Test Title", "Test Message"))
            .unwrap();
        assert!(!posted);
    }

    #[cfg(unix)]
    #[test]
    fn test_second_post_reuses_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let template = write_template_bundle(tmp.path(), 0);
        let ctx = context_at(tmp.path());
        let notifier = Notifier::new(&ctx).with_template(template);

        assert!(notifier
            .post(&Notification::new("Test Title", "Test Message"))
            .unwrap());

        // Replace the installed applet; a second post must not re-copy it
        let bundle = HelperBundle::for_context(&ctx);
        fs::write(&bundle.applet, "#!/bin/sh\nexit 7\n").unwrap();
        let posted = notifier
            .post(&Notification::new("Test Title", "Test Message"))
            .unwrap();
        assert!(!posted);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_helper() {
        let tmp = tempfile::tempdir().unwrap();
        let template =
            write_template_with_applet(tmp.path(), "#!/bin/sh\nsleep 5\nexit 0\n");
        let ctx = context_at(tmp.path());
        let notifier = Notifier::new(&ctx)
            .with_template(template)
            .with_timeout(Duration::from_millis(100));

        let started = Instant::now();
        let err = notifier
            .post(&Notification::new("Test Title", "Test Message"))
            .unwrap_err();
        assert!(matches!(err, NotifyError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_template_degrades_to_false() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context_at(tmp.path());
        let notifier =
            Notifier::new(&ctx).with_template(tmp.path().join("no-such-template.app"));

        let posted = notifier
            .post(&Notification::new("Test Title", "Test Message"))
            .unwrap();
        assert!(!posted);
    }
}
