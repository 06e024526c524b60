use crate::context::WorkflowContext;
use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

/// Process-wide workflow context, built on first use
static CONTEXT: OnceCell<WorkflowContext> = OnceCell::new();

/// Guard so the tracing subscriber is installed at most once
static LOGGING: OnceCell<()> = OnceCell::new();

/// Return the workflow context for this process
///
/// The first call reads the Alfred environment; every later call returns
/// the same instance. A failure to construct the context is fatal and is
/// reported on every call until the environment is fixed.
pub fn context() -> Result<&'static WorkflowContext> {
    CONTEXT.get_or_try_init(WorkflowContext::from_env)
}

/// Install the global tracing subscriber
///
/// Logs go to stderr, which the Alfred debugger captures. `debug` lowers
/// the default filter; RUST_LOG still wins when set. Calling this more
/// than once is harmless.
pub fn init_logging(debug: bool) {
    LOGGING.get_or_init(|| {
        let default = if debug { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
