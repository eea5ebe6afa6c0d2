use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry };

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs the global fmt subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `default_directive` when it is set. Calling this more
/// than once is a no-op.
pub fn init_tracing(default_directive: &str) -> Result<(), InitError> {
    if INITIALISED.set(()).is_err() {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}
