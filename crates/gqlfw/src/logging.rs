use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

/// Installs the stderr subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level follows the flags: `-q`
/// turns logging off, `-v` raises it to debug and `-vv` to trace. The
/// `debug` setting counts as one `-v`.
pub fn init_tracing(args: &GlobalArgs, debug: bool) -> anyhow::Result<()> {
    let level = if args.quiet {
        "off"
    } else {
        match args.verbose.saturating_add(u8::from(debug)) {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::uptime())
        .with_filter(env_filter);

    Registry::default().with(stderr_layer).try_init()?;

    Ok(())
}
