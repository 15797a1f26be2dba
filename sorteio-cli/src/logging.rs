use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Bibliotecas de HTTP ficam em `warn` para não poluir o log.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "html5ever", "selectors"];

fn build_filter(log_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = String::from(log_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }
    EnvFilter::new(&directives)
}

/// `RUST_LOG` tem precedência sobre `--log-level`. Logs vão para stderr.
pub fn init_logging(log_level: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(build_filter(log_level))
        .with(fmt_layer)
        .try_init();
}
