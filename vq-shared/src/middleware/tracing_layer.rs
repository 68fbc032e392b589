use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Crate targets use underscores.
fn default_directives(service_name: &str) -> String {
    format!("info,{}=debug,tower_http=debug", service_name.replace('-', "_"))
}

fn json_output() -> bool {
    matches!(std::env::var("VQ_ENV").as_deref(), Ok("production"))
}

/// Installs the global subscriber. `VQ_ENV=production` switches to JSON lines.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    if json_output() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_file(true).with_line_number(true))
            .init();
    }

    tracing::info!(service = service_name, json = json_output(), "tracing initialized");
}
