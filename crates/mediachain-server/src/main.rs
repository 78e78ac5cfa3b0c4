use log::info;
use tracing_subscriber::EnvFilter;

use mediachain::{load_config, Config};
use mediachain_server::{build_rocket, AppState};

const CONFIG_ENV: &str = "MEDIACHAIN_CONFIG";
const LOG_FORMAT_ENV: &str = "MEDIACHAIN_LOG_FORMAT";

fn init_logging() {
    // Rocket and the engine's `log` records flow into the tracing subscriber.
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

fn load() -> Result<Config, mediachain::ConfigError> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path)
        }
        None => {
            info!("{} not set, using default configuration", CONFIG_ENV);
            Ok(Config::default())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    info!("Starting mediachain server v{}", env!("CARGO_PKG_VERSION"));

    // The engine owns blocking HTTP clients, which must not be created on an
    // async runtime thread.
    let config = load()?;
    let state = AppState::from_config(&config)?;

    if let Err(e) = rocket::execute(build_rocket(state).launch()) {
        log::error!("Rocket server failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
