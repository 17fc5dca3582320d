// Taskora functions service
//
// Serves the email, password reset and payment verification endpoints.
// The config file path comes from the first argument or TASKORA_CONFIG.

use anyhow::{Context, Result};
use std::process;
use taskora_config::{ConfigLoader, TaskoraConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const SERVER_ERROR: i32 = 2;
}

#[tokio::main]
async fn main() {
    let config = match load_configuration().await {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            error!("Failed to load configuration: {:#}", e);
            process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    init_logging(&config.logging.level);
    info!(
        "Starting Taskora functions v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    match taskora_functions::start_server(&config).await {
        Ok(()) => process::exit(exit_codes::SUCCESS),
        Err(e) => {
            error!("Functions server failed: {}", e);
            process::exit(exit_codes::SERVER_ERROR);
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn load_configuration() -> Result<TaskoraConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TASKORA_CONFIG").ok());

    ConfigLoader::load(path.as_deref())
        .await
        .with_context(|| match &path {
            Some(path) => format!("loading {path}"),
            None => "loading configuration from the environment".to_string(),
        })
}
