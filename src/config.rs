use std::{env, time::Duration};

/// AppConfig
///
/// Holds the service configuration. Immutable once loaded; pulled into handlers through
/// the shared application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log format and how strict loading is.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Artificial latency applied to every route implementation fetch.
    pub module_load_delay: Duration,
}

/// Env
///
/// Defines the runtime context: human-readable logs and relaxed defaults locally,
/// JSON logs and mandatory settings in production.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests and in-process embedding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            module_load_delay: Duration::ZERO,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics if `BIND_ADDR` is missing in production, or if `MODULE_LOAD_DELAY_MS` is
    /// set but is not a whole number of milliseconds. Startup stops rather than running
    /// with a guessed configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = match env {
            Env::Production => {
                env::var("BIND_ADDR").expect("FATAL: BIND_ADDR must be set in production.")
            }
            Env::Local => env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        let module_load_delay = match env::var("MODULE_LOAD_DELAY_MS") {
            Ok(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .expect("FATAL: MODULE_LOAD_DELAY_MS must be an integer number of milliseconds."),
            ),
            Err(_) => Duration::ZERO,
        };

        Self {
            env,
            bind_addr,
            module_load_delay,
        }
    }
}
