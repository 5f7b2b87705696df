//! Environment variable names used by this crate for convenient
//! configuration of the hook from services.
//!
//! These are purely helpers; the hook itself stays decoupled from
//! environment access.

/// Backend DSN, e.g. `opensearch://127.0.0.1:9200/app-logs`.
pub const LOG_HOOK_DSN_ENV: &str = "LOG_HOOK_DSN";

/// Entry buffer capacity.
pub const LOG_HOOK_MAX_QUEUES_ENV: &str = "LOG_HOOK_MAX_QUEUES";

/// Number of worker threads.
pub const LOG_HOOK_MAX_WORKERS_ENV: &str = "LOG_HOOK_MAX_WORKERS";

/// Optional logical service name, added to every entry as `service`.
pub const LOG_HOOK_SERVICE_NAME_ENV: &str = "LOG_HOOK_SERVICE_NAME";

/// `true`/`1` to also print events to the console.
pub const LOG_HOOK_STDOUT_ENV: &str = "LOG_HOOK_STDOUT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, falling back to `default` when
/// it is unset or malformed.
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Interpret `1`, `true`, `yes` and `on` (any case) as true.
pub fn env_flag(key: &str) -> bool {
    matches!(
        env_or(key, "").trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
