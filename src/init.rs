use crate::backend::{make_exec_from_config, parse_dsn};
use crate::env::{
    env_flag, env_or, env_parse, LOG_HOOK_DSN_ENV, LOG_HOOK_MAX_QUEUES_ENV, LOG_HOOK_MAX_WORKERS_ENV,
    LOG_HOOK_SERVICE_NAME_ENV, LOG_HOOK_STDOUT_ENV,
};
use crate::hook::{Hook, HookError};
use crate::options::{HookOptions, DEFAULT_MAX_QUEUES, DEFAULT_MAX_WORKERS};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Subscriber-level settings used when installing a hook globally.
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of the hook layer so events are printed to the console
///   as well.
#[derive(Clone, Debug)]
pub struct InitConfig {
    pub enable_stdout: bool,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self { enable_stdout: true }
    }
}

/// Install a global `tracing` subscriber feeding events into `hook`.
///
/// **Parameters**
/// - `hook`: shared [`Hook`]; keep a clone to call [`Hook::flush`] before
///   the process exits.
/// - `config`: [`InitConfig`] controlling extra console output.
///
/// **Errors**
///
/// Fails if a global default subscriber is already set.
pub fn init_tracing_with_config(hook: Arc<Hook>, config: InitConfig) -> Result<(), HookError> {
    let layer = hook.layer();

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Install `hook` with [`InitConfig::default`].
pub fn init_tracing(hook: Arc<Hook>) -> Result<(), HookError> {
    init_tracing_with_config(hook, InitConfig::default())
}

/// Build [`HookOptions`] from the `LOG_HOOK_*` environment variables.
///
/// Without `LOG_HOOK_DSN` the options carry no executor and the hook runs
/// in degraded mode.
pub fn options_from_env() -> Result<HookOptions, HookError> {
    let mut options = HookOptions::default()
        .max_queues(env_parse(LOG_HOOK_MAX_QUEUES_ENV, DEFAULT_MAX_QUEUES))
        .max_workers(env_parse(LOG_HOOK_MAX_WORKERS_ENV, DEFAULT_MAX_WORKERS));

    let dsn = env_or(LOG_HOOK_DSN_ENV, "");
    if !dsn.is_empty() {
        let cfg = parse_dsn(&dsn)?;
        options = options.exec(make_exec_from_config(&cfg)?);
    }

    let service = env_or(LOG_HOOK_SERVICE_NAME_ENV, "");
    if !service.is_empty() {
        options = options.extra_field("service", service);
    }
    Ok(options)
}

/// Build a hook from the environment and install it globally.
///
/// Returns the hook so the caller can flush it on shutdown.
pub fn init_from_env() -> Result<Arc<Hook>, HookError> {
    let hook = Hook::shared(options_from_env()?)?;
    let config = InitConfig {
        enable_stdout: env_flag(LOG_HOOK_STDOUT_ENV),
    };
    init_tracing_with_config(Arc::clone(&hook), config)?;
    Ok(hook)
}
