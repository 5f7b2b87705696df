use std::sync::Arc;
use tracing::{error, info};

use tracing_persist_hook::init::init_from_env;
use tracing_persist_hook::{Hook, HookOptions, NoopExec};

fn main() {
    // LOG_HOOK_DSN=opensearch://127.0.0.1:9200/auth-errors LOG_HOOK_SERVICE_NAME=auth
    let hook = match init_from_env() {
        Ok(hook) => hook,
        Err(e) => {
            eprintln!("falling back to a no-op hook: {}", e);
            Hook::shared(HookOptions::default().exec(Arc::new(NoopExec))).expect("build hook")
        }
    };

    info!("starting service");

    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );

    hook.flush();
}
