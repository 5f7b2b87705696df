use std::sync::Arc;

use tracing::{error, info};
use tracing_persist_hook::{
    backend::{make_exec_from_config, parse_dsn},
    init::init_tracing,
    opensearch::OpenSearchExec,
    Executor, Hook, HookOptions,
};

fn main() {
    // Example DSN: opensearch://localhost:9200/logs
    let exec: Arc<dyn Executor> = match std::env::var("LOG_HOOK_DSN") {
        Ok(dsn) => {
            let backend_cfg = parse_dsn(&dsn).expect("invalid LOG_HOOK_DSN");
            make_exec_from_config(&backend_cfg).expect("failed to build opensearch executor")
        }
        // Pre-established client variant.
        Err(_) => Arc::new(OpenSearchExec::connect(
            reqwest::Client::new(),
            "http://localhost:9200",
            "logs",
        )),
    };

    let hook = Hook::shared(HookOptions::default().exec(exec)).expect("build hook");
    init_tracing(hook.clone()).expect("install subscriber");

    info!("opensearch backend example started");
    error!(index = "logs", "simulated error sent via OpenSearch backend");

    hook.flush();
}
