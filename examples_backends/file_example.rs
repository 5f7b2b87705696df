use tracing::{error, info, info_span, warn};
use tracing_persist_hook::init::{init_tracing_with_config, InitConfig};
use tracing_persist_hook::jsonl::JsonLinesExec;
use tracing_persist_hook::{Hook, HookOptions, LogEntry};

fn main() {
    let path = std::env::temp_dir().join("tracing-persist-hook-example.jsonl");
    let exec = JsonLinesExec::open(&path).expect("open log file");

    let options = HookOptions::default()
        .extra_field("service", "file-example")
        .filter(|mut e: LogEntry| {
            if e.fields.contains_key("password") {
                e.fields.insert("password".into(), "***".into());
            }
            e
        })
        .exec(std::sync::Arc::new(exec));

    let hook = Hook::shared(options).expect("build hook");
    init_tracing_with_config(hook.clone(), InitConfig { enable_stdout: false }).expect("install subscriber");

    info!("file backend example started");
    {
        let span = info_span!("login");
        let _guard = span.enter();
        warn!(user = "alice", password = "hunter2", "password about to expire");
    }
    error!(code = 500, "request failed");

    hook.flush();
    println!("entries written to {}: {:?}", path.display(), hook.stats());
}
