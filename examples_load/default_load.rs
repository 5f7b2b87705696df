use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_persist_hook::init::{init_tracing_with_config, InitConfig};
use tracing_persist_hook::{Hook, HookOptions, NoopExec};

fn main() {
    let hook = Hook::shared(HookOptions::default().exec(Arc::new(NoopExec))).expect("build hook");
    init_tracing_with_config(hook.clone(), InitConfig { enable_stdout: false }).expect("install subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: fired {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    hook.flush();
    println!("after flush: {:?} (total {:?})", hook.stats(), start.elapsed());
}
