use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::error;

use tracing_persist_hook::init::{init_tracing_with_config, InitConfig};
use tracing_persist_hook::{Hook, HookOptions, Level, NoopExec};

fn main() {
    let options = HookOptions::default()
        .max_queues(50_000)
        .max_workers(8)
        .levels([Level::Error, Level::Warn])
        .exec(Arc::new(NoopExec));
    let hook = Hook::shared(options).expect("build hook");

    init_tracing_with_config(hook.clone(), InitConfig { enable_stdout: false }).expect("install subscriber");

    let producers: u64 = 4;
    let per_producer: u64 = 25_000;
    let start = Instant::now();

    let handles: Vec<_> = (0..producers)
        .map(|p| {
            thread::spawn(move || {
                for i in 0..per_producer {
                    error!(producer = p, iteration = i, "custom load test error");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    let elapsed = start.elapsed();
    let n = producers * per_producer;
    println!("custom config: fired {} events from {} threads in {:?} (~{:.0} ev/s)",
        n,
        producers,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    hook.flush();
    println!("after flush: {:?}", hook.stats());
}
