use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_persist_hook::{init::init_tracing, BoxError, Executor, Hook, HookOptions, LogEntry};

/// Example of integrating a completely custom backend by implementing
/// the `Executor` trait directly. Imagine this talks to some
/// proprietary DB for which this crate does not provide a built-in
/// executor.
struct MyCustomDbExec;

#[async_trait]
impl Executor for MyCustomDbExec {
    async fn exec(&self, entry: &LogEntry) -> Result<(), BoxError> {
        // Here you would call your own client library for the target DB.
        // For the sake of example we just print the entry.
        println!("[my-custom-db] {:?}", entry);
        Ok(())
    }

    async fn close(&self) -> Result<(), BoxError> {
        println!("[my-custom-db] closed");
        Ok(())
    }
}

fn main() {
    let exec: Arc<dyn Executor> = Arc::new(MyCustomDbExec);
    let hook = Hook::shared(HookOptions::default().exec(exec)).expect("build hook");

    init_tracing(hook.clone()).expect("install subscriber");

    info!("custom backend example started");
    error!(db = "my-custom-db", "simulated error sent via custom backend");

    hook.flush();
}
