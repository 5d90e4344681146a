//! Chained computations demonstration
//!
//! Builds a four-level chain on top of a leaf that yields 41, either inline
//! or from a worker thread, and walks through the success, failure and
//! abandoned-handle cases. Every level logs what it received; the tracker's
//! live count is reported after each scenario.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example chain_demo
//!
//! # JSON format
//! cargo run --example chain_demo -- json
//!
//! # Compact format, with suspend/resume events
//! cargo run --example chain_demo -- compact "core_computation=trace,chain_demo=info"
//! ```

use core_computation::{from_callback, Callback, Error, Task};
use core_runtime::logging::{LogFormat, LogLevel, LoggingConfig};
use core_runtime::{CoreConfig, CoreRuntime};
use std::env;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, info_span, warn};

/// Stand-in for an external API that answers on a thread of its own.
#[derive(Clone, Default)]
struct ThreadedApi {
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ThreadedApi {
    fn request(&self, callback: Callback<i32>) {
        info!("api: request accepted, answering from a worker thread");
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            info!("api: invoking callback");
            callback.complete(41);
        });
        self.workers
            .lock()
            .expect("worker list poisoned")
            .push(worker);
    }

    fn join(&self) {
        let workers: Vec<_> =
            std::mem::take(&mut *self.workers.lock().expect("worker list poisoned"));
        for worker in workers {
            worker.join().expect("api worker panicked");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Leaf {
    Sync,
    SyncError,
    Async,
    AsyncError,
}

fn level1(runtime: &CoreRuntime, api: &ThreadedApi, leaf: Leaf) -> Task<i32> {
    let api = api.clone();
    runtime.start("level1", async move {
        let x = match leaf {
            Leaf::Sync => 41,
            Leaf::SyncError => return Err(Error::msg("TestException")),
            Leaf::Async => from_callback(move |callback| api.request(callback)).await?,
            Leaf::AsyncError => {
                from_callback(move |callback| api.request(callback)).await?;
                return Err(Error::msg("TestException"));
            }
        };
        info!(x, "level1: leaf delivered");
        Ok(x + 1)
    })
}

fn level2(runtime: &CoreRuntime, api: &ThreadedApi, leaf: Leaf) -> Task<f64> {
    let inner = level1(runtime, api, leaf);
    runtime.start("level2", async move {
        let x = inner.await?;
        info!(x, "level2: received");
        Ok(f64::from(x) + 1.0)
    })
}

fn level3(runtime: &CoreRuntime, api: &ThreadedApi, leaf: Leaf) -> Task<f64> {
    let inner = level2(runtime, api, leaf);
    runtime.start("level3", async move {
        let x = inner.await?;
        info!(x, "level3: received");
        Ok(x + 1.0)
    })
}

fn top(runtime: &CoreRuntime, api: &ThreadedApi, leaf: Leaf) -> Task<()> {
    let inner = level3(runtime, api, leaf);
    runtime.start("top", async move {
        match inner.await {
            Ok(x) => info!(x, "top: chain finished"),
            Err(err) => warn!(error = %err, "top: caught error from the chain"),
        }
        Ok(())
    })
}

fn report(runtime: &CoreRuntime, scenario: &str) {
    if let Some(tracker) = runtime.tracker() {
        let snapshot = tracker.snapshot();
        info!(
            scenario,
            live = snapshot.live,
            created = snapshot.created,
            suspensions = snapshot.suspensions,
            resumes = snapshot.resumes,
            "scenario finished"
        );
    }
}

fn run(runtime: &CoreRuntime, api: &ThreadedApi, scenario: &str, leaf: Leaf) {
    let _span = info_span!("scenario", name = scenario).entered();
    let task = top(runtime, api, leaf);
    if let Err(err) = runtime.block_on(task) {
        error!(error = %err, "scenario failed");
    }
    api.join();
    report(runtime, scenario);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut logging = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Info)
        .with_thread_info(true);
    if let Some(filter) = args.get(2) {
        logging = logging.with_filter(filter.clone());
    }

    let config = CoreConfig::builder()
        .track_lifetimes(true)
        .name_prefix("demo")
        .logging(logging)
        .build()
        .expect("Failed to build config");
    let runtime = CoreRuntime::new(config).expect("Failed to initialize runtime");
    let api = ThreadedApi::default();

    info!("=== Chained Computation Demo ===");

    run(&runtime, &api, "sync chain", Leaf::Sync);
    run(&runtime, &api, "sync chain with error", Leaf::SyncError);
    run(&runtime, &api, "async chain", Leaf::Async);
    run(&runtime, &api, "async chain with error", Leaf::AsyncError);

    {
        let _span = info_span!("scenario", name = "async simple with error").entered();
        let task = level1(&runtime, &api, Leaf::AsyncError);
        match runtime.block_on(task) {
            Ok(x) => info!(x, "unexpected value"),
            Err(err) => warn!(error = %err, "caught error one level up"),
        }
        api.join();
        report(&runtime, "async simple with error");
    }

    {
        let _span = info_span!("scenario", name = "abandoned handle").entered();
        let task = top(&runtime, &api, Leaf::Async);
        info!("dropping the top-level handle before the api answers");
        drop(task);
        api.join();
        report(&runtime, "abandoned handle");
    }

    info!("=== Demo Complete ===");
}
