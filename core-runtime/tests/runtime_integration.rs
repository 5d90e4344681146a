//! Integration tests for the runtime handle and logging setup

use core_computation::{from_callback, AbandonPolicy, Callback, Error, Task};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use core_runtime::{CoreConfig, CoreRuntime};
use mockall::automock;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[automock]
trait QuoteService: Send + Sync {
    fn fetch(&self, symbol: &str, callback: Callback<u32>);
}

fn fetch_quote(
    runtime: &CoreRuntime,
    service: Arc<dyn QuoteService>,
    symbol: &'static str,
) -> Task<u32> {
    runtime.start("fetch_quote", async move {
        let price = from_callback(move |callback| service.fetch(symbol, callback)).await?;
        Ok(price * 2)
    })
}

#[test]
fn test_logging_initializes_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_thread_info(true);

    init_logging(config.clone()).unwrap();

    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Failed to initialize logging"));
}

#[test]
fn test_runtime_with_mocked_service_on_worker_thread() {
    let mut service = MockQuoteService::new();
    service
        .expect_fetch()
        .times(1)
        .returning(|symbol, callback| {
            assert_eq!(symbol, "ACME");
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                callback.complete(21);
            });
        });

    let config = CoreConfig::builder().track_lifetimes(true).build().unwrap();
    let runtime = CoreRuntime::new(config).unwrap();
    let task = fetch_quote(&runtime, Arc::new(service), "ACME");
    assert!(!task.is_complete());

    assert_eq!(runtime.block_on(task).unwrap(), 42);
}

#[test]
fn test_runtime_surfaces_service_failure() {
    let mut service = MockQuoteService::new();
    service
        .expect_fetch()
        .times(1)
        .returning(|_, callback| callback.fail(anyhow::anyhow!("market closed")));

    let runtime = CoreRuntime::new(CoreConfig::default()).unwrap();
    let mut task = fetch_quote(&runtime, Arc::new(service), "ACME");

    let err = task.try_take().unwrap_err();
    assert!(err.is_producer());
    assert_eq!(err.to_string(), "market closed");
}

#[test]
fn test_keep_alive_runtime_finishes_dropped_work() {
    let (sender, receiver) = std::sync::mpsc::channel::<Callback<u32>>();
    let runtime = CoreRuntime::new(
        CoreConfig::builder()
            .abandon_policy(AbandonPolicy::KeepAlive)
            .track_lifetimes(true)
            .build()
            .unwrap(),
    )
    .unwrap();

    let task = runtime.start("background", async move {
        let value = from_callback(move |callback| sender.send(callback).unwrap()).await?;
        Ok::<_, Error>(value)
    });
    drop(task);

    let tracker = runtime.tracker().unwrap();
    assert_eq!(tracker.live(), 1);

    receiver.recv().unwrap().complete(5);
    assert_eq!(tracker.live(), 0);
}

#[test]
fn test_config_chaining() {
    let config = CoreConfig::builder()
        .abandon_policy(AbandonPolicy::Release)
        .track_lifetimes(true)
        .name_prefix("quotes")
        .logging(
            LoggingConfig::default()
                .with_format(LogFormat::Json)
                .with_level(LogLevel::Warn)
                .with_spans(false)
                .with_target(false),
        )
        .build()
        .unwrap();

    assert_eq!(config.abandon_policy, AbandonPolicy::Release);
    assert_eq!(config.qualified_name("fetch"), "quotes::fetch");

    let logging = config.logging.unwrap();
    assert_eq!(logging.format, LogFormat::Json);
    assert_eq!(logging.level, LogLevel::Warn);
    assert!(!logging.enable_spans);
    assert!(!logging.display_target);
}
