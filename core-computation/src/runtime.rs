//! Top-level drivers.
//!
//! Computations need no executor: they run inline wherever they are started
//! or resumed. Something still has to wait for the outermost result in
//! `main` or in a test, and that is all this module is for. It parks the
//! current thread until the awaited result is available; it never queues or
//! schedules work.

use std::future::Future;

/// Runs the provided future to completion on the current thread.
///
/// # Examples
///
/// ```rust
/// use core_computation::{runtime, start, Error};
///
/// let task = start(async { Ok::<_, Error>("hello") });
/// assert_eq!(runtime::block_on(task).unwrap(), "hello");
/// ```
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    let _span = tracing::trace_span!("block_on").entered();
    futures::executor::block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{from_callback, Callback};
    use crate::error::Error;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_block_on_plain_future() {
        assert_eq!(block_on(async { 3 + 4 }), 7);
    }

    #[test]
    fn test_block_on_waits_for_foreign_thread() {
        let value = block_on(async {
            from_callback(|callback: Callback<u64>| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    callback.complete(99);
                });
            })
            .await
        });
        assert_eq!(value.unwrap(), 99);
    }

    #[test]
    fn test_block_on_surfaces_errors() {
        let task = crate::Task::<()>::failed(Error::msg("TestException"));
        assert_eq!(block_on(task).unwrap_err().to_string(), "TestException");
    }
}
