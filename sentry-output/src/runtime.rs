//! Runtime diagnostics injected into every forwarded record.

use std::thread;

use crate::Record;

include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

/// Key of the rustc version the crate was built with.
pub const KEY_VERSION: &str = "runtime.version";
/// Key of the number of logical CPUs.
pub const KEY_NUM_CPU: &str = "runtime.num_cpu";
/// Key of the configured parallelism.
pub const KEY_PARALLELISM: &str = "runtime.parallelism";
/// Key of the number of live async tasks.
pub const KEY_NUM_TASKS: &str = "runtime.num_tasks";

/// Returns the version of the compiler, e.g. `rustc 1.81.0 (stable)`.
pub fn version() -> String {
    match (RUSTC_VERSION, RUSTC_CHANNEL) {
        (Some(version), Some(channel)) => format!("rustc {version} ({channel})"),
        (Some(version), None) => format!("rustc {version}"),
        _ => "rustc".to_owned(),
    }
}

/// Returns the number of worker threads of the current Tokio runtime, or the
/// available parallelism of the process outside of one.
pub fn parallelism() -> usize {
    #[cfg(feature = "tokio-runtime")]
    {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            return handle.metrics().num_workers();
        }
    }
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Returns the number of alive tasks of the current Tokio runtime, `0`
/// outside of one.
pub fn num_tasks() -> usize {
    #[cfg(feature = "tokio-runtime")]
    {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            return handle.metrics().num_alive_tasks();
        }
    }
    0
}

/// Adds the runtime diagnostics to the record.
pub(crate) fn inject(record: &mut Record) {
    record.insert(KEY_VERSION, version());
    record.insert(KEY_NUM_CPU, num_cpus::get());
    record.insert(KEY_PARALLELISM, parallelism());
    record.insert(KEY_NUM_TASKS, num_tasks());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_inject() {
        let mut record = Record::new();
        inject(&mut record);

        assert_eq!(record.len(), 4);
        assert!(record
            .get(KEY_VERSION)
            .and_then(|v| v.as_str())
            .unwrap()
            .starts_with("rustc"));
        assert_eq!(
            record.get(KEY_NUM_CPU),
            Some(&Value::from(num_cpus::get()))
        );
        assert_eq!(record.get(KEY_NUM_TASKS), Some(&Value::from(0usize)));
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_diagnostics() {
        assert_eq!(parallelism(), 2);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            rx.await.ok();
        });
        assert!(num_tasks() >= 1);

        tx.send(()).ok();
        task.await.unwrap();
    }
}
