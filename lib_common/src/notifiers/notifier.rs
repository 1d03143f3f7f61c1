//! Retrying delivery front-end: wraps a [`ChatTransport`] with bounded
//! exponential backoff and reduces the outcome to a boolean.

use async_trait::async_trait;

use crate::notifiers::{AlertSink, ChatTransport};
use crate::retrieve::{retry_with_backoff, RetryPolicy};

/// Delivers alerts through `T`, retrying per `policy`. Never returns an error.
pub struct Notifier<T: ChatTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: ChatTransport> Notifier<T> {
    /// Creates a notifier.
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// The wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Announces that the bot is running.
    pub async fn send_startup_message(&self, text: &str) -> bool {
        self.send(text).await
    }
}

#[async_trait]
impl<T: ChatTransport> AlertSink for Notifier<T> {
    async fn send(&self, message: &str) -> bool {
        let transport = &self.transport;
        // The final failure is already logged by the retry helper.
        retry_with_backoff(&self.policy, "send_message", |_| transport.deliver(message))
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifiers::DeliveryError;
    use log::{Level, Log, Metadata, Record};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Keeps every record with the thread that emitted it, so parallel tests don't mix.
    struct CaptureLogger;

    static CAPTURED: Mutex<Vec<(ThreadId, Level, String)>> = Mutex::new(Vec::new());
    static CAPTURE: CaptureLogger = CaptureLogger;

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            CAPTURED
                .lock()
                .unwrap()
                .push((thread::current().id(), record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    fn errors_on_this_thread() -> Vec<String> {
        let me = thread::current().id();
        CAPTURED
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, level, _)| *id == me && *level == Level::Error)
            .map(|(_, _, msg)| msg.clone())
            .collect()
    }

    /// Fails the first `failures` deliveries, recording when each attempt happened.
    struct FlakyTransport {
        failures: u32,
        attempts: Mutex<Vec<Instant>>,
    }

    impl FlakyTransport {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempt_times(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for FlakyTransport {
        async fn deliver(&self, _text: &str) -> Result<(), DeliveryError> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            if attempts.len() as u32 <= self.failures {
                Err(DeliveryError::Network("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(2), 2.0)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_with_growing_delays() {
        let notifier = Notifier::new(FlakyTransport::new(2), policy());
        assert!(notifier.send("hello").await);

        let times = notifier.transport().attempt_times();
        assert_eq!(times.len(), 3);
        let first_gap = times[1] - times[0];
        let second_gap = times[2] - times[1];
        assert_eq!(first_gap, Duration::from_secs(2));
        assert_eq!(second_gap, Duration::from_secs(4));
        assert!(second_gap > first_gap);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_four_attempts() {
        let notifier = Notifier::new(FlakyTransport::new(4), policy());
        assert!(!notifier.send("hello").await);
        assert_eq!(notifier.transport().attempt_times().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_makes_one_attempt() {
        let notifier = Notifier::new(FlakyTransport::new(0), policy());
        assert!(notifier.send_startup_message("bot is active").await);
        assert_eq!(notifier.transport().attempt_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn giving_up_logs_a_single_error() {
        log::set_logger(&CAPTURE).ok();
        log::set_max_level(log::LevelFilter::Trace);

        let notifier = Notifier::new(FlakyTransport::new(4), policy());
        assert!(!notifier.send("hello").await);

        let errors = errors_on_this_thread();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("failed after 3 retries"));
    }
}
