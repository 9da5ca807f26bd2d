//! State polling with bounded backoff
//!
//! [`wait_for`] observes a remote object through a [`Refresh`] implementation
//! until its status reaches a target, leaves the known vocabulary, or the
//! timeout runs out. Resource-specific wait loops are instances of it with
//! their own refresher and status names.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Delay schedule between refreshes
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Sleep after the first pending observation
    pub delay: Duration,

    /// Lower bound for every later sleep
    pub min_interval: Duration,

    /// Upper bound for every later sleep
    pub max_interval: Duration,

    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            min_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl PollConfig {
    /// Sleep before refresh number `attempt + 1`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.delay;
        }
        let grown = self.delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let grown = Duration::try_from_secs_f64(grown).unwrap_or(self.max_interval);
        grown.min(self.max_interval).max(self.min_interval)
    }
}

/// Wait-loop parameters
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    pub poll: PollConfig,
}

impl StateChangeConf {
    pub fn new<P, T>(pending: P, target: T, timeout: Duration) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            timeout,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    fn is_target(&self, status: &str) -> bool {
        self.target.iter().any(|s| s == status)
    }

    fn is_pending(&self, status: &str) -> bool {
        self.pending.iter().any(|s| s == status)
    }
}

/// One refresh result: the object, if it still exists, and its status label
#[derive(Debug, Clone)]
pub struct Observation<T> {
    pub value: Option<T>,
    pub status: String,
}

impl<T> Observation<T> {
    pub fn new(value: T, status: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            status: status.into(),
        }
    }

    /// The object no longer exists
    pub fn gone(status: impl Into<String>) -> Self {
        Self {
            value: None,
            status: status.into(),
        }
    }
}

/// Refresh errors that should be retried rather than abort the wait
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for crate::error::CloudError {
    fn is_transient(&self) -> bool {
        crate::error::CloudError::is_transient(self)
    }
}

/// Source of observations for [`wait_for`]
#[async_trait]
pub trait Refresh: Send {
    type Output: Send;
    type Error: Transient + fmt::Display + Send;

    async fn refresh(&mut self) -> Result<Observation<Self::Output>, Self::Error>;
}

/// Successful end of a wait
#[derive(Debug)]
pub struct Settled<T> {
    pub value: Option<T>,
    pub status: String,
    pub refreshes: u32,
    pub sleeps: u32,
    pub elapsed: Duration,
}

/// Why a wait ended without reaching a target status
#[derive(Debug)]
pub enum WaitError<E> {
    Timeout {
        last_status: Option<String>,
        timeout: Duration,
    },
    UnexpectedState {
        status: String,
        expected: Vec<String>,
    },
    Refresh(E),
}

impl<E: fmt::Display> fmt::Display for WaitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout {
                last_status,
                timeout,
            } => write!(
                f,
                "timeout after {:?} (last status: {})",
                timeout,
                last_status.as_deref().unwrap_or("none")
            ),
            WaitError::UnexpectedState { status, expected } => write!(
                f,
                "unexpected status {:?}, expected one of {}",
                status,
                expected.join(", ")
            ),
            WaitError::Refresh(err) => write!(f, "{}", err),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for WaitError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaitError::Refresh(err) => Some(err),
            _ => None,
        }
    }
}

/// Bookkeeping for a single wait loop
struct PollState<'a> {
    conf: &'a StateChangeConf,
    started: Instant,
    last_status: Option<String>,
    refreshes: u32,
    sleeps: u32,
}

impl<'a> PollState<'a> {
    fn new(conf: &'a StateChangeConf) -> Self {
        Self {
            conf,
            started: Instant::now(),
            last_status: None,
            refreshes: 0,
            sleeps: 0,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn next_delay(&self) -> Duration {
        self.conf.poll.delay_for_attempt(self.sleeps)
    }

    fn timed_out<E>(&self) -> WaitError<E> {
        WaitError::Timeout {
            last_status: self.last_status.clone(),
            timeout: self.conf.timeout,
        }
    }
}

/// Poll `refresher` until it reports a target status.
///
/// The first refresh happens immediately. Transient refresh errors count as
/// still pending; any other error, or a status outside both sets, ends the
/// wait at once. No refresh is issued once the timeout has elapsed.
pub async fn wait_for<R: Refresh>(
    conf: &StateChangeConf,
    refresher: &mut R,
) -> Result<Settled<R::Output>, WaitError<R::Error>> {
    let mut state = PollState::new(conf);

    loop {
        state.refreshes += 1;
        match refresher.refresh().await {
            Ok(observation) => {
                if conf.is_target(&observation.status) {
                    tracing::debug!(
                        "Reached {} after {} refreshes",
                        observation.status,
                        state.refreshes
                    );
                    return Ok(Settled {
                        value: observation.value,
                        status: observation.status,
                        refreshes: state.refreshes,
                        sleeps: state.sleeps,
                        elapsed: state.elapsed(),
                    });
                }
                if !conf.is_pending(&observation.status) {
                    return Err(WaitError::UnexpectedState {
                        status: observation.status,
                        expected: conf.pending.iter().chain(&conf.target).cloned().collect(),
                    });
                }
                tracing::trace!("Still {}, waiting", observation.status);
                state.last_status = Some(observation.status);
            }
            Err(err) if err.is_transient() => {
                tracing::debug!("Transient error while waiting, retrying: {}", err);
            }
            Err(err) => return Err(WaitError::Refresh(err)),
        }

        let elapsed = state.elapsed();
        if elapsed >= conf.timeout {
            return Err(state.timed_out());
        }

        let delay = state.next_delay().min(conf.timeout - elapsed);
        sleep(delay).await;
        state.sleeps += 1;

        if state.elapsed() >= conf.timeout {
            return Err(state.timed_out());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug)]
    struct StubError {
        transient: bool,
    }

    impl fmt::Display for StubError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stub error (transient: {})", self.transient)
        }
    }

    impl Transient for StubError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    /// Replays scripted observations, repeating the last one when exhausted
    struct Scripted {
        script: VecDeque<Result<&'static str, StubError>>,
        last: &'static str,
        calls: u32,
    }

    impl Scripted {
        fn new(script: Vec<Result<&'static str, StubError>>) -> Self {
            Self {
                script: script.into(),
                last: "PENDING",
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl Refresh for Scripted {
        type Output = u32;
        type Error = StubError;

        async fn refresh(&mut self) -> Result<Observation<u32>, StubError> {
            self.calls += 1;
            match self.script.pop_front() {
                Some(Ok(status)) => {
                    self.last = status;
                    Ok(Observation::new(self.calls, status))
                }
                Some(Err(err)) => Err(err),
                None => Ok(Observation::new(self.calls, self.last)),
            }
        }
    }

    fn conf(timeout_secs: u64) -> StateChangeConf {
        StateChangeConf::new(["PENDING"], ["ACTIVE"], Duration::from_secs(timeout_secs))
    }

    #[test]
    fn test_delay_calculation() {
        let poll = PollConfig::default();
        assert_eq!(poll.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(poll.delay_for_attempt(1), Duration::from_secs(10));
        assert_eq!(poll.delay_for_attempt(5), Duration::from_secs(10)); // capped at max

        let fast = PollConfig {
            delay: Duration::from_millis(100),
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(4),
            multiplier: 2.0,
        };
        assert_eq!(fast.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(fast.delay_for_attempt(1), Duration::from_secs(1)); // raised to min
        assert_eq!(fast.delay_for_attempt(6), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_target_after_two_sleeps() {
        let mut stub = Scripted::new(vec![Ok("PENDING"), Ok("PENDING"), Ok("ACTIVE")]);

        let settled = wait_for(&conf(60), &mut stub).await.unwrap();

        assert_eq!(settled.status, "ACTIVE");
        assert_eq!(settled.value, Some(3));
        assert_eq!(settled.sleeps, 2);
        assert_eq!(settled.refreshes, 3);
        assert_eq!(settled.elapsed, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_target_does_not_sleep() {
        let mut stub = Scripted::new(vec![Ok("ACTIVE")]);
        let settled = wait_for(&conf(60), &mut stub).await.unwrap();
        assert_eq!(settled.sleeps, 0);
        assert_eq!(settled.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_stops_refreshing() {
        let mut stub = Scripted::new(vec![]);

        let err = wait_for(&conf(30), &mut stub).await.unwrap_err();

        match err {
            WaitError::Timeout {
                last_status,
                timeout,
            } => {
                assert_eq!(last_status.as_deref(), Some("PENDING"));
                assert_eq!(timeout, Duration::from_secs(30));
            }
            other => panic!("expected timeout, got {}", other),
        }
        // refreshes at 0s, 5s, 15s and 25s; the last sleep is cut to the deadline
        assert_eq!(stub.calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_aborts() {
        let mut stub = Scripted::new(vec![Ok("PENDING"), Ok("ERROR")]);

        let err = wait_for(&conf(60), &mut stub).await.unwrap_err();

        assert!(matches!(
            err,
            WaitError::UnexpectedState { ref status, .. } if status == "ERROR"
        ));
        assert_eq!(stub.calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_aborts_immediately() {
        let mut stub = Scripted::new(vec![Err(StubError { transient: false })]);

        let err = wait_for(&conf(60), &mut stub).await.unwrap_err();

        assert!(matches!(err, WaitError::Refresh(StubError { transient: false })));
        assert_eq!(stub.calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_counts_as_pending() {
        let mut stub = Scripted::new(vec![
            Err(StubError { transient: true }),
            Ok("PENDING"),
            Ok("ACTIVE"),
        ]);

        let settled = wait_for(&conf(60), &mut stub).await.unwrap();

        assert_eq!(settled.refreshes, 3);
        assert_eq!(settled.sleeps, 2);
    }
}
