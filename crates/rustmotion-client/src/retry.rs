use rand::Rng;
use std::time::Duration;

/// Per-attempt reply deadlines for a request.
///
/// Attempt `n` waits `delays[n]`; the attempt after the last fixed delay
/// waits `final_delay` plus up to `jitter` and is the last one made, so a
/// request is transmitted at most `delays.len() + 1` times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    final_delay: Duration,
    jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: [400, 800, 1200, 1600]
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
            final_delay: Duration::from_millis(2000),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, final_delay: Duration, jitter: Duration) -> Self {
        Self {
            delays,
            final_delay,
            jitter,
        }
    }

    /// Retransmissions allowed after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.delays.len() as u32
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.delays.get(attempt as usize) {
            Some(delay) => *delay,
            None if self.jitter.is_zero() => self.final_delay,
            None => self.final_delay + rand::thread_rng().gen_range(Duration::ZERO..self.jitter),
        }
    }

    /// Upper bound on how long one request can wait across all attempts.
    pub fn worst_case(&self) -> Duration {
        self.delays.iter().sum::<Duration>() + self.final_delay + self.jitter
    }
}
