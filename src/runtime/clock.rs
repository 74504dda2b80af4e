use embassy_time::{Duration, Instant, Ticker};

/// Countdown time base. `start` arms a periodic tick; dropping a pending
/// `next_tick` future cancels the wait.
#[allow(async_fn_in_trait)]
pub trait CountdownClock {
    fn now_ms(&self) -> u64;

    fn start(&mut self, period_ms: u64);

    async fn next_tick(&mut self);
}

#[derive(Default)]
pub struct EmbassyClock {
    ticker: Option<Ticker>,
}

impl EmbassyClock {
    pub const fn new() -> Self {
        Self { ticker: None }
    }
}

impl CountdownClock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    fn start(&mut self, period_ms: u64) {
        self.ticker = Some(Ticker::every(Duration::from_millis(period_ms)));
    }

    async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => ticker.next().await,
            None => core::future::pending().await,
        }
    }
}
