//! Polling cadence.
use std::time::Duration;

use futures::Stream;
use pin_project_lite::pin_project;

pin_project! {
    /// Endless stream of `()` spaced `period` apart.
    ///
    /// The delay is re-armed when a tick is delivered, so a consumer that
    /// stalls pushes later ticks back instead of receiving a burst.
    pub struct Ticker {
        #[pin]
        delay: futures_timer::Delay,
        period: Duration,
        primed: bool,
    }
}

impl Ticker {
    /// First tick after one `period`.
    pub fn new(period: Duration) -> Self {
        Self {
            delay: futures_timer::Delay::new(period),
            period,
            primed: false,
        }
    }

    /// First tick right away, then every `period`.
    pub fn immediate(period: Duration) -> Self {
        Self {
            primed: true,
            ..Self::new(period)
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Stream for Ticker {
    type Item = ();

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let mut this = self.project();
        if std::mem::take(this.primed) {
            this.delay.reset(*this.period);
            return std::task::Poll::Ready(Some(()));
        }
        let tick = this.delay.as_mut().poll(cx);
        if tick.is_ready() {
            this.delay.reset(*this.period);
        }
        tick.map(Some)
    }
}
