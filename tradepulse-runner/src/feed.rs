//! Price sources for the live loop.
//!
//! A venue adapter only has to hand out quotes one at a time; aggregation,
//! signals and sizing are shared across every venue.

use std::collections::VecDeque;
use thiserror::Error;
use tradepulse_core::domain::Quote;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    /// Worth retrying after a backoff (timeouts, rate limits, dropped streams).
    #[error("transient feed failure: {0}")]
    Transient(String),

    /// The source cannot recover (bad credentials, unknown instrument).
    #[error("fatal feed failure: {0}")]
    Fatal(String),
}

impl FeedError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Transient(_))
    }
}

/// Capability to pull the next quote for one instrument.
pub trait PriceSource {
    /// `Ok(None)` means the source is exhausted and the loop should stop.
    fn next_quote(&mut self) -> Result<Option<Quote>, FeedError>;
}

impl<S: PriceSource + ?Sized> PriceSource for Box<S> {
    fn next_quote(&mut self) -> Result<Option<Quote>, FeedError> {
        (**self).next_quote()
    }
}

/// Replays a fixed sequence of quotes, e.g. a recorded tick file.
#[derive(Debug, Clone, Default)]
pub struct ReplayFeed {
    quotes: VecDeque<Result<Quote, FeedError>>,
}

impl ReplayFeed {
    pub fn new(quotes: impl IntoIterator<Item = Quote>) -> Self {
        Self {
            quotes: quotes.into_iter().map(Ok).collect(),
        }
    }

    /// Interleave scripted failures with quotes.
    pub fn scripted(events: impl IntoIterator<Item = Result<Quote, FeedError>>) -> Self {
        Self {
            quotes: events.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.quotes.len()
    }
}

impl PriceSource for ReplayFeed {
    fn next_quote(&mut self) -> Result<Option<Quote>, FeedError> {
        self.quotes.pop_front().transpose()
    }
}
