use chrono::{Duration, NaiveDate, Utc};

use crate::db::BarSource;
use crate::error::StoreError;
use crate::models::{Bar, BarWindow};

/// Consecutive empty days tolerated before the backward scan gives up
const MAX_NO_DATA_DAYS: u32 = 30;

/// Assembles bounded historical windows from the day-partitioned store.
///
/// The loader only reads. It runs off the tick-processing path, and a
/// cancelled load (its task aborted between day fetches) leaves the
/// store untouched and simply discards the partial accumulation.
pub struct BarLoader<S: BarSource> {
    store: S,
    anchor: Option<NaiveDate>,
}

impl<S: BarSource> BarLoader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            anchor: None,
        }
    }

    /// Override the scan anchor date ("today" by default)
    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Load the most recent finest bars covering `requested_count`
    /// reporting periods of `period_multiple` bars each.
    ///
    /// Scans backward from the anchor one calendar day at a time,
    /// stitching each day's bars (sorted ascending) onto the front of
    /// the accumulation, until the required total is reached or more
    /// than `MAX_NO_DATA_DAYS` consecutive days come back empty. The
    /// required total is `requested_count * period_multiple + total %
    /// period_multiple`, so the returned tail starts on a period
    /// boundary of the symbol's full series and later aggregation never
    /// yields a short leading bar.
    ///
    /// Short history (including a symbol the store has never seen) is
    /// not an error: the result is simply shorter than requested,
    /// possibly empty. Only store failures are fatal.
    pub async fn load(
        &self,
        symbol: &str,
        requested_count: usize,
        period_multiple: usize,
    ) -> Result<Vec<Bar>, StoreError> {
        Ok(self
            .load_inner(symbol, requested_count, period_multiple)
            .await?
            .0)
    }

    /// Load and wrap into a `BarWindow`, used once at strategy
    /// initialization
    pub async fn get_historical_window(
        &self,
        symbol: &str,
        requested_count: usize,
        period_multiple: usize,
    ) -> Result<BarWindow, StoreError> {
        let (bars, required) = self
            .load_inner(symbol, requested_count, period_multiple)
            .await?;
        Ok(BarWindow::new(enforce_ascending(symbol, bars), required))
    }

    async fn load_inner(
        &self,
        symbol: &str,
        requested_count: usize,
        period_multiple: usize,
    ) -> Result<(Vec<Bar>, usize), StoreError> {
        let period_multiple = period_multiple.max(1);

        let total = self.store.count_bars(symbol).await?;
        let remainder = (total % period_multiple as u64) as usize;
        let required = requested_count * period_multiple + remainder;

        if required == 0 {
            return Ok((Vec::new(), 0));
        }

        let anchor = self.anchor.unwrap_or_else(|| Utc::now().date_naive());

        let mut day = anchor;
        let mut no_data_days = 0u32;
        let mut segments: Vec<Vec<Bar>> = Vec::new();
        let mut loaded = 0usize;

        while no_data_days <= MAX_NO_DATA_DAYS {
            let mut bars = self.store.query_bars_by_day(symbol, day).await?;

            if bars.is_empty() {
                no_data_days += 1;
            } else {
                no_data_days = 0;
                bars.sort_by_key(|bar| bar.timestamp);
                loaded += bars.len();
                segments.push(bars);

                if loaded >= required {
                    break;
                }
            }

            day = day - Duration::days(1);
        }

        if loaded < required {
            // Recoverable: a month without data ends the scan and the
            // caller gets whatever history exists
            tracing::warn!(
                symbol,
                loaded,
                required,
                "bar history scan stopped after {} consecutive empty days",
                MAX_NO_DATA_DAYS
            );
        }

        // Days were collected newest-first; flatten oldest-first and
        // keep only the required tail
        segments.reverse();
        let mut bars: Vec<Bar> = segments.into_iter().flatten().collect();
        if bars.len() > required {
            bars.drain(..bars.len() - required);
        }

        tracing::info!(symbol, count = bars.len(), required, "loaded historical bars");

        Ok((bars, required))
    }
}

/// Drop any bar that does not advance the timestamp, keeping the window
/// strictly ascending with no duplicates. A violation means the store
/// holds conflicting rows for the symbol and is worth a warning.
fn enforce_ascending(symbol: &str, bars: Vec<Bar>) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());

    for bar in bars {
        match out.last() {
            Some(last) if bar.timestamp <= last.timestamp => {
                tracing::warn!(
                    symbol,
                    timestamp = %bar.timestamp,
                    "dropped out-of-order bar from history window"
                );
            }
            _ => out.push(bar),
        }
    }

    out
}
