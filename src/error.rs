use thiserror::Error;

/// Errors raised by the stop-order pipeline
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Insertion rejected; the book keeps the original order untouched
    #[error("duplicate stop order id {0}")]
    DuplicateOrderId(u64),

    /// Cancel targeted an id that is not pending in the book
    #[error("stop order {0} is not pending")]
    OrderNotPending(u64),

    /// A triggered batch contained an order the category comparators
    /// cannot order deterministically. The whole batch is aborted before
    /// any order is applied.
    #[error("invalid stop order batch: {0}")]
    Configuration(String),

    /// The venue rejected or failed a submission mid-batch
    #[error("order submission failed: {0}")]
    Submission(String),
}

/// Errors raised by the day-partitioned bar store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed a query. Fatal
    /// for the loader call that hit it; whether to retry is the caller's
    /// decision.
    #[error("bar store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}
