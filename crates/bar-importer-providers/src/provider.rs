use async_trait::async_trait;
use bar_importer_core::bar::Bar;
use bar_importer_core::cancel::CancellationToken;
use bar_importer_core::period::PeriodMap;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::error::ProviderError;

/// A bar exactly as a provider reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub adjusted_close: Option<Decimal>,
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        Bar {
            timestamp: raw.timestamp,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        }
    }
}

/// Remote source of historical bars.
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    /// The provider's own period vocabulary.
    type Period: Copy + std::fmt::Debug + Send + Sync;

    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Translation table from the public period type into [`Self::Period`].
    fn period_map(&self) -> PeriodMap<Self::Period>;

    /// Fetch bars for `symbol` between `start` and `end` in one round trip.
    /// Order of the returned bars is unspecified.
    ///
    /// Implementations must stop waiting and return
    /// [`ProviderError::Cancelled`] once `cancel` fires.
    async fn fetch_series(
        &self,
        symbol: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        period: Self::Period,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawBar>, ProviderError>;
}
