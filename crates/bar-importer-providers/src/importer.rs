use bar_importer_core::bar::Bar;
use bar_importer_core::cancel::CancellationToken;
use bar_importer_core::period::{Period, PeriodMap};
use bar_importer_core::range::RangeNormalizer;
use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::ImportError;
use crate::provider::SeriesFetcher;

/// Parameters of a single import. Bounds are wall-clock times in the
/// caller's zone; missing bounds mean "as far as the provider goes".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub symbol: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub period: Period,
}

impl ImportRequest {
    /// Daily bars over the full supported range.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            start: None,
            end: None,
            period: Period::default(),
        }
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }
}

/// Fetches bars through a [`SeriesFetcher`] and returns them normalized:
/// range clamped to what the provider accepts, shifted into the provider's
/// zone, and output sorted by timestamp.
pub struct SeriesImporter<F: SeriesFetcher> {
    fetcher: F,
    normalizer: RangeNormalizer,
    periods: PeriodMap<F::Period>,
}

impl<F: SeriesFetcher> SeriesImporter<F> {
    /// Use the fetcher's own period table.
    pub fn new(fetcher: F, normalizer: RangeNormalizer) -> Self {
        let periods = fetcher.period_map();
        Self::with_period_map(fetcher, normalizer, periods)
    }

    pub fn with_period_map(
        fetcher: F,
        normalizer: RangeNormalizer,
        periods: PeriodMap<F::Period>,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            periods,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn normalizer(&self) -> &RangeNormalizer {
        &self.normalizer
    }

    /// Import bars for `request`.
    ///
    /// Fails with [`ImportError::InvalidArgument`] before any network call if
    /// the period is not daily, weekly or monthly. Fetcher errors, including
    /// cancellation via `cancel`, are returned unchanged.
    pub async fn import(
        &self,
        request: &ImportRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Bar>, ImportError> {
        // The table only has interday entries
        let provider_period = self
            .periods
            .lookup(request.period)
            .ok_or_else(|| {
                ImportError::InvalidArgument("only daily, weekly & monthly data supported".into())
            })?;

        let range = self.normalizer.normalize(request.start, request.end);
        debug!(
            "{}: requesting {} bars ({provider_period:?}) from {}: {} to {}",
            request.symbol,
            request.period,
            self.fetcher.name(),
            range.start,
            range.end
        );

        let raw = self
            .fetcher
            .fetch_series(&request.symbol, range.start, range.end, provider_period, cancel)
            .await?;

        let mut bars: Vec<Bar> = raw.into_iter().map(Bar::from).collect();
        bars.sort_by_key(|b| b.timestamp);

        info!("{}: imported {} bar(s)", request.symbol, bars.len());
        Ok(bars)
    }
}
