//! Data access port trait.

use crate::domain::bar::IndicatorBar;
use crate::domain::error::TrendangleError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::{NaiveDate, NaiveDateTime};

/// Source of historical bars. Date bounds are inclusive; `None` leaves that
/// side of the range open.
pub trait DataPort {
    /// Raw bars in ascending timestamp order.
    fn fetch_ohlcv(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TrendangleError>;

    /// Precomputed indicator bars in file order. Not sorted or repaired;
    /// ordering problems surface when the stream is validated.
    fn fetch_indicator_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<IndicatorBar>, TrendangleError>;

    /// First and last timestamp plus row count, or `None` for an empty source.
    fn get_data_range(
        &self,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TrendangleError>;
}
