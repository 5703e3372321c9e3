//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::bar::IndicatorBar;
use crate::domain::error::TrendangleError;

/// Port for writing backtest reports into a directory.
pub trait ReportPort {
    /// Write this adapter's report files under `output_dir` and return the
    /// paths written. `bars` is the stream the result was simulated on.
    fn write(
        &self,
        result: &BacktestResult,
        bars: &[IndicatorBar],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, TrendangleError>;
}
