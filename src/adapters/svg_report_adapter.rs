//! SVG chart report adapter: equity curve, drawdown curve, and price with
//! both EMAs and trade entry markers.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::domain::backtest::BacktestResult;
use crate::domain::bar::IndicatorBar;
use crate::domain::error::TrendangleError;
use crate::domain::ledger::{EquityPoint, Trade};
use crate::domain::signal::Direction;
use crate::ports::report_port::ReportPort;

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 300.0;
const PRICE_CHART_WIDTH: f64 = 1200.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;
/// Price series longer than this are thinned by striding.
const MAX_PRICE_POINTS: usize = 2000;
const MARKER_SIZE: f64 = 5.0;

/// Plot area and value scale shared by all charts.
struct Frame {
    width: f64,
    count: usize,
    min: f64,
    range: f64,
}

impl Frame {
    fn new(width: f64, count: usize, min: f64, max: f64) -> Self {
        let range = if max - min > 0.0 { max - min } else { 1.0 };
        Frame {
            width,
            count,
            min,
            range,
        }
    }

    fn plot_width(&self) -> f64 {
        self.width - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height(&self) -> f64 {
        CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn x(&self, i: usize) -> f64 {
        MARGIN_LEFT + (i as f64 / (self.count.saturating_sub(1)).max(1) as f64) * self.plot_width()
    }

    fn y(&self, v: f64) -> f64 {
        MARGIN_TOP + self.plot_height() - ((v - self.min) / self.range) * self.plot_height()
    }

    fn path<I>(&self, points: I) -> String
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut data = String::new();
        for (i, v) in points {
            let cmd = if data.is_empty() { "M" } else { " L" };
            data.push_str(&format!("{} {:.1} {:.1}", cmd, self.x(i), self.y(v)));
        }
        data
    }

    /// Opening tag, background, title, axes, y labels (top/mid/bottom) and
    /// x labels (start/mid/end).
    fn open(&self, title: &str, y_labels: [String; 3], x_labels: [String; 3]) -> String {
        let bottom = CHART_HEIGHT - MARGIN_BOTTOM;
        let right = self.width - MARGIN_RIGHT;
        let mut svg = String::new();
        svg.push_str(&format!(
            r##"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">"##,
            w = self.width,
            h = CHART_HEIGHT
        ));
        svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"15\" text-anchor=\"end\" font-size=\"12\" fill=\"#666\">{}</text>\n",
            right, title
        ));
        svg.push_str(&format!(
            "  <line x1=\"{l}\" y1=\"{t}\" x2=\"{l}\" y2=\"{b}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
            l = MARGIN_LEFT,
            t = MARGIN_TOP,
            b = bottom
        ));
        svg.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{b}\" x2=\"{}\" y2=\"{b}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
            MARGIN_LEFT,
            right,
            b = bottom
        ));
        let y_positions = [
            MARGIN_TOP + 5.0,
            MARGIN_TOP + self.plot_height() / 2.0,
            bottom - 5.0,
        ];
        for (label, y) in y_labels.iter().zip(y_positions) {
            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
                MARGIN_LEFT - 5.0,
                y,
                label
            ));
        }
        let x_positions = [MARGIN_LEFT, MARGIN_LEFT + self.plot_width() / 2.0, right];
        for (label, x) in x_labels.iter().zip(x_positions) {
            svg.push_str(&format!(
                "  <text x=\"{:.1}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\" fill=\"#666\">{}</text>\n",
                x, CHART_HEIGHT, label
            ));
        }
        svg
    }
}

fn fmt_money(v: f64) -> String {
    format!("{:.0}", v)
}

fn fmt_date(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn date_labels(times: &[NaiveDateTime]) -> [String; 3] {
    match (times.first(), times.last()) {
        (Some(&first), Some(&last)) => [
            fmt_date(first),
            fmt_date(times[times.len() / 2]),
            fmt_date(last),
        ],
        _ => Default::default(),
    }
}

fn min_max<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Balance after each trade. Empty string when there are no trades.
pub fn generate_equity_svg(curve: &[EquityPoint]) -> String {
    if curve.is_empty() {
        return String::new();
    }

    let (min, max) = min_max(curve.iter().map(|p| p.balance));
    let frame = Frame::new(CHART_WIDTH, curve.len(), min, max);
    let times: Vec<NaiveDateTime> = curve.iter().map(|p| p.exit_time).collect();

    let mut svg = frame.open(
        "Equity",
        [fmt_money(max), fmt_money((max + min) / 2.0), fmt_money(min)],
        date_labels(&times),
    );
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"#2563eb\" stroke-width=\"2\"/>\n",
        frame.path(curve.iter().enumerate().map(|(i, p)| (i, p.balance)))
    ));
    svg.push_str("</svg>");
    svg
}

/// Currency drawdown from the running peak, filled down from zero.
pub fn generate_drawdown_svg(curve: &[EquityPoint]) -> String {
    if curve.is_empty() {
        return String::new();
    }

    let (deepest, _) = min_max(curve.iter().map(|p| p.drawdown));
    let frame = Frame::new(CHART_WIDTH, curve.len(), deepest.min(0.0), 0.0);
    let times: Vec<NaiveDateTime> = curve.iter().map(|p| p.exit_time).collect();

    let mut path = frame.path(
        std::iter::once((0, 0.0)).chain(curve.iter().enumerate().map(|(i, p)| (i, p.drawdown))),
    );
    path.push_str(&format!(
        " L {:.1} {:.1} Z",
        frame.x(curve.len() - 1),
        frame.y(0.0)
    ));

    let mut svg = frame.open(
        "Drawdown",
        ["0".to_string(), fmt_money(deepest / 2.0), fmt_money(deepest)],
        date_labels(&times),
    );
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"rgba(239,68,68,0.3)\" stroke=\"#dc2626\" stroke-width=\"1\"/>\n",
        path
    ));
    svg.push_str("</svg>");
    svg
}

fn entry_marker(frame: &Frame, trade: &Trade) -> String {
    let x = frame.x(trade.entry_index);
    let y = frame.y(trade.entry_price);
    let (tip, base, colour) = match trade.direction {
        Direction::Long => (y - MARKER_SIZE, y + MARKER_SIZE, "#16a34a"),
        Direction::Short => (y + MARKER_SIZE, y - MARKER_SIZE, "#dc2626"),
    };
    format!(
        "  <path d=\"M {:.1} {:.1} L {:.1} {:.1} L {:.1} {:.1} Z\" fill=\"{}\"/>\n",
        x,
        tip,
        x - MARKER_SIZE,
        base,
        x + MARKER_SIZE,
        base,
        colour
    )
}

/// Close price with fast and slow EMAs, plus an up triangle at each long
/// entry and a down triangle at each short entry.
pub fn generate_price_svg(bars: &[IndicatorBar], trades: &[Trade]) -> String {
    if bars.is_empty() {
        return String::new();
    }

    let (min, max) = min_max(
        bars.iter()
            .flat_map(|b| [b.close, b.fast_trend, b.slow_trend]),
    );
    let frame = Frame::new(PRICE_CHART_WIDTH, bars.len(), min, max);
    let stride = bars.len().div_ceil(MAX_PRICE_POINTS);
    let sampled = || bars.iter().enumerate().step_by(stride);
    let times: Vec<NaiveDateTime> = bars.iter().map(|b| b.timestamp).collect();

    let mut svg = frame.open(
        "Price",
        [
            format!("{:.2}", max),
            format!("{:.2}", (max + min) / 2.0),
            format!("{:.2}", min),
        ],
        date_labels(&times),
    );
    let series: [(&str, fn(&IndicatorBar) -> f64, &str); 3] = [
        ("close", |b| b.close, "#374151"),
        ("fast", |b| b.fast_trend, "#f59e0b"),
        ("slow", |b| b.slow_trend, "#7c3aed"),
    ];
    for (name, value, colour) in series {
        svg.push_str(&format!(
            "  <path class=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>\n",
            name,
            frame.path(sampled().map(|(i, b)| (i, value(b)))),
            colour
        ));
    }
    for trade in trades.iter().filter(|t| t.entry_index < bars.len()) {
        svg.push_str(&entry_marker(&frame, trade));
    }
    svg.push_str("</svg>");
    svg
}

pub struct SvgReportAdapter;

impl ReportPort for SvgReportAdapter {
    /// Charts with nothing to plot are skipped.
    fn write(
        &self,
        result: &BacktestResult,
        bars: &[IndicatorBar],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, TrendangleError> {
        let curve = result.ledger.equity_curve();
        let charts = [
            ("equity.svg", generate_equity_svg(&curve)),
            ("drawdown.svg", generate_drawdown_svg(&curve)),
            ("price.svg", generate_price_svg(bars, result.ledger.trades())),
        ];

        let mut written = Vec::new();
        for (name, svg) in charts {
            if svg.is_empty() {
                continue;
            }
            let path = output_dir.join(name);
            fs::write(&path, svg)?;
            written.push(path);
        }
        Ok(written)
    }
}
