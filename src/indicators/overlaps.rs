use crate::indicators::frame::{Cell, ColumnKind, QuoteFrame};
use crate::indicators::params::IndicatorParams;
use crate::indicators::series;
use crate::indicators::IndicatorError;
use chrono::NaiveDate;

pub struct OverlapCalculator;

/// Walk a trend-flag series from the most recent row backwards and return the
/// date of the most recent flip, i.e. the newer neighbor of the first row
/// whose flag differs from the latest one.
pub(crate) fn last_flip_date(dates: &[NaiveDate], flags: &[bool]) -> Option<NaiveDate> {
    let last = flags.len().checked_sub(1)?;
    let search = flags[last];
    let mut before = last;
    for i in (0..last).rev() {
        if flags[i] != search {
            return Some(dates[before]);
        }
        before = i;
    }
    None
}

impl OverlapCalculator {
    /// Simple Moving Average over `period` elements of `source`, plus a
    /// `rising` flag from the percent change of the average. Series no longer
    /// than the period produce all-null columns.
    pub fn simple_moving_average(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let period = params.integer("period")?;
        let source = params.text_or("source", "adjusted_close")?;
        if frame.len() > period {
            let src = frame.source(&source)?;
            let sma = series::rolling_mean(&src, period);
            let rising: Vec<bool> = series::pct_change(&sma).iter().map(|v| *v > 0.0).collect();
            frame.set_float_column("sma", sma);
            frame.set_bool_column("rising", rising);
        } else {
            frame.set_null_column("sma", ColumnKind::Float);
            frame.set_null_column("rising", ColumnKind::Bool);
        }
        Ok(())
    }

    /// Exponential Moving Average with span = `period` (no bias adjustment),
    /// same `rising` flag definition as the SMA.
    pub fn exponential_moving_average(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let period = params.integer("period")?;
        let source = params.text_or("source", "adjusted_close")?;
        if frame.len() > period {
            let src = frame.source(&source)?;
            let ema = series::ewm_span(&src, period as f64);
            let rising: Vec<bool> = series::pct_change(&ema).iter().map(|v| *v > 0.0).collect();
            frame.set_float_column("ema", ema);
            frame.set_bool_column("rising", rising);
        } else {
            frame.set_null_column("ema", ColumnKind::Float);
            frame.set_null_column("rising", ColumnKind::Bool);
        }
        Ok(())
    }

    /// Parabolic Stop And Reverse. Seeds bullish with SAR = first low and
    /// EP = first high; each day advances SAR toward the extreme point by the
    /// acceleration factor, flips trend when price crosses the SAR (resetting
    /// SAR to the prior EP, EP to the prior low/high and AF to the initial
    /// step), and otherwise ratchets EP/AF on new extremes up to `max`.
    /// The most recent flip date lands on the last row only.
    pub fn parabolic_sar(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let step = params.float_or("af", 0.02)?;
        let max_step = params.float_or("max", 0.2)?;
        if frame.is_empty() {
            return Err(IndicatorError::EmptyFrame);
        }

        let n = frame.len();
        let mut sar = vec![0.0; n];
        let mut bull = vec![true; n];
        let mut af = vec![step; n];
        let mut ep = vec![0.0; n];
        sar[0] = frame.low[0];
        ep[0] = frame.high[0];

        for a in 1..n {
            let high = frame.high[a];
            let low = frame.low[a];
            if bull[a - 1] {
                sar[a] = sar[a - 1] + af[a - 1] * (ep[a - 1] - sar[a - 1]);
                bull[a] = true;
                if low < sar[a - 1] || low < sar[a] {
                    bull[a] = false;
                    sar[a] = ep[a - 1];
                    ep[a] = frame.low[a - 1];
                    af[a] = step;
                } else if high > ep[a - 1] {
                    ep[a] = high;
                    af[a] = if af[a - 1] <= max_step - step {
                        af[a - 1] + step
                    } else {
                        af[a - 1]
                    };
                } else {
                    af[a] = af[a - 1];
                    ep[a] = ep[a - 1];
                }
            } else {
                sar[a] = sar[a - 1] - af[a - 1] * (sar[a - 1] - ep[a - 1]);
                bull[a] = false;
                if high > sar[a - 1] || high > sar[a] {
                    bull[a] = true;
                    sar[a] = ep[a - 1];
                    ep[a] = frame.high[a - 1];
                    af[a] = step;
                } else if low < ep[a - 1] {
                    ep[a] = low;
                    af[a] = if af[a - 1] < max_step {
                        af[a - 1] + step
                    } else {
                        af[a - 1]
                    };
                } else {
                    af[a] = af[a - 1];
                    ep[a] = ep[a - 1];
                }
            }
        }

        let change_date = last_flip_date(&frame.dates, &bull);
        let mut date_cells = vec![None; n];
        if let Some(date) = change_date {
            date_cells[n - 1] = Some(Cell::Date(date));
        }
        frame.set_float_column("psar", sar);
        frame.set_bool_column("psar_bull", bull);
        frame.set_cells("psar_change_date", ColumnKind::Date, date_cells);
        Ok(())
    }
}
