use crate::indicators::frame::QuoteFrame;
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Calculation timeframe for a configured indicator. The index doubles as the
/// position of the matching frame in the pipeline's frame set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_lowercase().as_str() {
            "d" | "day" | "daily" => Some(Timeframe::Daily),
            "w" | "week" | "weekly" => Some(Timeframe::Weekly),
            "m" | "month" | "monthly" => Some(Timeframe::Monthly),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Timeframe::Daily => 0,
            Timeframe::Weekly => 1,
            Timeframe::Monthly => 2,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Daily => write!(f, "daily"),
            Timeframe::Weekly => write!(f, "weekly"),
            Timeframe::Monthly => write!(f, "monthly"),
        }
    }
}

fn bucket_key(date: NaiveDate, timeframe: Timeframe) -> (i32, u32) {
    match timeframe {
        Timeframe::Weekly => {
            let week = date.iso_week();
            (week.year(), week.week())
        }
        Timeframe::Daily | Timeframe::Monthly => (date.year(), date.month()),
    }
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().fold(f64::NEG_INFINITY, |acc, v| acc.max(*v))
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().fold(f64::INFINITY, |acc, v| acc.min(*v))
}

/// Aggregate a daily frame into weekly (ISO week) or monthly (calendar month)
/// candles: open = first, high = max, low = min, close = last, volume = sum,
/// split-adjusted fields analogously, adjusted_close = last. Each bucket keeps
/// the last trading date it contains, and the result is positionally
/// re-indexed. The daily timeframe resamples to a plain copy.
pub fn resample(frame: &QuoteFrame, timeframe: Timeframe) -> QuoteFrame {
    if timeframe == Timeframe::Daily {
        return frame.clone();
    }
    let mut out = QuoteFrame::default();
    let mut start = 0;
    while start < frame.len() {
        let key = bucket_key(frame.dates[start], timeframe);
        let mut end = start + 1;
        while end < frame.len() && bucket_key(frame.dates[end], timeframe) == key {
            end += 1;
        }
        out.dates.push(frame.dates[end - 1]);
        out.open.push(frame.open[start]);
        out.high.push(max_of(&frame.high[start..end]));
        out.low.push(min_of(&frame.low[start..end]));
        out.close.push(frame.close[end - 1]);
        out.split_adjusted_open.push(frame.split_adjusted_open[start]);
        out.split_adjusted_high
            .push(max_of(&frame.split_adjusted_high[start..end]));
        out.split_adjusted_low
            .push(min_of(&frame.split_adjusted_low[start..end]));
        out.split_adjusted_close
            .push(frame.split_adjusted_close[end - 1]);
        out.adjusted_close.push(frame.adjusted_close[end - 1]);
        out.volume.push(frame.volume[start..end].iter().sum());
        start = end;
    }
    out
}
