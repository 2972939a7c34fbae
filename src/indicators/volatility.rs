use crate::indicators::frame::{ColumnKind, QuoteFrame};
use crate::indicators::params::IndicatorParams;
use crate::indicators::series;
use crate::indicators::IndicatorError;

pub struct VolatilityCalculator;

impl VolatilityCalculator {
    /// Bollinger Bands around the rolling mean of `source`, using the
    /// population standard deviation. `bb_pc` is the symmetric %B form
    /// `(source - mean) / std`, which exceeds +-1 in extremes, and
    /// `bb_expanding` flags a growing standard deviation.
    pub fn bollinger_bands(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let period = params.integer_or("period", 20)?;
        let multiplier = params.float_or("std", 2.0)?;
        let source = params.text_or("source", "adjusted_close")?;
        if frame.len() > period {
            let src = frame.source(&source)?;
            let std = series::rolling_std(&src, period);
            let sma = series::rolling_mean(&src, period);
            let upper: Vec<f64> = sma
                .iter()
                .zip(&std)
                .map(|(mean, std)| mean + multiplier * std)
                .collect();
            let lower: Vec<f64> = sma
                .iter()
                .zip(&std)
                .map(|(mean, std)| mean - multiplier * std)
                .collect();
            let pc: Vec<f64> = src
                .iter()
                .zip(sma.iter().zip(&std))
                .map(|(value, (mean, std))| (value - mean) / std)
                .collect();
            let expanding: Vec<bool> = series::pct_change(&std).iter().map(|v| *v > 0.0).collect();
            frame.set_float_column("sma", sma);
            frame.set_float_column("bb_upper", upper);
            frame.set_float_column("bb_lower", lower);
            frame.set_float_column("bb_pc", pc);
            frame.set_bool_column("bb_expanding", expanding);
        } else {
            frame.set_null_column("sma", ColumnKind::Float);
            frame.set_null_column("bb_upper", ColumnKind::Float);
            frame.set_null_column("bb_lower", ColumnKind::Float);
            frame.set_null_column("bb_pc", ColumnKind::Float);
            frame.set_null_column("bb_expanding", ColumnKind::Bool);
        }
        Ok(())
    }

    /// Rolling high/low of the last `interval` rows plus the percentage
    /// distance of the close from each extreme.
    pub fn high_low_window(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let interval = params.integer("interval")?;
        let source_high = params.text_or("sourceHigh", "high")?;
        let source_low = params.text_or("sourceLow", "low")?;
        let source_pc = params.text_or("sourcePercentage", "close")?;

        let highs = frame.source(&source_high)?;
        let lows = frame.source(&source_low)?;
        let reference = frame.source(&source_pc)?;

        let window_high = series::rolling_max(&highs, interval);
        let window_low = series::rolling_min(&lows, interval);
        let high_pc: Vec<f64> = reference
            .iter()
            .zip(&window_high)
            .map(|(value, high)| (value / high - 1.0) * 100.0)
            .collect();
        let low_pc: Vec<f64> = reference
            .iter()
            .zip(&window_low)
            .map(|(value, low)| (value / low - 1.0) * 100.0)
            .collect();

        frame.set_float_column("window_high", window_high);
        frame.set_float_column("window_high_pc", high_pc);
        frame.set_float_column("window_low", window_low);
        frame.set_float_column("window_low_pc", low_pc);
        Ok(())
    }
}
