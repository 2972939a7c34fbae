use crate::indicators::frame::QuoteFrame;
use crate::indicators::params::IndicatorParams;
use crate::indicators::series;
use crate::indicators::IndicatorError;

pub struct StatisticsCalculator;

impl StatisticsCalculator {
    /// True where `source` increased versus the prior row.
    pub fn slope(frame: &mut QuoteFrame, params: &IndicatorParams) -> Result<(), IndicatorError> {
        let source = params.text("source")?;
        let src = frame.source(&source)?;
        let slope: Vec<bool> = series::diff(&src).iter().map(|v| *v > 0.0).collect();
        frame.set_bool_column("slope", slope);
        Ok(())
    }

    /// True where `source1 > source2` on the same row. Useful as a composite
    /// on top of earlier indicator outputs (e.g. a fast SMA above a slow one).
    pub fn larger(frame: &mut QuoteFrame, params: &IndicatorParams) -> Result<(), IndicatorError> {
        let source1 = params.text("source1")?;
        let source2 = params.text("source2")?;
        let a = frame.source(&source1)?;
        let b = frame.source(&source2)?;
        let larger: Vec<bool> = a.iter().zip(&b).map(|(a, b)| a > b).collect();
        frame.set_bool_column("larger", larger);
        Ok(())
    }

    /// Rolling sum of log-returns of `source` over the last `interval` rows.
    pub fn cumulative_return(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let interval = params.integer("interval")?;
        let source = params.text_or("source", "close")?;
        let src = frame.source(&source)?;
        let mut log_returns = vec![f64::NAN; src.len()];
        for i in 1..src.len() {
            log_returns[i] = (src[i] / src[i - 1]).ln();
        }
        let cumulative = series::rolling_sum(&log_returns, interval);
        frame.set_float_column("cumulative_return", cumulative);
        Ok(())
    }
}
