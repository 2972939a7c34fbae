use crate::indicators::frame::{ColumnKind, QuoteFrame};
use crate::indicators::oscillators::OscillatorCalculator;
use crate::indicators::overlaps::OverlapCalculator;
use crate::indicators::params::IndicatorParams;
use crate::indicators::statistics::StatisticsCalculator;
use crate::indicators::volatility::VolatilityCalculator;
use crate::indicators::IndicatorError;
use std::collections::HashMap;

pub type ApplyFn = fn(&mut QuoteFrame, &IndicatorParams) -> Result<(), IndicatorError>;

/// A registered indicator: its configuration name, the output columns it
/// declares (added as nulls when the function fails, so downstream merge and
/// rename logic never special-cases absence), and the function itself.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorFunction {
    pub name: &'static str,
    pub columns: &'static [(&'static str, ColumnKind)],
    pub apply: ApplyFn,
}

const SIMPLE_MOVING_AVERAGE: IndicatorFunction = IndicatorFunction {
    name: "SimpleMovingAverage",
    columns: &[("sma", ColumnKind::Float), ("rising", ColumnKind::Bool)],
    apply: OverlapCalculator::simple_moving_average,
};

const EXPONENTIAL_MOVING_AVERAGE: IndicatorFunction = IndicatorFunction {
    name: "ExponentialMovingAverage",
    columns: &[("ema", ColumnKind::Float), ("rising", ColumnKind::Bool)],
    apply: OverlapCalculator::exponential_moving_average,
};

const BOLLINGER_BANDS: IndicatorFunction = IndicatorFunction {
    name: "BollingerBands",
    columns: &[
        ("sma", ColumnKind::Float),
        ("bb_upper", ColumnKind::Float),
        ("bb_lower", ColumnKind::Float),
        ("bb_pc", ColumnKind::Float),
        ("bb_expanding", ColumnKind::Bool),
    ],
    apply: VolatilityCalculator::bollinger_bands,
};

const RSI: IndicatorFunction = IndicatorFunction {
    name: "RSI",
    columns: &[("rsi", ColumnKind::Float)],
    apply: OscillatorCalculator::relative_strength_index,
};

const ADXDMI: IndicatorFunction = IndicatorFunction {
    name: "ADXDMI",
    columns: &[
        ("dmi_p", ColumnKind::Float),
        ("dmi_m", ColumnKind::Float),
        ("dmi_bull", ColumnKind::Bool),
        ("adx", ColumnKind::Float),
        ("adx_crossing_date", ColumnKind::Date),
        ("dmi_crossing_date", ColumnKind::Date),
    ],
    apply: OscillatorCalculator::average_directional_index,
};

const PSAR: IndicatorFunction = IndicatorFunction {
    name: "PSAR",
    columns: &[
        ("psar", ColumnKind::Float),
        ("psar_bull", ColumnKind::Bool),
        ("psar_change_date", ColumnKind::Date),
    ],
    apply: OverlapCalculator::parabolic_sar,
};

const SLOPE: IndicatorFunction = IndicatorFunction {
    name: "Slope",
    columns: &[("slope", ColumnKind::Bool)],
    apply: StatisticsCalculator::slope,
};

const LARGER: IndicatorFunction = IndicatorFunction {
    name: "Larger",
    columns: &[("larger", ColumnKind::Bool)],
    apply: StatisticsCalculator::larger,
};

const HIGH_LOW: IndicatorFunction = IndicatorFunction {
    name: "HighLow",
    columns: &[
        ("window_high", ColumnKind::Float),
        ("window_high_pc", ColumnKind::Float),
        ("window_low", ColumnKind::Float),
        ("window_low_pc", ColumnKind::Float),
    ],
    apply: VolatilityCalculator::high_low_window,
};

const CUMULATIVE_RETURN: IndicatorFunction = IndicatorFunction {
    name: "CumulativeReturn",
    columns: &[("cumulative_return", ColumnKind::Float)],
    apply: StatisticsCalculator::cumulative_return,
};

/// Explicit name-to-function table, populated once at startup. Configuration
/// entries resolve against it at load time, so an unknown indicator name is a
/// startup error instead of a per-job surprise.
pub struct IndicatorRegistry {
    functions: HashMap<&'static str, IndicatorFunction>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register(SIMPLE_MOVING_AVERAGE);
        registry.register(EXPONENTIAL_MOVING_AVERAGE);
        registry.register(BOLLINGER_BANDS);
        registry.register(RSI);
        registry.register(ADXDMI);
        registry.register(PSAR);
        registry.register(SLOPE);
        registry.register(LARGER);
        registry.register(HIGH_LOW);
        registry.register(CUMULATIVE_RETURN);
        registry
    }

    fn register(&mut self, function: IndicatorFunction) {
        self.functions.insert(function.name, function);
    }

    pub fn get(&self, name: &str) -> Option<IndicatorFunction> {
        self.functions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
