use crate::indicators::frame::{Cell, ColumnKind, QuoteFrame};
use crate::indicators::params::IndicatorParams;
use crate::indicators::series;
use crate::indicators::IndicatorError;
use chrono::NaiveDate;

pub struct OscillatorCalculator;

/// Wilder's running mean: seeded with the simple mean of elements 1..=period
/// (element 0 is the undefined first difference), then
/// `avg[i] = (avg[i-1] * (period - 1) + x[i]) / period`.
fn wilder_running_mean(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }
    out[period] = values[1..=period].iter().sum::<f64>() / period as f64;
    for i in period + 1..values.len() {
        out[i] = (out[i - 1] * (period - 1) as f64 + values[i]) / period as f64;
    }
    out
}

/// Backward scan shared by the ADX/DMI outputs. Starting from the most recent
/// row: record the date the dominant-direction flag last flipped, and - never
/// scanning past that flip - the most recent row where ADX moved above the
/// opposing DMI line (dated at the newer row of the pair). Returns
/// `(adx_crossing_date, dmi_crossing_date)`.
pub(crate) fn crossing_scan(
    dates: &[NaiveDate],
    bull: &[bool],
    adx: &[f64],
    dmi_p: &[f64],
    dmi_m: &[f64],
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let mut adx_date = None;
    let mut dmi_date = None;
    let Some(last) = bull.len().checked_sub(1) else {
        return (None, None);
    };
    let search = bull[last];
    let mut dmi_found = false;
    let mut adx_found = false;
    let mut before = last;
    for i in (0..last).rev() {
        if bull[i] != search && !dmi_found {
            dmi_date = Some(dates[before]);
            dmi_found = true;
            if !adx_found {
                break;
            }
        }
        if !adx_found {
            let line = if bull[i] { dmi_m } else { dmi_p };
            if adx[i] <= line[i] && adx[before] > line[before] {
                adx_date = Some(dates[before]);
                adx_found = true;
            }
        }
        if adx_found && dmi_found {
            break;
        }
        before = i;
    }
    (adx_date, dmi_date)
}

impl OscillatorCalculator {
    /// Relative Strength Index with Wilder smoothing of the average gains and
    /// losses. A zero average loss saturates the index at 100.
    pub fn relative_strength_index(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let period = params.integer_or("period", 14)?;
        let source = params.text_or("source", "close")?;
        if frame.len() > period {
            let src = frame.source(&source)?;
            let change = series::diff(&src);
            let gain: Vec<f64> = change
                .iter()
                .map(|c| if *c < 0.0 { 0.0 } else { *c })
                .collect();
            let loss: Vec<f64> = change
                .iter()
                .map(|c| if *c > 0.0 { 0.0 } else { -*c })
                .collect();
            let avg_gain = wilder_running_mean(&gain, period);
            let avg_loss = wilder_running_mean(&loss, period);
            let rsi: Vec<f64> = avg_gain
                .iter()
                .zip(&avg_loss)
                .map(|(g, l)| 100.0 - 100.0 / (1.0 + g / l))
                .collect();
            frame.set_float_column("rsi", rsi);
        } else {
            frame.set_null_column("rsi", ColumnKind::Float);
        }
        Ok(())
    }

    /// ADX/DMI: Wilder-smoothed true range and directional movement, the
    /// directional lines as a percentage of ATR, the trend-strength ADX, the
    /// dominant-direction flag, and the two backward-scan crossing dates
    /// placed on the most recent row.
    pub fn average_directional_index(
        frame: &mut QuoteFrame,
        params: &IndicatorParams,
    ) -> Result<(), IndicatorError> {
        let period = params.integer_or("period", 14)?;
        let alpha = 1.0 / period as f64;
        let n = frame.len();
        if n == 0 {
            frame.set_null_column("dmi_p", ColumnKind::Float);
            frame.set_null_column("dmi_m", ColumnKind::Float);
            frame.set_null_column("dmi_bull", ColumnKind::Bool);
            frame.set_null_column("adx", ColumnKind::Float);
            frame.set_null_column("adx_crossing_date", ColumnKind::Date);
            frame.set_null_column("dmi_crossing_date", ColumnKind::Date);
            return Ok(());
        }

        // True range: the first row has no prior close and degrades to
        // high - low.
        let mut tr = vec![0.0; n];
        tr[0] = frame.high[0] - frame.low[0];
        for i in 1..n {
            let range = frame.high[i] - frame.low[i];
            let from_high = (frame.high[i] - frame.close[i - 1]).abs();
            let from_low = (frame.low[i] - frame.close[i - 1]).abs();
            tr[i] = range.max(from_high).max(from_low);
        }
        let atr = series::ewm_alpha(&tr, alpha);

        // Raw directional movement from consecutive high/low deltas.
        let mut plus_dx = vec![0.0; n];
        let mut minus_dx = vec![0.0; n];
        for i in 1..n {
            let up = frame.high[i] - frame.high[i - 1];
            let down = frame.low[i - 1] - frame.low[i];
            if up > down && up > 0.0 {
                plus_dx[i] = up;
            }
            if down > up && down > 0.0 {
                minus_dx[i] = down;
            }
        }
        let smoothed_plus = series::ewm_alpha(&plus_dx, alpha);
        let smoothed_minus = series::ewm_alpha(&minus_dx, alpha);

        let dmi_p: Vec<f64> = smoothed_plus
            .iter()
            .zip(&atr)
            .map(|(dm, atr)| dm / atr * 100.0)
            .collect();
        let dmi_m: Vec<f64> = smoothed_minus
            .iter()
            .zip(&atr)
            .map(|(dm, atr)| dm / atr * 100.0)
            .collect();
        let dx: Vec<f64> = dmi_p
            .iter()
            .zip(&dmi_m)
            .map(|(p, m)| (p - m).abs() / (p + m) * 100.0)
            .collect();
        let adx = series::ewm_alpha(&dx, alpha);
        let bull: Vec<bool> = dmi_p.iter().zip(&dmi_m).map(|(p, m)| p > m).collect();

        let (adx_date, dmi_date) = crossing_scan(&frame.dates, &bull, &adx, &dmi_p, &dmi_m);
        let mut adx_cells = vec![None; n];
        let mut dmi_cells = vec![None; n];
        if let Some(date) = adx_date {
            adx_cells[n - 1] = Some(Cell::Date(date));
        }
        if let Some(date) = dmi_date {
            dmi_cells[n - 1] = Some(Cell::Date(date));
        }

        frame.set_float_column("dmi_p", dmi_p);
        frame.set_float_column("dmi_m", dmi_m);
        frame.set_bool_column("dmi_bull", bull);
        frame.set_float_column("adx", adx);
        frame.set_cells("adx_crossing_date", ColumnKind::Date, adx_cells);
        frame.set_cells("dmi_crossing_date", ColumnKind::Date, dmi_cells);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::params::ParamValue;
    use crate::indicators::testutil::{dates, frame_from_closes, frame_from_hlc};

    #[test]
    fn rsi_stays_within_bounds() {
        // A non-constant oscillating series longer than the period.
        let closes: Vec<f64> = (0..40)
            .map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
            .collect();
        let mut frame = frame_from_closes(&closes);
        OscillatorCalculator::relative_strength_index(&mut frame, &IndicatorParams::new())
            .unwrap();

        let rsi = frame.column("rsi").unwrap();
        for i in 0..14 {
            assert_eq!(rsi.cells[i], None, "warm-up row {i} must be null");
        }
        for i in 14..closes.len() {
            match rsi.cells[i] {
                Some(Cell::Float(v)) => {
                    assert!((0.0..=100.0).contains(&v), "rsi[{i}] = {v} out of range")
                }
                other => panic!("rsi[{i}] unexpected cell {other:?}"),
            }
        }
    }

    #[test]
    fn rsi_saturates_at_100_without_losses() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let mut frame = frame_from_closes(&closes);
        let mut params = IndicatorParams::new();
        params.set("period", ParamValue::Number(5.0));
        OscillatorCalculator::relative_strength_index(&mut frame, &params).unwrap();
        match frame.column("rsi").unwrap().cells.last().unwrap() {
            Some(Cell::Float(v)) => assert!((v - 100.0).abs() < 1e-9),
            other => panic!("unexpected cell {other:?}"),
        }
    }

    #[test]
    fn rsi_short_series_yields_null_column() {
        let mut frame = frame_from_closes(&[1.0, 2.0, 3.0]);
        OscillatorCalculator::relative_strength_index(&mut frame, &IndicatorParams::new())
            .unwrap();
        assert!(frame.column("rsi").unwrap().cells.iter().all(Option::is_none));
    }

    #[test]
    fn adx_outputs_are_structurally_sound() {
        let mut high = Vec::new();
        let mut low = Vec::new();
        let mut close = Vec::new();
        for i in 0..15 {
            let base = 10.0 + i as f64;
            high.push(base + 1.0);
            low.push(base - 1.0);
            close.push(base);
        }
        for i in 0..15 {
            let base = 24.0 - i as f64;
            high.push(base + 1.0);
            low.push(base - 1.0);
            close.push(base);
        }
        let mut frame = frame_from_hlc(&high, &low, &close);
        let mut params = IndicatorParams::new();
        params.set("period", ParamValue::Number(5.0));
        OscillatorCalculator::average_directional_index(&mut frame, &params).unwrap();

        for name in ["dmi_p", "dmi_m", "adx"] {
            for (i, cell) in frame.column(name).unwrap().cells.iter().enumerate() {
                if let Some(Cell::Float(v)) = cell {
                    assert!(
                        (0.0..=100.0 + 1e-9).contains(v),
                        "{name}[{i}] = {v} out of range"
                    );
                }
            }
        }
        // After a long downtrend the dominant direction is bearish, so the
        // flip from the uptrend must be recorded on the last row.
        let dmi_crossing = frame.column("dmi_crossing_date").unwrap();
        assert!(dmi_crossing.cells.last().unwrap().is_some());
        for cell in &dmi_crossing.cells[..frame.len() - 1] {
            assert_eq!(*cell, None);
        }
    }

    #[test]
    fn crossing_scan_finds_crossing_newer_than_flip() {
        let dates = dates(6);
        // Flip between rows 2 and 3; latest regime starts at row 3.
        let bull = [true, true, false, true, true, true];
        // Bullish regime compares ADX against the minus line: ADX moves from
        // below dmi_m (row 3) to above it (row 4) -> crossing dated row 4.
        let adx = [10.0, 10.0, 10.0, 10.0, 30.0, 30.0];
        let dmi_p = [25.0, 25.0, 5.0, 25.0, 40.0, 40.0];
        let dmi_m = [5.0, 5.0, 25.0, 20.0, 20.0, 20.0];
        let (adx_date, dmi_date) = crossing_scan(&dates, &bull, &adx, &dmi_p, &dmi_m);
        assert_eq!(dmi_date, Some(dates[3]));
        assert_eq!(adx_date, Some(dates[4]));
    }

    #[test]
    fn crossing_scan_returns_null_when_no_crossing_before_flip() {
        let dates = dates(5);
        let bull = [true, true, false, true, true];
        // ADX stays above the opposing line in the whole latest regime, so no
        // crossing exists before the scan hits the flip boundary.
        let adx = [50.0, 50.0, 50.0, 50.0, 50.0];
        let dmi_p = [25.0, 25.0, 5.0, 25.0, 25.0];
        let dmi_m = [5.0, 5.0, 25.0, 5.0, 5.0];
        let (adx_date, dmi_date) = crossing_scan(&dates, &bull, &adx, &dmi_p, &dmi_m);
        assert_eq!(dmi_date, Some(dates[3]));
        assert_eq!(adx_date, None);
    }

    #[test]
    fn crossing_scan_without_flip_returns_neither_date() {
        let dates = dates(4);
        let bull = [true, true, true, true];
        let adx = [10.0, 10.0, 10.0, 10.0];
        let dmi_p = [25.0; 4];
        let dmi_m = [5.0; 4];
        let (adx_date, dmi_date) = crossing_scan(&dates, &bull, &adx, &dmi_p, &dmi_m);
        assert_eq!(dmi_date, None);
        assert_eq!(adx_date, None);
    }
}
