use crate::database::models::QuoteRow;
use crate::indicators::IndicatorError;
use chrono::NaiveDate;

/// A single nullable value inside an indicator output column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Bool,
    Date,
}

/// An indicator output column attached to a frame. Null cells stand in for
/// undefined values (warm-up windows, failed calculations).
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Option<Cell>>,
}

/// Ordered quote history for one security plus the indicator output columns
/// added while the pipeline runs. The OHLCV vectors are positionally indexed
/// and strictly increasing by date; added columns always span every row.
#[derive(Debug, Clone, Default)]
pub struct QuoteFrame {
    pub dates: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub split_adjusted_open: Vec<f64>,
    pub split_adjusted_high: Vec<f64>,
    pub split_adjusted_low: Vec<f64>,
    pub split_adjusted_close: Vec<f64>,
    pub adjusted_close: Vec<f64>,
    pub volume: Vec<f64>,
    columns: Vec<Column>,
}

impl QuoteFrame {
    pub fn from_rows(rows: &[QuoteRow]) -> Self {
        let mut frame = Self::default();
        for row in rows {
            frame.dates.push(row.date);
            frame.open.push(row.open);
            frame.high.push(row.high);
            frame.low.push(row.low);
            frame.close.push(row.close);
            frame.split_adjusted_open.push(row.split_adjusted_open);
            frame.split_adjusted_high.push(row.split_adjusted_high);
            frame.split_adjusted_low.push(row.split_adjusted_low);
            frame.split_adjusted_close.push(row.split_adjusted_close);
            frame.adjusted_close.push(row.adjusted_close);
            frame.volume.push(row.volume);
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Resolve a source column as a float series. Base OHLCV fields and
    /// previously added float columns are both valid sources, so composite
    /// indicators can build on earlier outputs. Null cells come back as NaN.
    pub fn source(&self, name: &str) -> Result<Vec<f64>, IndicatorError> {
        if let Some(base) = self.base_series(name) {
            return Ok(base.clone());
        }
        match self.column(name) {
            Some(column) => match column.kind {
                ColumnKind::Float => Ok(column
                    .cells
                    .iter()
                    .map(|cell| match cell {
                        Some(Cell::Float(value)) => *value,
                        _ => f64::NAN,
                    })
                    .collect()),
                ColumnKind::Bool => Ok(column
                    .cells
                    .iter()
                    .map(|cell| match cell {
                        Some(Cell::Bool(true)) => 1.0,
                        Some(Cell::Bool(false)) => 0.0,
                        _ => f64::NAN,
                    })
                    .collect()),
                ColumnKind::Date => Err(IndicatorError::NonNumericSource(name.to_string())),
            },
            None => Err(IndicatorError::UnknownSource(name.to_string())),
        }
    }

    fn base_series(&self, name: &str) -> Option<&Vec<f64>> {
        match name {
            "open" => Some(&self.open),
            "high" => Some(&self.high),
            "low" => Some(&self.low),
            "close" => Some(&self.close),
            "split_adjusted_open" => Some(&self.split_adjusted_open),
            "split_adjusted_high" => Some(&self.split_adjusted_high),
            "split_adjusted_low" => Some(&self.split_adjusted_low),
            "split_adjusted_close" => Some(&self.split_adjusted_close),
            "adjusted_close" => Some(&self.adjusted_close),
            "volume" => Some(&self.volume),
            _ => None,
        }
    }

    /// Add or replace a column. Replacing keeps the column's position so the
    /// merge order stays stable when an indicator overwrites its own output.
    pub fn set_cells(&mut self, name: &str, kind: ColumnKind, cells: Vec<Option<Cell>>) {
        debug_assert_eq!(cells.len(), self.len());
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(column) => {
                column.kind = kind;
                column.cells = cells;
            }
            None => self.columns.push(Column {
                name: name.to_string(),
                kind,
                cells,
            }),
        }
    }

    /// NaN values become null cells, matching how undefined warm-up values
    /// are persisted.
    pub fn set_float_column(&mut self, name: &str, values: Vec<f64>) {
        let cells = values
            .into_iter()
            .map(|value| {
                if value.is_nan() {
                    None
                } else {
                    Some(Cell::Float(value))
                }
            })
            .collect();
        self.set_cells(name, ColumnKind::Float, cells);
    }

    pub fn set_bool_column(&mut self, name: &str, values: Vec<bool>) {
        let cells = values.into_iter().map(|value| Some(Cell::Bool(value))).collect();
        self.set_cells(name, ColumnKind::Bool, cells);
    }

    pub fn set_null_column(&mut self, name: &str, kind: ColumnKind) {
        let cells = vec![None; self.len()];
        self.set_cells(name, kind, cells);
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if from == to || !self.has_column(from) {
            return;
        }
        self.columns.retain(|c| c.name != to);
        if let Some(column) = self.columns.iter_mut().find(|c| c.name == from) {
            column.name = to.to_string();
        }
    }

    pub fn drop_column(&mut self, name: &str) {
        self.columns.retain(|c| c.name != name);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Added indicator columns in insertion order. Base OHLCV fields are not
    /// part of this list, which is what keeps them out of the merged record.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}
