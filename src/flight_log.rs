//! # Flight log
//!
//! A flight log is a list of records `(t, x, y, z, target_x, target_y, target_z)`. It is persisted as a NumPy
//! `.npy` file holding an `N x 7` array of `f64`, so that it can be read back by [FlightLog::load()] or by any
//! NumPy-based tool. Positions are logged as `f32` by the Crazyflie and stored as `f64`: saving and loading is
//! lossless.

use std::path::Path;

use log::info;
use ndarray::{Array2, ArrayView2};
use ndarray_npy::{read_npy, write_npy};

use crate::{Error, Result};

/// Number of columns of the persisted array
pub const COLUMNS: usize = 7;

/// One logged sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    /// Vehicle timestamp (milliseconds)
    pub timestamp: f64,
    /// Estimated x
    pub x: f64,
    /// Estimated y
    pub y: f64,
    /// Estimated z
    pub z: f64,
    /// Target x when the sample was received
    pub target_x: f64,
    /// Target y when the sample was received
    pub target_y: f64,
    /// Target z when the sample was received
    pub target_z: f64,
}

impl LogRecord {
    fn to_row(self) -> [f64; COLUMNS] {
        [
            self.timestamp,
            self.x,
            self.y,
            self.z,
            self.target_x,
            self.target_y,
            self.target_z,
        ]
    }

    fn from_row(row: &[f64]) -> Self {
        Self {
            timestamp: row[0],
            x: row[1],
            y: row[2],
            z: row[3],
            target_x: row[4],
            target_y: row[5],
            target_z: row[6],
        }
    }
}

/// Append-only list of [LogRecord]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightLog {
    records: Vec<LogRecord>,
}

/// A flight log split in named columns
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct Columns {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub target_x: Vec<f64>,
    pub target_y: Vec<f64>,
    pub target_z: Vec<f64>,
}

impl FlightLog {
    /// An empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    /// Records in arrival order
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the log has no record
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The log as an `N x 7` array
    pub fn to_array(&self) -> Array2<f64> {
        let mut array = Array2::zeros((self.records.len(), COLUMNS));
        for (mut row, record) in array.rows_mut().into_iter().zip(&self.records) {
            for (cell, value) in row.iter_mut().zip(record.to_row()) {
                *cell = value;
            }
        }
        array
    }

    /// Build a log from an `N x 7` array
    pub fn from_array(array: ArrayView2<f64>) -> Result<Self> {
        if array.ncols() != COLUMNS {
            return Err(Error::Npy(format!(
                "expected {} columns, found {}",
                COLUMNS,
                array.ncols()
            )));
        }

        let records = array
            .rows()
            .into_iter()
            .map(|row| LogRecord::from_row(&row.to_vec()))
            .collect();

        Ok(Self { records })
    }

    /// Split in columns
    pub fn columns(&self) -> Columns {
        let mut columns = Columns::default();
        for r in &self.records {
            columns.t.push(r.timestamp);
            columns.x.push(r.x);
            columns.y.push(r.y);
            columns.z.push(r.z);
            columns.target_x.push(r.target_x);
            columns.target_y.push(r.target_y);
            columns.target_z.push(r.target_z);
        }
        columns
    }

    /// Write the log as a `.npy` file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_npy(path, &self.to_array())?;
        info!("Flight log saved to {} ({} records)", path.display(), self.len());
        Ok(())
    }

    /// Read a log written by [FlightLog::save()]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let array: Array2<f64> = read_npy(path.as_ref())?;
        Self::from_array(array.view())
    }
}

impl FromIterator<LogRecord> for FlightLog {
    fn from_iter<I: IntoIterator<Item = LogRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
