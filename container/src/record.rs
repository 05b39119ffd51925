use std::io::{Read, Write};

use ndarray::Array2;

use crate::{Deserialize, Header, Result, Serialize};

/// A named two dimensional image and its header.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub header: Header,
    pub data: Array2<f64>,
}

impl Record {
    /// Creates a new `Record` with an empty header.
    ///
    /// # Arguments
    /// * `name` - The name of the record, stored as its `EXTNAME`.
    /// * `data` - The image, rows are stored as `NAXIS2` and columns as `NAXIS1`.
    pub fn new(name: impl Into<String>, data: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            header: Header::new(),
            data,
        }
    }
}

/// An ordered sequence of records, the first one is the primary record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    records: Vec<Record>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Writes the whole container to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        self.serialize(w)
    }

    /// Reads a whole container from `r`.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Self::deserialize(r)
    }
}

impl FromIterator<Record> for Container {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
