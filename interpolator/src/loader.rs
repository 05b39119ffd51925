use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use ndarray::{Array1, Array2, s};

use crate::{InterpolatorErr, Result, format::N_PARAMS};

/// Wavelength bins dropped at each edge of the grid unless told otherwise.
pub const DEFAULT_TRIM: usize = 10;

/// Reads a whitespace separated numeric table, one row per line.
///
/// Blank lines and lines starting with `#` are skipped. Every row must have the same amount of
/// columns.
pub fn load_table(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let text = read(path)?;

    let mut values = Vec::new();
    let mut ncols = None;
    let mut nrows = 0;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let before = values.len();
        for field in line.split_whitespace() {
            let value = field
                .parse::<f64>()
                .map_err(|_| data_err(path, i + 1, format!("{field:?} is not a number")))?;
            values.push(value);
        }

        let width = values.len() - before;
        match ncols {
            None => ncols = Some(width),
            Some(n) if n != width => {
                return Err(data_err(
                    path,
                    i + 1,
                    format!("row has {width} columns, previous rows have {n}"),
                ));
            }
            Some(_) => {}
        }

        nrows += 1;
    }

    let ncols = ncols.ok_or_else(|| data_err(path, 0, "the table has no rows".to_string()))?;
    Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| data_err(path, 0, e.to_string()))
}

/// Reads a numeric vector, either one value per line or a single row.
pub fn load_vector(path: impl AsRef<Path>) -> Result<Array1<f64>> {
    let path = path.as_ref();
    let table = load_table(path)?;

    match table.dim() {
        (_, 1) | (1, _) => Ok(table.iter().copied().collect()),
        (rows, cols) => Err(data_err(
            path,
            0,
            format!("expected a vector, found a {rows} x {cols} table"),
        )),
    }
}

/// Where the grid tables are.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// `N x 3` physical parameters.
    pub params: PathBuf,
    /// `N x W` spectra.
    pub spectra: PathBuf,
    /// `N x W` spectra variances.
    pub variance: PathBuf,
    /// `W` wavelengths.
    pub wave: PathBuf,
}

/// A spectral grid: the spectra of `N` stars sampled on a common wavelength grid.
#[derive(Debug, Clone)]
pub struct GridData {
    pub params: Array2<f64>,
    pub spectra: Array2<f64>,
    pub variance: Array2<f64>,
    pub wave: Array1<f64>,
}

impl GridData {
    /// Loads the grid and drops `trim` wavelength bins at each edge.
    pub fn load(paths: &DataPaths, trim: usize) -> Result<Self> {
        let params = load_table(&paths.params)?;
        let spectra = load_table(&paths.spectra)?;
        let variance = load_table(&paths.variance)?;
        let wave = load_vector(&paths.wave)?;

        if params.ncols() != N_PARAMS {
            return Err(data_err(
                &paths.params,
                0,
                format!("expected {N_PARAMS} parameter columns, found {}", params.ncols()),
            ));
        }

        if spectra.nrows() != params.nrows() {
            return Err(data_err(
                &paths.spectra,
                0,
                format!("expected {} spectra, found {}", params.nrows(), spectra.nrows()),
            ));
        }

        if spectra.ncols() != wave.len() {
            return Err(data_err(
                &paths.spectra,
                0,
                format!("expected {} wavelength bins, found {}", wave.len(), spectra.ncols()),
            ));
        }

        if variance.dim() != spectra.dim() {
            return Err(data_err(
                &paths.variance,
                0,
                format!("expected shape {:?}, found {:?}", spectra.dim(), variance.dim()),
            ));
        }

        let bins = wave.len();
        if 2 * trim >= bins {
            return Err(data_err(
                &paths.wave,
                0,
                format!("cannot trim {trim} bins from each edge of {bins} bins"),
            ));
        }

        let keep = trim..bins - trim;
        let grid = Self {
            spectra: spectra.slice(s![.., keep.clone()]).to_owned(),
            variance: variance.slice(s![.., keep.clone()]).to_owned(),
            wave: wave.slice(s![keep]).to_owned(),
            params,
        };

        info!(
            samples = grid.len(), bins = grid.bins();
            "loaded spectral grid"
        );

        Ok(grid)
    }

    /// Returns the amount of spectra.
    pub fn len(&self) -> usize {
        self.params.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the amount of wavelength bins of every spectrum.
    pub fn bins(&self) -> usize {
        self.wave.len()
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| InterpolatorErr::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn data_err(path: &Path, line: usize, reason: String) -> InterpolatorErr {
    InterpolatorErr::Data {
        path: path.to_path_buf(),
        line,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::array;

    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn tables_skip_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.txt", "# header\n1 2.5 -3e2\n\n4\t5 6\n");

        assert_eq!(load_table(&path).unwrap(), array![[1., 2.5, -300.], [4., 5., 6.]]);
    }

    #[test]
    fn ragged_rows_report_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.txt", "1 2\n3 4\n5\n");

        match load_table(&path) {
            Err(InterpolatorErr::Data { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn vectors_are_columns_or_rows() {
        let dir = tempfile::tempdir().unwrap();
        let column = write(dir.path(), "c.txt", "1\n2\n3\n");
        let row = write(dir.path(), "r.txt", "1 2 3\n");
        let table = write(dir.path(), "t.txt", "1 2\n3 4\n");

        assert_eq!(load_vector(&column).unwrap(), array![1., 2., 3.]);
        assert_eq!(load_vector(&row).unwrap(), array![1., 2., 3.]);
        assert!(load_vector(&table).is_err());
    }

    #[test]
    fn grid_is_trimmed_at_both_edges() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths {
            params: write(dir.path(), "p.txt", "5000 4.5 0\n6000 3.5 -1\n"),
            spectra: write(dir.path(), "s.txt", "1 2 3 4 5 6\n7 8 9 10 11 12\n"),
            variance: write(dir.path(), "v.txt", "0 0 0 0 0 0\n0 0 0 0 0 0\n"),
            wave: write(dir.path(), "w.txt", "4000\n4001\n4002\n4003\n4004\n4005\n"),
        };

        let grid = GridData::load(&paths, 2).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.bins(), 2);
        assert_eq!(grid.spectra, array![[3., 4.], [9., 10.]]);
        assert_eq!(grid.wave, array![4002., 4003.]);

        assert!(GridData::load(&paths, 3).is_err());
    }

    #[test]
    fn grid_needs_three_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths {
            params: write(dir.path(), "p.txt", "5000 4.5\n"),
            spectra: write(dir.path(), "s.txt", "1 2 3\n"),
            variance: write(dir.path(), "v.txt", "1 2 3\n"),
            wave: write(dir.path(), "w.txt", "1 2 3\n"),
        };

        assert!(matches!(
            GridData::load(&paths, 0),
            Err(InterpolatorErr::Data { .. })
        ));
    }
}
