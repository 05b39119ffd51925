use std::{fs, path::Path};

use log::debug;

use crate::{InterpolatorErr, Result};

const HEADER: &str = "epoch,loss";

/// Writes one `epoch,loss` row per epoch, epochs counted from zero.
pub fn write_loss_history(path: impl AsRef<Path>, losses: &[f64]) -> Result<()> {
    let path = path.as_ref();

    let mut text = String::with_capacity(HEADER.len() + 1 + losses.len() * 24);
    text.push_str(HEADER);
    text.push('\n');
    for (epoch, loss) in losses.iter().enumerate() {
        text.push_str(&format!("{epoch},{loss:e}\n"));
    }

    fs::write(path, text).map_err(|source| InterpolatorErr::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(epochs = losses.len(); "wrote loss history to {}", path.display());
    Ok(())
}

/// Reads a history written by [`write_loss_history`].
pub fn read_loss_history(path: impl AsRef<Path>) -> Result<Vec<(usize, f64)>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| InterpolatorErr::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let data_err = |line: usize, reason: String| InterpolatorErr::Data {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = text.lines().enumerate();
    match lines.next() {
        Some((_, header)) if header.trim() == HEADER => {}
        Some((_, header)) => {
            return Err(data_err(1, format!("expected {HEADER:?}, found {header:?}")));
        }
        None => return Err(data_err(0, "the history is empty".to_string())),
    }

    let mut history = Vec::new();
    for (i, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (epoch, loss) = line
            .split_once(',')
            .ok_or_else(|| data_err(i + 1, format!("{line:?} is not an epoch,loss pair")))?;

        let epoch = epoch
            .trim()
            .parse()
            .map_err(|_| data_err(i + 1, format!("{epoch:?} is not an epoch")))?;
        let loss = loss
            .trim()
            .parse()
            .map_err(|_| data_err(i + 1, format!("{loss:?} is not a loss")))?;

        history.push((epoch, loss));
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histories_are_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.csv");
        let losses = [0.5, 0.125, 3.0e-7];

        write_loss_history(&path, &losses).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("epoch,loss\n0,"));

        assert_eq!(
            read_loss_history(&path).unwrap(),
            vec![(0, 0.5), (1, 0.125), (2, 3.0e-7)]
        );
    }

    #[test]
    fn bad_rows_report_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.csv");
        fs::write(&path, "epoch,loss\n0,1.0\n1,oops\n").unwrap();

        match read_loss_history(&path) {
            Err(InterpolatorErr::Data { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn header_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.csv");
        fs::write(&path, "0,1.0\n").unwrap();

        assert!(matches!(
            read_loss_history(&path),
            Err(InterpolatorErr::Data { line: 1, .. })
        ));
    }
}
