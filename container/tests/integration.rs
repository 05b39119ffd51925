use std::io::Cursor;

use container::{Container, ContainerErr, FileGuard, Record, Value};
use ndarray::{Array2, array};

fn sample() -> Container {
    let mut primary = Record::new("TERM_WEIGHTS", array![[0.5, -0.25, 1e-9], [3.0, 4.0, 5.0]]);
    primary.header.set("CRPIX1", 1usize).unwrap();
    primary
        .header
        .set_with_comment("CRVAL1", 4750.625, r"Wavelength at first pixel \AA")
        .unwrap();
    primary.header.set("I_AFUNC", "linear").unwrap();

    let mut hidden = Record::new("HIDDEN_LAYER_1", Array2::from_elem((4, 2), 0.1 + 0.2));
    hidden.header.set("I_AFUNC", "logistic").unwrap();
    hidden.header.set("I_LAYER", 1usize).unwrap();

    [primary, hidden].into_iter().collect()
}

#[test]
fn blocks_are_aligned() {
    let mut bytes = Vec::new();
    sample().write_to(&mut bytes).unwrap();

    assert_eq!(bytes.len() % 2880, 0);
    assert!(bytes.starts_with(b"SIMPLE  =                    T"));
    // 2 header blocks and 2 data blocks.
    assert_eq!(bytes.len(), 4 * 2880);
    assert_eq!(&bytes[2 * 2880..2 * 2880 + 8], b"XTENSION");
}

#[test]
fn write_read_preserves_records() {
    let container = sample();
    let mut bytes = Vec::new();
    container.write_to(&mut bytes).unwrap();

    let decoded = Container::read_from(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(decoded, container);

    let primary = decoded.get(0).unwrap();
    assert_eq!(primary.header.get("I_AFUNC"), Some(&Value::from("linear")));
    assert_eq!(
        primary.header.card("CRVAL1").unwrap().comment.as_deref(),
        Some(r"Wavelength at first pixel \AA")
    );
}

#[test]
fn empty_records_have_no_data_blocks() {
    let container: Container = [Record::new("EMPTY", Array2::zeros((0, 0)))]
        .into_iter()
        .collect();

    let mut bytes = Vec::new();
    container.write_to(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 2880);

    let decoded = Container::read_from(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(decoded.get(0).unwrap().data.dim(), (0, 0));
}

#[test]
fn truncated_streams_are_rejected() {
    let mut bytes = Vec::new();
    sample().write_to(&mut bytes).unwrap();
    bytes.truncate(bytes.len() - 100);

    let err = Container::read_from(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, ContainerErr::Truncated { record: 1 }));
}

#[test]
fn store_replaces_the_destination() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.fits");

    container::store(&path, &sample()).unwrap();
    let single: Container = [Record::new("ONLY", Array2::ones((1, 1)))]
        .into_iter()
        .collect();
    container::store(&path, &single).unwrap();

    assert_eq!(container::load(&path).unwrap(), single);
    // No temporary files are left behind.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn store_into_a_missing_directory_fails_with_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("model.fits");

    match container::store(&path, &sample()) {
        Err(ContainerErr::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn guard_is_exclusive_and_released_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.fits");

    {
        let _guard = FileGuard::acquire(&path).unwrap();
        assert!(matches!(
            FileGuard::acquire(&path),
            Err(ContainerErr::Locked(_))
        ));
    }

    assert!(FileGuard::acquire(&path).is_ok());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// A primary header with the given axis lengths and no data.
fn bare_header(naxis1: i64, naxis2: i64) -> Vec<u8> {
    let cards = [
        format!("{:<8}= {:>20}", "SIMPLE", "T"),
        format!("{:<8}= {:>20}", "BITPIX", -64),
        format!("{:<8}= {:>20}", "NAXIS", 2),
        format!("{:<8}= {:>20}", "NAXIS1", naxis1),
        format!("{:<8}= {:>20}", "NAXIS2", naxis2),
        "END".to_string(),
    ];

    let mut bytes: Vec<u8> = cards
        .iter()
        .flat_map(|card| format!("{card:<80}").into_bytes())
        .collect();
    bytes.resize(2880, b' ');
    bytes
}

#[test]
fn oversized_images_are_rejected() {
    let huge = 1 << 62;
    let err = Container::read_from(&mut Cursor::new(bare_header(huge, huge))).unwrap_err();
    assert!(matches!(err, ContainerErr::InvalidCard { record: 0, .. }), "{err:?}");

    let err = Container::read_from(&mut Cursor::new(bare_header(1000, 1000))).unwrap_err();
    assert!(matches!(err, ContainerErr::Truncated { record: 0 }), "{err:?}");
}

#[cfg(unix)]
#[test]
fn stored_files_keep_readable_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.fits");
    let mode = |path: &std::path::Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

    container::store(&path, &sample()).unwrap();
    assert_eq!(mode(&path), 0o644);

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();
    container::store(&path, &sample()).unwrap();
    assert_eq!(mode(&path), 0o640);
}
