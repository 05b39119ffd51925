use std::io::Read;

use log::debug;
use ndarray::Array2;

use crate::{
    BITPIX_F64, BLOCK_SIZE, CARD_SIZE, Card, Container, ContainerErr, Header, Record, Result,
    block_padding,
};

/// Keywords regenerated by the codec on write, they never reach a `Header`.
const STRUCTURAL: [&str; 10] = [
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "PCOUNT", "GCOUNT",
    "EXTNAME",
];

/// `EXTNAME` given to a primary record that has none.
const PRIMARY_NAME: &str = "PRIMARY";

pub trait Deserialize: Sized {
    fn deserialize<R: Read>(r: &mut R) -> Result<Self>;
}

impl Deserialize for Container {
    fn deserialize<R: Read>(r: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;

        let mut container = Container::new();
        let mut rest = bytes.as_slice();

        while !rest.is_empty() {
            let index = container.len();
            let (record, tail) = read_record(rest, index)?;
            debug!(record = index; "read {} {:?}", record.name, record.data.dim());

            container.push(record);
            rest = tail;
        }

        Ok(container)
    }
}

fn read_record(bytes: &[u8], index: usize) -> Result<(Record, &[u8])> {
    let (cards, rest) = read_cards(bytes, index)?;

    let first = cards.first().map(|card| card.key.as_str());
    match (index, first) {
        (0, Some("SIMPLE")) => {}
        (0, _) => {
            return Err(ContainerErr::MissingKeyword {
                record: index,
                key: "SIMPLE",
            });
        }
        (_, Some("XTENSION")) => {}
        (_, _) => {
            return Err(ContainerErr::MissingKeyword {
                record: index,
                key: "XTENSION",
            });
        }
    }

    let required = |key: &'static str| {
        cards
            .iter()
            .find(|card| card.key == key)
            .and_then(|card| card.value.as_i64())
            .ok_or(ContainerErr::MissingKeyword { record: index, key })
    };

    let bitpix = required("BITPIX")?;
    if bitpix != BITPIX_F64 {
        return Err(ContainerErr::UnsupportedBitpix {
            record: index,
            bitpix,
        });
    }

    let shape = match required("NAXIS")? {
        0 => (0, 0),
        1 => (1, dimension(required("NAXIS1")?, index)?),
        2 => (
            dimension(required("NAXIS2")?, index)?,
            dimension(required("NAXIS1")?, index)?,
        ),
        naxis => {
            return Err(ContainerErr::UnsupportedShape {
                record: index,
                naxis,
            });
        }
    };

    let name = cards
        .iter()
        .find(|card| card.key == "EXTNAME")
        .and_then(|card| card.value.as_str())
        .map(String::from)
        .unwrap_or_else(|| PRIMARY_NAME.to_string());

    let mut header = Header::new();
    for card in cards {
        if !STRUCTURAL.contains(&card.key.as_str()) {
            header.push(card);
        }
    }

    let (data, rest) = read_data(rest, shape, index)?;
    let record = Record { name, header, data };
    Ok((record, rest))
}

fn dimension(value: i64, index: usize) -> Result<usize> {
    usize::try_from(value).map_err(|_| ContainerErr::InvalidCard {
        record: index,
        card: "NAXISn".to_string(),
        reason: "negative axis length",
    })
}

/// Reads header blocks up to the one holding the `END` card.
fn read_cards(bytes: &[u8], index: usize) -> Result<(Vec<Card>, &[u8])> {
    let mut cards = Vec::new();
    let mut offset = 0;

    loop {
        let block = bytes
            .get(offset..offset + BLOCK_SIZE)
            .ok_or(ContainerErr::Truncated { record: index })?;
        offset += BLOCK_SIZE;

        for raw in block.chunks_exact(CARD_SIZE) {
            if raw.starts_with(b"END") && raw[3..].iter().all(|&b| b == b' ') {
                return Ok((cards, &bytes[offset..]));
            }

            if let Some(card) = Card::decode(raw, index)? {
                cards.push(card);
            }
        }
    }
}

fn read_data(bytes: &[u8], shape: (usize, usize), index: usize) -> Result<(Array2<f64>, &[u8])> {
    let padded = shape
        .0
        .checked_mul(shape.1)
        .and_then(|n| n.checked_mul(size_of::<f64>()))
        .and_then(|len| len.checked_add(block_padding(len)).map(|padded| (len, padded)));

    let Some((len, padded)) = padded else {
        return Err(ContainerErr::InvalidCard {
            record: index,
            card: "NAXISn".to_string(),
            reason: "image too large",
        });
    };

    if padded > bytes.len() {
        return Err(ContainerErr::Truncated { record: index });
    }

    let raw = &bytes[..padded];

    let values = raw[..len]
        .chunks_exact(size_of::<f64>())
        .map(|chunk| {
            let mut be = [0; size_of::<f64>()];
            be.copy_from_slice(chunk);
            f64::from_be_bytes(be)
        })
        .collect();

    let data = Array2::from_shape_vec(shape, values).map_err(|_| ContainerErr::Truncated { record: index })?;
    Ok((data, &bytes[padded..]))
}
