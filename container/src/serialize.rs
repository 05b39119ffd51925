use std::io::Write;

use log::debug;

use crate::{BITPIX_F64, CARD_SIZE, Card, Container, Record, Result, block_padding};

pub trait Serialize {
    fn serialize<W: Write>(&self, w: &mut W) -> Result<()>;
}

impl Serialize for Container {
    fn serialize<W: Write>(&self, w: &mut W) -> Result<()> {
        for (i, record) in self.records().iter().enumerate() {
            write_header(w, record, i)?;
            write_data(w, record)?;
            debug!(record = i; "wrote {} {:?}", record.name, record.data.dim());
        }

        Ok(())
    }
}

/// The codec owned cards that open the header of the `index`-th record.
fn structural_cards(record: &Record, index: usize) -> Vec<Card> {
    let (rows, cols) = record.data.dim();
    let mut cards = Vec::with_capacity(9);

    if index == 0 {
        cards.push(Card::new("SIMPLE", true).with_comment("conforms to FITS standard"));
    } else {
        cards.push(Card::new("XTENSION", "IMAGE").with_comment("Image extension"));
    }

    cards.push(Card::new("BITPIX", BITPIX_F64).with_comment("array data type"));

    if rows * cols == 0 {
        cards.push(Card::new("NAXIS", 0usize).with_comment("number of array dimensions"));
    } else {
        cards.push(Card::new("NAXIS", 2usize).with_comment("number of array dimensions"));
        cards.push(Card::new("NAXIS1", cols));
        cards.push(Card::new("NAXIS2", rows));
    }

    if index == 0 {
        cards.push(Card::new("EXTEND", true));
    } else {
        cards.push(Card::new("PCOUNT", 0usize).with_comment("number of parameters"));
        cards.push(Card::new("GCOUNT", 1usize).with_comment("number of groups"));
    }

    cards.push(Card::new("EXTNAME", record.name.as_str()).with_comment("extension name"));
    cards
}

fn write_header<W: Write>(w: &mut W, record: &Record, index: usize) -> Result<()> {
    let mut bytes = Vec::new();

    for card in structural_cards(record, index).iter().chain(record.header.iter()) {
        bytes.extend_from_slice(&card.encode()?);
    }

    let mut end = [b' '; CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    bytes.extend_from_slice(&end);

    bytes.resize(bytes.len() + block_padding(bytes.len()), b' ');
    w.write_all(&bytes)?;
    Ok(())
}

fn write_data<W: Write>(w: &mut W, record: &Record) -> Result<()> {
    let mut bytes = Vec::with_capacity(record.data.len() * size_of::<f64>());

    // `iter` walks in logical row major order whatever the memory layout is.
    for v in record.data.iter() {
        bytes.extend_from_slice(&v.to_be_bytes());
    }

    bytes.resize(bytes.len() + block_padding(bytes.len()), 0);
    w.write_all(&bytes)?;
    Ok(())
}
