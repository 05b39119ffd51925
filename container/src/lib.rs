//! Multi-record binary container made of 2880 byte blocks: every record is a header of 80 column
//! keyword cards followed by a two dimensional big-endian `f64` image.
//!
//! The layout is the subset of FITS needed to store one image per record, so the files can be
//! opened by any FITS reader.

mod card;
mod deserialize;
mod error;
mod file;
mod header;
mod record;
mod serialize;

pub use card::{Card, Value};
pub use deserialize::Deserialize;
pub use error::{ContainerErr, Result};
pub use file::{FileGuard, load, store};
pub use header::Header;
pub use record::{Container, Record};
pub use serialize::Serialize;

/// Size in bytes of every header and data block.
const BLOCK_SIZE: usize = 2880;

/// Size in bytes of a single header card.
const CARD_SIZE: usize = 80;

/// `BITPIX` value for IEEE-754 double precision data.
const BITPIX_F64: i64 = -64;

/// Returns the amount of padding needed to complete the last block of `len` bytes.
fn block_padding(len: usize) -> usize {
    (BLOCK_SIZE - len % BLOCK_SIZE) % BLOCK_SIZE
}
