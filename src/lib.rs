//! # filecompressor
//!
//! Lossless compression of whole buffers or files with one of two classic methods:
//!
//! * `huffman` - static Huffman coding, the frequency table is stored in a small header
//! * `lzw` - LZW with a 4096 entry dictionary and fixed 32 bit codes
//!
//! The `codec` module is the entry point for most callers.  Each method module
//! also exposes `compress` and `expand` over `Read`/`Write` streams and slices.
//!
//! ```rust
//! use filecompressor::codec;
//! let (packed,_) = codec::lzw_compress(b"ababab").unwrap();
//! let (unpacked,stats) = codec::lzw_expand(&packed).unwrap();
//! assert_eq!(unpacked,b"ababab");
//! assert_eq!(stats.out_size,6);
//! ```

mod tools;
pub mod huffman;
pub mod lzw;
pub mod codec;

/// Errors that can be returned by any compress or expand operation
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("could not open {path}: {source}")]
    IoOpen {
        path: std::path::PathBuf,
        source: std::io::Error
    },
    #[error("read failed: {0}")]
    IoRead(#[source] std::io::Error),
    #[error("write failed: {0}")]
    IoWrite(#[source] std::io::Error),
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    #[error("corrupt data: {0}")]
    CorruptData(String),
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String)
}

pub type Result<T> = std::result::Result<T,Error>;

pub use codec::{Method,Stats};
