//! # lzw13
//!
//! LZW codec for small buffers (up to 8192 bytes).  The dictionary is an open-addressed
//! hash table rather than a direct trie, and codes are packed MSB first with a width that
//! ramps from 9 to 13 bits.  Width changes are signaled in-band with a control code.
//!
//! The wire format has no header, it is only the packed codes terminated by an
//! end-of-stream code.  See the `lzw` module for the entry points.

mod tools;
pub mod lzw;

type DYNERR = Box<dyn std::error::Error>;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("compressed data is not smaller than the input")]
    CompressionIneffective,
    #[error("buffer exhausted before end of data")]
    BufferExhausted,
    #[error("dictionary exhausted, no free slot")]
    DictionaryExhausted,
    #[error("malformed stream: {0}")]
    MalformedStream(String)
}

/// Options controlling the stream functions
#[derive(Clone)]
pub struct Options {
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64,
    /// expansion fails rather than produce more than this many bytes
    pub max_output_size: usize
}

pub const STD_OPTIONS: Options = Options {
    in_offset: 0,
    out_offset: 0,
    max_output_size: lzw::MAX_INPUT_SIZE
};
