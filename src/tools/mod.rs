//! Building blocks shared by the encoder and decoder

pub mod bit_stream;
pub mod hash_trie;
