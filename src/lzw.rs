//! LZW Compression
//!
//! Compresses buffers of up to 8192 bytes.  The layout of the code space is fixed:
//! * 0-255 are literals
//! * 256 ends the stream
//! * 257 tells the decoder that subsequent codes are one bit wider
//! * 258-8191 are assigned to strings as the dictionary grows
//!
//! Codes start at 9 bits and widen up to 13 bits.  The encoder widens as soon as the next
//! code to be assigned no longer fits, and always announces this with the bump code, the decoder
//! never infers the width from its own dictionary.  When all codes are assigned the dictionary
//! freezes, and both sides keep going with what they have.
//!
//! Compression only succeeds if the result is strictly smaller than the input.
//! `Codec::compress` reports this as `Outcome::Ineffective`, callers should
//! store the original bytes in that case.
//!
//! The working buffers belong to a `Codec`, which is reset at the start of every call.
//! Every call borrows the codec mutably, so one instance cannot serve two calls at once.
//! Use one codec per thread, or the slice functions, which create a fresh codec each time.

use std::io::{Read,Write,Seek,SeekFrom};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::tools::bit_stream::{BitPacker,BitUnpacker};
use crate::tools::hash_trie::{HashTrie,Probe};
pub use crate::tools::hash_trie::{TABLE_SIZE,FIRST_CODE,MAX_CODE};
use crate::{DYNERR,Error,Options};

/// largest buffer `compress` will accept
pub const MAX_INPUT_SIZE: usize = 8192;
pub const END_OF_STREAM: u16 = 256;
pub const BUMP_CODE: u16 = 257;
pub const MIN_CODE_WIDTH: usize = 9;
pub const MAX_CODE_WIDTH: usize = 13;

#[derive(FromPrimitive)]
enum Control {
    EndOfStream = 256,
    Bump = 257
}

/// Result of a compression attempt that ran without errors
#[derive(Debug,PartialEq)]
pub enum Outcome {
    /// the packed codes, always shorter than the input
    Compressed(Vec<u8>),
    /// the packed codes would be at least as long as the input
    Ineffective
}

/// Record of the encoder widening its codes
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct Bump {
    /// next code to be assigned when the width changed
    pub next_code: u16,
    /// width of codes following the bump
    pub width: usize
}

/// Owns the dictionary and decoding stack.
pub struct Codec {
    trie: HashTrie,
    /// symbols of the string being decoded, last symbol first
    stack: Vec<u8>
}

fn malformed(msg: &str) -> Error {
    log::error!("{}",msg);
    Error::MalformedStream(msg.to_string())
}

impl Codec {
    pub fn new() -> Self {
        Self {
            trie: HashTrie::new(),
            stack: Vec::with_capacity(TABLE_SIZE)
        }
    }
    /// Encode `expanded` into `packer`, returning the width transitions.
    /// Any error from the packer is passed through unchanged.
    fn encode(&mut self,expanded: &[u8],packer: &mut BitPacker) -> Result<Vec<Bump>,Error> {
        self.trie.reset();
        let mut bumps = Vec::new();
        let mut width = MIN_CODE_WIDTH;
        let (first,rest) = match expanded.split_first() {
            Some((first,rest)) => (*first,rest),
            None => return Ok(bumps)
        };
        let mut curr_code = first as u16;
        for &sym in rest {
            match self.trie.probe(curr_code,sym)? {
                Probe::Found(code) => {
                    // keep matching
                    curr_code = code;
                },
                Probe::Vacant(slot) => {
                    log::trace!("code: {}",curr_code);
                    packer.put_code(width,curr_code)?;
                    self.trie.add_child(slot,curr_code,sym);
                    curr_code = sym as u16;
                    if self.trie.next_code() as usize >= 1 << width && width < MAX_CODE_WIDTH {
                        packer.put_code(width,BUMP_CODE)?;
                        width += 1;
                        log::debug!("widen to {} bits at code {}",width,self.trie.next_code());
                        bumps.push(Bump { next_code: self.trie.next_code(), width });
                    }
                }
            }
        }
        log::trace!("code: {}",curr_code);
        packer.put_code(width,curr_code)?;
        packer.put_code(width,END_OF_STREAM)?;
        Ok(bumps)
    }
    /// Compress a buffer of at most `MAX_INPUT_SIZE` bytes.  An empty buffer gives an empty result.
    /// Only invalid input or an internal failure produce an error, data that does not
    /// shrink is reported as `Outcome::Ineffective`.
    pub fn compress(&mut self,expanded: &[u8]) -> Result<Outcome,Error> {
        if expanded.is_empty() {
            return Ok(Outcome::Compressed(Vec::new()));
        }
        if expanded.len() > MAX_INPUT_SIZE {
            return Err(Error::InvalidArgument(format!("input of {} bytes exceeds {}",expanded.len(),MAX_INPUT_SIZE)));
        }
        // if this fills up the output cannot be smaller than the input
        let mut packer = BitPacker::with_capacity(expanded.len());
        match self.encode(expanded,&mut packer) {
            Ok(bumps) => {
                log::debug!("packed {} bits with {} width changes",packer.bit_count(),bumps.len());
            },
            Err(Error::BufferExhausted) => {
                log::debug!("output reached input size of {}",expanded.len());
                return Ok(Outcome::Ineffective);
            },
            Err(e) => return Err(e)
        }
        let compressed = packer.flush();
        if compressed.len() >= expanded.len() {
            log::debug!("compressed size {} is not smaller than {}",compressed.len(),expanded.len());
            return Ok(Outcome::Ineffective);
        }
        Ok(Outcome::Compressed(compressed))
    }
    /// Expand a compressed buffer, producing at most `max_output_size` bytes.
    /// An empty buffer gives an empty result.  Bytes after the end-of-stream code are ignored.
    pub fn expand(&mut self,compressed: &[u8],max_output_size: usize) -> Result<Vec<u8>,Error> {
        if compressed.is_empty() {
            return Ok(Vec::new());
        }
        self.trie.reset();
        let mut unpacker = BitUnpacker::new(compressed);
        let mut expanded: Vec<u8> = Vec::new();
        let mut width = MIN_CODE_WIDTH;
        let first = match unpacker.get_code(width) {
            Some(code) if code <= u8::MAX as u16 => code,
            Some(code) => return Err(malformed(&format!("first code {} is not a literal",code))),
            None => return Err(malformed("no room for the first code"))
        };
        if max_output_size == 0 {
            return Err(Error::BufferExhausted);
        }
        expanded.push(first as u8);
        let mut prev_code = first;
        // first symbol of the most recent string
        let mut lead = first as u8;

        log::debug!("enter main LZW loop");
        loop {
            let code = match unpacker.get_code(width) {
                Some(c) => c,
                None if unpacker.can_read() => return Err(malformed("stream ended inside a code")),
                None => return Err(malformed("stream ended before end-of-stream code"))
            };
            match Control::from_u16(code) {
                Some(Control::EndOfStream) => {
                    log::debug!("end of stream after {} bytes",expanded.len());
                    return Ok(expanded);
                },
                Some(Control::Bump) => {
                    if width < MAX_CODE_WIDTH {
                        width += 1;
                    }
                    log::debug!("widen to {} bits",width);
                    continue;
                },
                None => {}
            }
            self.stack.clear();
            let next_code = self.trie.next_code();
            let mut walk = if code == next_code {
                // encoder used the string it just added, which can only be
                // the previous string extended by its own first symbol
                self.stack.push(lead);
                prev_code
            } else if code < next_code {
                code
            } else {
                return Err(malformed(&format!("code {} is ahead of the dictionary at {}",code,next_code)));
            };
            while walk > u8::MAX as u16 {
                if self.stack.len() >= TABLE_SIZE {
                    return Err(malformed("decode stack overflow"));
                }
                let link = match self.trie.link(walk) {
                    Some(link) => link,
                    None => return Err(malformed(&format!("code {} is not in the dictionary",walk)))
                };
                self.stack.push(link.sym);
                walk = link.parent;
            }
            if self.stack.len() >= TABLE_SIZE {
                return Err(malformed("decode stack overflow"));
            }
            self.stack.push(walk as u8);
            lead = walk as u8;
            if expanded.len() + self.stack.len() > max_output_size {
                log::error!("expanded data would exceed {} bytes",max_output_size);
                return Err(Error::BufferExhausted);
            }
            expanded.extend(self.stack.iter().rev());
            log::trace!("  write {} as {} bytes",code,self.stack.len());
            if let Some(new_code) = self.trie.add_link(prev_code,lead) {
                log::trace!("add {} linking to {}.{}",new_code,prev_code,lead);
            }
            prev_code = code;
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  Data that does not shrink is an error here,
/// and nothing is written in that case.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut expanded_length = expanded_in.seek(SeekFrom::End(0))?;
    if opt.in_offset > expanded_length {
        return Err(Box::new(Error::InvalidArgument(format!("offset {} is past the end of the input",opt.in_offset))));
    }
    expanded_length -= opt.in_offset;
    if expanded_length > MAX_INPUT_SIZE as u64 {
        return Err(Box::new(Error::InvalidArgument(format!("input of {} bytes exceeds {}",expanded_length,MAX_INPUT_SIZE))));
    }
    expanded_in.seek(SeekFrom::Start(opt.in_offset))?;
    let mut expanded = Vec::new();
    expanded_in.read_to_end(&mut expanded)?;
    let compressed = match Codec::new().compress(&expanded)? {
        Outcome::Compressed(dat) => dat,
        Outcome::Ineffective => return Err(Box::new(Error::CompressionIneffective))
    };
    compressed_out.seek(SeekFrom::Start(opt.out_offset))?;
    compressed_out.write_all(&compressed)?;
    compressed_out.flush()?;
    Ok((expanded_length,compressed.len() as u64))
}

/// Main decompression function.
/// `compressed_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  Output is limited by `opt.max_output_size`.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let mut compressed_size = compressed_in.seek(SeekFrom::End(0))?;
    if opt.in_offset > compressed_size {
        return Err(Box::new(Error::InvalidArgument(format!("offset {} is past the end of the input",opt.in_offset))));
    }
    compressed_size -= opt.in_offset;
    compressed_in.seek(SeekFrom::Start(opt.in_offset))?;
    let mut compressed = Vec::new();
    compressed_in.read_to_end(&mut compressed)?;
    let expanded = Codec::new().expand(&compressed,opt.max_output_size)?;
    expanded_out.seek(SeekFrom::Start(opt.out_offset))?;
    expanded_out.write_all(&expanded)?;
    expanded_out.flush()?;
    Ok((compressed_size,expanded.len() as u64))
}

/// Convenience function, compress a slice with a fresh codec.
/// Data that does not shrink gives `Error::CompressionIneffective`.
pub fn compress_slice(slice: &[u8]) -> Result<Vec<u8>,Error> {
    match Codec::new().compress(slice)? {
        Outcome::Compressed(dat) => Ok(dat),
        Outcome::Ineffective => Err(Error::CompressionIneffective)
    }
}

/// Convenience function, expand a slice with a fresh codec
pub fn expand_slice(slice: &[u8],max_output_size: usize) -> Result<Vec<u8>,Error> {
    Codec::new().expand(slice,max_output_size)
}


// *************** TESTS *****************

#[cfg(test)]
fn random_bytes(seed: u64,len: usize) -> Vec<u8> {
    use rand::{RngCore,SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut ans = vec![0;len];
    rng.fill_bytes(&mut ans);
    ans
}

#[cfg(test)]
fn sam_text(len: usize) -> Vec<u8> {
    "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().iter().cycle().take(len).copied().collect()
}

#[test]
fn compression_works() {
    // Wikipedia example.  Codes are
    // 054 04F 042 045 04F 052 04E 04F 054 102 104 106 10B 105 107 109 100
    // all at 9 bits, followed by 7 bits of padding.
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let lzw_str = "2A 13 C8 44 52 79 48 9C 4F 2A 40 A0 90 68 5C 16 0F 09 80 00";
    let compressed = compress_slice(test_data).expect("compression failed");
    assert_eq!(compressed,hex::decode(lzw_str.replace(" ","")).unwrap());
}

#[test]
fn invertibility() {
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    assert!(compressed.len() < test_data.len());
    let expanded = expand_slice(&compressed,MAX_INPUT_SIZE).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);

    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed,MAX_INPUT_SIZE).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn invertibility_full_size() {
    let test_data = sam_text(MAX_INPUT_SIZE);
    let compressed = compress_slice(&test_data).expect("compression failed");
    assert!(compressed.len() < test_data.len());
    let expanded = expand_slice(&compressed,MAX_INPUT_SIZE).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn empty_buffers() {
    assert_eq!(compress_slice(&[]).expect("compression failed"),Vec::<u8>::new());
    assert_eq!(expand_slice(&[],MAX_INPUT_SIZE).expect("expansion failed"),Vec::<u8>::new());
}

#[test]
fn oversized_input() {
    let test_data = sam_text(MAX_INPUT_SIZE + 1);
    match compress_slice(&test_data) {
        Err(Error::InvalidArgument(_)) => {},
        _ => panic!("expected invalid argument")
    }
}

#[test]
fn incompressible_input() {
    use rand::RngCore;
    let mut test_data = [0u8;64];
    rand::thread_rng().fill_bytes(&mut test_data);
    let mut codec = Codec::new();
    assert_eq!(codec.compress(&test_data).expect("compression failed"),Outcome::Ineffective);
    match compress_slice(&test_data) {
        Err(Error::CompressionIneffective) => {},
        _ => panic!("expected compression ineffective")
    }
    // 3 codes of 9 bits do not fit in 2 bytes
    assert_eq!(codec.compress("ab".as_bytes()).expect("compression failed"),Outcome::Ineffective);
}

#[test]
fn codec_reuse() {
    // each call starts from an empty dictionary
    let mut codec = Codec::new();
    let first = sam_text(1000);
    let second = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let _ = codec.compress(&first).expect("compression failed");
    let reused = codec.compress(second).expect("compression failed");
    assert_eq!(reused,Outcome::Compressed(compress_slice(second).expect("compression failed")));
    let compressed = compress_slice(&first).expect("compression failed");
    assert_eq!(codec.expand(&compressed,MAX_INPUT_SIZE).expect("expansion failed"),first);
    assert_eq!(codec.expand(&compressed,MAX_INPUT_SIZE).expect("expansion failed"),first);
}

#[test]
fn width_ramp() {
    // Random bytes create a new string for almost every code, so every width is reached.
    // This does not compress, so give the packer room to finish anyway.
    let test_data = random_bytes(7,MAX_INPUT_SIZE);
    let mut codec = Codec::new();
    let mut packer = BitPacker::with_capacity(test_data.len() * 2);
    let bumps = codec.encode(&test_data,&mut packer).expect("encoding failed");
    assert_eq!(bumps,vec![
        Bump { next_code: 512, width: 10 },
        Bump { next_code: 1024, width: 11 },
        Bump { next_code: 2048, width: 12 },
        Bump { next_code: 4096, width: 13 }
    ]);
    let compressed = packer.flush();

    // Every code adds a string, so the bump has to come right after
    // the code that brings the count to a power of 2.
    let mut unpacker = BitUnpacker::new(&compressed);
    let mut width = MIN_CODE_WIDTH;
    let mut next_code = FIRST_CODE as usize;
    while width < MAX_CODE_WIDTH {
        let code = unpacker.get_code(width).expect("stream ended early");
        if next_code == 1 << width {
            assert_eq!(code,BUMP_CODE);
            width += 1;
            continue;
        }
        assert!(code != BUMP_CODE && code != END_OF_STREAM);
        assert!((code as usize) < next_code);
        next_code += 1;
    }

    let expanded = codec.expand(&compressed,MAX_INPUT_SIZE).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn frozen_dictionary_stays_in_sync() {
    // larger than `compress` allows, but enough to use up every code
    let test_data = random_bytes(11,30000);
    let mut codec = Codec::new();
    let mut packer = BitPacker::with_capacity(test_data.len() * 2);
    codec.encode(&test_data,&mut packer).expect("encoding failed");
    assert!(codec.trie.is_full());
    let compressed = packer.flush();
    let expanded = codec.expand(&compressed,test_data.len()).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn output_limit() {
    let test_data = sam_text(MAX_INPUT_SIZE);
    let compressed = compress_slice(&test_data).expect("compression failed");
    match expand_slice(&compressed,100) {
        Err(Error::BufferExhausted) => {},
        _ => panic!("expected buffer exhausted")
    }
    match expand_slice(&compressed,MAX_INPUT_SIZE - 1) {
        Err(Error::BufferExhausted) => {},
        _ => panic!("expected buffer exhausted")
    }
    assert_eq!(expand_slice(&compressed,MAX_INPUT_SIZE).expect("expansion failed"),test_data);
}

#[test]
fn trailing_bytes_ignored() {
    let test_data = "TOBEORNOTTOBEORTOBEORNOT".as_bytes();
    let mut compressed = compress_slice(test_data).expect("compression failed");
    compressed.extend_from_slice(&[0xFF,0xFF,0x00]);
    assert_eq!(expand_slice(&compressed,MAX_INPUT_SIZE).expect("expansion failed"),test_data);
}

#[test]
fn malformed_streams() {
    // missing end of stream
    let compressed = compress_slice("TOBEORNOTTOBEORTOBEORNOT".as_bytes()).expect("compression failed");
    match expand_slice(&compressed[0..18],MAX_INPUT_SIZE) {
        Err(Error::MalformedStream(_)) => {},
        _ => panic!("expected malformed stream")
    }
    // first code is not a literal
    let mut packer = BitPacker::with_capacity(4);
    packer.put_code(9,BUMP_CODE).expect("packing failed");
    packer.put_code(9,END_OF_STREAM).expect("packing failed");
    match expand_slice(&packer.flush(),MAX_INPUT_SIZE) {
        Err(Error::MalformedStream(_)) => {},
        _ => panic!("expected malformed stream")
    }
    // code beyond the next one to be assigned
    let mut packer = BitPacker::with_capacity(4);
    packer.put_code(9,0x41).expect("packing failed");
    packer.put_code(9,0x110).expect("packing failed");
    packer.put_code(9,END_OF_STREAM).expect("packing failed");
    match expand_slice(&packer.flush(),MAX_INPUT_SIZE) {
        Err(Error::MalformedStream(_)) => {},
        _ => panic!("expected malformed stream")
    }
    // too short for even one code
    match expand_slice(&[0x41],MAX_INPUT_SIZE) {
        Err(Error::MalformedStream(_)) => {},
        _ => panic!("expected malformed stream")
    }
}

#[test]
fn one_code_ahead() {
    // a run like "aaaa" gives 061 102 061 100, the decoder sees 102 before it has added it
    let test_data = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed,MAX_INPUT_SIZE).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn stream_offsets() {
    let test_data = [b"HDR".to_vec(),sam_text(500)].concat();
    let mut opt = crate::STD_OPTIONS;
    opt.in_offset = 3;
    opt.out_offset = 2;
    let mut src = std::io::Cursor::new(test_data.as_slice());
    let mut dst: std::io::Cursor<Vec<u8>> = std::io::Cursor::new(vec![0xAA,0xBB]);
    let (in_size,out_size) = compress(&mut src,&mut dst,&opt).expect("compression failed");
    assert_eq!(in_size,500);
    let compressed = dst.into_inner();
    assert_eq!(&compressed[0..2],&[0xAA,0xBB]);
    assert_eq!(compressed.len() as u64,out_size + 2);

    let mut opt = crate::STD_OPTIONS;
    opt.in_offset = 2;
    let mut src = std::io::Cursor::new(compressed.as_slice());
    let mut dst: std::io::Cursor<Vec<u8>> = std::io::Cursor::new(Vec::new());
    let (in_size,out_size) = expand(&mut src,&mut dst,&opt).expect("expansion failed");
    assert_eq!(in_size,compressed.len() as u64 - 2);
    assert_eq!(out_size,500);
    assert_eq!(dst.into_inner(),sam_text(500));
}

#[test]
fn stream_rejects_oversized() {
    let test_data = sam_text(MAX_INPUT_SIZE + 10);
    let mut opt = crate::STD_OPTIONS;
    let mut src = std::io::Cursor::new(test_data.as_slice());
    let mut dst: std::io::Cursor<Vec<u8>> = std::io::Cursor::new(Vec::new());
    assert!(compress(&mut src,&mut dst,&opt).is_err());
    // skipping past the excess brings it into range
    opt.in_offset = 10;
    let mut src = std::io::Cursor::new(test_data.as_slice());
    compress(&mut src,&mut dst,&opt).expect("compression failed");
    assert!(dst.into_inner().len() < MAX_INPUT_SIZE);
}
