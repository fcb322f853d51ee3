//! Variable width code packing.
//!
//! Codes are packed most significant bit first with no padding between them.
//! The `bit_vec` crate only handles MSB order, which is exactly the order we need,
//! so we let it do the conversions to and from bytes.

use bit_vec::BitVec;
use crate::Error;

/// Writes codes of varying width into a destination of fixed capacity.
pub struct BitPacker {
    bits: BitVec,
    /// capacity in bits
    capacity: usize
}

/// Reads codes of varying width from a byte slice.
pub struct BitUnpacker {
    bits: BitVec,
    ptr: usize
}

impl BitPacker {
    /// Create a packer that can hold `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: BitVec::with_capacity(capacity * 8),
            capacity: capacity * 8
        }
    }
    /// Write the low `num_bits` of `code`, most significant bit first.
    /// Fails if the destination would overflow, bits written before the
    /// overflow are kept, but the caller should treat the packer as spoiled.
    pub fn put_code(&mut self,num_bits: usize,code: u16) -> Result<(),Error> {
        debug_assert!(num_bits <= u16::BITS as usize);
        for i in (0..num_bits).rev() {
            if self.bits.len() >= self.capacity {
                return Err(Error::BufferExhausted);
            }
            self.bits.push((code >> i) & 1 > 0);
        }
        Ok(())
    }
    /// number of bits written so far
    pub fn bit_count(&self) -> usize {
        self.bits.len()
    }
    /// Consume the packer and return the bytes, the last byte is padded with zeros
    pub fn flush(self) -> Vec<u8> {
        self.bits.to_bytes()
    }
}

impl BitUnpacker {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bits: BitVec::from_bytes(bytes),
            ptr: 0
        }
    }
    /// true while any bit remains, even if there are too few for a whole code
    pub fn can_read(&self) -> bool {
        self.ptr < self.bits.len()
    }
    /// Read a code of `num_bits` width.  Returns `None`, without advancing,
    /// if fewer than `num_bits` remain.  Running out is not an error at this level,
    /// the decoder decides what it means.
    pub fn get_code(&mut self,num_bits: usize) -> Option<u16> {
        debug_assert!(num_bits <= u16::BITS as usize);
        if self.ptr + num_bits > self.bits.len() {
            return None;
        }
        let mut ans: u16 = 0;
        for _i in 0..num_bits {
            ans <<= 1;
            ans |= self.bits.get(self.ptr)? as u16;
            self.ptr += 1;
        }
        Some(ans)
    }
}

#[test]
fn packing_is_msb_first() {
    let mut packer = BitPacker::with_capacity(4);
    packer.put_code(9,0x054).expect("packing failed");
    packer.put_code(9,0x04F).expect("packing failed");
    assert_eq!(packer.bit_count(),18);
    // 001010100 001001111 + 6 bits of padding
    assert_eq!(packer.flush(),hex::decode("2A13C0").unwrap());
}

#[test]
fn flush_rounds_up() {
    let mut packer = BitPacker::with_capacity(2);
    packer.put_code(9,0x1FF).expect("packing failed");
    assert_eq!(packer.flush(),vec![0xFF,0x80]);
    let packer = BitPacker::with_capacity(2);
    assert_eq!(packer.flush(),Vec::<u8>::new());
}

#[test]
fn full_destination() {
    let mut packer = BitPacker::with_capacity(2);
    packer.put_code(13,0x1234).expect("packing failed");
    match packer.put_code(9,0x100) {
        Err(Error::BufferExhausted) => {},
        _ => panic!("expected buffer exhausted")
    }
    // exactly filling the buffer is fine
    let mut packer = BitPacker::with_capacity(2);
    packer.put_code(9,0x100).expect("packing failed");
    packer.put_code(7,0x7F).expect("packing failed");
    assert_eq!(packer.flush(),vec![0x80,0x7F]);
}

#[test]
fn unpacking_widths() {
    let mut unpacker = BitUnpacker::new(&hex::decode("2A13C0").unwrap());
    assert_eq!(unpacker.get_code(9),Some(0x054));
    assert_eq!(unpacker.get_code(9),Some(0x04F));
    assert!(unpacker.can_read());
    // 6 bits left, a 9 bit code cannot be formed
    assert_eq!(unpacker.get_code(9),None);
    assert!(unpacker.can_read());
    assert_eq!(unpacker.get_code(6),Some(0));
    assert!(!unpacker.can_read());
}

#[test]
fn mixed_widths() {
    let mut packer = BitPacker::with_capacity(8);
    packer.put_code(9,0x101).expect("packing failed");
    packer.put_code(10,0x3FE).expect("packing failed");
    packer.put_code(13,0x1FFF).expect("packing failed");
    let bytes = packer.flush();
    assert_eq!(bytes.len(),4);
    let mut unpacker = BitUnpacker::new(&bytes);
    assert_eq!(unpacker.get_code(9),Some(0x101));
    assert_eq!(unpacker.get_code(10),Some(0x3FE));
    assert_eq!(unpacker.get_code(13),Some(0x1FFF));
    assert!(!unpacker.can_read());
}
