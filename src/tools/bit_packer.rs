//! Bit packing for the Huffman stage.
//!
//! Bits are always packed starting from the most significant bit of each byte,
//! and the last byte is padded with zeros.  The packer does not record how many
//! padding bits there are, the caller has to store the bit count and hand it
//! back to the unpacker.

use bit_vec::BitVec;
use crate::Error;

/// Number of bytes needed to hold `bit_count` bits
pub fn packed_len(bit_count: u64) -> u64 {
    bit_count / 8 + match bit_count % 8 {
        0 => 0,
        _ => 1
    }
}

/// Accumulates codes and produces the byte aligned buffer
pub struct BitPacker {
    bits: BitVec
}

impl BitPacker {
    pub fn new() -> Self {
        Self {
            bits: BitVec::new()
        }
    }
    /// append every bit of `code`, first bit of the code goes first
    pub fn put_code(&mut self,code: &BitVec) {
        self.bits.extend(code.iter());
    }
    /// number of bits written so far, not counting padding
    pub fn bit_count(&self) -> u64 {
        self.bits.len() as u64
    }
    /// consume the packer, yielding the MSB first bytes with a zero padded tail
    pub fn finish(self) -> Vec<u8> {
        self.bits.to_bytes()
    }
}

/// Hands out exactly the bits that were packed, padding is never visible.
pub struct BitUnpacker {
    bits: BitVec,
    ptr: usize
}

impl BitUnpacker {
    /// `bytes` must be exactly as long as the packer would have made it for `bit_count` bits.
    pub fn create(bytes: &[u8],bit_count: u64) -> Result<Self,Error> {
        let expected = packed_len(bit_count);
        if bytes.len() as u64 != expected {
            log::error!("{} bits need {} bytes, but there are {}",bit_count,expected,bytes.len());
            return Err(Error::CorruptHeader(format!("bit count {} does not match payload of {} bytes",bit_count,bytes.len())));
        }
        let mut bits = BitVec::from_bytes(bytes);
        bits.truncate(bit_count as usize);
        Ok(Self {
            bits,
            ptr: 0
        })
    }
    /// get the next bit, or None once `bit_count` bits have been consumed
    pub fn get_bit(&mut self) -> Option<bool> {
        let ans = self.bits.get(self.ptr);
        if ans.is_some() {
            self.ptr += 1;
        }
        ans
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn bits_from_str(s: &str) -> BitVec {
    s.chars().map(|c| c=='1').collect()
}

#[test]
fn packing_is_msb_first_with_zero_tail() {
    let mut packer = BitPacker::new();
    packer.put_code(&bits_from_str("1"));
    packer.put_code(&bits_from_str("011"));
    packer.put_code(&bits_from_str("0000"));
    packer.put_code(&bits_from_str("101"));
    assert_eq!(packer.bit_count(),11);
    assert_eq!(packer.finish(),vec![0xb0,0xa0]);
}

#[test]
fn empty_packer_gives_no_bytes() {
    let packer = BitPacker::new();
    assert_eq!(packer.bit_count(),0);
    assert_eq!(packer.finish(),Vec::<u8>::new());
}

#[test]
fn unpacking_stops_at_bit_count() {
    let mut unpacker = BitUnpacker::create(&[0xb0,0xa0],11).expect("unpack failed");
    let mut got = String::new();
    while let Some(bit) = unpacker.get_bit() {
        got.push(if bit { '1' } else { '0' });
    }
    assert_eq!(got,"10110000101");
    assert_eq!(unpacker.get_bit(),None);
}

#[test]
fn unpacking_rejects_wrong_length() {
    assert!(matches!(BitUnpacker::create(&[0xff],9),Err(Error::CorruptHeader(_))));
    assert!(matches!(BitUnpacker::create(&[0xff,0x00],8),Err(Error::CorruptHeader(_))));
    assert!(BitUnpacker::create(&[],0).is_ok());
}

#[test]
fn packed_len_rounds_up() {
    assert_eq!(packed_len(0),0);
    assert_eq!(packed_len(1),1);
    assert_eq!(packed_len(8),1);
    assert_eq!(packed_len(9),2);
}
