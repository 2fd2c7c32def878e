//! Static Huffman Compression
//!
//! The whole input is buffered, counted, and then coded with a tree that
//! depends only on the frequency table.  The table is stored up front so the
//! expander can grow the identical tree.
//!
//! Layout of the compressed data, all integers little endian:
//!
//! * `i32` number of distinct bytes
//! * for each distinct byte in order of first appearance: `u8` byte value, `i32` count
//! * `i64` number of code bits, not counting padding
//! * code bits packed MSB first, last byte padded with zeros
//!
//! The bit count is necessary, without it the zero padding would decode as extra symbols.

use std::io::{Cursor,Read,Write};
use crate::tools::bit_packer::{BitPacker,BitUnpacker};
use crate::{Error,Result};
pub use crate::tools::huff_tree::{FrequencyTable,HuffmanTree,EncodingTable};

const PAIR_LEN: usize = 5;

/// Everything that comes before the packed code bits
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct CompressedHeader {
    pub freq: FrequencyTable,
    pub bit_count: u64
}

fn take<const N: usize>(dat: &[u8],pos: usize) -> Result<[u8;N]> {
    match dat.get(pos..pos+N) {
        Some(slice) => {
            let mut ans = [0;N];
            ans.copy_from_slice(slice);
            Ok(ans)
        },
        None => Err(Error::CorruptHeader(format!("truncated at byte {}",pos)))
    }
}

impl CompressedHeader {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut ans = Vec::with_capacity(12 + PAIR_LEN*self.freq.len());
        ans.extend_from_slice(&i32::to_le_bytes(self.freq.len() as i32));
        for &(byte,count) in self.freq.entries() {
            let count = match i32::try_from(count) {
                Ok(c) => c,
                Err(_) => return Err(Error::UnsupportedConfiguration(format!("byte {} occurs {} times, limit is {}",byte,count,i32::MAX)))
            };
            ans.push(byte);
            ans.extend_from_slice(&i32::to_le_bytes(count));
        }
        ans.extend_from_slice(&i64::to_le_bytes(self.bit_count as i64));
        Ok(ans)
    }
    /// Parse the header at the start of `dat`, returns the header and the offset of the code bits.
    pub fn parse(dat: &[u8]) -> Result<(Self,usize)> {
        let unique = i32::from_le_bytes(take::<4>(dat,0)?);
        if !(0..=256).contains(&unique) {
            return Err(Error::CorruptHeader(format!("invalid symbol count {}",unique)));
        }
        let header_len = 4 + PAIR_LEN*unique as usize + 8;
        if dat.len() < header_len {
            return Err(Error::CorruptHeader(format!("{} symbols need a {} byte header, only {} bytes available",unique,header_len,dat.len())));
        }
        let mut seen = [false;256];
        let mut entries = Vec::with_capacity(unique as usize);
        let mut ptr = 4;
        for _i in 0..unique {
            let byte = dat[ptr];
            let count = i32::from_le_bytes(take::<4>(dat,ptr+1)?);
            if count <= 0 {
                return Err(Error::CorruptHeader(format!("byte {} has count {}",byte,count)));
            }
            if seen[byte as usize] {
                return Err(Error::CorruptHeader(format!("byte {} is listed twice",byte)));
            }
            seen[byte as usize] = true;
            entries.push((byte,count as u64));
            ptr += PAIR_LEN;
        }
        let bit_count = i64::from_le_bytes(take::<8>(dat,ptr)?);
        if bit_count < 0 {
            return Err(Error::CorruptHeader(format!("negative bit count {}",bit_count)));
        }
        ptr += 8;
        Ok((Self {
            freq: FrequencyTable::from_entries(entries),
            bit_count: bit_count as u64
        },ptr))
    }
}

/// Count the bytes, the order of first appearance is kept for tie breaking
pub fn build_frequency_table(dat: &[u8]) -> FrequencyTable {
    FrequencyTable::from_bytes(dat)
}

/// Main compression function.
/// `expanded_in` is read to the end before anything is written.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W) -> Result<(u64,u64)>
where R: Read, W: Write {
    let mut dat = Vec::new();
    expanded_in.read_to_end(&mut dat).map_err(Error::IoRead)?;
    log::debug!("building frequency table for {} bytes",dat.len());
    let freq = build_frequency_table(&dat);
    let tree = HuffmanTree::build(&freq);
    let table = EncodingTable::from_tree(&tree);
    log::debug!("{} distinct symbols",freq.len());
    let mut packer = BitPacker::new();
    for &b in &dat {
        let code = table.get(b).ok_or_else(|| Error::CorruptData(format!("no code for byte {}",b)))?;
        packer.put_code(code);
    }
    let header = CompressedHeader {
        freq,
        bit_count: packer.bit_count()
    };
    log::debug!("encoded stream has {} bits",header.bit_count);
    let header_bytes = header.to_bytes()?;
    let payload = packer.finish();
    compressed_out.write_all(&header_bytes).map_err(Error::IoWrite)?;
    compressed_out.write_all(&payload).map_err(Error::IoWrite)?;
    compressed_out.flush().map_err(Error::IoWrite)?;
    Ok((dat.len() as u64,(header_bytes.len() + payload.len()) as u64))
}

/// Main decompression function.
/// Nothing is written unless the whole stream decodes cleanly.
/// Returns (in_size,out_size) or error.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W) -> Result<(u64,u64)>
where R: Read, W: Write {
    let mut dat = Vec::new();
    compressed_in.read_to_end(&mut dat).map_err(Error::IoRead)?;
    let (header,offset) = CompressedHeader::parse(&dat)?;
    log::debug!("header lists {} symbols and {} bits",header.freq.len(),header.bit_count);
    let tree = HuffmanTree::build(&header.freq);
    let table = EncodingTable::from_tree(&tree);
    match table.encoded_bits(&header.freq) {
        Some(n) if n == header.bit_count => {},
        Some(n) => return Err(Error::CorruptHeader(format!("frequencies imply {} bits, header says {}",n,header.bit_count))),
        None => return Err(Error::CorruptHeader("frequencies are too large".to_string()))
    }
    let mut unpacker = BitUnpacker::create(&dat[offset..],header.bit_count)?;
    let mut ans = Vec::new();
    if let Some(root) = tree.root() {
        if let Some(byte) = tree.leaf(root) {
            // single symbol, every bit is one occurrence
            while unpacker.get_bit().is_some() {
                ans.push(byte);
            }
        } else {
            let mut node = root;
            while let Some(bit) = unpacker.get_bit() {
                node = tree.step(node,bit);
                if let Some(byte) = tree.leaf(node) {
                    ans.push(byte);
                    node = root;
                }
            }
            if node != root {
                return Err(Error::CorruptData("bit stream ends inside a code".to_string()));
            }
        }
    }
    if ans.len() as u64 != header.freq.total() {
        log::error!("decoded {} bytes, header counts {}",ans.len(),header.freq.total());
        return Err(Error::CorruptData(format!("decoded {} bytes, expected {}",ans.len(),header.freq.total())));
    }
    expanded_out.write_all(&ans).map_err(Error::IoWrite)?;
    expanded_out.flush().map_err(Error::IoWrite)?;
    Ok((dat.len() as u64,ans.len() as u64))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8]) -> Result<Vec<u8>> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8]) -> Result<Vec<u8>> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
fn noise(len: usize,mut seed: u32) -> Vec<u8> {
    let mut ans = Vec::with_capacity(len);
    for _i in 0..len {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        ans.push((seed >> 24) as u8);
    }
    ans
}

#[test]
fn compression_works() {
    // a=2 b=1, b is lighter so it goes left: b=0, a=1, stream is 110 padded
    let compressed = compress_slice("aab".as_bytes()).expect("compression failed");
    let expected = "02000000 61 02000000 62 01000000 0300000000000000 C0";
    assert_eq!(compressed,hex::decode(expected.replace(" ","")).unwrap());
}

#[test]
fn degenerate_alphabet() {
    let compressed = compress_slice("aaaa".as_bytes()).expect("compression failed");
    let expected = "01000000 61 04000000 0400000000000000 00";
    assert_eq!(compressed,hex::decode(expected.replace(" ","")).unwrap());
    let (header,_) = CompressedHeader::parse(&compressed).expect("bad header");
    assert_eq!(header.bit_count,4);
    // 4 padding bits must not turn into 4 more a's
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(expanded,"aaaa".as_bytes().to_vec());
}

#[test]
fn empty_input() {
    let compressed = compress_slice(&[]).expect("compression failed");
    assert_eq!(compressed,hex::decode("000000000000000000000000").unwrap());
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert!(expanded.is_empty());
}

#[test]
fn invertibility() {
    let all_bytes: Vec<u8> = (0..=255).collect();
    let cases: Vec<Vec<u8>> = vec![
        "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().to_vec(),
        "x".as_bytes().to_vec(),
        vec![0;1000],
        all_bytes.repeat(3),
        noise(10000,1),
        "TOBEORNOTTOBEORTOBEORNOT#\n".repeat(200).into_bytes()
    ];
    for test_data in cases {
        let compressed = compress_slice(&test_data).expect("compression failed");
        let expanded = expand_slice(&compressed).expect("expansion failed");
        assert_eq!(test_data,expanded);
    }
}

#[test]
fn compression_is_deterministic() {
    let test_data = noise(5000,7);
    let first = compress_slice(&test_data).expect("compression failed");
    let second = compress_slice(&test_data).expect("compression failed");
    assert_eq!(first,second);
}

#[test]
fn header_is_consistent() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let (header,offset) = CompressedHeader::parse(&compressed).expect("bad header");
    let freq = build_frequency_table(test_data);
    assert_eq!(header.freq,freq);
    let table = EncodingTable::from_tree(&HuffmanTree::build(&freq));
    let code_bits: u64 = test_data.iter().map(|b| table.get(*b).unwrap().len() as u64).sum();
    assert_eq!(header.bit_count,code_bits);
    assert_eq!((compressed.len() - offset) as u64,(code_bits + 7) / 8);
}

#[test]
fn truncation_is_rejected() {
    let compressed = compress_slice("aab".as_bytes()).expect("compression failed");
    for end in 0..compressed.len() {
        match expand_slice(&compressed[0..end]) {
            Err(Error::CorruptHeader(_)) => {},
            other => panic!("truncated to {} gave {:?}",end,other)
        }
    }
}

#[test]
fn bad_symbol_count_is_rejected() {
    for unique in ["2C010000","FFFFFFFF","02000000"] {
        // the last one declares 2 symbols but carries only 1
        let dat = hex::decode([unique,"61 04000000 0400000000000000 00"].concat().replace(" ","")).unwrap();
        assert!(matches!(expand_slice(&dat),Err(Error::CorruptHeader(_))));
    }
}

#[test]
fn inconsistent_header_is_rejected() {
    let cases = [
        // duplicate byte
        "02000000 61 02000000 61 01000000 0300000000000000 C0",
        // zero count
        "02000000 61 00000000 62 01000000 0100000000000000 00",
        // bit count disagrees with frequencies
        "02000000 61 02000000 62 01000000 0400000000000000 C0",
        // negative bit count
        "01000000 61 04000000 FFFFFFFFFFFFFFFF",
        // extra payload byte
        "02000000 61 02000000 62 01000000 0300000000000000 C0 00"
    ];
    for case in cases {
        let dat = hex::decode(case.replace(" ","")).unwrap();
        assert!(matches!(expand_slice(&dat),Err(Error::CorruptHeader(_))),"accepted {}",case);
    }
}

#[test]
fn bad_code_stream_is_rejected() {
    // a=1 b=1 c=2 gives c=0 a=10 b=11 and 6 bits total
    let header = "03000000 61 01000000 62 01000000 63 02000000 0600000000000000";
    // 000001: five c's then a dangling half code
    let dat = hex::decode([header,"04"].concat().replace(" ","")).unwrap();
    assert!(matches!(expand_slice(&dat),Err(Error::CorruptData(_))));
    // 101010: three a's, too few symbols
    let dat = hex::decode([header,"A8"].concat().replace(" ","")).unwrap();
    assert!(matches!(expand_slice(&dat),Err(Error::CorruptData(_))));
    // 101100 (a b c c) is what the compressor would write for "abcc"
    let dat = hex::decode([header,"B0"].concat().replace(" ","")).unwrap();
    assert_eq!(expand_slice(&dat).expect("expansion failed"),"abcc".as_bytes().to_vec());
    assert_eq!(compress_slice("abcc".as_bytes()).unwrap(),dat);
}
