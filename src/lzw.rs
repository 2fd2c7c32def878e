//! LZW Compression
//!
//! Codes are written as 32 bit little endian integers, one per match, with no
//! header, no clear code, and no stop code.  The dictionary starts with the 256
//! single byte strings, new strings get codes starting at 256.
//!
//! When the dictionary is full it is either frozen (the default) or the operation
//! fails, depending on `Options::overflow`.  Compressor and expander must use the
//! same options.

use std::io::{Cursor,Read,Write,BufReader,BufWriter,ErrorKind};
use std::collections::HashMap;
use crate::{Error,Result};

/// number of codes that are defined before any input is seen
pub const ROOT_CODES: usize = 256;
/// bytes per code in the compressed stream
pub const CODE_BYTES: usize = 4;

/// What to do when a new string is found but the dictionary is full
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Overflow {
    /// stop adding strings, keep coding with what is there
    Freeze,
    /// return `Error::UnsupportedConfiguration`
    Reject
}

/// Options controlling compression
#[derive(Clone,Debug)]
pub struct Options {
    /// maximum number of dictionary entries, including the 256 roots
    pub max_dict_size: usize,
    /// behavior once `max_dict_size` is reached
    pub overflow: Overflow
}

pub const STD_OPTIONS: Options = Options {
    max_dict_size: 4096,
    overflow: Overflow::Freeze
};

impl Options {
    fn verify(&self) -> Result<()> {
        if self.max_dict_size < ROOT_CODES || self.max_dict_size as u64 > u32::MAX as u64 + 1 {
            return Err(Error::UnsupportedConfiguration(format!("dictionary size {} is out of range",self.max_dict_size)));
        }
        Ok(())
    }
}

/// Dictionary used during compression, (prefix code,next byte) maps to code.
/// Single byte strings are implied and never stored.
struct EncodeDictionary {
    links: HashMap<(u32,u8),u32>,
    next_code: usize,
    opt: Options
}

impl EncodeDictionary {
    fn create(opt: &Options) -> Self {
        Self {
            links: HashMap::new(),
            next_code: ROOT_CODES,
            opt: opt.clone()
        }
    }
    fn lookup(&self,prefix: u32,sym: u8) -> Option<u32> {
        self.links.get(&(prefix,sym)).copied()
    }
    /// Add the string `prefix`+`sym` under the next code, if there is room.
    fn insert(&mut self,prefix: u32,sym: u8) -> Result<()> {
        if self.next_code >= self.opt.max_dict_size {
            return match self.opt.overflow {
                Overflow::Freeze => Ok(()),
                Overflow::Reject => Err(Error::UnsupportedConfiguration(format!("dictionary is full at {} entries",self.next_code)))
            };
        }
        log::trace!("add {} linking to {}.{}",self.next_code,prefix,sym);
        self.links.insert((prefix,sym),self.next_code as u32);
        self.next_code += 1;
        if self.next_code == self.opt.max_dict_size {
            log::debug!("dictionary is full");
        }
        Ok(())
    }
}

/// Dictionary element for expansion.
/// Stores the code of the string minus its last byte, the last byte, and the first byte.
#[derive(Clone)]
struct Link {
    prefix: Option<u32>,
    sym: u8,
    first: u8
}

/// Dictionary used during expansion, code is the index.
struct DecodeDictionary {
    links: Vec<Link>,
    opt: Options
}

impl DecodeDictionary {
    fn create(opt: &Options) -> Self {
        let mut links = Vec::with_capacity(opt.max_dict_size.min(1 << 16));
        for i in 0..ROOT_CODES {
            links.push(Link { prefix: None, sym: i as u8, first: i as u8 });
        }
        Self {
            links,
            opt: opt.clone()
        }
    }
    fn next_code(&self) -> usize {
        self.links.len()
    }
    fn is_full(&self) -> bool {
        self.links.len() >= self.opt.max_dict_size
    }
    fn first_byte(&self,code: u32) -> u8 {
        self.links[code as usize].first
    }
    /// Walk back through the prefix links to form the string
    fn get_string(&self,code: u32) -> Vec<u8> {
        let mut rev = Vec::new();
        let mut curr = Some(code);
        while let Some(c) = curr {
            let link = &self.links[c as usize];
            rev.push(link.sym);
            curr = link.prefix;
        }
        rev.reverse();
        rev
    }
    /// Mirror of `EncodeDictionary::insert`, must be called at the same points in the stream.
    fn insert(&mut self,prefix: u32,sym: u8) -> Result<()> {
        if self.is_full() {
            return match self.opt.overflow {
                Overflow::Freeze => Ok(()),
                Overflow::Reject => Err(Error::UnsupportedConfiguration(format!("dictionary is full at {} entries",self.links.len())))
            };
        }
        log::trace!("add {} linking to {}.{}",self.links.len(),prefix,sym);
        let first = self.first_byte(prefix);
        self.links.push(Link { prefix: Some(prefix), sym, first });
        Ok(())
    }
}

fn put_code<W: Write>(code: u32,writer: &mut W) -> Result<()> {
    log::trace!("code: {}",code);
    writer.write_all(&u32::to_le_bytes(code)).map_err(Error::IoWrite)
}

/// Read one code, returns None at a clean end of stream.
fn get_code<R: Read>(reader: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8;CODE_BYTES];
    let mut filled = 0;
    while filled < CODE_BYTES {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind()==ErrorKind::Interrupted => {},
            Err(e) => return Err(Error::IoRead(e))
        }
    }
    match filled {
        0 => Ok(None),
        CODE_BYTES => Ok(Some(u32::from_le_bytes(buf))),
        n => Err(Error::CorruptData(format!("stream ends with {} stray bytes",n)))
    }
}

/// Main compression function.
/// `expanded_in` is usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64)>
where R: Read, W: Write {
    opt.verify()?;
    let reader = BufReader::new(expanded_in);
    let mut writer = BufWriter::new(compressed_out);
    let mut dict = EncodeDictionary::create(opt);
    let mut in_size: u64 = 0;
    let mut code_count: u64 = 0;
    // code of the longest string matched so far
    let mut curr_match: Option<u32> = None;
    log::debug!("entering loop over symbols");
    for sym in reader.bytes() {
        let sym = sym.map_err(Error::IoRead)?;
        in_size += 1;
        curr_match = match curr_match {
            None => Some(sym as u32),
            Some(prefix) => match dict.lookup(prefix,sym) {
                Some(code) => Some(code),
                None => {
                    put_code(prefix,&mut writer)?;
                    code_count += 1;
                    dict.insert(prefix,sym)?;
                    Some(sym as u32)
                }
            }
        };
    }
    if let Some(code) = curr_match {
        put_code(code,&mut writer)?;
        code_count += 1;
    }
    writer.flush().map_err(Error::IoWrite)?;
    log::debug!("wrote {} codes, dictionary has {} entries",code_count,dict.next_code);
    Ok((in_size,code_count*CODE_BYTES as u64))
}

/// Main decompression function.
/// `compressed_in` is usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  A code that is not yet defined is an error,
/// expansion does not stop quietly.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64)>
where R: Read, W: Write {
    opt.verify()?;
    let mut reader = BufReader::new(compressed_in);
    let mut writer = BufWriter::new(expanded_out);
    let mut dict = DecodeDictionary::create(opt);
    let mut out_size: u64 = 0;
    let mut code_count: u64 = 0;

    let mut prev_code = match get_code(&mut reader)? {
        Some(c) => c,
        None => {
            log::debug!("empty stream");
            return Ok((0,0));
        }
    };
    if prev_code as usize >= ROOT_CODES {
        log::error!("Bad LZW code, stream starts with {}",prev_code);
        return Err(Error::CorruptData(format!("first code {} is not a single byte",prev_code)));
    }
    writer.write_all(&[prev_code as u8]).map_err(Error::IoWrite)?;
    out_size += 1;
    code_count += 1;

    log::debug!("enter main LZW loop");
    while let Some(code) = get_code(&mut reader)? {
        code_count += 1;
        let next_code = dict.next_code();
        let entry = if (code as usize) < next_code {
            dict.get_string(code)
        } else if code as usize == next_code && !dict.is_full() {
            // the string being defined right now, which starts and ends with the first byte of prev
            let mut s = dict.get_string(prev_code);
            s.push(dict.first_byte(prev_code));
            s
        } else {
            log::error!("Bad LZW code, expected at most {}, got {}",next_code,code);
            return Err(Error::CorruptData(format!("undefined code {} at position {}",code,code_count-1)));
        };
        dict.insert(prev_code,entry[0])?;
        writer.write_all(&entry).map_err(Error::IoWrite)?;
        log::trace!("  write {} as {:?}",code,entry);
        out_size += entry.len() as u64;
        prev_code = code;
    }
    writer.flush().map_err(Error::IoWrite)?;
    log::debug!("read {} codes",code_count);
    Ok((code_count*CODE_BYTES as u64,out_size))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
fn codes_to_bytes(codes: &[u32]) -> Vec<u8> {
    codes.iter().flat_map(|c| u32::to_le_bytes(*c)).collect()
}

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
    // a, b, then ab which was added after emitting a
    let compressed = compress_slice("abab".as_bytes(),&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,hex::decode("61000000 62000000 00010000".replace(" ","")).unwrap());
    let compressed = compress_slice("ababab".as_bytes(),&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,hex::decode("61000000 62000000 00010000 00010000".replace(" ","")).unwrap());
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(expanded,"ababab".as_bytes().to_vec());
}

#[test]
fn compression_works_wiki() {
    // Example adapted from wikipedia, # and newline are ordinary symbols
    let test_data = "TOBEORNOTTOBEORTOBEORNOT#\n".as_bytes();
    let codes = [0x54,0x4f,0x42,0x45,0x4f,0x52,0x4e,0x4f,0x54,0x100,0x102,0x104,0x109,0x103,0x105,0x107,0x23,0x0a];
    let compressed = compress_slice(test_data,&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,codes_to_bytes(&codes));
}

#[test]
fn code_defined_by_itself() {
    // aaa gives 97 then 256, which the expander has not finished defining when it is read
    let compressed = compress_slice("aaa".as_bytes(),&STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed,codes_to_bytes(&[97,256]));
    let expanded = expand_slice(&codes_to_bytes(&[97,256,257]),&STD_OPTIONS).expect("expansion failed");
    assert_eq!(expanded,"aaaaaa".as_bytes().to_vec());
    assert_eq!(compress_slice("aaaaaa".as_bytes(),&STD_OPTIONS).unwrap(),codes_to_bytes(&[97,256,257]));
}

#[test]
fn empty_input() {
    let compressed = compress_slice(&[],&STD_OPTIONS).expect("compression failed");
    assert!(compressed.is_empty());
    let expanded = expand_slice(&[],&STD_OPTIONS).expect("expansion failed");
    assert!(expanded.is_empty());
}

#[test]
fn invertibility() {
    let cases: Vec<Vec<u8>> = vec![
        "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes().to_vec(),
        "z".as_bytes().to_vec(),
        vec![7;5000],
        noise(4000,3),
        "TOBEORNOTTOBEORTOBEORNOT#\n".repeat(100).into_bytes()
    ];
    for test_data in cases {
        let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
        let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
        assert_eq!(test_data,expanded);
    }
}

#[test]
fn invertibility_with_full_dictionary() {
    // random data creates a new entry for almost every code, so 4096 is passed quickly
    let mut test_data = noise(60000,11);
    test_data.append(&mut "I am Sam. Sam I am. ".repeat(500).into_bytes());
    let compressed = compress_slice(&test_data,&STD_OPTIONS).expect("compression failed");
    assert!(compressed.len()/CODE_BYTES > STD_OPTIONS.max_dict_size);
    let expanded = expand_slice(&compressed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn frozen_dictionary_never_grows() {
    let opt = Options { max_dict_size: 258, overflow: Overflow::Freeze };
    let compressed = compress_slice("ababab".as_bytes(),&opt).expect("compression failed");
    assert_eq!(compressed,codes_to_bytes(&[97,98,256,256]));
    // only ab and ba exist, so aba needs 3 codes
    let compressed = compress_slice("abababa".as_bytes(),&opt).expect("compression failed");
    assert_eq!(compressed,codes_to_bytes(&[97,98,256,256,97]));
    assert_eq!(expand_slice(&compressed,&opt).unwrap(),"abababa".as_bytes().to_vec());
    // the code that would come next is not valid once frozen
    let bogus = codes_to_bytes(&[97,98,258]);
    assert!(matches!(expand_slice(&bogus,&opt),Err(Error::CorruptData(_))));
    let no_learning = Options { max_dict_size: 256, overflow: Overflow::Freeze };
    let compressed = compress_slice("abab".as_bytes(),&no_learning).expect("compression failed");
    assert_eq!(compressed,codes_to_bytes(&[97,98,97,98]));
}

#[test]
fn full_dictionary_can_be_rejected() {
    let opt = Options { max_dict_size: 258, overflow: Overflow::Reject };
    assert!(compress_slice("abab".as_bytes(),&opt).is_ok());
    assert!(matches!(compress_slice("abcabc".as_bytes(),&opt),Err(Error::UnsupportedConfiguration(_))));
    assert!(matches!(expand_slice(&codes_to_bytes(&[97,98,99,256]),&opt),Err(Error::UnsupportedConfiguration(_))));
}

#[test]
fn bad_options_are_rejected() {
    let opt = Options { max_dict_size: 100, overflow: Overflow::Freeze };
    assert!(matches!(compress_slice("abc".as_bytes(),&opt),Err(Error::UnsupportedConfiguration(_))));
    assert!(matches!(expand_slice(&codes_to_bytes(&[97]),&opt),Err(Error::UnsupportedConfiguration(_))));
}

#[test]
fn undefined_code_is_rejected() {
    // after two codes only 256 is defined, 257 is being defined, 261 is garbage
    let corrupt = codes_to_bytes(&[97,98,261]);
    assert!(matches!(expand_slice(&corrupt,&STD_OPTIONS),Err(Error::CorruptData(_))));
    let corrupt = codes_to_bytes(&[256]);
    assert!(matches!(expand_slice(&corrupt,&STD_OPTIONS),Err(Error::CorruptData(_))));
    let corrupt = codes_to_bytes(&[97,u32::MAX]);
    assert!(matches!(expand_slice(&corrupt,&STD_OPTIONS),Err(Error::CorruptData(_))));
}

#[test]
fn partial_code_is_rejected() {
    let mut corrupt = codes_to_bytes(&[97,98]);
    corrupt.push(0);
    assert!(matches!(expand_slice(&corrupt,&STD_OPTIONS),Err(Error::CorruptData(_))));
}
