//! Codec boundary
//!
//! Four whole-buffer operations, two per method, each returning the transformed
//! bytes along with `Stats`.  The file variants read the entire input, transform it
//! in memory, and only create the output once the transform has succeeded.

use std::fs::File;
use std::io::{Read,Write};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration,Instant};
use crate::{huffman,lzw,Error,Result};

/// Compression method selector
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Method {
    Huffman,
    Lzw
}

impl Method {
    pub const NAMES: [&'static str;2] = ["huffman","lzw"];
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Huffman => "huffman",
            Method::Lzw => "lzw"
        }
    }
}

impl FromStr for Method {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "huffman" => Ok(Method::Huffman),
            "lzw" => Ok(Method::Lzw),
            _ => Err(Error::UnsupportedConfiguration(format!("unknown method {}",s)))
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",self.as_str())
    }
}

/// Sizes and timing of one operation
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct Stats {
    pub in_size: u64,
    pub out_size: u64,
    pub elapsed: Duration
}

impl Stats {
    /// fraction of the input that was saved, negative if the output grew
    pub fn ratio(&self) -> f64 {
        if self.in_size == 0 {
            return 0.0;
        }
        1.0 - self.out_size as f64 / self.in_size as f64
    }
}

fn timed<F>(dat: &[u8],f: F) -> Result<(Vec<u8>,Stats)>
where F: Fn(&[u8]) -> Result<Vec<u8>> {
    let start = Instant::now();
    let ans = f(dat)?;
    let stats = Stats {
        in_size: dat.len() as u64,
        out_size: ans.len() as u64,
        elapsed: start.elapsed()
    };
    Ok((ans,stats))
}

pub fn huffman_compress(dat: &[u8]) -> Result<(Vec<u8>,Stats)> {
    timed(dat,huffman::compress_slice)
}

pub fn huffman_expand(dat: &[u8]) -> Result<(Vec<u8>,Stats)> {
    timed(dat,huffman::expand_slice)
}

pub fn lzw_compress(dat: &[u8]) -> Result<(Vec<u8>,Stats)> {
    timed(dat,|s| lzw::compress_slice(s,&lzw::STD_OPTIONS))
}

pub fn lzw_expand(dat: &[u8]) -> Result<(Vec<u8>,Stats)> {
    timed(dat,|s| lzw::expand_slice(s,&lzw::STD_OPTIONS))
}

pub fn compress(method: Method,dat: &[u8]) -> Result<(Vec<u8>,Stats)> {
    match method {
        Method::Huffman => huffman_compress(dat),
        Method::Lzw => lzw_compress(dat)
    }
}

pub fn expand(method: Method,dat: &[u8]) -> Result<(Vec<u8>,Stats)> {
    match method {
        Method::Huffman => huffman_expand(dat),
        Method::Lzw => lzw_expand(dat)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|source| Error::IoOpen { path: path.to_path_buf(), source })?;
    let mut ans = Vec::new();
    file.read_to_end(&mut ans).map_err(Error::IoRead)?;
    Ok(ans)
}

fn write_file(path: &Path,dat: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|source| Error::IoOpen { path: path.to_path_buf(), source })?;
    file.write_all(dat).map_err(Error::IoWrite)?;
    file.flush().map_err(Error::IoWrite)
}

fn transform_file<F>(path_in: &Path,path_out: &Path,f: F) -> Result<Stats>
where F: Fn(&[u8]) -> Result<(Vec<u8>,Stats)> {
    let start = Instant::now();
    let dat = read_file(path_in)?;
    let (ans,mut stats) = f(&dat)?;
    write_file(path_out,&ans)?;
    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// Compress the file at `path_in` into a new file at `path_out`
pub fn compress_file(method: Method,path_in: &Path,path_out: &Path) -> Result<Stats> {
    log::debug!("compress {} with {}",path_in.display(),method);
    transform_file(path_in,path_out,|dat| compress(method,dat))
}

/// Expand the file at `path_in` into a new file at `path_out`
pub fn expand_file(method: Method,path_in: &Path,path_out: &Path) -> Result<Stats> {
    log::debug!("expand {} with {}",path_in.display(),method);
    transform_file(path_in,path_out,|dat| expand(method,dat))
}

// *************** TESTS *****************

#[test]
fn byte_operations_report_sizes() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(20).into_bytes();
    for method in [Method::Huffman,Method::Lzw] {
        let (compressed,stats) = compress(method,&test_data).expect("compression failed");
        assert_eq!(stats.in_size,test_data.len() as u64);
        assert_eq!(stats.out_size,compressed.len() as u64);
        assert!(stats.ratio() > 0.0);
        let (expanded,stats) = expand(method,&compressed).expect("expansion failed");
        assert_eq!(stats.in_size,compressed.len() as u64);
        assert_eq!(stats.out_size,test_data.len() as u64);
        assert_eq!(expanded,test_data);
    }
}

#[test]
fn methods_parse() {
    for name in Method::NAMES {
        let method: Method = name.parse().expect("parse failed");
        assert_eq!(method.to_string(),name);
    }
    assert!(matches!("lzss".parse::<Method>(),Err(Error::UnsupportedConfiguration(_))));
}

#[test]
fn empty_round_trip() {
    for method in [Method::Huffman,Method::Lzw] {
        let (compressed,_) = compress(method,&[]).expect("compression failed");
        let (expanded,stats) = expand(method,&compressed).expect("expansion failed");
        assert!(expanded.is_empty());
        assert_eq!(stats.out_size,0);
    }
}

#[test]
fn file_round_trip() {
    let temp_dir = tempfile::tempdir().expect("no temp dir");
    let orig = temp_dir.path().join("orig.txt");
    let packed = temp_dir.path().join("orig.pack");
    let restored = temp_dir.path().join("orig.restored");
    let test_data = "TOBEORNOTTOBEORTOBEORNOT#\n".repeat(50).into_bytes();
    std::fs::write(&orig,&test_data).expect("write failed");
    for method in [Method::Huffman,Method::Lzw] {
        let stats = compress_file(method,&orig,&packed).expect("compression failed");
        assert_eq!(stats.in_size,test_data.len() as u64);
        assert_eq!(stats.out_size,std::fs::metadata(&packed).unwrap().len());
        expand_file(method,&packed,&restored).expect("expansion failed");
        assert_eq!(std::fs::read(&restored).unwrap(),test_data);
    }
}

#[test]
fn missing_input_is_open_error() {
    let temp_dir = tempfile::tempdir().expect("no temp dir");
    let missing = temp_dir.path().join("missing");
    let out = temp_dir.path().join("out");
    match compress_file(Method::Lzw,&missing,&out) {
        Err(Error::IoOpen { path, .. }) => assert_eq!(path,missing),
        other => panic!("expected open error, got {:?}",other)
    }
    assert!(!out.exists());
}

#[test]
fn failed_expand_leaves_no_output() {
    let temp_dir = tempfile::tempdir().expect("no temp dir");
    let corrupt = temp_dir.path().join("corrupt.lzw");
    let out = temp_dir.path().join("out");
    std::fs::write(&corrupt,[97u8,0,0,0,5,1,0,0]).expect("write failed");
    assert!(matches!(expand_file(Method::Lzw,&corrupt,&out),Err(Error::CorruptData(_))));
    assert!(!out.exists());
}
