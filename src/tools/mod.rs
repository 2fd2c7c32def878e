//! Building blocks shared by the codecs

pub mod bit_packer;
pub mod huff_tree;
