//! Static Huffman tree used by the `huffman` module.
//!
//! The tree is stored as an arena of nodes.  Leaves are created first, in the
//! order their bytes first appeared in the input, and internal nodes are appended
//! as they are merged.  When two weights are equal the node with the lower arena
//! index is taken first, so the same frequency table always yields the same tree.

use bit_vec::BitVec;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Occurrence counts, ordered by first appearance
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct FrequencyTable {
    entries: Vec<(u8,u64)>
}

impl FrequencyTable {
    /// Count every byte of `dat`
    pub fn from_bytes(dat: &[u8]) -> Self {
        let mut counts = [0u64;256];
        let mut order = Vec::new();
        for &b in dat {
            if counts[b as usize] == 0 {
                order.push(b);
            }
            counts[b as usize] += 1;
        }
        Self {
            entries: order.into_iter().map(|b| (b,counts[b as usize])).collect()
        }
    }
    /// Caller is responsible for distinct bytes and nonzero counts.
    pub fn from_entries(entries: Vec<(u8,u64)>) -> Self {
        Self {
            entries
        }
    }
    pub fn entries(&self) -> &[(u8,u64)] {
        &self.entries
    }
    /// number of distinct bytes
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// total number of bytes that were counted
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_,f)| f).sum()
    }
}

#[derive(Clone,Debug)]
enum Node {
    Leaf {
        byte: u8,
        weight: u64
    },
    Internal {
        weight: u64,
        left: usize,
        right: usize
    }
}

impl Node {
    fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } => *weight,
            Node::Internal { weight, .. } => *weight
        }
    }
}

#[derive(Clone,Debug)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: Option<usize>
}

impl HuffmanTree {
    pub fn build(freq: &FrequencyTable) -> Self {
        let mut nodes: Vec<Node> = freq.entries().iter()
            .map(|&(byte,weight)| Node::Leaf { byte, weight })
            .collect();
        let mut heap: BinaryHeap<Reverse<(u64,usize)>> = nodes.iter()
            .enumerate()
            .map(|(i,n)| Reverse((n.weight(),i)))
            .collect();
        while heap.len() > 1 {
            // cannot fail, heap holds at least 2
            let Some(Reverse((w1,left))) = heap.pop() else { break };
            let Some(Reverse((w2,right))) = heap.pop() else { break };
            let idx = nodes.len();
            nodes.push(Node::Internal { weight: w1 + w2, left, right });
            heap.push(Reverse((w1 + w2,idx)));
        }
        let root = heap.pop().map(|Reverse((_,i))| i);
        log::debug!("tree has {} nodes",nodes.len());
        Self {
            nodes,
            root
        }
    }
    /// arena index of the root, None if the tree is empty
    pub fn root(&self) -> Option<usize> {
        self.root
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    /// If `node` is a leaf return its byte
    pub fn leaf(&self,node: usize) -> Option<u8> {
        match self.nodes[node] {
            Node::Leaf { byte, .. } => Some(byte),
            Node::Internal { .. } => None
        }
    }
    /// Move from an internal node to its left (false) or right (true) child.
    /// Leaves have no children, they return themselves.
    pub fn step(&self,node: usize,bit: bool) -> usize {
        match self.nodes[node] {
            Node::Internal { left, right, .. } => match bit {
                false => left,
                true => right
            },
            Node::Leaf { .. } => node
        }
    }
}

/// Code for each byte value, derived from a `HuffmanTree`
#[derive(Clone,Debug)]
pub struct EncodingTable {
    codes: Vec<Option<BitVec>>
}

impl EncodingTable {
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut codes = vec![None;256];
        let root = match tree.root() {
            Some(r) => r,
            None => return Self { codes }
        };
        if let Some(byte) = tree.leaf(root) {
            // lone symbol still needs a bit, otherwise nothing could be decoded
            codes[byte as usize] = Some(BitVec::from_elem(1,false));
            return Self { codes };
        }
        let mut stack = vec![(root,BitVec::new())];
        while let Some((node,path)) = stack.pop() {
            match tree.nodes[node] {
                Node::Leaf { byte, .. } => {
                    codes[byte as usize] = Some(path);
                },
                Node::Internal { left, right, .. } => {
                    let mut rpath = path.clone();
                    rpath.push(true);
                    let mut lpath = path;
                    lpath.push(false);
                    stack.push((right,rpath));
                    stack.push((left,lpath));
                }
            }
        }
        Self { codes }
    }
    pub fn get(&self,byte: u8) -> Option<&BitVec> {
        self.codes[byte as usize].as_ref()
    }
    /// Length of the encoded stream for the bytes that were counted in `freq`.
    /// Returns None if `freq` has a byte this table does not know, or the sum overflows.
    pub fn encoded_bits(&self,freq: &FrequencyTable) -> Option<u64> {
        let mut ans: u64 = 0;
        for &(byte,count) in freq.entries() {
            let len = self.get(byte)?.len() as u64;
            ans = ans.checked_add(len.checked_mul(count)?)?;
        }
        Some(ans)
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn code_str(table: &EncodingTable,byte: u8) -> String {
    table.get(byte).unwrap().iter().map(|b| if b { '1' } else { '0' }).collect()
}

#[test]
fn frequencies_keep_first_appearance() {
    let freq = FrequencyTable::from_bytes(b"banana");
    assert_eq!(freq.entries(),&[(b'b',1),(b'a',3),(b'n',2)]);
    assert_eq!(freq.len(),3);
    assert_eq!(freq.total(),6);
    assert!(FrequencyTable::from_bytes(b"").is_empty());
}

#[test]
fn ties_go_to_first_appearance() {
    // a and b both have weight 1, a appeared first so it is popped first and goes left
    let tree = HuffmanTree::build(&FrequencyTable::from_bytes(b"ab"));
    let table = EncodingTable::from_tree(&tree);
    assert_eq!(code_str(&table,b'a'),"0");
    assert_eq!(code_str(&table,b'b'),"1");
    let tree = HuffmanTree::build(&FrequencyTable::from_bytes(b"ba"));
    let table = EncodingTable::from_tree(&tree);
    assert_eq!(code_str(&table,b'b'),"0");
    assert_eq!(code_str(&table,b'a'),"1");
}

#[test]
fn merged_node_loses_tie_to_leaf() {
    // a=1,b=1 merge into weight 2, which ties with c=2; the leaf c has the lower index
    let tree = HuffmanTree::build(&FrequencyTable::from_bytes(b"abcc"));
    let table = EncodingTable::from_tree(&tree);
    assert_eq!(code_str(&table,b'c'),"0");
    assert_eq!(code_str(&table,b'a'),"10");
    assert_eq!(code_str(&table,b'b'),"11");
}

#[test]
fn single_symbol_gets_one_bit() {
    let tree = HuffmanTree::build(&FrequencyTable::from_bytes(b"zzzz"));
    assert_eq!(tree.node_count(),1);
    let root = tree.root().unwrap();
    assert_eq!(tree.leaf(root),Some(b'z'));
    let table = EncodingTable::from_tree(&tree);
    assert_eq!(code_str(&table,b'z'),"0");
    assert_eq!(table.encoded_bits(&FrequencyTable::from_bytes(b"zzzz")),Some(4));
}

#[test]
fn empty_tree_has_no_codes() {
    let tree = HuffmanTree::build(&FrequencyTable::from_bytes(b""));
    assert_eq!(tree.root(),None);
    let table = EncodingTable::from_tree(&tree);
    assert!((0..=255).all(|b| table.get(b).is_none()));
}

#[test]
fn codes_are_prefix_free() {
    let text = b"I am Sam. Sam I am. I do not like this Sam I am.\n";
    let freq = FrequencyTable::from_bytes(text);
    let table = EncodingTable::from_tree(&HuffmanTree::build(&freq));
    let codes: Vec<String> = freq.entries().iter().map(|(b,_)| code_str(&table,*b)).collect();
    for (i,a) in codes.iter().enumerate() {
        for (j,b) in codes.iter().enumerate() {
            if i != j {
                assert!(!b.starts_with(a.as_str()),"{} is a prefix of {}",a,b);
            }
        }
    }
    // frequent symbols never get longer codes than rare ones
    let space = code_str(&table,b' ').len();
    let newline = code_str(&table,b'\n').len();
    assert!(space <= newline);
}

#[test]
fn tree_walk_reaches_every_leaf() {
    let freq = FrequencyTable::from_bytes(b"abracadabra");
    let tree = HuffmanTree::build(&freq);
    let table = EncodingTable::from_tree(&tree);
    for &(byte,_) in freq.entries() {
        let mut node = tree.root().unwrap();
        for bit in table.get(byte).unwrap().iter() {
            node = tree.step(node,bit);
        }
        assert_eq!(tree.leaf(node),Some(byte));
    }
}
