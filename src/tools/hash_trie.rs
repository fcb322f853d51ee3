//! Hash addressed trie for the LZW dictionary.
//!
//! A string is represented by the code of its prefix (the parent) and its last symbol.
//! Encoding looks up (parent,symbol) pairs in an open addressed table, collisions are
//! resolved by stepping backwards with a stride that depends on the starting slot.
//! Since the table length is prime, the probe sequence visits every slot before repeating.
//!
//! Decoding needs the opposite mapping, code to (parent,symbol), which is kept in a
//! second table indexed directly by code.

use crate::Error;

/// Prime length of the hash table, must exceed the number of assignable codes
pub const TABLE_SIZE: usize = 9973;
/// First code available for multi-symbol strings, lower codes are literals and controls
pub const FIRST_CODE: u16 = 258;
/// Largest code that can be assigned
pub const MAX_CODE: u16 = 8191;
/// shift applied to the symbol when forming the starting slot
const HASH_SHIFT: usize = 13 - 8;

/// Occupied slot in the hash table
#[derive(Clone,Copy)]
struct Node {
    code: u16,
    parent: u16,
    sym: u8
}

/// Reverse mapping from a code to the string it extends
#[derive(Clone,Copy,PartialEq,Debug)]
pub struct Link {
    pub parent: u16,
    pub sym: u8
}

/// Result of probing for a (parent,symbol) pair
#[derive(PartialEq,Debug)]
pub enum Probe {
    /// the string already has this code
    Found(u16),
    /// the string is new, this free slot is where it belongs
    Vacant(usize)
}

pub struct HashTrie {
    slots: Vec<Option<Node>>,
    links: Vec<Option<Link>>,
    next_code: u16
}

impl HashTrie {
    pub fn new() -> Self {
        Self {
            slots: vec![None;TABLE_SIZE],
            links: vec![None;TABLE_SIZE],
            next_code: FIRST_CODE
        }
    }
    /// Empty every slot and restart code assignment, must be called at the start of every pass.
    pub fn reset(&mut self) {
        self.slots.fill(None);
        self.links.fill(None);
        self.next_code = FIRST_CODE;
    }
    /// Code that the next insertion will receive.  Once this exceeds `MAX_CODE`
    /// the dictionary is frozen.
    pub fn next_code(&self) -> u16 {
        self.next_code
    }
    pub fn is_full(&self) -> bool {
        self.next_code > MAX_CODE
    }
    /// Find the slot for the string formed by appending `sym` to the string `parent`.
    /// The first slot that is either empty or holds the same pair is the answer.
    pub fn probe(&self,parent: u16,sym: u8) -> Result<Probe,Error> {
        let mut idx = ((sym as usize) << HASH_SHIFT ^ parent as usize) % TABLE_SIZE;
        let stride = match idx {
            0 => 1,
            i => TABLE_SIZE - i
        };
        for _i in 0..TABLE_SIZE {
            match self.slots[idx] {
                None => return Ok(Probe::Vacant(idx)),
                Some(node) if node.parent == parent && node.sym == sym => return Ok(Probe::Found(node.code)),
                Some(_) => {}
            }
            idx = match idx >= stride {
                true => idx - stride,
                false => idx + TABLE_SIZE - stride
            };
        }
        log::error!("hash probe for ({},{}) visited every slot",parent,sym);
        Err(Error::DictionaryExhausted)
    }
    /// Assign the next code to (parent,sym) in the vacant `slot` found by `probe`.
    /// Returns the new code, or `None` if the dictionary is frozen, in which case nothing changes.
    pub fn add_child(&mut self,slot: usize,parent: u16,sym: u8) -> Option<u16> {
        let code = self.add_link(parent,sym)?;
        self.slots[slot] = Some(Node {
            code,
            parent,
            sym
        });
        Some(code)
    }
    /// Assign the next code to (parent,sym) in the reverse table only, this is all the decoder needs.
    /// Returns the new code, or `None` if the dictionary is frozen.
    pub fn add_link(&mut self,parent: u16,sym: u8) -> Option<u16> {
        if self.is_full() {
            return None;
        }
        let code = self.next_code;
        self.links[code as usize] = Some(Link { parent, sym });
        self.next_code += 1;
        Some(code)
    }
    /// Look up the string that `code` stands for, one link at a time
    pub fn link(&self,code: u16) -> Option<Link> {
        *self.links.get(code as usize)?
    }
}

#[test]
fn probe_then_insert() {
    let mut trie = HashTrie::new();
    let slot = match trie.probe(b'T' as u16,b'O').expect("probe failed") {
        Probe::Vacant(slot) => slot,
        Probe::Found(_) => panic!("empty dictionary had a match")
    };
    assert_eq!(slot,((b'O' as usize) << 5) ^ b'T' as usize);
    assert_eq!(trie.add_child(slot,b'T' as u16,b'O'),Some(FIRST_CODE));
    assert_eq!(trie.probe(b'T' as u16,b'O').expect("probe failed"),Probe::Found(FIRST_CODE));
    assert_eq!(trie.link(FIRST_CODE),Some(Link { parent: b'T' as u16, sym: b'O' }));
    assert_eq!(trie.next_code(),FIRST_CODE + 1);
}

#[test]
fn collisions_step_backward() {
    // (1,0) and (33,1) hash to the same starting slot 1, stride is TABLE_SIZE-1,
    // so the second one should land in slot 2.
    let mut trie = HashTrie::new();
    assert_eq!(trie.probe(1,0).expect("probe failed"),Probe::Vacant(1));
    trie.add_child(1,1,0);
    assert_eq!(trie.probe(33,1).expect("probe failed"),Probe::Vacant(2));
    trie.add_child(2,33,1);
    assert_eq!(trie.probe(1,0).expect("probe failed"),Probe::Found(FIRST_CODE));
    assert_eq!(trie.probe(33,1).expect("probe failed"),Probe::Found(FIRST_CODE + 1));
}

#[test]
fn slot_zero_uses_unit_stride() {
    let mut trie = HashTrie::new();
    assert_eq!(trie.probe(0,0).expect("probe failed"),Probe::Vacant(0));
    // anything else starting at 0 wraps to the end of the table
    trie.slots[0] = Some(Node { code: 300, parent: 7, sym: 7 });
    assert_eq!(trie.probe(0,0).expect("probe failed"),Probe::Vacant(TABLE_SIZE - 1));
}

#[test]
fn frozen_after_max_code() {
    let mut trie = HashTrie::new();
    for i in FIRST_CODE..=MAX_CODE {
        assert_eq!(trie.add_link((i - 1) % 256,(i % 256) as u8),Some(i));
    }
    assert!(trie.is_full());
    assert_eq!(trie.add_link(0,0),None);
    assert_eq!(trie.add_child(0,0,0),None);
    assert!(trie.slots[0].is_none());
    assert_eq!(trie.next_code(),MAX_CODE + 1);
    trie.reset();
    assert_eq!(trie.next_code(),FIRST_CODE);
    assert_eq!(trie.link(FIRST_CODE),None);
}

#[test]
fn exhausted_table() {
    let mut trie = HashTrie::new();
    trie.slots.fill(Some(Node { code: 300, parent: 999, sym: 0 }));
    match trie.probe(1,1) {
        Err(Error::DictionaryExhausted) => {},
        _ => panic!("expected dictionary exhausted")
    }
}
