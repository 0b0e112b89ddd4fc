//! OR combinator over two sub-events (§4.4).
//!
//! The original source's `disjoint.py` is an empty stub; semantics here
//! follow §4.4 directly and the same connect/forward shape as the other
//! combinators.

#[derive(Debug)]
pub struct DisjointState {
    pub satisfied: bool,
    pub listening: bool,
}

impl DisjointState {
    pub fn new() -> Self {
        DisjointState {
            satisfied: false,
            listening: false,
        }
    }
}

impl Default for DisjointState {
    fn default() -> Self {
        Self::new()
    }
}
