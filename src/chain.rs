//! Chain traversal, matching and identity.
//!
//! All walks are iterative and stop after [`MAX_CHAIN_DEPTH`] hops. A chain
//! built through the public API cannot loop, but deserialized or hand-built
//! input is not trusted to be short, and a walk must never be the thing that
//! hangs a request.

use crate::ErrorNode;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

/// Maximum number of ancestors any walk visits.
///
/// Longer ancestries are silently truncated.
pub const MAX_CHAIN_DEPTH: usize = 1000;

/// Iterator over the ancestors of a node, nearest first.
///
/// Created by [`ErrorNode::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    next: Option<&'a ErrorNode>,
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ErrorNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            self.next = None;
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = current.cause();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(_) if self.remaining > 0 => (1, Some(self.remaining)),
            _ => (0, Some(0)),
        }
    }
}

impl FusedIterator for Ancestors<'_> {}

impl ErrorNode {
    /// Lazy walk over this node's ancestors, from the direct cause outward.
    #[inline]
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: self.cause(),
            remaining: MAX_CHAIN_DEPTH,
        }
    }

    /// This node followed by its ancestors.
    #[inline]
    pub fn chain(&self) -> impl Iterator<Item = &ErrorNode> + '_ {
        std::iter::once(self).chain(self.ancestors())
    }

    /// Ancestors in order, nearest first. Empty when there is no cause.
    ///
    /// At most [`MAX_CHAIN_DEPTH`] entries.
    pub fn parents(&self) -> Vec<&ErrorNode> {
        self.ancestors().collect()
    }

    /// Number of ancestors, capped like [`parents`](Self::parents).
    #[inline]
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// The farthest reachable ancestor, or `self` for a leaf.
    pub fn root_cause(&self) -> &ErrorNode {
        self.ancestors().last().unwrap_or(self)
    }

    /// First node in the chain, starting with `self`, whose code equals the
    /// target's.
    pub fn find(&self, target: &ErrorNode) -> Option<&ErrorNode> {
        self.find_code(target.code())
    }

    /// First node in the chain, starting with `self`, carrying `code`.
    pub fn find_code(&self, code: &str) -> Option<&ErrorNode> {
        self.chain().find(|node| node.code() == code)
    }

    /// Copy the first node matching `target`'s code into `target`.
    ///
    /// Returns whether a match was found; `target` is untouched otherwise.
    pub fn as_target(&self, target: &mut ErrorNode) -> bool {
        match self.find(target) {
            Some(found) => {
                *target = found.clone();
                true
            }
            None => false,
        }
    }

    /// Whether any node in the chain has `other`'s code.
    #[inline]
    pub fn is_same_as(&self, other: &ErrorNode) -> bool {
        self.find(other).is_some()
    }

    /// Whether this node represents a fault: a non-empty code, or a cause.
    #[inline]
    pub fn is_error(&self) -> bool {
        !self.code().is_empty() || self.cause().is_some()
    }

    /// Shallow identity: code equality, ancestry ignored.
    #[inline]
    pub fn equals(&self, other: &ErrorNode) -> bool {
        self.code() == other.code()
    }
}

impl PartialEq for ErrorNode {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for ErrorNode {}

impl Hash for ErrorNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}
