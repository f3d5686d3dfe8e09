//! Read-only display projection of an assembled thread.
//!
//! Groups borrow from the tree; projecting never fetches or mutates, so the
//! same tree can be projected as often as a renderer needs.

use ctzn_types::{Post, RecordRef};
use std::iter::FusedIterator;
use std::slice;

use super::ThreadNode;

/// One post in display form, with lazy access to its reply groups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGroup<'a> {
    pub post: &'a Post,
    pub is_highlighted: bool,
    pub depth: usize,
    node: &'a ThreadNode,
    subject_url: &'a str,
}

impl<'a> DisplayGroup<'a> {
    /// Groups for the direct replies of this post
    pub fn children(&self) -> Projection<'a> {
        Projection {
            nodes: self.node.replies.iter(),
            subject_url: self.subject_url,
            depth: self.depth + 1,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.node.replies.is_empty()
    }
}

/// Project `nodes` at `depth`, highlighting the node whose URL matches
/// `subject`.
pub fn project<'a>(nodes: &'a [ThreadNode], subject: &'a RecordRef, depth: usize) -> Projection<'a> {
    Projection {
        nodes: nodes.iter(),
        subject_url: &subject.db_url,
        depth,
    }
}

/// Lazy sequence of sibling groups. Clone it to walk the same level again.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    nodes: slice::Iter<'a, ThreadNode>,
    subject_url: &'a str,
    depth: usize,
}

impl<'a> Projection<'a> {
    /// Pre-order walk over every group at or below this level
    pub fn walk(self) -> Walk<'a> {
        Walk { stack: vec![self] }
    }
}

impl<'a> Iterator for Projection<'a> {
    type Item = DisplayGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.next()?;
        Some(DisplayGroup {
            post: &node.post,
            is_highlighted: node.post.url == self.subject_url,
            depth: self.depth,
            node,
            subject_url: self.subject_url,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl ExactSizeIterator for Projection<'_> {}
impl FusedIterator for Projection<'_> {}

/// Depth-first, pre-order walk produced by [`Projection::walk`]
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<Projection<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = DisplayGroup<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(group) => {
                    self.stack.push(group.children());
                    return Some(group);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl FusedIterator for Walk<'_> {}
