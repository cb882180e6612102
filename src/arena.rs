// SPDX-License-Identifier: Unlicense
//! Chunked, append-only storage for AST nodes.
//!
//! Nodes live in fixed-size chunks that are reserved in full when opened and
//! never grown, so an issued chunk is never reallocated. Nodes refer to each
//! other through [`NodeId`] handles, which stay valid until the arena is
//! dropped. There is no way to free a single node.
use crate::ast::Node;
use std::{fmt, ops::Index};

/// Number of nodes per chunk.
pub const CHUNK_CAPACITY: usize = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    OutOfMemory,
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::OutOfMemory => f.write_str("out of memory while allocating an AST node"),
        }
    }
}

impl std::error::Error for ArenaError {}

#[derive(Debug, Default)]
pub struct Arena<'src> {
    chunks: Vec<Vec<Node<'src>>>,
    len: usize,
}

impl<'src> Arena<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` and returns its handle.
    ///
    /// Every node referenced by `node` must already live in this arena.
    pub fn alloc(&mut self, node: Node<'src>) -> Result<NodeId, ArenaError> {
        let id = u32::try_from(self.len)
            .map(NodeId)
            .map_err(|_| ArenaError::OutOfMemory)?;
        if cfg!(debug_assertions) {
            node.for_each_child(|child| {
                assert!(child < id, "{node:?} refers to unallocated node {child}")
            });
        }

        self.chunk_with_room()?.push(node);
        self.len += 1;
        Ok(id)
    }

    fn chunk_with_room(&mut self) -> Result<&mut Vec<Node<'src>>, ArenaError> {
        let full = self
            .chunks
            .last()
            .map_or(true, |chunk| chunk.len() == CHUNK_CAPACITY);
        if full {
            let mut chunk = Vec::new();
            chunk
                .try_reserve_exact(CHUNK_CAPACITY)
                .map_err(|_| ArenaError::OutOfMemory)?;
            self.chunks
                .try_reserve(1)
                .map_err(|_| ArenaError::OutOfMemory)?;
            self.chunks.push(chunk);
            log::debug!("opened AST chunk {} at node {}", self.chunks.len(), self.len);
        }
        self.chunks.last_mut().ok_or(ArenaError::OutOfMemory)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<'src>> {
        let index = id.index();
        self.chunks
            .get(index / CHUNK_CAPACITY)?
            .get(index % CHUNK_CAPACITY)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl<'src> Index<NodeId> for Arena<'src> {
    type Output = Node<'src>;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {id} is not allocated in this arena"),
        }
    }
}
