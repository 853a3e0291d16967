//! Call stacks: the shared forest and per-bucket decoding contexts.

pub mod context;
pub mod forest;

// Re-export main types
pub use context::{StackDecodingContext, TrieId, TrieNode, TRIE_ROOT};
pub use forest::{GlobalStackForest, NodeId, StackId, StackNode};
