//! lazyact DOM - Document Object Model
//!
//! Arena-backed document tree that the activation engine reads and mutates.
//! Hosts feed it layout rectangles and read back the mutations it records.

mod attributes;
mod classlist;
mod dataset;
mod document;
mod error;
mod geometry;
mod mutation;
mod node;
mod selector;
mod style;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use classlist::DOMTokenList;
pub use dataset::{data_attribute_name, dataset_key};
pub use document::{Document, ReadyState};
pub use error::{DomError, DomResult, SelectorError};
pub use geometry::DOMRect;
pub use mutation::MutationRecord;
pub use node::{ElementData, Node, NodeData};
pub use selector::Selector;
pub use style::InlineStyle;
pub use tree::DomTree;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Build an id from a raw arena index
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
