#![forbid(unsafe_code)]

//! Procedural compositor node-graph assembly for layering footage and
//! UV-mapped passes.
//!
//! The host application owns the node-tree and the media decoding; this
//! crate drives them through the [`port::NodeGraphPort`] and
//! [`port::MediaLoader`] capability traits. [`builder::GraphBuilder`] turns
//! an ordered [`model::LayerList`] into a wired, positioned graph, tearing
//! down and re-emitting the whole tree on every configure request while
//! carrying user-bound custom node-groups across rebuilds.

pub mod builder;
pub mod error;
pub mod footage;
pub mod layout;
pub mod memory;
pub mod model;
pub mod port;

pub use builder::GraphBuilder;
pub use error::{UvfxError, UvfxResult};
pub use footage::{ResolvedFootage, SourceKind, resolve};
pub use layout::{LAYER_STRIDE, LayoutCursor};
pub use memory::{MemoryGraph, MemoryMedia};
pub use model::{Layer, LayerKind, LayerList, NodeRefs};
pub use port::{
    GroupId, MediaHandle, MediaInterpretation, MediaLoader, NodeGraphPort, NodeId, NodeKind,
};
