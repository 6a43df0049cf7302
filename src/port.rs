use std::path::Path;

use crate::error::UvfxResult;

/// Host-assigned node name, unique within the tree at a point in time.
///
/// Stored per-layer as a weak reference and re-resolved through
/// [`NodeGraphPort::group_of`] on the next rebuild; never a live handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a reusable node-group definition in the host project library.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to media loaded by the host, valid for one rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MediaHandle(pub u64);

/// How a media source's pixels are interpreted by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaInterpretation {
    Color,
    /// Raw data, exempt from color management. UV passes require this.
    NonColor,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Footage source: plays back loaded media for `frame_count` frames.
    Media {
        media: MediaHandle,
        frame_count: u64,
        interpretation: MediaInterpretation,
        cyclic: bool,
        auto_refresh: bool,
    },
    /// Instance of a reusable node-group.
    Group(GroupId),
    /// Remaps footage pixels through a UV pass (input 0: image, input 1: UV).
    UvRemap,
    /// Composites a foreground over the running chain by alpha.
    AlphaOver,
    /// Terminal sink feeding the host's final output.
    Composite,
    /// Terminal sink feeding the host's interactive preview.
    Viewer,
}

/// Capability interface over the host's live node-tree.
///
/// The builder receives this instead of reaching into ambient host state,
/// so graph assembly can run against an in-memory tree in tests (see
/// [`crate::memory::MemoryGraph`]). The host owns every node; ids handed
/// out here are only valid until the next [`NodeGraphPort::clear`].
pub trait NodeGraphPort {
    fn create_node(&mut self, kind: NodeKind) -> UvfxResult<NodeId>;

    /// Removes every node in the tree. Full reset; the builder never diffs.
    fn clear(&mut self);

    /// Connects `from`'s output socket to `to`'s input socket.
    fn link(&mut self, from: &NodeId, output: usize, to: &NodeId, input: usize) -> UvfxResult<()>;

    fn set_position(&mut self, node: &NodeId, x: f32, y: f32) -> UvfxResult<()>;

    fn set_muted(&mut self, node: &NodeId, muted: bool) -> UvfxResult<()>;

    /// Sets the default value of an unlinked input socket (e.g. blend factor).
    fn set_input_value(&mut self, node: &NodeId, input: usize, value: f64) -> UvfxResult<()>;

    /// Weak-ref resolution: the group instantiated by `node`, if the node
    /// still exists and is a group instance.
    fn group_of(&self, node: &NodeId) -> Option<GroupId>;

    /// Looks up a node-group definition by its well-known library name.
    fn find_group(&self, name: &str) -> Option<GroupId>;

    /// Duplicates a node-group definition, returning the copy's id.
    fn clone_group(&mut self, template: &GroupId) -> UvfxResult<GroupId>;
}

/// The host's media-loading facility: path to playable handle, plus
/// duration inspection for decoded movie clips.
pub trait MediaLoader {
    fn load(&mut self, path: &Path) -> UvfxResult<MediaHandle>;

    /// Intrinsic frame count of a decoded movie clip.
    fn movie_frame_count(&mut self, media: MediaHandle) -> UvfxResult<u64>;
}
