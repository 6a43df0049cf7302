//! In-memory host: a complete [`NodeGraphPort`] + [`MediaLoader`] pair.
//!
//! Backs the test suite and lets embedders assemble and inspect graphs
//! without a live host application. Node names follow the host convention
//! of a kind-derived base plus a numeric suffix on collision ("Image",
//! "Image.001", ...).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{
    error::{UvfxError, UvfxResult},
    port::{GroupId, MediaHandle, MediaLoader, NodeGraphPort, NodeId, NodeKind},
};

#[derive(Clone, Debug)]
pub struct MemoryNode {
    pub kind: NodeKind,
    pub position: (f32, f32),
    pub muted: bool,
    pub input_values: BTreeMap<usize, f64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub from: NodeId,
    pub output: usize,
    pub to: NodeId,
    pub input: usize,
}

#[derive(Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<NodeId, MemoryNode>,
    links: Vec<Link>,
    // Node-group definitions live in the project library, not the tree:
    // clear() leaves them alone so cloned groups survive rebuilds.
    groups: BTreeMap<GroupId, GroupDef>,
    name_seq: BTreeMap<String, u64>,
}

#[derive(Clone, Debug)]
struct GroupDef {
    /// Library name of the template this definition came from.
    pub source: String,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node-group template under its well-known library name.
    pub fn register_template(&mut self, name: &str) -> GroupId {
        let id = GroupId(name.to_string());
        self.groups.insert(
            id.clone(),
            GroupDef {
                source: name.to_string(),
            },
        );
        id
    }

    /// Registers the full set of templates the builder expects.
    pub fn register_default_templates(&mut self) {
        for name in [
            "Multiply",
            "Add",
            "UV transform",
            "UV tile",
            "Custom",
            "CustomFootage",
        ] {
            self.register_template(name);
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &MemoryNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_into(&self, node: &NodeId) -> Vec<&Link> {
        self.links.iter().filter(|l| &l.to == node).collect()
    }

    pub fn group_exists(&self, id: &GroupId) -> bool {
        self.groups.contains_key(id)
    }

    /// Library name of the template a group definition was cloned from
    /// (its own name for registered templates).
    pub fn group_source(&self, id: &GroupId) -> Option<&str> {
        self.groups.get(id).map(|def| def.source.as_str())
    }

    /// Host-side edit: rebinds a group node to another definition, the way
    /// the UI's group selector does behind the builder's back.
    pub fn rebind_group_node(&mut self, node: &NodeId, group: &GroupId) -> UvfxResult<()> {
        if !self.groups.contains_key(group) {
            return Err(UvfxError::graph(format!(
                "node-group '{group}' is not defined"
            )));
        }
        let entry = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| UvfxError::graph(format!("unknown node '{node}'")))?;
        match &mut entry.kind {
            NodeKind::Group(bound) => {
                *bound = group.clone();
                Ok(())
            }
            _ => Err(UvfxError::graph(format!(
                "node '{node}' is not a group instance"
            ))),
        }
    }

    fn unique_name(&mut self, base: &str) -> String {
        let seq = self.name_seq.entry(base.to_string()).or_insert(0);
        *seq += 1;
        if *seq == 1 {
            base.to_string()
        } else {
            format!("{base}.{:03}", *seq - 1)
        }
    }

    fn base_name(kind: &NodeKind) -> String {
        match kind {
            NodeKind::Media { .. } => "Image".to_string(),
            NodeKind::Group(group) => group.as_str().to_string(),
            NodeKind::UvRemap => "Map UV".to_string(),
            NodeKind::AlphaOver => "Alpha Over".to_string(),
            NodeKind::Composite => "Composite".to_string(),
            NodeKind::Viewer => "Viewer".to_string(),
        }
    }
}

impl NodeGraphPort for MemoryGraph {
    fn create_node(&mut self, kind: NodeKind) -> UvfxResult<NodeId> {
        if let NodeKind::Group(group) = &kind {
            if !self.groups.contains_key(group) {
                return Err(UvfxError::graph(format!(
                    "node-group '{group}' is not defined"
                )));
            }
        }
        let id = NodeId(self.unique_name(&Self::base_name(&kind)));
        self.nodes.insert(
            id.clone(),
            MemoryNode {
                kind,
                position: (0.0, 0.0),
                muted: false,
                input_values: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.name_seq.clear();
    }

    fn link(&mut self, from: &NodeId, output: usize, to: &NodeId, input: usize) -> UvfxResult<()> {
        for id in [from, to] {
            if !self.nodes.contains_key(id) {
                return Err(UvfxError::graph(format!("unknown node '{id}' in link")));
            }
        }
        self.links.push(Link {
            from: from.clone(),
            output,
            to: to.clone(),
            input,
        });
        Ok(())
    }

    fn set_position(&mut self, node: &NodeId, x: f32, y: f32) -> UvfxResult<()> {
        let node = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| UvfxError::graph(format!("unknown node '{node}'")))?;
        node.position = (x, y);
        Ok(())
    }

    fn set_muted(&mut self, node: &NodeId, muted: bool) -> UvfxResult<()> {
        let node = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| UvfxError::graph(format!("unknown node '{node}'")))?;
        node.muted = muted;
        Ok(())
    }

    fn set_input_value(&mut self, node: &NodeId, input: usize, value: f64) -> UvfxResult<()> {
        let node = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| UvfxError::graph(format!("unknown node '{node}'")))?;
        node.input_values.insert(input, value);
        Ok(())
    }

    fn group_of(&self, node: &NodeId) -> Option<GroupId> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Group(group) => Some(group.clone()),
            _ => None,
        }
    }

    fn find_group(&self, name: &str) -> Option<GroupId> {
        let id = GroupId(name.to_string());
        self.groups.contains_key(&id).then_some(id)
    }

    fn clone_group(&mut self, template: &GroupId) -> UvfxResult<GroupId> {
        let def = self
            .groups
            .get(template)
            .ok_or_else(|| UvfxError::graph(format!("unknown node-group '{template}'")))?
            .clone();

        let mut copy = 1;
        let id = loop {
            let candidate = GroupId(format!("{template}.{copy:03}"));
            if !self.groups.contains_key(&candidate) {
                break candidate;
            }
            copy += 1;
        };
        self.groups.insert(id.clone(), def);
        Ok(id)
    }
}

/// Path-keyed media loader.
///
/// Movie frame counts come from [`MemoryMedia::set_movie_frames`]; clips
/// without a registered probe report a single frame.
#[derive(Default)]
pub struct MemoryMedia {
    movie_frames: BTreeMap<PathBuf, u64>,
    loaded: Vec<PathBuf>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_movie_frames(&mut self, path: impl Into<PathBuf>, frames: u64) {
        self.movie_frames.insert(path.into(), frames);
    }

    pub fn loaded_paths(&self) -> &[PathBuf] {
        &self.loaded
    }
}

impl MediaLoader for MemoryMedia {
    fn load(&mut self, path: &Path) -> UvfxResult<MediaHandle> {
        self.loaded.push(path.to_path_buf());
        Ok(MediaHandle(self.loaded.len() as u64))
    }

    fn movie_frame_count(&mut self, media: MediaHandle) -> UvfxResult<u64> {
        let index = media.0 as usize;
        if index == 0 || index > self.loaded.len() {
            return Err(UvfxError::media(format!(
                "unknown media handle {}",
                media.0
            )));
        }
        Ok(self
            .movie_frames
            .get(&self.loaded[index - 1])
            .copied()
            .unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MediaInterpretation;

    fn media_kind() -> NodeKind {
        NodeKind::Media {
            media: MediaHandle(1),
            frame_count: 1,
            interpretation: MediaInterpretation::Color,
            cyclic: true,
            auto_refresh: true,
        }
    }

    #[test]
    fn node_names_get_numeric_suffixes_on_collision() {
        let mut graph = MemoryGraph::new();
        let first = graph.create_node(media_kind()).unwrap();
        let second = graph.create_node(media_kind()).unwrap();
        assert_eq!(first.as_str(), "Image");
        assert_eq!(second.as_str(), "Image.001");
    }

    #[test]
    fn link_rejects_unknown_nodes() {
        let mut graph = MemoryGraph::new();
        let node = graph.create_node(media_kind()).unwrap();
        let ghost = NodeId("Ghost".to_string());
        assert!(graph.link(&node, 0, &ghost, 0).is_err());
        assert!(graph.links().is_empty());
    }

    #[test]
    fn clear_drops_nodes_but_keeps_group_library() {
        let mut graph = MemoryGraph::new();
        let template = graph.register_template("Custom");
        let clone = graph.clone_group(&template).unwrap();
        let node = graph.create_node(NodeKind::Group(clone.clone())).unwrap();

        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert!(graph.group_of(&node).is_none());
        assert!(graph.group_exists(&clone));
    }

    #[test]
    fn clone_group_allocates_fresh_ids() {
        let mut graph = MemoryGraph::new();
        let template = graph.register_template("Custom");
        let a = graph.clone_group(&template).unwrap();
        let b = graph.clone_group(&template).unwrap();
        assert_eq!(a.as_str(), "Custom.001");
        assert_eq!(b.as_str(), "Custom.002");
        assert_eq!(graph.group_source(&b), Some("Custom"));
    }

    #[test]
    fn group_node_requires_defined_group() {
        let mut graph = MemoryGraph::new();
        let err = graph
            .create_node(NodeKind::Group(GroupId("Nope".to_string())))
            .unwrap_err();
        assert!(err.to_string().contains("graph error:"));
    }

    #[test]
    fn group_of_resolves_only_group_nodes() {
        let mut graph = MemoryGraph::new();
        let template = graph.register_template("Multiply");
        let group_node = graph.create_node(NodeKind::Group(template.clone())).unwrap();
        let image_node = graph.create_node(media_kind()).unwrap();

        assert_eq!(graph.group_of(&group_node), Some(template));
        assert!(graph.group_of(&image_node).is_none());
    }

    #[test]
    fn unprobed_movie_defaults_to_one_frame() {
        let mut media = MemoryMedia::new();
        let handle = media.load(Path::new("/footage/clip.mp4")).unwrap();
        assert_eq!(media.movie_frame_count(handle).unwrap(), 1);
        assert!(media.movie_frame_count(MediaHandle(99)).is_err());
    }
}
