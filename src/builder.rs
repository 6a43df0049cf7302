use std::collections::BTreeSet;
use std::path::Path;

use crate::{
    error::{UvfxError, UvfxResult},
    footage,
    layout::LayoutCursor,
    model::{Layer, LayerKind, LayerList, NodeRefs},
    port::{GroupId, MediaInterpretation, MediaLoader, NodeGraphPort, NodeId, NodeKind},
};

/// Socket conventions shared by the blend-stage nodes: input 0 is the blend
/// factor, input 1 the running composite, input 2 the new contribution.
const BLEND_FACTOR_INPUT: usize = 0;
const BLEND_BASE_INPUT: usize = 1;
const BLEND_OVERLAY_INPUT: usize = 2;

/// Assembles the compositor node graph from an ordered layer stack.
///
/// One invocation per "configure" request: the previous generated graph is
/// torn down completely and re-emitted layer by layer, chaining each
/// layer's output into the next layer's blend stage and attaching the
/// terminal sinks at the end. User-bound custom node-groups are carried
/// across the teardown by a best-effort preservation pre-pass.
pub struct GraphBuilder<'a> {
    graph: &'a mut dyn NodeGraphPort,
    media: &'a mut dyn MediaLoader,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(graph: &'a mut dyn NodeGraphPort, media: &'a mut dyn MediaLoader) -> Self {
        Self { graph, media }
    }

    #[tracing::instrument(skip_all, fields(layers = layers.len()))]
    pub fn rebuild(&mut self, layers: &mut LayerList) -> UvfxResult<()> {
        layers.validate()?;
        // Fail on missing templates before touching the tree, so a
        // misconfigured project keeps its previous graph intact.
        self.check_templates(layers)?;
        self.preserve_group_bindings(layers);

        self.graph.clear();

        let mut cursor = LayoutCursor::new();
        let mut last: Option<NodeId> = None;
        for layer in layers.iter_mut() {
            last = self.emit_layer(layer, &mut cursor, last)?;
            cursor.advance();
        }

        cursor.advance();
        self.attach_sinks(&cursor, last.as_ref())
    }

    fn check_templates(&self, layers: &LayerList) -> UvfxResult<()> {
        let mut required = BTreeSet::new();
        for layer in layers.iter() {
            required.extend(layer.kind.required_templates());
        }
        for name in required {
            self.require_group(name)?;
        }
        Ok(())
    }

    /// Re-reads each custom layer's previous blend node from the tree that
    /// is about to be destroyed and records the node-group it instantiates,
    /// so the rebuilt node rebinds to the same (possibly user-edited) group
    /// instead of a fresh clone. Stale refs are skipped silently.
    fn preserve_group_bindings(&self, layers: &mut LayerList) {
        for layer in layers.iter_mut() {
            let (LayerKind::CustomNode { group } | LayerKind::CustomFootageNode { group, .. }) =
                &mut layer.kind
            else {
                continue;
            };
            let Some(blend) = &layer.refs.blend else {
                continue;
            };
            if let Some(bound) = self.graph.group_of(blend) {
                tracing::debug!(layer = %layer.name, group = %bound, "preserving group binding");
                *group = Some(bound.0);
            }
        }
    }

    fn emit_layer(
        &mut self,
        layer: &mut Layer,
        cursor: &mut LayoutCursor,
        last: Option<NodeId>,
    ) -> UvfxResult<Option<NodeId>> {
        tracing::debug!(layer = %layer.name, x = cursor.x(), "emitting layer");
        match &mut layer.kind {
            LayerKind::Color { footage_dir } => {
                let source = self.footage_node(
                    footage_dir,
                    cursor.chain_head(),
                    MediaInterpretation::Color,
                )?;
                // Unresolved base footage keeps the previous chain head so
                // downstream layers still have something to blend over.
                Ok(source.or(last))
            }
            LayerKind::Multiply { footage_dir } => {
                let source =
                    self.footage_node(footage_dir, cursor.footage_row(), MediaInterpretation::Color)?;
                let blend = self.emit_mix_group(&mut layer.refs, "Multiply", cursor)?;
                self.chain_into_blend(last.as_ref(), source.as_ref(), &blend)?;
                Ok(Some(blend))
            }
            LayerKind::Add { footage_dir } => {
                let source =
                    self.footage_node(footage_dir, cursor.footage_row(), MediaInterpretation::Color)?;
                let blend = self.emit_mix_group(&mut layer.refs, "Add", cursor)?;
                self.chain_into_blend(last.as_ref(), source.as_ref(), &blend)?;
                Ok(Some(blend))
            }
            LayerKind::CustomNode { group } => {
                let bound = self.bind_custom_group(group, "Custom")?;
                let node = self.graph.create_node(NodeKind::Group(bound))?;
                let (x, y) = cursor.blend_slot();
                self.graph.set_position(&node, x, y)?;
                if let Some(prev) = &last {
                    self.graph.link(prev, 0, &node, BLEND_BASE_INPUT)?;
                }
                layer.refs.blend = Some(node.clone());
                Ok(Some(node))
            }
            LayerKind::CustomFootageNode { footage_dir, group } => {
                let source =
                    self.footage_node(footage_dir, cursor.footage_row(), MediaInterpretation::Color)?;
                let bound = self.bind_custom_group(group, "CustomFootage")?;
                let node = self.graph.create_node(NodeKind::Group(bound))?;
                let (x, y) = cursor.blend_slot();
                self.graph.set_position(&node, x, y)?;
                self.chain_into_blend(last.as_ref(), source.as_ref(), &node)?;
                layer.refs.blend = Some(node.clone());
                Ok(Some(node))
            }
            LayerKind::Uv {
                footage_dir,
                uv_dir,
            } => {
                let source = self.footage_node(
                    footage_dir,
                    cursor.uv_footage_row(),
                    MediaInterpretation::Color,
                )?;
                let uv_source =
                    self.footage_node(uv_dir, cursor.uv_source(), MediaInterpretation::NonColor)?;

                let transform = self.group_node("UV transform", cursor.uv_transform())?;
                let tile = self.group_node("UV tile", cursor.uv_tile())?;
                // Tiling is opt-in; the UI unmutes the node.
                self.graph.set_muted(&tile, true)?;

                let remap = self.graph.create_node(NodeKind::UvRemap)?;
                let (x, y) = cursor.uv_remap();
                self.graph.set_position(&remap, x, y)?;

                let alpha = self.graph.create_node(NodeKind::AlphaOver)?;
                let (x, y) = cursor.blend_slot();
                self.graph.set_position(&alpha, x, y)?;

                if let Some(src) = &source {
                    self.graph.link(src, 0, &remap, 0)?;
                }
                if let Some(uv) = &uv_source {
                    self.graph.link(uv, 0, &transform, 0)?;
                }
                self.graph.link(&transform, 0, &tile, 0)?;
                self.graph.link(&tile, 0, &remap, 1)?;
                if let Some(prev) = &last {
                    self.graph.link(prev, 0, &alpha, BLEND_BASE_INPUT)?;
                }
                self.graph.link(&remap, 0, &alpha, BLEND_OVERLAY_INPUT)?;

                layer.refs.uv_transform = Some(transform);
                layer.refs.uv_tile = Some(tile);
                layer.refs.blend = Some(alpha.clone());
                Ok(Some(alpha))
            }
        }
    }

    fn attach_sinks(&mut self, cursor: &LayoutCursor, last: Option<&NodeId>) -> UvfxResult<()> {
        let composite = self.graph.create_node(NodeKind::Composite)?;
        let (x, y) = cursor.composite_sink();
        self.graph.set_position(&composite, x, y)?;

        let viewer = self.graph.create_node(NodeKind::Viewer)?;
        let (x, y) = cursor.viewer_sink();
        self.graph.set_position(&viewer, x, y)?;

        match last {
            Some(last) => {
                self.graph.link(last, 0, &composite, 0)?;
                self.graph.link(last, 0, &viewer, 0)?;
            }
            None => {
                tracing::warn!("no layer produced output; sinks are left unconnected");
            }
        }
        Ok(())
    }

    /// Resolves footage in `dir` into a placed media-source node, or `None`
    /// when the directory yields no media (the slot is skipped, not fatal).
    fn footage_node(
        &mut self,
        dir: &Path,
        position: (f32, f32),
        interpretation: MediaInterpretation,
    ) -> UvfxResult<Option<NodeId>> {
        let Some(resolved) = footage::resolve(dir, self.media)? else {
            tracing::warn!(dir = %dir.display(), "no media in footage dir; slot left empty");
            return Ok(None);
        };
        let node = self.graph.create_node(NodeKind::Media {
            media: resolved.media,
            frame_count: resolved.frame_count,
            interpretation,
            cyclic: true,
            auto_refresh: true,
        })?;
        self.graph.set_position(&node, position.0, position.1)?;
        Ok(Some(node))
    }

    /// Creates a Multiply/Add blend stage with its factor defaulted to 1.
    fn emit_mix_group(
        &mut self,
        refs: &mut NodeRefs,
        template: &str,
        cursor: &LayoutCursor,
    ) -> UvfxResult<NodeId> {
        let node = self.group_node(template, cursor.blend_slot())?;
        self.graph
            .set_input_value(&node, BLEND_FACTOR_INPUT, 1.0)?;
        refs.blend = Some(node.clone());
        Ok(node)
    }

    fn chain_into_blend(
        &mut self,
        last: Option<&NodeId>,
        source: Option<&NodeId>,
        blend: &NodeId,
    ) -> UvfxResult<()> {
        if let Some(prev) = last {
            self.graph.link(prev, 0, blend, BLEND_BASE_INPUT)?;
        }
        if let Some(src) = source {
            self.graph.link(src, 0, blend, BLEND_OVERLAY_INPUT)?;
        }
        Ok(())
    }

    fn group_node(&mut self, template: &str, position: (f32, f32)) -> UvfxResult<NodeId> {
        let group = self.require_group(template)?;
        let node = self.graph.create_node(NodeKind::Group(group))?;
        self.graph.set_position(&node, position.0, position.1)?;
        Ok(node)
    }

    /// Resolves a stored custom-group binding, falling back to a fresh
    /// clone of the named template when the binding is absent or stale.
    /// The clone's id is written back so the next rebuild rebinds to it.
    fn bind_custom_group(
        &mut self,
        binding: &mut Option<String>,
        template: &str,
    ) -> UvfxResult<GroupId> {
        if let Some(name) = binding.as_deref() {
            if let Some(id) = self.graph.find_group(name) {
                return Ok(id);
            }
            tracing::debug!(group = name, "stored group binding is stale; cloning template");
        }
        let template_id = self.require_group(template)?;
        let clone = self.graph.clone_group(&template_id)?;
        *binding = Some(clone.as_str().to_string());
        Ok(clone)
    }

    fn require_group(&self, name: &str) -> UvfxResult<GroupId> {
        self.graph
            .find_group(name)
            .ok_or_else(|| UvfxError::missing_template(name))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::memory::{MemoryGraph, MemoryMedia};

    fn color_layer(dir: &str) -> Layer {
        Layer {
            name: "Base".to_string(),
            kind: LayerKind::Color {
                footage_dir: PathBuf::from(dir),
            },
            refs: Default::default(),
        }
    }

    #[test]
    fn missing_template_leaves_existing_graph_untouched() {
        let mut graph = MemoryGraph::new();
        graph.register_template("Multiply");
        let mut media = MemoryMedia::new();

        // Seed a pre-existing "generated" node to observe survival.
        let survivor = graph.create_node(NodeKind::Composite).unwrap();

        let mut layers = LayerList {
            layers: vec![
                color_layer("/nonexistent/base"),
                Layer {
                    name: "Add".to_string(),
                    kind: LayerKind::Add {
                        footage_dir: PathBuf::from("/nonexistent/add"),
                    },
                    refs: Default::default(),
                },
            ],
            active: 0,
        };

        let err = GraphBuilder::new(&mut graph, &mut media)
            .rebuild(&mut layers)
            .unwrap_err();
        assert!(matches!(err, UvfxError::MissingTemplate(name) if name == "Add"));
        assert!(graph.node(&survivor).is_some());
    }

    #[test]
    fn empty_layer_list_is_rejected() {
        let mut graph = MemoryGraph::new();
        let mut media = MemoryMedia::new();
        let mut layers = LayerList {
            layers: vec![],
            active: 0,
        };
        assert!(
            GraphBuilder::new(&mut graph, &mut media)
                .rebuild(&mut layers)
                .is_err()
        );
    }

    #[test]
    fn unresolved_footage_still_yields_sinks() {
        let mut graph = MemoryGraph::new();
        graph.register_default_templates();
        let mut media = MemoryMedia::new();

        let mut layers = LayerList {
            layers: vec![color_layer("/nonexistent/base")],
            active: 0,
        };
        GraphBuilder::new(&mut graph, &mut media)
            .rebuild(&mut layers)
            .unwrap();

        let kinds: Vec<_> = graph.nodes().map(|(_, n)| n.kind.clone()).collect();
        assert!(kinds.contains(&NodeKind::Composite));
        assert!(kinds.contains(&NodeKind::Viewer));
        // Nothing resolved, so the sinks have no upstream.
        assert!(graph.links().is_empty());
    }

    #[test]
    fn stale_custom_binding_falls_back_to_template_clone() {
        let mut graph = MemoryGraph::new();
        graph.register_default_templates();
        let mut media = MemoryMedia::new();

        let mut layers = LayerList {
            layers: vec![Layer {
                name: "FX".to_string(),
                kind: LayerKind::CustomNode {
                    group: Some("Vanished.007".to_string()),
                },
                refs: Default::default(),
            }],
            active: 0,
        };
        GraphBuilder::new(&mut graph, &mut media)
            .rebuild(&mut layers)
            .unwrap();

        let LayerKind::CustomNode { group } = &layers.layers[0].kind else {
            panic!("kind changed");
        };
        assert_eq!(group.as_deref(), Some("Custom.001"));
    }
}
