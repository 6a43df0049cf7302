use std::path::PathBuf;

use crate::{
    error::{UvfxError, UvfxResult},
    port::NodeId,
};

/// One user-configured footage/blend unit in the stacking order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Display label; duplicates allowed, never used as identity.
    pub name: String,
    pub kind: LayerKind,
    #[serde(default)]
    pub refs: NodeRefs,
}

/// Layer type with one payload per variant, so a variant only carries the
/// fields that are meaningful for it.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum LayerKind {
    /// Plain footage that becomes the new chain head.
    Color { footage_dir: PathBuf },
    /// Footage remapped through a UV pass and alpha-overed onto the chain.
    Uv { footage_dir: PathBuf, uv_dir: PathBuf },
    /// Footage multiplied onto the running composite.
    Multiply { footage_dir: PathBuf },
    /// Footage added onto the running composite.
    Add { footage_dir: PathBuf },
    /// A bare node-group instance spliced into the chain. `group` is the
    /// bound node-group id; `None` clones the default "Custom" template.
    CustomNode { group: Option<String> },
    /// Like [`LayerKind::CustomNode`] but with a footage source wired into
    /// the group's second input.
    CustomFootageNode {
        footage_dir: PathBuf,
        group: Option<String>,
    },
}

impl LayerKind {
    /// Node-group templates this layer kind instantiates, by library name.
    pub fn required_templates(&self) -> &'static [&'static str] {
        match self {
            LayerKind::Color { .. } => &[],
            LayerKind::Uv { .. } => &["UV transform", "UV tile"],
            LayerKind::Multiply { .. } => &["Multiply"],
            LayerKind::Add { .. } => &["Add"],
            LayerKind::CustomNode { .. } => &["Custom"],
            LayerKind::CustomFootageNode { .. } => &["CustomFootage"],
        }
    }
}

/// Weak references to nodes a layer previously caused to be emitted.
///
/// Resolved by lookup on the next rebuild, never held as live handles; a
/// stale entry simply fails to resolve and the default behavior applies.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct NodeRefs {
    pub uv_transform: Option<NodeId>,
    pub uv_tile: Option<NodeId>,
    pub blend: Option<NodeId>,
}

impl Layer {
    fn base() -> Self {
        Self {
            name: "Footage".to_string(),
            kind: LayerKind::Uv {
                footage_dir: PathBuf::from("//"),
                uv_dir: PathBuf::from("//Template/UV1/"),
            },
            refs: NodeRefs::default(),
        }
    }
}

/// Ordered layer stack. Order determines blend stacking and layout order;
/// index 0 is the base layer and cannot be removed.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LayerList {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub active: usize,
}

impl LayerList {
    /// A list seeded with one default layer, as created when a scene is
    /// first configured.
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::base()],
            active: 0,
        }
    }

    pub fn validate(&self) -> UvfxResult<()> {
        if self.layers.is_empty() {
            return Err(UvfxError::validation(
                "layer list must contain at least the base layer",
            ));
        }
        if self.active >= self.layers.len() {
            return Err(UvfxError::validation(format!(
                "active layer index {} out of range (len {})",
                self.active,
                self.layers.len()
            )));
        }
        Ok(())
    }

    /// Appends a new default slot and makes it active.
    pub fn push_slot(&mut self) -> &mut Layer {
        self.layers.push(Layer {
            name: "New Footage".to_string(),
            ..Layer::base()
        });
        self.active = self.layers.len() - 1;
        self.layers.last_mut().unwrap()
    }

    /// Removes the slot at `index`. The base layer at index 0 stays.
    pub fn remove_slot(&mut self, index: usize) -> UvfxResult<Layer> {
        if index == 0 {
            return Err(UvfxError::validation("the base layer cannot be removed"));
        }
        if index >= self.layers.len() {
            return Err(UvfxError::validation(format!(
                "layer slot {index} out of range (len {})",
                self.layers.len()
            )));
        }
        let removed = self.layers.remove(index);
        if self.active >= self.layers.len() {
            self.active = self.layers.len() - 1;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Layer> {
        self.layers.iter_mut()
    }
}

impl Default for LayerList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_slot_list() -> LayerList {
        let mut list = LayerList::new();
        let slot = list.push_slot();
        slot.name = "Glow".to_string();
        slot.kind = LayerKind::Add {
            footage_dir: PathBuf::from("//Glow/"),
        };
        list
    }

    #[test]
    fn new_list_seeds_one_base_layer() {
        let list = LayerList::new();
        assert_eq!(list.len(), 1);
        assert_eq!(list.active, 0);
        assert!(matches!(list.layers[0].kind, LayerKind::Uv { .. }));
    }

    #[test]
    fn push_slot_appends_and_activates() {
        let list = two_slot_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list.active, 1);
        assert_eq!(list.layers[1].name, "Glow");
    }

    #[test]
    fn remove_slot_refuses_base_layer() {
        let mut list = two_slot_list();
        assert!(list.remove_slot(0).is_err());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_slot_clamps_active_index() {
        let mut list = two_slot_list();
        list.remove_slot(1).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.active, 0);
    }

    #[test]
    fn remove_slot_rejects_out_of_range() {
        let mut list = two_slot_list();
        assert!(list.remove_slot(5).is_err());
    }

    #[test]
    fn validate_rejects_empty_list() {
        let list = LayerList {
            layers: vec![],
            active: 0,
        };
        assert!(list.validate().is_err());
    }

    #[test]
    fn validate_rejects_dangling_active_index() {
        let mut list = LayerList::new();
        list.active = 3;
        assert!(list.validate().is_err());
    }

    #[test]
    fn json_roundtrip_keeps_refs_and_bindings() {
        let mut list = two_slot_list();
        list.layers[1].refs.blend = Some(NodeId("Add.002".to_string()));
        let slot = list.push_slot();
        slot.kind = LayerKind::CustomNode {
            group: Some("Custom.001".to_string()),
        };

        let s = serde_json::to_string_pretty(&list).unwrap();
        let de: LayerList = serde_json::from_str(&s).unwrap();
        assert_eq!(de.len(), 3);
        assert_eq!(de.layers[1].refs.blend, Some(NodeId("Add.002".to_string())));
        match &de.layers[2].kind {
            LayerKind::CustomNode { group } => {
                assert_eq!(group.as_deref(), Some("Custom.001"));
            }
            other => panic!("expected CustomNode, got {other:?}"),
        }
    }

    #[test]
    fn required_templates_cover_blend_kinds() {
        let kind = LayerKind::Uv {
            footage_dir: PathBuf::from("//"),
            uv_dir: PathBuf::from("//"),
        };
        assert_eq!(kind.required_templates(), ["UV transform", "UV tile"]);
        assert!(
            LayerKind::Color {
                footage_dir: PathBuf::from("//"),
            }
            .required_templates()
            .is_empty()
        );
    }
}
