//! An in-memory host. Holds a flat prim table, a node graph and the bits of UI
//! state the procedures touch, and implements every host trait over them.
//!
//! Bounds are stored per prim and are not transformed by authored xform ops.

use crate::core::bounds::{BoundingBox, FrameRange};
use crate::core::host::{
    HostError, MessageSink, NetworkUi, NodeConnector, NodeGraph, ParmReader, ParmWriter, Playbar,
    Stage,
};
use crate::core::types::{NodePath, ParmValue};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimKind {
    Untyped,
    Xform,
    Mesh,
    Camera,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSample {
    pub frame: f64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XformOp {
    Translate(DVec3),
    RotateY(Vec<TimeSample>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryPrim {
    pub kind: PrimKind,
    #[serde(default)]
    pub bound: Option<BoundingBox>,
    #[serde(default)]
    pub xform_ops: Vec<XformOp>,
}

impl MemoryPrim {
    fn new(kind: PrimKind) -> Self {
        Self {
            kind,
            bound: None,
            xform_ops: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub src: NodePath,
    pub output: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryNode {
    pub type_name: String,
    pub parms: BTreeMap<String, ParmValue>,
    pub inputs: BTreeMap<String, Connection>,
    pub material_flag: bool,
    pub children_laid_out: bool,
    pub positioned: bool,
}

impl MemoryNode {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryHost {
    prims: BTreeMap<String, MemoryPrim>,
    frame_range: FrameRange,
    nodes: BTreeMap<NodePath, MemoryNode>,
    current: Option<NodePath>,
    selection: Vec<NodePath>,
    messages: Vec<String>,
}

fn is_at_or_below(path: &str, root: &str) -> bool {
    if root == "/" {
        return true;
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    // scene setup -------------------------------------------------------------

    /// Inserts or replaces a prim, creating untyped ancestors as needed.
    pub fn add_prim(&mut self, path: &str, kind: PrimKind, bound: Option<BoundingBox>) {
        self.ensure_ancestors(path);
        self.prims.insert(
            path.to_string(),
            MemoryPrim {
                kind,
                bound,
                xform_ops: Vec::new(),
            },
        );
    }

    pub fn set_frame_range(&mut self, range: FrameRange) {
        self.frame_range = range;
    }

    /// Inserts a node, creating `subnet` ancestors as needed.
    pub fn add_node(&mut self, path: impl Into<NodePath>, type_name: &str) -> NodePath {
        let path = path.into();
        let mut missing = Vec::new();
        let mut cursor = path.parent();
        while let Some(p) = cursor {
            if p.as_str() == "/" || self.nodes.contains_key(&p) {
                break;
            }
            cursor = p.parent();
            missing.push(p);
        }
        for p in missing {
            self.nodes.insert(p, MemoryNode::new("subnet"));
        }
        self.nodes.insert(path.clone(), MemoryNode::new(type_name));
        path
    }

    // inspection --------------------------------------------------------------

    pub fn prim(&self, path: &str) -> Option<&MemoryPrim> {
        self.prims.get(path)
    }

    pub fn stage_snapshot(&self) -> &BTreeMap<String, MemoryPrim> {
        &self.prims
    }

    pub fn node(&self, path: &NodePath) -> Option<&MemoryNode> {
        self.nodes.get(path)
    }

    pub fn graph_snapshot(&self) -> &BTreeMap<NodePath, MemoryNode> {
        &self.nodes
    }

    pub fn children(&self, parent: &NodePath) -> impl Iterator<Item = (&NodePath, &MemoryNode)> {
        self.nodes
            .iter()
            .filter(move |(path, _)| path.parent().as_ref() == Some(parent))
    }

    pub fn current(&self) -> Option<&NodePath> {
        self.current.as_ref()
    }

    pub fn selection(&self) -> &[NodePath] {
        &self.selection
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    // internals ---------------------------------------------------------------

    fn ensure_ancestors(&mut self, path: &str) {
        let ends: Vec<usize> = path
            .match_indices('/')
            .map(|(idx, _)| idx)
            .filter(|&idx| idx > 0)
            .collect();
        for end in ends {
            self.prims
                .entry(path[..end].to_string())
                .or_insert_with(|| MemoryPrim::new(PrimKind::Untyped));
        }
    }

    fn define(&mut self, path: &str, kind: PrimKind) {
        self.ensure_ancestors(path);
        self.prims
            .entry(path.to_string())
            .or_insert_with(|| MemoryPrim::new(kind))
            .kind = kind;
    }

    fn prim_mut(&mut self, path: &str) -> Result<&mut MemoryPrim, HostError> {
        self.prims
            .get_mut(path)
            .ok_or_else(|| HostError::PrimNotFound(path.to_string()))
    }

    fn node_mut(&mut self, path: &NodePath) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| HostError::NodeNotFound(path.clone()))
    }

    fn has_node(&self, path: &NodePath) -> bool {
        path.as_str() == "/" || self.nodes.contains_key(path)
    }
}

impl Stage for MemoryHost {
    fn world_bound(&self, prim: &str) -> Result<Option<BoundingBox>, HostError> {
        if !self.prims.contains_key(prim) {
            return Ok(None);
        }
        let bound = self
            .prims
            .iter()
            .filter(|(path, _)| is_at_or_below(path, prim))
            .filter_map(|(_, p)| p.bound)
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b));
        Ok(Some(bound))
    }

    fn define_camera(&mut self, path: &str) -> Result<(), HostError> {
        self.define(path, PrimKind::Camera);
        Ok(())
    }

    fn define_xform(&mut self, path: &str) -> Result<(), HostError> {
        self.define(path, PrimKind::Xform);
        Ok(())
    }

    fn clear_xform_op_order(&mut self, path: &str) -> Result<(), HostError> {
        self.prim_mut(path)?.xform_ops.clear();
        Ok(())
    }

    fn add_translate_op(&mut self, path: &str, value: DVec3) -> Result<(), HostError> {
        let prim = self.prim_mut(path)?;
        if prim
            .xform_ops
            .iter()
            .any(|op| matches!(op, XformOp::Translate(_)))
        {
            return Err(HostError::Rejected(format!(
                "{} already has a translate op",
                path
            )));
        }
        prim.xform_ops.push(XformOp::Translate(value));
        Ok(())
    }

    fn reset_rotate_y_op(&mut self, path: &str) -> Result<(), HostError> {
        let prim = self.prim_mut(path)?;
        let mut seen = false;
        prim.xform_ops.retain_mut(|op| match op {
            XformOp::RotateY(samples) if !seen => {
                seen = true;
                samples.clear();
                true
            }
            XformOp::RotateY(_) => false,
            XformOp::Translate(_) => true,
        });
        if !seen {
            prim.xform_ops.push(XformOp::RotateY(Vec::new()));
        }
        Ok(())
    }

    fn set_rotate_y(&mut self, path: &str, frame: f64, degrees: f64) -> Result<(), HostError> {
        let prim = self.prim_mut(path)?;
        let samples = prim
            .xform_ops
            .iter_mut()
            .find_map(|op| match op {
                XformOp::RotateY(samples) => Some(samples),
                XformOp::Translate(_) => None,
            })
            .ok_or_else(|| HostError::Rejected(format!("{} has no rotateY op", path)))?;

        let sample = TimeSample {
            frame,
            value: degrees,
        };
        match samples.iter().position(|s| s.frame >= frame) {
            Some(idx) if samples[idx].frame == frame => samples[idx] = sample,
            Some(idx) => samples.insert(idx, sample),
            None => samples.push(sample),
        }
        Ok(())
    }
}

impl Playbar for MemoryHost {
    fn frame_range(&self) -> Result<FrameRange, HostError> {
        Ok(self.frame_range)
    }
}

impl MessageSink for MemoryHost {
    fn display_message(&mut self, text: &str) -> Result<(), HostError> {
        self.messages.push(text.to_string());
        Ok(())
    }
}

impl ParmReader for MemoryHost {
    fn eval_parm(&self, node: &NodePath, parm: &str) -> Result<Option<ParmValue>, HostError> {
        let node = self
            .nodes
            .get(node)
            .ok_or_else(|| HostError::NodeNotFound(node.clone()))?;
        Ok(node.parms.get(parm).cloned())
    }
}

impl ParmWriter for MemoryHost {
    fn set_parm(&mut self, node: &NodePath, parm: &str, value: ParmValue) -> Result<(), HostError> {
        self.node_mut(node)?.parms.insert(parm.to_string(), value);
        Ok(())
    }
}

impl NodeConnector for MemoryHost {
    fn connect(
        &mut self,
        dst: &NodePath,
        input: &str,
        src: &NodePath,
        output: &str,
    ) -> Result<(), HostError> {
        if !self.nodes.contains_key(src) {
            return Err(HostError::NodeNotFound(src.clone()));
        }
        self.node_mut(dst)?.inputs.insert(
            input.to_string(),
            Connection {
                src: src.clone(),
                output: output.to_string(),
            },
        );
        Ok(())
    }
}

impl NodeGraph for MemoryHost {
    fn node_exists(&self, path: &NodePath) -> Result<bool, HostError> {
        Ok(self.has_node(path))
    }

    fn create_node(
        &mut self,
        parent: &NodePath,
        type_name: &str,
        name: &str,
    ) -> Result<NodePath, HostError> {
        if !self.has_node(parent) {
            return Err(HostError::NodeNotFound(parent.clone()));
        }
        let path = parent.join(name);
        if self.nodes.contains_key(&path) {
            return Err(HostError::NodeExists(path));
        }
        self.nodes.insert(path.clone(), MemoryNode::new(type_name));
        Ok(path)
    }

    fn set_material_flag(&mut self, node: &NodePath, on: bool) -> Result<(), HostError> {
        self.node_mut(node)?.material_flag = on;
        Ok(())
    }

    fn layout_children(&mut self, node: &NodePath) -> Result<(), HostError> {
        self.node_mut(node)?.children_laid_out = true;
        Ok(())
    }

    fn move_to_good_position(&mut self, node: &NodePath) -> Result<(), HostError> {
        self.node_mut(node)?.positioned = true;
        Ok(())
    }
}

impl NetworkUi for MemoryHost {
    fn focus(&mut self, node: &NodePath) -> Result<(), HostError> {
        if !self.nodes.contains_key(node) {
            return Err(HostError::NodeNotFound(node.clone()));
        }
        self.current = Some(node.clone());
        self.selection = vec![node.clone()];
        Ok(())
    }
}

// ---------------------------------------------------------
// unittest
// ---------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_prim_creates_ancestors() {
        let mut host = MemoryHost::new();
        host.add_prim("/world/asset/geo", PrimKind::Mesh, None);
        assert_eq!(host.prim("/world").unwrap().kind, PrimKind::Untyped);
        assert_eq!(host.prim("/world/asset").unwrap().kind, PrimKind::Untyped);
        assert_eq!(host.prim("/world/asset/geo").unwrap().kind, PrimKind::Mesh);
    }

    #[test]
    fn test_define_non_ascii_paths() {
        let mut host = MemoryHost::new();
        host.define_camera("émission/cam").unwrap();
        assert_eq!(host.prim("émission").unwrap().kind, PrimKind::Untyped);
        assert_eq!(host.prim("émission/cam").unwrap().kind, PrimKind::Camera);

        host.define_xform("/caméra/é/géo").unwrap();
        assert_eq!(host.prim("/caméra").unwrap().kind, PrimKind::Untyped);
        assert_eq!(host.prim("/caméra/é").unwrap().kind, PrimKind::Untyped);
        assert_eq!(host.prim("/caméra/é/géo").unwrap().kind, PrimKind::Xform);
    }

    #[test]
    fn test_world_bound_unions_descendants_only() {
        let mut host = MemoryHost::new();
        host.add_prim(
            "/asset/a",
            PrimKind::Mesh,
            Some(BoundingBox::new(DVec3::ZERO, DVec3::ONE)),
        );
        host.add_prim(
            "/asset/b",
            PrimKind::Mesh,
            Some(BoundingBox::new(DVec3::splat(-2.0), DVec3::ZERO)),
        );
        host.add_prim(
            "/asset_other",
            PrimKind::Mesh,
            Some(BoundingBox::new(DVec3::splat(50.0), DVec3::splat(60.0))),
        );

        let bound = host.world_bound("/asset").unwrap().unwrap();
        assert_eq!(bound.min, DVec3::splat(-2.0));
        assert_eq!(bound.max, DVec3::ONE);

        assert_eq!(host.world_bound("/missing").unwrap(), None);
    }

    #[test]
    fn test_rotate_y_samples_replace_by_frame() {
        let mut host = MemoryHost::new();
        host.define_xform("/asset").unwrap();
        host.reset_rotate_y_op("/asset").unwrap();
        host.set_rotate_y("/asset", 2.0, 20.0).unwrap();
        host.set_rotate_y("/asset", 1.0, 10.0).unwrap();
        host.set_rotate_y("/asset", 2.0, 25.0).unwrap();

        let XformOp::RotateY(samples) = &host.prim("/asset").unwrap().xform_ops[0] else {
            panic!("expected rotateY");
        };
        assert_eq!(
            samples,
            &vec![
                TimeSample { frame: 1.0, value: 10.0 },
                TimeSample { frame: 2.0, value: 25.0 }
            ]
        );

        host.reset_rotate_y_op("/asset").unwrap();
        assert_eq!(
            host.prim("/asset").unwrap().xform_ops,
            vec![XformOp::RotateY(Vec::new())]
        );
    }

    #[test]
    fn test_translate_op_is_unique_until_cleared() {
        let mut host = MemoryHost::new();
        host.define_camera("/cam").unwrap();
        host.add_translate_op("/cam", DVec3::X).unwrap();
        assert!(matches!(
            host.add_translate_op("/cam", DVec3::Y),
            Err(HostError::Rejected(_))
        ));
        host.clear_xform_op_order("/cam").unwrap();
        host.add_translate_op("/cam", DVec3::Y).unwrap();
        assert_eq!(
            host.prim("/cam").unwrap().xform_ops,
            vec![XformOp::Translate(DVec3::Y)]
        );
        assert!(matches!(
            host.clear_xform_op_order("/nope"),
            Err(HostError::PrimNotFound(_))
        ));
    }

    #[test]
    fn test_graph_create_connect_and_focus() {
        let mut host = MemoryHost::new();
        let lib = host.add_node("/stage/subnet1/materiallibrary", "materiallibrary");
        assert_eq!(host.node(&NodePath::new("/stage")).unwrap().type_name, "subnet");

        let a = host.create_node(&lib, "mtlximage", "Albedo").unwrap();
        let s = host
            .create_node(&lib, "mtlxstandard_surface", "surface")
            .unwrap();
        assert!(matches!(
            host.create_node(&lib, "mtlximage", "Albedo"),
            Err(HostError::NodeExists(_))
        ));
        assert!(matches!(
            host.create_node(&NodePath::new("/nope"), "mtlximage", "x"),
            Err(HostError::NodeNotFound(_))
        ));

        host.connect(&s, "base_color", &a, "out").unwrap();
        assert_eq!(
            host.node(&s).unwrap().inputs["base_color"],
            Connection {
                src: a.clone(),
                output: "out".to_string()
            }
        );
        assert_eq!(host.children(&lib).count(), 2);

        host.focus(&s).unwrap();
        assert_eq!(host.current(), Some(&s));
        assert_eq!(host.selection(), &[s.clone()]);
    }

    #[test]
    fn test_parms_read_back_and_json_round_trip() {
        let mut host = MemoryHost::new();
        let tool = host.add_node("/stage/tool", "turntable_tool");
        host.set_parm(&tool, "albedo_001", "a.exr".into()).unwrap();

        assert_eq!(
            host.eval_parm(&tool, "albedo_001").unwrap(),
            Some(ParmValue::String("a.exr".to_string()))
        );
        assert_eq!(host.eval_parm(&tool, "missing").unwrap(), None);
        assert!(matches!(
            host.eval_parm(&NodePath::new("/ghost"), "x"),
            Err(HostError::NodeNotFound(_))
        ));

        let json = serde_json::to_string(&host).unwrap();
        let back: MemoryHost = serde_json::from_str(&json).unwrap();
        assert_eq!(back, host);
    }
}
