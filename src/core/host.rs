//! Capabilities the host application exposes to the procedures in this crate.
//!
//! Each trait covers one role. Procedures name only the roles they need, so a
//! test double or a live session can stand in for the host.

use crate::core::bounds::{BoundingBox, FrameRange};
use crate::core::live_link::LinkError;
use crate::core::types::{NodePath, ParmValue};
use glam::DVec3;

#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error("node not found: {0}")]
    NodeNotFound(NodePath),

    #[error("prim not found: {0}")]
    PrimNotFound(String),

    #[error("parameter '{parm}' not found on {node}")]
    ParameterNotFound { node: NodePath, parm: String },

    #[error("node already exists: {0}")]
    NodeExists(NodePath),

    #[error("host rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected reply from host: {0}")]
    Protocol(String),

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Scene-description access: bound queries and transform-op authoring.
pub trait Stage {
    /// World-space bound of the prim and its descendants. `None` when no prim exists at `prim`.
    fn world_bound(&self, prim: &str) -> Result<Option<BoundingBox>, HostError>;
    fn define_camera(&mut self, path: &str) -> Result<(), HostError>;
    fn define_xform(&mut self, path: &str) -> Result<(), HostError>;
    fn clear_xform_op_order(&mut self, path: &str) -> Result<(), HostError>;
    fn add_translate_op(&mut self, path: &str, value: DVec3) -> Result<(), HostError>;
    /// Leaves exactly one rotate-Y op on the prim, with no time samples.
    fn reset_rotate_y_op(&mut self, path: &str) -> Result<(), HostError>;
    fn set_rotate_y(&mut self, path: &str, frame: f64, degrees: f64) -> Result<(), HostError>;
}

pub trait Playbar {
    fn frame_range(&self) -> Result<FrameRange, HostError>;
}

pub trait MessageSink {
    fn display_message(&mut self, text: &str) -> Result<(), HostError>;
}

pub trait ParmReader {
    /// `Ok(None)` when the node exists but carries no parameter called `parm`.
    fn eval_parm(&self, node: &NodePath, parm: &str) -> Result<Option<ParmValue>, HostError>;
}

pub trait ParmWriter {
    fn set_parm(&mut self, node: &NodePath, parm: &str, value: ParmValue) -> Result<(), HostError>;
}

pub trait NodeConnector {
    fn connect(
        &mut self,
        dst: &NodePath,
        input: &str,
        src: &NodePath,
        output: &str,
    ) -> Result<(), HostError>;
}

pub trait NodeGraph: ParmWriter + NodeConnector {
    fn node_exists(&self, path: &NodePath) -> Result<bool, HostError>;
    fn create_node(
        &mut self,
        parent: &NodePath,
        type_name: &str,
        name: &str,
    ) -> Result<NodePath, HostError>;
    fn set_material_flag(&mut self, node: &NodePath, on: bool) -> Result<(), HostError>;
    fn layout_children(&mut self, node: &NodePath) -> Result<(), HostError>;
    fn move_to_good_position(&mut self, node: &NodePath) -> Result<(), HostError>;
}

pub trait NetworkUi {
    /// Make `node` current, drop any other selection and show it in the network editor.
    fn focus(&mut self, node: &NodePath) -> Result<(), HostError>;
}
