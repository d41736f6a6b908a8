use crate::core::bounds::{BoundingBox, FrameRange};
use crate::core::host::{
    HostError, MessageSink, NetworkUi, NodeConnector, NodeGraph, ParmReader, ParmWriter, Playbar,
    Stage,
};
use crate::core::live_link::LiveLink;
use crate::core::script::{Phase, Script, fmt_f64, python_string_literal};
use crate::core::types::{NodePath, ParmValue};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Python expression evaluating to the editable USD stage.
    pub stage_expr: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stage_expr: "hou.pwd().editableStage()".to_string(),
        }
    }
}

/// Where a read is answered from.
pub trait QueryTransport {
    fn query(&self, script: &str) -> Result<Value, HostError>;
}

impl QueryTransport for LiveLink {
    fn query(&self, script: &str) -> Result<Value, HostError> {
        Ok(LiveLink::query(self, script)?)
    }
}

#[derive(Debug, Deserialize)]
struct BoundReply {
    found: bool,
    #[serde(default)]
    empty: bool,
    #[serde(default)]
    min: Option<DVec3>,
    #[serde(default)]
    max: Option<DVec3>,
}

#[derive(Debug, Deserialize)]
struct ParmReply {
    node: bool,
    #[serde(default)]
    value: Option<ParmValue>,
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, HostError> {
    serde_json::from_value(value).map_err(|e| HostError::Protocol(e.to_string()))
}

fn py_vec3(v: DVec3) -> String {
    format!("Gf.Vec3d({}, {}, {})", fmt_f64(v.x), fmt_f64(v.y), fmt_f64(v.z))
}

fn py_parm_value(value: &ParmValue) -> String {
    match value {
        ParmValue::Int(v) => v.to_string(),
        ParmValue::Float(v) => fmt_f64(*v),
        ParmValue::String(s) => python_string_literal(s),
    }
}

/// A host backed by a running Houdini.
///
/// Reads go out immediately as live-link queries. Writes are buffered as Python
/// in a [`Script`] and reach Houdini on [`HoudiniSession::commit`].
pub struct HoudiniSession<L = LiveLink> {
    link: L,
    config: SessionConfig,
    script: Script,
    node_vars: HashMap<NodePath, String>,
    stage_bound: bool,
}

impl<L: QueryTransport> HoudiniSession<L> {
    pub fn new(link: L, config: SessionConfig) -> Self {
        Self {
            link,
            config,
            script: Script::new(),
            node_vars: HashMap::new(),
            stage_bound: false,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// The buffered writes, rendered as one script.
    pub fn pending_script(&self) -> Option<String> {
        if self.script.is_empty() {
            None
        } else {
            Some(self.script.render())
        }
    }

    /// Hands back the buffered script and starts a fresh one.
    pub fn take_script(&mut self) -> Option<String> {
        let script = self.pending_script();
        self.script.clear();
        self.node_vars.clear();
        self.stage_bound = false;
        script
    }

    fn node_ref(&self, path: &NodePath) -> String {
        match self.node_vars.get(path) {
            Some(var) => var.clone(),
            None => format!("hou.node({})", python_string_literal(path.as_str())),
        }
    }

    fn new_var(type_name: &str) -> String {
        let base: String = type_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let uuid_str = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}_{}",
            base,
            uuid_str.chars().take(12).collect::<String>()
        )
    }

    fn stage(&mut self) -> &'static str {
        if !self.stage_bound {
            let line = format!("stage = {}", self.config.stage_expr);
            self.script.line(Phase::Setup, line);
            self.stage_bound = true;
        }
        "stage"
    }

    fn xformable(&mut self, path: &str) -> String {
        let stage = self.stage();
        format!(
            "UsdGeom.Xformable({}.GetPrimAtPath({}))",
            stage,
            python_string_literal(path)
        )
    }
}

impl HoudiniSession<LiveLink> {
    /// Sends the buffered writes to Houdini. Nothing is sent when nothing was written.
    pub fn commit(&mut self) -> Result<(), HostError> {
        match self.take_script() {
            Some(script) => Ok(self.link.send(&script)?),
            None => Ok(()),
        }
    }
}

impl<L: QueryTransport> Stage for HoudiniSession<L> {
    fn world_bound(&self, prim: &str) -> Result<Option<BoundingBox>, HostError> {
        let mut code = String::new();
        let _ = write!(
            &mut code,
            r#"from pxr import Usd, UsdGeom
stage = {stage}
prim = stage.GetPrimAtPath({path})
if prim:
    cache = UsdGeom.BBoxCache(Usd.TimeCode.Default(), [UsdGeom.Tokens.default_])
    box = cache.ComputeWorldBound(prim).GetRange()
    if box.IsEmpty():
        result = {{"found": True, "empty": True}}
    else:
        result = {{"found": True, "min": list(box.GetMin()), "max": list(box.GetMax())}}
else:
    result = {{"found": False}}
"#,
            stage = self.config.stage_expr,
            path = python_string_literal(prim)
        );
        let reply: BoundReply = decode(self.link.query(&code)?)?;
        if !reply.found {
            return Ok(None);
        }
        if reply.empty {
            return Ok(Some(BoundingBox::empty()));
        }
        match (reply.min, reply.max) {
            (Some(min), Some(max)) => Ok(Some(BoundingBox::new(min, max))),
            _ => Err(HostError::Protocol(format!(
                "bound reply for {} is missing min/max",
                prim
            ))),
        }
    }

    fn define_camera(&mut self, path: &str) -> Result<(), HostError> {
        let stage = self.stage();
        let line = format!(
            "UsdGeom.Camera.Define({}, {})",
            stage,
            python_string_literal(path)
        );
        self.script.line(Phase::Creation, line);
        Ok(())
    }

    fn define_xform(&mut self, path: &str) -> Result<(), HostError> {
        let stage = self.stage();
        let line = format!(
            "UsdGeom.Xform.Define({}, {})",
            stage,
            python_string_literal(path)
        );
        self.script.line(Phase::Creation, line);
        Ok(())
    }

    fn clear_xform_op_order(&mut self, path: &str) -> Result<(), HostError> {
        let xf = self.xformable(path);
        self.script
            .line(Phase::Creation, format!("{}.ClearXformOpOrder()", xf));
        Ok(())
    }

    fn add_translate_op(&mut self, path: &str, value: DVec3) -> Result<(), HostError> {
        let xf = self.xformable(path);
        let line = format!("{}.AddTranslateOp().Set({})", xf, py_vec3(value));
        self.script.line(Phase::Creation, line);
        Ok(())
    }

    fn reset_rotate_y_op(&mut self, path: &str) -> Result<(), HostError> {
        let xf = self.xformable(path);
        let mut code = String::new();
        let _ = write!(
            &mut code,
            r#"_xf = {xf}
_rot = [op for op in _xf.GetOrderedXformOps() if op.GetOpType() == UsdGeom.XformOp.TypeRotateY]
rotate_op = _rot[0] if _rot else _xf.AddRotateYOp()
rotate_op.GetAttr().Clear()
"#,
        );
        self.script.line(Phase::Creation, code);
        Ok(())
    }

    fn set_rotate_y(&mut self, path: &str, frame: f64, degrees: f64) -> Result<(), HostError> {
        let xf = self.xformable(path);
        let line = format!(
            "[op for op in {}.GetOrderedXformOps() if op.GetOpType() == UsdGeom.XformOp.TypeRotateY][0].Set({}, Usd.TimeCode({}))",
            xf,
            fmt_f64(degrees),
            fmt_f64(frame)
        );
        self.script.line(Phase::Creation, line);
        Ok(())
    }
}

impl<L: QueryTransport> Playbar for HoudiniSession<L> {
    fn frame_range(&self) -> Result<FrameRange, HostError> {
        let value = self
            .link
            .query("result = list(hou.playbar.frameRange())\n")?;
        let [start, end]: [f64; 2] = decode(value)?;
        Ok(FrameRange::new(start, end))
    }
}

impl<L: QueryTransport> MessageSink for HoudiniSession<L> {
    fn display_message(&mut self, text: &str) -> Result<(), HostError> {
        let line = format!("hou.ui.displayMessage({})", python_string_literal(text));
        self.script.line(Phase::Finishing, line);
        Ok(())
    }
}

impl<L: QueryTransport> ParmReader for HoudiniSession<L> {
    fn eval_parm(&self, node: &NodePath, parm: &str) -> Result<Option<ParmValue>, HostError> {
        let mut code = String::new();
        let _ = write!(
            &mut code,
            r#"node = hou.node({node})
if node is None:
    result = {{"node": False}}
else:
    parm = node.parm({parm})
    result = {{"node": True, "value": None if parm is None else parm.eval()}}
"#,
            node = python_string_literal(node.as_str()),
            parm = python_string_literal(parm)
        );
        let reply: ParmReply = decode(self.link.query(&code)?)?;
        if !reply.node {
            return Err(HostError::NodeNotFound(node.clone()));
        }
        Ok(reply.value)
    }
}

impl<L: QueryTransport> ParmWriter for HoudiniSession<L> {
    fn set_parm(&mut self, node: &NodePath, parm: &str, value: ParmValue) -> Result<(), HostError> {
        let line = format!(
            "{}.parm({}).set({})",
            self.node_ref(node),
            python_string_literal(parm),
            py_parm_value(&value)
        );
        self.script.line(Phase::Creation, line);
        Ok(())
    }
}

impl<L: QueryTransport> NodeConnector for HoudiniSession<L> {
    fn connect(
        &mut self,
        dst: &NodePath,
        input: &str,
        src: &NodePath,
        output: &str,
    ) -> Result<(), HostError> {
        let line = format!(
            "{}.setNamedInput({}, {}, {})",
            self.node_ref(dst),
            python_string_literal(input),
            self.node_ref(src),
            python_string_literal(output)
        );
        self.script.line(Phase::Linking, line);
        Ok(())
    }
}

impl<L: QueryTransport> NodeGraph for HoudiniSession<L> {
    fn node_exists(&self, path: &NodePath) -> Result<bool, HostError> {
        if self.node_vars.contains_key(path) {
            return Ok(true);
        }
        let code = format!(
            "result = hou.node({}) is not None\n",
            python_string_literal(path.as_str())
        );
        decode(self.link.query(&code)?)
    }

    fn create_node(
        &mut self,
        parent: &NodePath,
        type_name: &str,
        name: &str,
    ) -> Result<NodePath, HostError> {
        let path = parent.join(name);
        let var = Self::new_var(type_name);
        let line = format!(
            "{} = {}.createNode({}, {})",
            var,
            self.node_ref(parent),
            python_string_literal(type_name),
            python_string_literal(name)
        );
        self.script.line(Phase::Creation, line);
        self.node_vars.insert(path.clone(), var);
        Ok(path)
    }

    fn set_material_flag(&mut self, node: &NodePath, on: bool) -> Result<(), HostError> {
        let line = format!(
            "{}.setGenericFlag(hou.nodeFlag.Material, {})",
            self.node_ref(node),
            if on { "True" } else { "False" }
        );
        self.script.line(Phase::Finishing, line);
        Ok(())
    }

    fn layout_children(&mut self, node: &NodePath) -> Result<(), HostError> {
        let line = format!("{}.layoutChildren()", self.node_ref(node));
        self.script.line(Phase::Finishing, line);
        Ok(())
    }

    fn move_to_good_position(&mut self, node: &NodePath) -> Result<(), HostError> {
        let line = format!("{}.moveToGoodPosition()", self.node_ref(node));
        self.script.line(Phase::Creation, line);
        Ok(())
    }
}

impl<L: QueryTransport> NetworkUi for HoudiniSession<L> {
    fn focus(&mut self, node: &NodePath) -> Result<(), HostError> {
        let node = self.node_ref(node);
        let mut code = String::new();
        let _ = write!(
            &mut code,
            r#"{node}.setCurrent(True, clear_all_selected=True)
_editor = hou.ui.paneTabOfType(hou.paneTabType.NetworkEditor)
if _editor is not None:
    _editor.setCurrentNode({node})
"#,
        );
        self.script.line(Phase::Finishing, code);
        Ok(())
    }
}
