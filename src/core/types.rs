use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Float;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vector;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceShader;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplacementShader;

/// Absolute path of a node in the host's node graph, e.g. `/stage/subnet1`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            Self("/".to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn join(&self, child: &str) -> Self {
        let child = child.trim_matches('/');
        if self.0 == "/" {
            Self(format!("/{}", child))
        } else {
            Self(format!("{}/{}", self.0, child))
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self("/".to_string())),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A parameter value as read from or written to a host node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParmValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl ParmValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::String(_) => None,
        }
    }
}

impl fmt::Display for ParmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParmValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParmValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParmValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ParmValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

pub trait PortType {
    fn type_name() -> &'static str;
}

macro_rules! impl_port_type {
    ($type:ident, $name:expr) => {
        impl PortType for $type {
            fn type_name() -> &'static str {
                $name
            }
        }
    };
}

impl_port_type!(Color, "color3");
impl_port_type!(Float, "float");
impl_port_type!(Vector, "vector3");
impl_port_type!(SurfaceShader, "surfaceshader");
impl_port_type!(DisplacementShader, "displacementshader");

/// An output port on a concrete node. The marker type records what flows out of it.
#[derive(Debug, PartialEq, Eq)]
pub struct OutPort<T> {
    pub node: NodePath,
    pub name: &'static str,
    pub _marker: PhantomData<T>,
}

impl<T> Clone for OutPort<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> OutPort<T> {
    pub fn new(node: NodePath, name: &'static str) -> Self {
        Self {
            node,
            name,
            _marker: PhantomData,
        }
    }
}

/// A named input on some node type; only ports of the same marker type connect to it.
#[derive(Debug, PartialEq, Eq)]
pub struct InPin<T> {
    pub name: &'static str,
    pub _marker: PhantomData<T>,
}

impl<T> Clone for InPin<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InPin<T> {}

impl<T> InPin<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}
