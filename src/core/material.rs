//! MaterialX material builder.
//!
//! Builds a fixed PBR subnetwork inside the tool's material library: five image
//! lookups feeding a standard surface and a displacement shader, exposed through
//! two subnet output connectors. Image file paths and colour space come from
//! parameters on the tool instance, selected by a short suffix.

use crate::core::host::{HostError, NetworkUi, NodeConnector, NodeGraph, ParmReader};
use crate::core::types::{
    Color, DisplacementShader, Float, InPin, NodePath, OutPort, ParmValue, PortType,
    SurfaceShader, Vector,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

pub const DEFAULT_LIBRARY: &str = "materiallibrary";
pub const SURFACE_NODE: &str = "mtlxstandard_surface";
pub const DISPLACEMENT_NODE: &str = "mtlxdisplacement";
pub const NORMAL_MAP_NODE: &str = "mtlxnormalmap";

const CONNECTOR_KIND_OUTPUT: i64 = 1;
const CONNECTOR_TYPE_SURFACE: i64 = 24;
const CONNECTOR_TYPE_DISPLACEMENT: i64 = 25;

/// What to do when the tool has no parameter for a binding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingPolicy {
    /// Leave the target node on its defaults.
    #[default]
    BindIfPresent,
    /// Fail with `HostError::ParameterNotFound`.
    BindAlways,
}

/// How an image node decodes its texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signature {
    Color,
    Float,
    Vector2,
}

impl Signature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Float => "Float",
            Self::Vector2 => "Vector2",
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key that picks one of the repeated parameter sets on the tool, e.g. `001`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParmSuffix(String);

impl ParmSuffix {
    pub const LEN: usize = 3;

    pub fn new(suffix: impl Into<String>) -> Self {
        Self(suffix.into())
    }

    /// The last three characters of the parameter that triggered the build.
    pub fn from_parm_name(name: &str) -> Self {
        let count = name.chars().count();
        Self(name.chars().skip(count.saturating_sub(Self::LEN)).collect())
    }

    pub fn apply(&self, base: &str) -> String {
        format!("{}{}", base, self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSlot {
    pub node_name: &'static str,
    pub file_parm: &'static str,
    pub signature: Signature,
    pub colorspace_parm: Option<&'static str>,
}

pub const ALBEDO: ImageSlot = ImageSlot {
    node_name: "Albedo",
    file_parm: "albedo",
    signature: Signature::Color,
    colorspace_parm: Some("colorspace"),
};
pub const ROUGHNESS: ImageSlot = ImageSlot {
    node_name: "Roughness",
    file_parm: "roughness",
    signature: Signature::Float,
    colorspace_parm: None,
};
pub const NORMAL: ImageSlot = ImageSlot {
    node_name: "Normal",
    file_parm: "normal",
    signature: Signature::Vector2,
    colorspace_parm: None,
};
pub const METALLIC: ImageSlot = ImageSlot {
    node_name: "Metallic",
    file_parm: "metalness",
    signature: Signature::Float,
    colorspace_parm: None,
};
pub const DISPLACEMENT: ImageSlot = ImageSlot {
    node_name: "Displacement",
    file_parm: "displacement",
    signature: Signature::Float,
    colorspace_parm: None,
};

pub const DISPLACEMENT_SCALE_PARM: &str = "displacementscale";
pub const NORMAL_SCALE_PARM: &str = "normalscale";

// typed node handles -----------------------------------------------------------

pub struct SubnetConnector<T> {
    pub path: NodePath,
    _marker: PhantomData<T>,
}

impl<T> SubnetConnector<T> {
    pub const PIN_SUBOUTPUT: InPin<T> = InPin::new("suboutput");
}

pub struct StandardSurface {
    pub path: NodePath,
}

impl StandardSurface {
    pub const PIN_BASE_COLOR: InPin<Color> = InPin::new("base_color");
    pub const PIN_SPECULAR_ROUGHNESS: InPin<Float> = InPin::new("specular_roughness");
    pub const PIN_METALNESS: InPin<Float> = InPin::new("metalness");
    pub const PIN_NORMAL: InPin<Vector> = InPin::new("normal");

    pub fn out(&self) -> OutPort<SurfaceShader> {
        OutPort::new(self.path.clone(), "out")
    }
}

pub struct Displacement {
    pub path: NodePath,
}

impl Displacement {
    pub const PIN_DISPLACEMENT: InPin<Float> = InPin::new("displacement");

    pub fn out(&self) -> OutPort<DisplacementShader> {
        OutPort::new(self.path.clone(), "out")
    }
}

pub struct NormalMap {
    pub path: NodePath,
}

impl NormalMap {
    pub const PIN_IN: InPin<Vector> = InPin::new("in");

    pub fn out(&self) -> OutPort<Vector> {
        OutPort::new(self.path.clone(), "out")
    }
}

pub struct Image {
    pub path: NodePath,
}

impl Image {
    pub fn out_color(&self) -> OutPort<Color> {
        OutPort::new(self.path.clone(), "out")
    }

    pub fn out_float(&self) -> OutPort<Float> {
        OutPort::new(self.path.clone(), "out")
    }

    pub fn out_vector(&self) -> OutPort<Vector> {
        OutPort::new(self.path.clone(), "out")
    }
}

fn wire<G, T>(graph: &mut G, dst: &NodePath, pin: InPin<T>, src: &OutPort<T>) -> Result<(), HostError>
where
    G: NodeConnector + ?Sized,
    T: PortType,
{
    log::debug!(
        "connect {}:{} -> {}:{} ({})",
        src.node,
        src.name,
        dst,
        pin.name,
        T::type_name()
    );
    graph.connect(dst, pin.name, &src.node, src.name)
}

// building ---------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MaterialError {
    #[error("invalid material name '{0}'")]
    InvalidName(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Nodes of a freshly built material.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialNetwork {
    pub material: NodePath,
    pub surface: NodePath,
    /// Tool parameters that were looked up but absent.
    pub skipped_parms: Vec<String>,
}

struct Binder<'a> {
    tool: &'a NodePath,
    suffix: &'a ParmSuffix,
    policy: BindingPolicy,
    skipped: Vec<String>,
}

impl Binder<'_> {
    fn lookup<G>(&mut self, graph: &G, base: &str) -> Result<Option<ParmValue>, HostError>
    where
        G: ParmReader + ?Sized,
    {
        let name = self.suffix.apply(base);
        match graph.eval_parm(self.tool, &name)? {
            Some(value) => Ok(Some(value)),
            None => match self.policy {
                BindingPolicy::BindAlways => Err(HostError::ParameterNotFound {
                    node: self.tool.clone(),
                    parm: name,
                }),
                BindingPolicy::BindIfPresent => {
                    log::warn!("{} has no parameter '{}'; leaving default", self.tool, name);
                    self.skipped.push(name);
                    Ok(None)
                }
            },
        }
    }

    /// Scale parms are read only when the tool carries them, whatever the policy.
    fn lookup_optional<G>(&mut self, graph: &G, base: &str) -> Result<Option<ParmValue>, HostError>
    where
        G: ParmReader + ?Sized,
    {
        let name = self.suffix.apply(base);
        let value = graph.eval_parm(self.tool, &name)?;
        if value.is_none() {
            log::debug!("{} has no parameter '{}'; leaving default", self.tool, name);
            self.skipped.push(name);
        }
        Ok(value)
    }

    fn bind_image<G>(&mut self, graph: &mut G, image: &Image, slot: &ImageSlot) -> Result<(), HostError>
    where
        G: NodeGraph + ParmReader + ?Sized,
    {
        let Some(file) = self.lookup(&*graph, slot.file_parm)? else {
            return Ok(());
        };
        graph.set_parm(&image.path, "file", file)?;
        graph.set_parm(&image.path, "signature", slot.signature.as_str().into())?;
        if let Some(base) = slot.colorspace_parm {
            if let Some(colorspace) = self.lookup(&*graph, base)? {
                graph.set_parm(&image.path, "filecolorspace", colorspace)?;
            }
        }
        Ok(())
    }

    fn bind_scale<G>(&mut self, graph: &mut G, node: &NodePath, base: &str) -> Result<(), HostError>
    where
        G: NodeGraph + ParmReader + ?Sized,
    {
        if let Some(scale) = self.lookup_optional(&*graph, base)? {
            graph.set_parm(node, "scale", scale)?;
        }
        Ok(())
    }
}

fn create_connector<G, T>(
    graph: &mut G,
    material: &NodePath,
    name: &str,
    parm_name: &str,
    label: &str,
    parm_type: i64,
) -> Result<SubnetConnector<T>, HostError>
where
    G: NodeGraph + ?Sized,
{
    let path = graph.create_node(material, "subnetconnector", name)?;
    graph.set_parm(&path, "connectorkind", CONNECTOR_KIND_OUTPUT.into())?;
    graph.set_parm(&path, "parmname", parm_name.into())?;
    graph.set_parm(&path, "parmlabel", label.into())?;
    graph.set_parm(&path, "parmtype", parm_type.into())?;
    Ok(SubnetConnector {
        path,
        _marker: PhantomData,
    })
}

fn create_image<G>(graph: &mut G, material: &NodePath, slot: &ImageSlot) -> Result<Image, HostError>
where
    G: NodeGraph + ?Sized,
{
    let path = graph.create_node(material, "mtlximage", slot.node_name)?;
    Ok(Image { path })
}

fn validate_name(name: &str) -> Result<(), MaterialError> {
    if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(MaterialError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Creates the material subnet `<library>/<name>` and binds it to the tool's parameters.
///
/// Host failures propagate as they happen; nodes created before the failure stay in place.
pub fn create_mtlx<G>(
    graph: &mut G,
    library: &NodePath,
    name: &str,
    tool: &NodePath,
    suffix: &ParmSuffix,
    policy: BindingPolicy,
) -> Result<MaterialNetwork, MaterialError>
where
    G: NodeGraph + ParmReader + ?Sized,
{
    validate_name(name)?;

    let material = graph.create_node(library, "subnet", name)?;
    graph.move_to_good_position(&material)?;

    let surface_output: SubnetConnector<SurfaceShader> = create_connector(
        graph,
        &material,
        "surface_output",
        "surface",
        "Surface",
        CONNECTOR_TYPE_SURFACE,
    )?;
    let displacement_output: SubnetConnector<DisplacementShader> = create_connector(
        graph,
        &material,
        "displacement_output",
        "displacement",
        "Displacement",
        CONNECTOR_TYPE_DISPLACEMENT,
    )?;

    let surface = StandardSurface {
        path: graph.create_node(&material, "mtlxstandard_surface", SURFACE_NODE)?,
    };

    let albedo = create_image(graph, &material, &ALBEDO)?;
    let roughness = create_image(graph, &material, &ROUGHNESS)?;
    let normal = create_image(graph, &material, &NORMAL)?;
    let metallic = create_image(graph, &material, &METALLIC)?;
    let displace = create_image(graph, &material, &DISPLACEMENT)?;

    let displacement = Displacement {
        path: graph.create_node(&material, "mtlxdisplacement", DISPLACEMENT_NODE)?,
    };
    let normal_map = NormalMap {
        path: graph.create_node(&material, "mtlxnormalmap::2.0", NORMAL_MAP_NODE)?,
    };

    // ---- connections ----
    wire(
        graph,
        &surface_output.path,
        SubnetConnector::<SurfaceShader>::PIN_SUBOUTPUT,
        &surface.out(),
    )?;
    wire(
        graph,
        &displacement_output.path,
        SubnetConnector::<DisplacementShader>::PIN_SUBOUTPUT,
        &displacement.out(),
    )?;
    wire(
        graph,
        &surface.path,
        StandardSurface::PIN_SPECULAR_ROUGHNESS,
        &roughness.out_float(),
    )?;
    wire(
        graph,
        &displacement.path,
        Displacement::PIN_DISPLACEMENT,
        &displace.out_float(),
    )?;
    wire(graph, &surface.path, StandardSurface::PIN_BASE_COLOR, &albedo.out_color())?;
    wire(graph, &surface.path, StandardSurface::PIN_NORMAL, &normal_map.out())?;
    wire(graph, &surface.path, StandardSurface::PIN_METALNESS, &metallic.out_float())?;
    wire(graph, &normal_map.path, NormalMap::PIN_IN, &normal.out_vector())?;
    graph.layout_children(&material)?;

    // ---- tool bindings ----
    let mut binder = Binder {
        tool,
        suffix,
        policy,
        skipped: Vec::new(),
    };
    binder.bind_image(graph, &albedo, &ALBEDO)?;
    binder.bind_image(graph, &roughness, &ROUGHNESS)?;
    binder.bind_image(graph, &metallic, &METALLIC)?;
    binder.bind_image(graph, &normal, &NORMAL)?;
    binder.bind_image(graph, &displace, &DISPLACEMENT)?;
    binder.bind_scale(graph, &displacement.path, DISPLACEMENT_SCALE_PARM)?;
    binder.bind_scale(graph, &normal_map.path, NORMAL_SCALE_PARM)?;

    graph.set_material_flag(&material, true)?;

    Ok(MaterialNetwork {
        material,
        surface: surface.path,
        skipped_parms: binder.skipped,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub library: String,
    pub binding: BindingPolicy,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            library: DEFAULT_LIBRARY.to_string(),
            binding: BindingPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialRequest {
    pub tool: NodePath,
    pub name: String,
    pub suffix: ParmSuffix,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MaterialOutcome {
    Created {
        name: String,
        library: String,
        network: MaterialNetwork,
    },
    AlreadyExists {
        name: String,
        surface: NodePath,
    },
}

impl MaterialOutcome {
    pub fn surface(&self) -> &NodePath {
        match self {
            Self::Created { network, .. } => &network.surface,
            Self::AlreadyExists { surface, .. } => surface,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Created { name, library, .. } => format!(
                "Created MaterialX material '{}' in material library '{}'",
                name, library
            ),
            Self::AlreadyExists { name, .. } => format!("Material '{}' already exists", name),
        }
    }
}

impl fmt::Display for MaterialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Builds the named material unless it already exists; in that case its surface
/// shader is focused in the network editor and the graph is left alone.
pub fn material<H>(
    host: &mut H,
    request: &MaterialRequest,
    config: &MaterialConfig,
) -> Result<MaterialOutcome, MaterialError>
where
    H: NodeGraph + ParmReader + NetworkUi + ?Sized,
{
    validate_name(&request.name)?;
    let library = request.tool.join(&config.library);
    let existing = library.join(&request.name);

    let outcome = if host.node_exists(&existing)? {
        let surface = existing.join(SURFACE_NODE);
        host.focus(&surface)?;
        MaterialOutcome::AlreadyExists {
            name: request.name.clone(),
            surface,
        }
    } else {
        let network = create_mtlx(
            host,
            &library,
            &request.name,
            &request.tool,
            &request.suffix,
            config.binding,
        )?;
        MaterialOutcome::Created {
            name: request.name.clone(),
            library: config.library.clone(),
            network,
        }
    };
    log::info!("{}", outcome);
    Ok(outcome)
}

// ----------------------------------------------------------------------------
// unittest
// ----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::ParmWriter;
    use crate::core::memory::{Connection, MemoryHost};

    const TOOL: &str = "/stage/subnet1";

    fn host_with_tool(parms: &[(&str, ParmValue)]) -> MemoryHost {
        let mut host = MemoryHost::new();
        let tool = host.add_node(TOOL, "mtlx_builder");
        host.add_node(tool.join(DEFAULT_LIBRARY), "materiallibrary");
        for (name, value) in parms {
            host.set_parm(&tool, name, value.clone()).unwrap();
        }
        host
    }

    fn full_parms() -> Vec<(&'static str, ParmValue)> {
        vec![
            ("albedo001", "tex/albedo.exr".into()),
            ("colorspace001", "srgb_texture".into()),
            ("roughness001", "tex/rough.exr".into()),
            ("metalness001", "tex/metal.exr".into()),
            ("normal001", "tex/normal.exr".into()),
            ("displacement001", "tex/disp.exr".into()),
            ("displacementscale001", ParmValue::Float(0.25)),
            ("normalscale001", ParmValue::Float(1.5)),
        ]
    }

    fn request(name: &str) -> MaterialRequest {
        MaterialRequest {
            tool: NodePath::new(TOOL),
            name: name.to_string(),
            suffix: ParmSuffix::from_parm_name("create001"),
        }
    }

    fn link(src: &NodePath, output: &str) -> Connection {
        Connection {
            src: src.clone(),
            output: output.to_string(),
        }
    }

    #[test]
    fn test_parm_suffix() {
        assert_eq!(ParmSuffix::from_parm_name("build_material_002").as_str(), "002");
        assert_eq!(ParmSuffix::from_parm_name("ab").as_str(), "ab");
        assert_eq!(ParmSuffix::from_parm_name("matériau_é01").as_str(), "é01");
        assert_eq!(ParmSuffix::new("007").apply("albedo"), "albedo007");
    }

    #[test]
    fn test_builds_fixed_topology() {
        let mut host = host_with_tool(&full_parms());
        let outcome = material(&mut host, &request("test"), &MaterialConfig::default()).unwrap();

        let mat = NodePath::new("/stage/subnet1/materiallibrary/test");
        assert_eq!(outcome.surface(), &mat.join(SURFACE_NODE));
        assert_eq!(
            outcome.message(),
            "Created MaterialX material 'test' in material library 'materiallibrary'"
        );

        let material_node = host.node(&mat).unwrap();
        assert_eq!(material_node.type_name, "subnet");
        assert!(material_node.material_flag);
        assert!(material_node.children_laid_out);
        assert!(material_node.positioned);

        let mut children: Vec<(String, String)> = host
            .children(&mat)
            .map(|(p, n)| (p.name().to_string(), n.type_name.clone()))
            .collect();
        children.sort();
        assert_eq!(
            children,
            vec![
                ("Albedo".to_string(), "mtlximage".to_string()),
                ("Displacement".to_string(), "mtlximage".to_string()),
                ("Metallic".to_string(), "mtlximage".to_string()),
                ("Normal".to_string(), "mtlximage".to_string()),
                ("Roughness".to_string(), "mtlximage".to_string()),
                ("displacement_output".to_string(), "subnetconnector".to_string()),
                ("mtlxdisplacement".to_string(), "mtlxdisplacement".to_string()),
                ("mtlxnormalmap".to_string(), "mtlxnormalmap::2.0".to_string()),
                ("mtlxstandard_surface".to_string(), "mtlxstandard_surface".to_string()),
                ("surface_output".to_string(), "subnetconnector".to_string()),
            ]
        );

        let surface = mat.join(SURFACE_NODE);
        let disp = mat.join(DISPLACEMENT_NODE);
        let nmap = mat.join(NORMAL_MAP_NODE);

        let surface_node = host.node(&surface).unwrap();
        assert_eq!(surface_node.inputs["base_color"], link(&mat.join("Albedo"), "out"));
        assert_eq!(
            surface_node.inputs["specular_roughness"],
            link(&mat.join("Roughness"), "out")
        );
        assert_eq!(surface_node.inputs["metalness"], link(&mat.join("Metallic"), "out"));
        assert_eq!(surface_node.inputs["normal"], link(&nmap, "out"));
        assert_eq!(
            host.node(&nmap).unwrap().inputs["in"],
            link(&mat.join("Normal"), "out")
        );
        assert_eq!(
            host.node(&disp).unwrap().inputs["displacement"],
            link(&mat.join("Displacement"), "out")
        );

        let surface_out = host.node(&mat.join("surface_output")).unwrap();
        assert_eq!(surface_out.inputs["suboutput"], link(&surface, "out"));
        assert_eq!(surface_out.parms["connectorkind"], ParmValue::Int(1));
        assert_eq!(surface_out.parms["parmname"], ParmValue::from("surface"));
        assert_eq!(surface_out.parms["parmlabel"], ParmValue::from("Surface"));
        assert_eq!(surface_out.parms["parmtype"], ParmValue::Int(24));

        let disp_out = host.node(&mat.join("displacement_output")).unwrap();
        assert_eq!(disp_out.inputs["suboutput"], link(&disp, "out"));
        assert_eq!(disp_out.parms["parmname"], ParmValue::from("displacement"));
        assert_eq!(disp_out.parms["parmtype"], ParmValue::Int(25));
    }

    #[test]
    fn test_binds_tool_parameters() {
        let mut host = host_with_tool(&full_parms());
        let outcome = material(&mut host, &request("test"), &MaterialConfig::default()).unwrap();
        let MaterialOutcome::Created { network, .. } = &outcome else {
            panic!("expected a new material");
        };
        assert!(network.skipped_parms.is_empty());

        let mat = &network.material;
        let albedo = host.node(&mat.join("Albedo")).unwrap();
        assert_eq!(albedo.parms["file"], ParmValue::from("tex/albedo.exr"));
        assert_eq!(albedo.parms["signature"], ParmValue::from("Color"));
        assert_eq!(albedo.parms["filecolorspace"], ParmValue::from("srgb_texture"));

        let expected = [
            ("Roughness", "tex/rough.exr", "Float"),
            ("Metallic", "tex/metal.exr", "Float"),
            ("Normal", "tex/normal.exr", "Vector2"),
            ("Displacement", "tex/disp.exr", "Float"),
        ];
        for (node, file, signature) in expected {
            let image = host.node(&mat.join(node)).unwrap();
            assert_eq!(image.parms["file"], ParmValue::from(file), "{}", node);
            assert_eq!(image.parms["signature"], ParmValue::from(signature), "{}", node);
            assert!(!image.parms.contains_key("filecolorspace"), "{}", node);
        }

        assert_eq!(
            host.node(&mat.join(DISPLACEMENT_NODE)).unwrap().parms["scale"],
            ParmValue::Float(0.25)
        );
        assert_eq!(
            host.node(&mat.join(NORMAL_MAP_NODE)).unwrap().parms["scale"],
            ParmValue::Float(1.5)
        );
    }

    #[test]
    fn test_second_call_only_focuses() {
        let mut host = host_with_tool(&full_parms());
        let config = MaterialConfig::default();
        material(&mut host, &request("test"), &config).unwrap();
        let graph_after_first = host.graph_snapshot().clone();
        assert_eq!(host.current(), None);

        let outcome = material(&mut host, &request("test"), &config).unwrap();
        let surface = NodePath::new("/stage/subnet1/materiallibrary/test/mtlxstandard_surface");
        assert_eq!(
            outcome,
            MaterialOutcome::AlreadyExists {
                name: "test".to_string(),
                surface: surface.clone()
            }
        );
        assert_eq!(outcome.message(), "Material 'test' already exists");
        assert_eq!(host.graph_snapshot(), &graph_after_first);
        assert_eq!(host.current(), Some(&surface));
        assert_eq!(host.selection(), &[surface]);

        let library = NodePath::new("/stage/subnet1/materiallibrary");
        assert_eq!(host.children(&library).count(), 1);
    }

    #[test]
    fn test_absent_parameters_keep_defaults() {
        let mut host = host_with_tool(&[
            ("albedo001", "tex/albedo.exr".into()),
            ("roughness001", "tex/rough.exr".into()),
        ]);
        let outcome = material(&mut host, &request("partial"), &MaterialConfig::default()).unwrap();
        let MaterialOutcome::Created { network, .. } = outcome else {
            panic!("expected a new material");
        };
        assert_eq!(
            network.skipped_parms,
            vec![
                "colorspace001",
                "metalness001",
                "normal001",
                "displacement001",
                "displacementscale001",
                "normalscale001"
            ]
        );

        let mat = &network.material;
        let albedo = host.node(&mat.join("Albedo")).unwrap();
        assert_eq!(albedo.parms["file"], ParmValue::from("tex/albedo.exr"));
        assert!(!albedo.parms.contains_key("filecolorspace"));
        for node in ["Metallic", "Normal", "Displacement"] {
            assert!(host.node(&mat.join(node)).unwrap().parms.is_empty(), "{}", node);
        }
        assert!(host.node(&mat.join(DISPLACEMENT_NODE)).unwrap().parms.is_empty());
        assert!(host.node(mat).unwrap().material_flag);
    }

    #[test]
    fn test_bind_always_fails_on_absent_parameter() {
        let mut host = host_with_tool(&[("albedo001", "tex/albedo.exr".into())]);
        let config = MaterialConfig {
            binding: BindingPolicy::BindAlways,
            ..MaterialConfig::default()
        };
        let err = material(&mut host, &request("strict"), &config).unwrap_err();
        match err {
            MaterialError::Host(HostError::ParameterNotFound { node, parm }) => {
                assert_eq!(node, NodePath::new(TOOL));
                assert_eq!(parm, "colorspace001");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bind_always_leaves_scales_optional() {
        let parms: Vec<_> = full_parms()
            .into_iter()
            .filter(|(name, _)| !name.contains("scale"))
            .collect();
        assert_eq!(parms.len(), 6);
        let mut host = host_with_tool(&parms);
        let config = MaterialConfig {
            binding: BindingPolicy::BindAlways,
            ..MaterialConfig::default()
        };
        let outcome = material(&mut host, &request("strict"), &config).unwrap();
        let MaterialOutcome::Created { network, .. } = outcome else {
            panic!("expected a new material");
        };
        assert_eq!(
            network.skipped_parms,
            vec!["displacementscale001", "normalscale001"]
        );

        let mat = &network.material;
        assert!(host.node(mat).unwrap().material_flag);
        let albedo = host.node(&mat.join("Albedo")).unwrap();
        assert_eq!(albedo.parms["filecolorspace"], ParmValue::from("srgb_texture"));
        assert_eq!(
            host.node(&mat.join("Displacement")).unwrap().parms["file"],
            ParmValue::from("tex/disp.exr")
        );
        assert!(!host.node(&mat.join(DISPLACEMENT_NODE)).unwrap().parms.contains_key("scale"));
        assert!(!host.node(&mat.join(NORMAL_MAP_NODE)).unwrap().parms.contains_key("scale"));
    }

    #[test]
    fn test_missing_library_propagates() {
        let mut host = MemoryHost::new();
        host.add_node(TOOL, "mtlx_builder");
        let err = material(&mut host, &request("test"), &MaterialConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            MaterialError::Host(HostError::NodeNotFound(ref p))
                if p.as_str() == "/stage/subnet1/materiallibrary"
        ));
    }

    #[test]
    fn test_rejects_unusable_names() {
        let mut host = host_with_tool(&[]);
        for name in ["", "a/b", "has space"] {
            let err = material(&mut host, &request(name), &MaterialConfig::default()).unwrap_err();
            assert!(matches!(err, MaterialError::InvalidName(_)));
        }
    }
}
