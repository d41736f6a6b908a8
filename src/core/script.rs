use std::fmt::Write;

pub fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str(r#"\""#),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn fmt_f64(v: f64) -> String {
    if v.is_nan() {
        "float('nan')".to_string()
    } else if v.is_infinite() && v.is_sign_positive() {
        "float('inf')".to_string()
    } else if v.is_infinite() {
        "float('-inf')".to_string()
    } else {
        format!("{:?}", v)
    }
}

pub fn generate_script_header() -> String {
    "import hou\nfrom pxr import Usd, UsdGeom, Gf\n".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Creation,
    Linking,
    Finishing,
}

/// Python to run inside Houdini, collected by phase and rendered in phase order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    setup: String,
    creation: String,
    linking: String,
    finishing: String,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, phase: Phase, code: impl AsRef<str>) {
        let buf = match phase {
            Phase::Setup => &mut self.setup,
            Phase::Creation => &mut self.creation,
            Phase::Linking => &mut self.linking,
            Phase::Finishing => &mut self.finishing,
        };
        buf.push_str(code.as_ref());
        if !code.as_ref().ends_with('\n') {
            buf.push('\n');
        }
    }

    pub fn is_empty(&self) -> bool {
        self.setup.is_empty()
            && self.creation.is_empty()
            && self.linking.is_empty()
            && self.finishing.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn render(&self) -> String {
        let mut code = generate_script_header();
        for (title, body) in [
            ("Setup", &self.setup),
            ("Creation", &self.creation),
            ("Linking", &self.linking),
            ("Finishing", &self.finishing),
        ] {
            if body.is_empty() {
                continue;
            }
            let _ = write!(&mut code, "\n# --- {} Phase ---\n{}", title, body);
        }
        code
    }
}
