use crate::core::{KicadSexpError, Result};
use crate::node::{render_inline, Node};
use crate::parser::sexp::SExp;
use crate::registry::{NodeArgs, NodeDescriptor};

/// `(layer F.Cu)` or `(layers F.Cu F.Paste F.Mask)`.
///
/// Layer names are canonical KiCad names (`F.Cu`, `B.SilkS`, `In1.Cu`) or
/// wildcards such as `*.Cu`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    token: String,
    names: Vec<String>,
}

impl Layer {
    pub fn new(token: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            token: token.into(),
            names,
        }
    }

    pub fn descriptor(token: &str) -> NodeDescriptor {
        NodeDescriptor::new(token, |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let atoms = args.atoms()?;
            if atoms.is_empty() {
                return Err(KicadSexpError::structural(&args.token, "expected a layer name"));
            }
            let names = atoms
                .into_iter()
                .map(|atom| match atom {
                    SExp::Atom(name) => Ok(name),
                    other => Err(KicadSexpError::structural(
                        &args.token,
                        format!("layer name must be a string, found {}", other),
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Layer::new(args.token, names)))
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First (or only) layer name.
    pub fn name(&self) -> &str {
        self.names.first().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn is_copper(&self) -> bool {
        self.names.iter().any(|n| n.ends_with(".Cu"))
    }

    pub fn with_names(self, names: Vec<String>) -> Self {
        Self { names, ..self }
    }
}

impl Node for Layer {
    fn token(&self) -> &str {
        &self.token
    }

    fn render(&self) -> String {
        let args: Vec<SExp> = self.names.iter().map(|n| SExp::atom(n.as_str())).collect();
        render_inline(&self.token, &args)
    }
}
