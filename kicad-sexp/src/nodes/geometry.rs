//! Positions, points and sizes.

use crate::classify::ChildBuckets;
use crate::core::{KicadSexpError, Result};
use crate::node::{downcast, max_args, number_arg, render_container, render_inline, Node, Parsed};
use crate::parser::sexp::SExp;
use crate::registry::{NodeArgs, NodeDescriptor};

/// `(at x y [angle])`
#[derive(Debug, Clone, PartialEq)]
pub struct At {
    x: f64,
    y: f64,
    angle: Option<f64>,
}

impl At {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, angle: None }
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("at", |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let atoms = args.atoms()?;
            max_args(&args.token, &atoms, 3)?;
            let angle = match atoms.get(2) {
                Some(_) => Some(number_arg(&args.token, &atoms, 2, "angle")?),
                None => None,
            };
            Ok(Box::new(At {
                x: number_arg(&args.token, &atoms, 0, "x")?,
                y: number_arg(&args.token, &atoms, 1, "y")?,
                angle,
            }))
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn angle(&self) -> Option<f64> {
        self.angle
    }

    pub fn with_angle(self, angle: f64) -> Self {
        Self {
            angle: Some(angle),
            ..self
        }
    }

    pub fn moved_by(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

impl Node for At {
    fn token(&self) -> &str {
        "at"
    }

    fn render(&self) -> String {
        let mut args = vec![SExp::Number(self.x), SExp::Number(self.y)];
        if let Some(angle) = self.angle {
            args.push(SExp::Number(angle));
        }
        render_inline("at", &args)
    }
}

/// Two numbers under a token: `xy`, `start`, `mid`, `end`, `center`, and
/// `size` outside of fonts.
#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    token: String,
    x: f64,
    y: f64,
}

impl Coord {
    pub fn new(token: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            token: token.into(),
            x,
            y,
        }
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self::new("xy", x, y)
    }

    pub fn descriptor(token: &str) -> NodeDescriptor {
        NodeDescriptor::new(token, |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let atoms = args.atoms()?;
            max_args(&args.token, &atoms, 2)?;
            let x = number_arg(&args.token, &atoms, 0, "x")?;
            let y = number_arg(&args.token, &atoms, 1, "y")?;
            Ok(Box::new(Coord::new(args.token, x, y)))
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Node for Coord {
    fn token(&self) -> &str {
        &self.token
    }

    fn render(&self) -> String {
        render_inline(&self.token, &[SExp::Number(self.x), SExp::Number(self.y)])
    }
}

/// `(size height width)` inside `font`; note the swapped order.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSize {
    height: f64,
    width: f64,
}

impl FontSize {
    pub fn new(height: f64, width: f64) -> Self {
        Self { height, width }
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("size", |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let atoms = args.atoms()?;
            max_args(&args.token, &atoms, 2)?;
            Ok(Box::new(FontSize {
                height: number_arg(&args.token, &atoms, 0, "height")?,
                width: number_arg(&args.token, &atoms, 1, "width")?,
            }))
        })
        .under("font")
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

impl Node for FontSize {
    fn token(&self) -> &str {
        "size"
    }

    fn render(&self) -> String {
        render_inline("size", &[SExp::Number(self.height), SExp::Number(self.width)])
    }
}

/// `(arc (start ..) (mid ..) (end ..))` inside a point list.
#[derive(Debug, Clone, PartialEq)]
pub struct PtsArc {
    start: Coord,
    mid: Coord,
    end: Coord,
}

impl PtsArc {
    pub fn new(start: (f64, f64), mid: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            start: Coord::new("start", start.0, start.1),
            mid: Coord::new("mid", mid.0, mid.1),
            end: Coord::new("end", end.0, end.1),
        }
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("arc", |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let mut buckets = ChildBuckets::new(args.token.clone());
            for child in args.take_resolved()? {
                match child {
                    Parsed::Node(node) => buckets.push(node),
                    other => {
                        return Err(KicadSexpError::structural(
                            &args.token,
                            format!("unexpected child {}", other.render()),
                        ))
                    }
                }
            }
            let arc = PtsArc {
                start: buckets.take_required("start")?,
                mid: buckets.take_required("mid")?,
                end: buckets.take_required("end")?,
            };
            buckets.finish_strict()?;
            Ok(Box::new(arc))
        })
        .under("pts")
    }

    pub fn start(&self) -> &Coord {
        &self.start
    }

    pub fn mid(&self) -> &Coord {
        &self.mid
    }

    pub fn end(&self) -> &Coord {
        &self.end
    }
}

impl Node for PtsArc {
    fn token(&self) -> &str {
        "arc"
    }

    fn render(&self) -> String {
        render_container(
            "arc",
            &[],
            &[self.start.render(), self.mid.render(), self.end.render()],
        )
    }
}

/// One entry of a point list.
#[derive(Debug, Clone, PartialEq)]
pub enum PtsItem {
    Xy(Coord),
    Arc(PtsArc),
}

impl PtsItem {
    fn render(&self) -> String {
        match self {
            PtsItem::Xy(xy) => xy.render(),
            PtsItem::Arc(arc) => arc.render(),
        }
    }
}

/// `(pts (xy ..) (arc ..) ...)`: an ordered point list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pts {
    items: Vec<PtsItem>,
}

impl Pts {
    pub fn new(items: Vec<PtsItem>) -> Self {
        Self { items }
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("pts", |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let mut items = Vec::new();
            for child in args.take_resolved()? {
                let item = match child.into_node() {
                    Some(node) if node.is::<PtsArc>() => PtsItem::Arc(downcast(node)?),
                    Some(node) if node.token() == "xy" && node.is::<Coord>() => {
                        PtsItem::Xy(downcast(node)?)
                    }
                    Some(node) => {
                        return Err(KicadSexpError::structural(
                            &args.token,
                            format!("unsupported child '{}'", node.token()),
                        ))
                    }
                    None => {
                        return Err(KicadSexpError::structural(&args.token, "unexpected bare value"))
                    }
                };
                items.push(item);
            }
            Ok(Box::new(Pts { items }))
        })
    }

    pub fn items(&self) -> &[PtsItem] {
        &self.items
    }

    /// Plain `xy` points, skipping arcs.
    pub fn points(&self) -> impl Iterator<Item = &Coord> {
        self.items.iter().filter_map(|item| match item {
            PtsItem::Xy(xy) => Some(xy),
            PtsItem::Arc(_) => None,
        })
    }

    pub fn with_item(mut self, item: PtsItem) -> Self {
        self.items.push(item);
        self
    }
}

impl Node for Pts {
    fn token(&self) -> &str {
        "pts"
    }

    fn render(&self) -> String {
        let children: Vec<String> = self.items.iter().map(|i| i.render()).collect();
        render_container("pts", &[], &children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn parse<T: Node + Clone>(registry: &Registry, text: &str) -> Result<T> {
        let parsed = registry.parse_str(text)?.remove(0);
        let node = parsed.into_node().expect("node");
        downcast::<T>(node)
    }

    #[test]
    fn test_at_with_and_without_angle() {
        let registry = Registry::kicad();
        let at: At = parse(&registry, "(at 1.5 -2)").unwrap();
        assert_eq!((at.x(), at.y(), at.angle()), (1.5, -2.0, None));
        assert_eq!(at.render(), "(at 1.5 -2)");

        let rotated: At = parse(&registry, "(at 0 0 90)").unwrap();
        assert_eq!(rotated.angle(), Some(90.0));
        assert_eq!(rotated.moved_by(1.0, 1.0).render(), "(at 1 1 90)");
    }

    #[test]
    fn test_at_rejects_bad_arity() {
        let registry = Registry::kicad();
        assert!(parse::<At>(&registry, "(at 1)").is_err());
        assert!(parse::<At>(&registry, "(at 1 2 3 4)").is_err());
        assert!(parse::<At>(&registry, "(at x 2)").is_err());
    }

    #[test]
    fn test_size_depends_on_parent() {
        let registry = Registry::kicad();
        let plain: Coord = parse(&registry, "(size 1 2)").unwrap();
        assert_eq!(plain.token(), "size");

        let font = registry
            .parse_primitive(&crate::parser::parse_forms("(size 1.27 1.5)").unwrap()[0], Some("font"))
            .unwrap();
        let size = font.as_node().and_then(|n| n.downcast_ref::<FontSize>()).unwrap();
        assert_eq!((size.height(), size.width()), (1.27, 1.5));
    }

    #[test]
    fn test_pts_keeps_order_and_variants() {
        let registry = Registry::kicad();
        let pts: Pts = parse(
            &registry,
            "(pts (xy 2 2) (arc (start 0 0) (mid 1 1) (end 2 0)) (xy 0 0))",
        )
        .unwrap();
        assert_eq!(pts.items().len(), 3);
        assert!(matches!(pts.items()[1], PtsItem::Arc(_)));
        let xs: Vec<f64> = pts.points().map(|p| p.x()).collect();
        assert_eq!(xs, [2.0, 0.0]);
        assert_eq!(
            pts.render(),
            "(pts\n  (xy 2 2)\n  (arc\n    (start 0 0)\n    (mid 1 1)\n    (end 2 0)\n  )\n  (xy 0 0)\n)"
        );
    }

    #[test]
    fn test_pts_rejects_foreign_children() {
        let registry = Registry::kicad();
        assert!(parse::<Pts>(&registry, "(pts (at 0 0))").is_err());
        assert!(parse::<Pts>(&registry, "(pts 1 2)").is_err());
        assert!(parse::<Pts>(&registry, "(pts (arc (start 0 0) (end 1 1)))").is_err());
    }

    #[test]
    fn test_arc_only_registered_under_pts() {
        let registry = Registry::kicad();
        assert!(matches!(
            registry.parse_str("(arc (start 0 0) (mid 1 1) (end 2 0))"),
            Err(KicadSexpError::UnregisteredToken { .. })
        ));
    }

    #[test]
    fn test_builders() {
        let pts = Pts::default()
            .with_item(PtsItem::Xy(Coord::xy(0.0, 0.0)))
            .with_item(PtsItem::Arc(PtsArc::new((0.0, 0.0), (1.0, 1.0), (2.0, 0.0))));
        assert_eq!(pts.items().len(), 2);
        assert_eq!(At::new(1.0, 2.0).with_angle(180.0).render(), "(at 1 2 180)");
    }
}
