//! Presentation tags carried by nodes and links.
//!
//! The engine never interprets these beyond equality (the diff engine reports
//! a change when they differ); the host's shape layer dispatches on them.

/// How a node or link is rendered by the host.
///
/// `Custom` names a renderer registered host-side; the engine treats it as an
/// opaque capability tag chosen once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Presentation {
    #[default]
    Default,
    Custom {
        renderer: String,
    },
}

/// Stroke style of a link.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LinkStroke {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Custom {
        dasharray: Vec<f64>,
        offset: f64,
    },
}

/// Concrete dash geometry for a stroke, in user units.
#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    pub dasharray: Vec<f64>,
    pub offset: f64,
}

impl LinkStroke {
    /// Dash geometry for this stroke, `None` for solid strokes.
    ///
    /// Named styles and custom styles resolve through the same table; there is
    /// no fallback branch that leaves a named style without a pattern.
    pub fn dash_pattern(&self) -> Option<DashPattern> {
        match self {
            LinkStroke::Solid => None,
            LinkStroke::Dashed => Some(DashPattern {
                dasharray: vec![8.0, 4.0],
                offset: 0.0,
            }),
            LinkStroke::Dotted => Some(DashPattern {
                dasharray: vec![2.0, 3.0],
                offset: 0.0,
            }),
            LinkStroke::Custom { dasharray, offset } => Some(DashPattern {
                dasharray: dasharray.clone(),
                offset: *offset,
            }),
        }
    }
}
