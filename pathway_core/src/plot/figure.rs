//! Backend independent figure description
//!
//! A [`Figure`] is a display list: a page size, one panel (cartesian axes or a pie chart) and
//! the artists drawn on it. Renderers only translate data coordinates into page coordinates,
//! all layout decisions (limits, ticks, legend entries) are made here.
use crate::plot::ticks::{auto_limits, auto_ticks, format_tick};
use crate::plot::Color;

/// One page of a report
#[derive(Clone, Debug, PartialEq)]
pub struct Figure {
    /// Page width in inches
    pub width: f64,
    /// Page height in inches
    pub height: f64,
    /// Content of the page
    pub panel: Panel,
}

impl Figure {
    /// Figure with a single set of cartesian axes
    pub fn with_axes(width: f64, height: f64, axes: Axes) -> Self {
        Figure {
            width,
            height,
            panel: Panel::Axes(axes),
        }
    }

    /// Figure with a single pie chart
    pub fn with_pie(width: f64, height: f64, pie: PieChart) -> Self {
        Figure {
            width,
            height,
            panel: Panel::Pie(pie),
        }
    }

    /// The cartesian axes of the figure, None for pie charts
    pub fn axes(&self) -> Option<&Axes> {
        match &self.panel {
            Panel::Axes(axes) => Some(axes),
            Panel::Pie(_) => None,
        }
    }

    /// Mutable access to the cartesian axes of the figure
    pub fn axes_mut(&mut self) -> Option<&mut Axes> {
        match &mut self.panel {
            Panel::Axes(axes) => Some(axes),
            Panel::Pie(_) => None,
        }
    }
}

/// Content of a figure
#[derive(Clone, Debug, PartialEq)]
pub enum Panel {
    /// Cartesian axes
    Axes(Axes),
    /// Pie chart
    Pie(PieChart),
}

/// Cartesian axes with their artists
#[derive(Clone, Debug, PartialEq)]
pub struct Axes {
    /// Title drawn above the axes
    pub title: Option<String>,
    /// Horizontal axis
    pub x: Axis,
    /// Vertical axis
    pub y: Axis,
    /// Whether the frame around the axes is drawn
    pub spines: bool,
    /// Where the legend goes, None for no legend
    pub legend: Option<LegendPlacement>,
    /// Things drawn in the axes, in drawing order
    pub artists: Vec<Artist>,
}

impl Default for Axes {
    fn default() -> Self {
        Axes {
            title: None,
            x: Axis::default(),
            y: Axis::default(),
            spines: true,
            legend: None,
            artists: Vec::new(),
        }
    }
}

impl Axes {
    /// Add an artist
    pub fn add(&mut self, artist: Artist) {
        self.artists.push(artist);
    }

    /// Limits of the horizontal axis, explicit limits win over the data extent
    pub fn x_limits(&self) -> (f64, f64) {
        self.x.limits.unwrap_or_else(|| {
            let values: Vec<f64> = self.artists.iter().flat_map(|a| a.x_extent()).collect();
            auto_limits(&values, self.x.scale)
        })
    }

    /// Limits of the vertical axis, explicit limits win over the data extent
    pub fn y_limits(&self) -> (f64, f64) {
        self.y.limits.unwrap_or_else(|| {
            let values: Vec<f64> = self.artists.iter().flat_map(|a| a.y_extent()).collect();
            auto_limits(&values, self.y.scale)
        })
    }

    /// Tick positions and labels of the horizontal axis
    pub fn x_ticks(&self) -> Vec<(f64, String)> {
        self.x.tick_marks(self.x_limits())
    }

    /// Tick positions and labels of the vertical axis
    pub fn y_ticks(&self) -> Vec<(f64, String)> {
        self.y.tick_marks(self.y_limits())
    }

    /// Legend entries (label, color) in artist order
    pub fn legend_entries(&self) -> Vec<(&str, Color)> {
        self.artists
            .iter()
            .filter_map(|a| a.legend_entry())
            .collect()
    }
}

/// One axis of a set of axes
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Axis {
    /// Axis label
    pub label: Option<String>,
    /// Explicit limits
    pub limits: Option<(f64, f64)>,
    /// Linear or logarithmic
    pub scale: Scale,
    /// Tick placement
    pub ticks: Ticks,
    /// Whether major grid lines are drawn at the ticks
    pub grid: bool,
}

impl Axis {
    fn tick_marks(&self, limits: (f64, f64)) -> Vec<(f64, String)> {
        match &self.ticks {
            Ticks::Hidden => Vec::new(),
            Ticks::Labeled(ticks) => ticks.clone(),
            Ticks::Auto => auto_ticks(limits, self.scale)
                .into_iter()
                .map(|t| (t, format_tick(t, self.scale)))
                .collect(),
        }
    }
}

/// Axis scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    Linear,
    Log,
}

/// Tick placement of an axis
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Ticks {
    /// Evenly spaced ticks chosen from the limits
    #[default]
    Auto,
    /// No ticks or tick labels
    Hidden,
    /// Ticks at the given positions with the given labels
    Labeled(Vec<(f64, String)>),
}

/// Placement of the legend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegendPlacement {
    /// Upper right corner inside the axes
    UpperRight,
    /// Outside the axes on the right, vertically centred (center-left anchor at (1, 0.5))
    OutsideRight,
}

/// Something drawn in a set of axes
#[derive(Clone, Debug, PartialEq)]
pub enum Artist {
    /// Filled axis aligned rectangles, bars and ranges
    Rectangles {
        label: Option<String>,
        color: Color,
        rects: Vec<Rect>,
    },
    /// Polyline through the points
    Line {
        label: Option<String>,
        color: Color,
        width: f64,
        points: Vec<(f64, f64)>,
    },
    /// Square markers at the points
    Markers {
        label: Option<String>,
        color: Color,
        /// Marker edge length in points
        size: f64,
        points: Vec<(f64, f64)>,
    },
    /// Text whose lower left corner sits at (`x`, `y`), lines separated by `\n`
    Text {
        x: f64,
        y: f64,
        text: String,
        /// Font size in points
        size: f64,
    },
}

impl Artist {
    fn x_extent(&self) -> Vec<f64> {
        match self {
            Artist::Rectangles { rects, .. } => rects.iter().flat_map(|r| [r.x0, r.x1]).collect(),
            Artist::Line { points, .. } | Artist::Markers { points, .. } => {
                points.iter().map(|p| p.0).collect()
            }
            Artist::Text { x, .. } => vec![*x],
        }
    }

    fn y_extent(&self) -> Vec<f64> {
        match self {
            Artist::Rectangles { rects, .. } => rects.iter().flat_map(|r| [r.y0, r.y1]).collect(),
            Artist::Line { points, .. } | Artist::Markers { points, .. } => {
                points.iter().map(|p| p.1).collect()
            }
            Artist::Text { y, .. } => vec![*y],
        }
    }

    fn legend_entry(&self) -> Option<(&str, Color)> {
        match self {
            Artist::Rectangles {
                label: Some(label),
                color,
                ..
            }
            | Artist::Line {
                label: Some(label),
                color,
                ..
            }
            | Artist::Markers {
                label: Some(label),
                color,
                ..
            } => Some((label.as_str(), *color)),
            _ => None,
        }
    }
}

/// Axis aligned rectangle in data coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl Rect {
    /// Vertical bar centred on `x`
    pub fn bar(x: f64, width: f64, bottom: f64, top: f64) -> Self {
        Rect {
            x0: x - width / 2.0,
            x1: x + width / 2.0,
            y0: bottom,
            y1: top,
        }
    }

    /// Horizontal bar centred on `y`
    pub fn hbar(y: f64, height: f64, left: f64, right: f64) -> Self {
        Rect {
            x0: left,
            x1: right,
            y0: y - height / 2.0,
            y1: y + height / 2.0,
        }
    }
}

/// Pie chart, slices run counter-clockwise from 12 o'clock
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PieChart {
    pub title: Option<String>,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    /// Fraction of the total of every slice, slices with non-positive values get 0
    pub fn fractions(&self) -> Vec<f64> {
        let total: f64 = self.slices.iter().map(|s| s.value.max(0.0)).sum();
        self.slices
            .iter()
            .map(|s| {
                if total > 0.0 {
                    s.value.max(0.0) / total
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub color: Color,
}
