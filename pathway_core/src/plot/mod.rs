//! Module providing figures for MDF and ECM results, and the text page of the report

pub mod figure;
pub mod ticks;

pub use figure::{Artist, Axes, Axis, Figure, LegendPlacement, Panel, PieChart, PieSlice, Rect, Scale, Ticks};

/// Width and height (inches) of the MDF pages
pub const MDF_PAGE_SIZE: (f64, f64) = (10.0, 7.0);

/// RGB color with components in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const GREY: Color = Color::rgb(0.75, 0.75, 0.75);
    pub const BLUE: Color = Color::rgb(0.122, 0.467, 0.706);
    pub const ORANGE: Color = Color::rgb(1.0, 0.498, 0.055);
    pub const GREEN: Color = Color::rgb(0.173, 0.627, 0.173);
    pub const RED: Color = Color::rgb(0.839, 0.153, 0.157);
    pub const PURPLE: Color = Color::rgb(0.580, 0.404, 0.741);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b }
    }

    /// The `index`th color of the categorical palette, repeating after ten colors
    pub fn palette(index: usize) -> Self {
        const PALETTE: [Color; 10] = [
            Color::BLUE,
            Color::ORANGE,
            Color::GREEN,
            Color::RED,
            Color::PURPLE,
            Color::rgb(0.549, 0.337, 0.294),
            Color::rgb(0.890, 0.467, 0.761),
            Color::rgb(0.498, 0.498, 0.498),
            Color::rgb(0.737, 0.741, 0.133),
            Color::rgb(0.090, 0.745, 0.812),
        ];
        PALETTE[index % PALETTE.len()]
    }
}

/// Break a long formula into lines by inserting `\n` at character offset 100, then at
/// character offset 200 of the already modified string
///
/// An offset past the end of the string appends the newline instead.
///
/// # Examples
/// ```rust
/// use pathway_core::plot::insert_line_breaks;
/// assert_eq!(insert_line_breaks("A <=> B"), "A <=> B\n\n");
/// ```
pub fn insert_line_breaks(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    for offset in [100, 200] {
        let position = offset.min(chars.len());
        chars.insert(position, '\n');
    }
    chars.into_iter().collect()
}

/// Text only page holding the net reaction formula
///
/// The text sits at (0, 1) of axes spanning x ∈ [0, 5] and y ∈ [1, 1.2], with no ticks and
/// no frame.
pub fn text_page(formula: &str) -> Figure {
    let mut axes = Axes {
        spines: false,
        ..Axes::default()
    };
    axes.x.limits = Some((0.0, 5.0));
    axes.y.limits = Some((1.0, 1.2));
    axes.x.ticks = Ticks::Hidden;
    axes.y.ticks = Ticks::Hidden;
    axes.add(Artist::Text {
        x: 0.0,
        y: 1.0,
        text: insert_line_breaks(formula),
        size: 10.0,
    });
    Figure::with_axes(MDF_PAGE_SIZE.0, MDF_PAGE_SIZE.1, axes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks_in_long_formula() {
        let formula: String = (0..250).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let wrapped = insert_line_breaks(&formula);
        let chars: Vec<char> = wrapped.chars().collect();
        assert_eq!(chars.len(), 252);
        assert_eq!(chars[100], '\n');
        assert_eq!(chars[200], '\n');
        // The second break lands after 199 characters of the original formula
        let original: Vec<char> = formula.chars().collect();
        assert_eq!(wrapped.replace('\n', ""), formula);
        assert_eq!(chars[199], original[198]);
        assert_eq!(chars[201], original[199]);
    }

    #[test]
    fn line_breaks_in_short_formula() {
        let formula = "x".repeat(150);
        let wrapped = insert_line_breaks(&formula);
        assert_eq!(wrapped.chars().nth(100), Some('\n'));
        assert!(wrapped.ends_with('\n'));
        assert_eq!(wrapped.len(), 152);
        assert_eq!(insert_line_breaks(""), "\n\n");
    }

    #[test]
    fn text_page_layout() {
        let page = text_page("A <=> B");
        assert_eq!((page.width, page.height), (10.0, 7.0));
        let axes = page.axes().unwrap();
        assert_eq!(axes.x_limits(), (0.0, 5.0));
        assert_eq!(axes.y_limits(), (1.0, 1.2));
        assert!(axes.x_ticks().is_empty());
        assert!(axes.y_ticks().is_empty());
        assert!(!axes.spines);
        match &axes.artists[0] {
            Artist::Text { x, y, text, .. } => {
                assert_eq!((*x, *y), (0.0, 1.0));
                assert_eq!(text, "A <=> B\n\n");
            }
            other => panic!("Expected text, got {:?}", other),
        }
    }
}
