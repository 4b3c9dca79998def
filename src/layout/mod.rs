//! Greedy left-to-right wrapping of tag chips.
//!
//! Chips are placed in input order on the current line. A chip that would
//! overflow the line starts a new one, unless it is the first chip of the
//! line, which is always placed no matter how wide it is.

use unicode_width::UnicodeWidthStr;

use crate::config::LayoutOptions;

/// Columns taken by the chip brackets alone.
pub const MIN_CHIP_PADDING: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowResult {
    pub size: Size,
    pub positions: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowLayout {
    pub spacing: f32,
}

impl Default for FlowLayout {
    fn default() -> Self {
        Self { spacing: 8.0 }
    }
}

impl FlowLayout {
    pub fn new(spacing: f32) -> Self {
        Self { spacing }
    }

    pub fn arrange(&self, max_width: f32, chips: &[Size]) -> FlowResult {
        let mut positions = Vec::with_capacity(chips.len());
        let mut x = 0.0_f32;
        let mut y = 0.0_f32;
        let mut line_height = 0.0_f32;

        for chip in chips {
            if x + chip.width > max_width && x > 0.0 {
                x = 0.0;
                y += line_height + self.spacing;
                line_height = 0.0;
            }
            positions.push(Point::new(x, y));
            x += chip.width + self.spacing;
            line_height = line_height.max(chip.height);
        }

        FlowResult {
            size: Size::new(max_width, y + line_height),
            positions,
        }
    }
}

/// Lays text chips out on a character grid. Each chip is one row tall and
/// as wide as its label's display width plus the configured padding.
pub fn render_chips<S: AsRef<str>>(labels: &[S], options: &LayoutOptions) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let padding = usize::from(options.chip_padding.max(MIN_CHIP_PADDING));
    let sizes: Vec<Size> = labels
        .iter()
        .map(|label| Size::new((label.as_ref().width() + padding) as f32, 1.0))
        .collect();
    let layout = FlowLayout::new(f32::from(options.chip_spacing));
    let result = layout.arrange(f32::from(options.line_width), &sizes);

    let mut lines: Vec<String> = Vec::new();
    for (label, point) in labels.iter().zip(&result.positions) {
        let row = point.y as usize / (1 + usize::from(options.chip_spacing));
        while lines.len() <= row {
            lines.push(String::new());
        }
        let line = &mut lines[row];
        let column = point.x as usize;
        let current = line.width();
        if column > current {
            line.push_str(&" ".repeat(column - current));
        }
        line.push_str(&chip_text(label.as_ref(), padding));
    }
    lines.join("\n")
}

fn chip_text(label: &str, padding: usize) -> String {
    let inner = padding.saturating_sub(2);
    let left = inner / 2;
    let right = inner - left;
    format!("[{}{}{}]", " ".repeat(left), label, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chips(widths: &[f32], height: f32) -> Vec<Size> {
        widths.iter().map(|w| Size::new(*w, height)).collect()
    }

    #[test]
    fn wraps_when_next_chip_overflows() {
        let layout = FlowLayout::new(10.0);
        let result = layout.arrange(70.0, &chips(&[30.0, 30.0, 30.0], 20.0));
        assert_eq!(
            result.positions,
            vec![
                Point::new(0.0, 0.0),
                Point::new(40.0, 0.0),
                Point::new(0.0, 30.0),
            ]
        );
        assert_eq!(result.size, Size::new(70.0, 50.0));
    }

    #[test]
    fn exact_fit_stays_on_line() {
        let layout = FlowLayout::new(10.0);
        let result = layout.arrange(100.0, &chips(&[50.0, 40.0], 12.0));
        assert_eq!(result.positions[1], Point::new(60.0, 0.0));
        assert_eq!(result.size.height, 12.0);
    }

    #[test]
    fn oversized_first_chip_never_wraps_an_empty_line() {
        let layout = FlowLayout::new(10.0);
        let result = layout.arrange(50.0, &chips(&[80.0, 20.0], 10.0));
        assert_eq!(result.positions[0], Point::new(0.0, 0.0));
        assert_eq!(result.positions[1], Point::new(0.0, 20.0));
        assert_eq!(result.size, Size::new(50.0, 30.0));
    }

    #[test]
    fn line_height_is_tallest_chip_on_line() {
        let layout = FlowLayout::new(5.0);
        let sizes = vec![
            Size::new(20.0, 10.0),
            Size::new(20.0, 25.0),
            Size::new(20.0, 8.0),
        ];
        let result = layout.arrange(50.0, &sizes);
        assert_eq!(result.positions[2], Point::new(0.0, 30.0));
        assert_eq!(result.size.height, 38.0);
    }

    #[test]
    fn empty_input_has_zero_height() {
        let result = FlowLayout::default().arrange(120.0, &[]);
        assert!(result.positions.is_empty());
        assert_eq!(result.size, Size::new(120.0, 0.0));
    }

    #[test]
    fn renders_chips_across_rows() {
        let options = LayoutOptions {
            line_width: 20,
            chip_spacing: 1,
            chip_padding: 4,
        };
        let rendered = render_chips(&["Bio", "Local", "Végétarien"], &options);
        assert_eq!(rendered, "[ Bio ] [ Local ]\n[ Végétarien ]");
        assert_eq!(render_chips::<&str>(&[], &options), "");
    }

    #[test]
    fn narrow_padding_still_reserves_the_brackets() {
        let options = LayoutOptions {
            line_width: 20,
            chip_spacing: 1,
            chip_padding: 0,
        };
        let rendered = render_chips(&["Bio", "Local", "Végétarien"], &options);
        assert_eq!(rendered, "[Bio] [Local]\n[Végétarien]");
    }
}
