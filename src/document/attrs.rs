//! Attribute interpretation
//!
//! Loosely-typed attributes arrive as raw JSON. Every reader here is a pure
//! function that resolves an invalid or missing shape to a safe default, so the
//! layout code never has to type-check attributes itself.

use serde_json::Value;

/// Cell padding used when a cell does not specify its own
pub const DEFAULT_CELL_PADDING: CellPadding = CellPadding {
    top: 2.0,
    right: 4.0,
    bottom: 2.0,
    left: 4.0,
};

fn finite(value: &Value) -> Option<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
}

/// Table indent in pixels.
///
/// Accepts `{ "width": n }` or a bare number. NaN, infinities and any other
/// shape resolve to 0. Negative values are kept: they pull the table into the
/// left margin.
pub fn table_indent(value: Option<&Value>) -> f32 {
    let Some(value) = value else {
        return 0.0;
    };
    let width = match value {
        Value::Object(map) => map.get("width").and_then(finite),
        other => finite(other),
    };
    width.unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHeightRule {
    Auto,
    AtLeast,
    Exact,
}

/// Explicit row height (`w:trHeight`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowHeight {
    pub value: f32,
    pub rule: RowHeightRule,
}

impl RowHeight {
    /// Whether the height is a real constraint rather than a hint
    pub fn is_explicit(&self) -> bool {
        self.rule != RowHeightRule::Auto
    }
}

/// Explicit row height, or `None` when absent or malformed.
///
/// A bare number is read as an `atLeast` height.
pub fn row_height(value: Option<&Value>) -> Option<RowHeight> {
    let value = value?;
    let (height, rule) = match value {
        Value::Object(map) => {
            let height = map.get("value").and_then(finite)?;
            let rule = match map.get("rule").and_then(Value::as_str) {
                Some("exact") => RowHeightRule::Exact,
                Some("auto") => RowHeightRule::Auto,
                _ => RowHeightRule::AtLeast,
            };
            (height, rule)
        }
        other => (finite(other)?, RowHeightRule::AtLeast),
    };
    (height > 0.0).then_some(RowHeight { value: height, rule })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPadding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl CellPadding {
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl Default for CellPadding {
    fn default() -> Self {
        DEFAULT_CELL_PADDING
    }
}

/// Cell padding; each side falls back to the default independently
pub fn cell_padding(value: Option<&Value>) -> CellPadding {
    let Some(Value::Object(map)) = value else {
        return DEFAULT_CELL_PADDING;
    };
    let side = |name: &str, fallback: f32| {
        map.get(name)
            .and_then(finite)
            .filter(|v| *v >= 0.0)
            .unwrap_or(fallback)
    };
    CellPadding {
        top: side("top", DEFAULT_CELL_PADDING.top),
        right: side("right", DEFAULT_CELL_PADDING.right),
        bottom: side("bottom", DEFAULT_CELL_PADDING.bottom),
        left: side("left", DEFAULT_CELL_PADDING.left),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_indent_shapes() {
        assert_eq!(table_indent(None), 0.0);
        assert_eq!(table_indent(Some(&json!({"width": 24, "type": "dxa"}))), 24.0);
        assert_eq!(table_indent(Some(&json!(-12.5))), -12.5);
        assert_eq!(table_indent(Some(&json!({"width": "wide"}))), 0.0);
        assert_eq!(table_indent(Some(&json!([1, 2]))), 0.0);
        assert_eq!(table_indent(Some(&json!({"type": "dxa"}))), 0.0);
    }

    #[test]
    fn test_row_height_rules() {
        let exact = row_height(Some(&json!({"value": 40, "rule": "exact"}))).unwrap();
        assert_eq!(exact.rule, RowHeightRule::Exact);
        assert!(exact.is_explicit());

        let bare = row_height(Some(&json!(30))).unwrap();
        assert_eq!(bare.rule, RowHeightRule::AtLeast);

        let auto = row_height(Some(&json!({"value": 30, "rule": "auto"}))).unwrap();
        assert!(!auto.is_explicit());

        assert!(row_height(Some(&json!({"value": 0}))).is_none());
        assert!(row_height(Some(&json!({"value": -5}))).is_none());
        assert!(row_height(Some(&json!("tall"))).is_none());
        assert!(row_height(None).is_none());
    }

    #[test]
    fn test_cell_padding_defaults_per_side() {
        assert_eq!(cell_padding(None), DEFAULT_CELL_PADDING);

        let padding = cell_padding(Some(&json!({"top": 6, "bottom": -1, "left": "x"})));
        assert_eq!(padding.top, 6.0);
        assert_eq!(padding.bottom, DEFAULT_CELL_PADDING.bottom);
        assert_eq!(padding.left, DEFAULT_CELL_PADDING.left);
        assert_eq!(padding.vertical(), 8.0);

        assert_eq!(cell_padding(Some(&json!(5))), DEFAULT_CELL_PADDING);
    }
}
