use super::*;

const ELLIPSIS: char = '…';

/// Formats `value` with `digits` significant digits, switching to
/// scientific notation for very small or large magnitudes.
pub fn format_sig(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let mut exponent = decimal_exponent(value.abs());
    if (-4..4).contains(&exponent) {
        // Rounding can carry into the next power of ten (9.96 -> 10).
        let shift = digits as i32 - 1 - exponent;
        let rounded = if shift >= 0 {
            let scale = 10f64.powi(shift);
            (value * scale).round() / scale
        } else {
            let scale = 10f64.powi(-shift);
            (value / scale).round() * scale
        };
        exponent = decimal_exponent(rounded.abs());
    }
    if !(-3..4).contains(&exponent) {
        return format!("{:.*e}", digits - 1, value);
    }
    let decimals = digits as i32 - 1 - exponent;
    if decimals >= 0 {
        format!("{:.*}", decimals as usize, value)
    } else {
        let factor = 10f64.powi(-decimals);
        format!("{:.0}", (value / factor).round() * factor)
    }
}

fn decimal_exponent(magnitude: f64) -> i32 {
    let mut exponent = magnitude.log10().floor() as i32;
    // log10 can land a hair off for exact powers of ten.
    if 10f64.powi(exponent + 1) <= magnitude {
        exponent += 1;
    } else if 10f64.powi(exponent) > magnitude {
        exponent -= 1;
    }
    exponent
}

/// Percent change from a parent's error to the sum of its children's.
/// Positive means the split reduced the error. `None` when any error is
/// non-finite or the parent error is not positive.
pub fn error_reduction(parent: f64, left: f64, right: f64) -> Option<f64> {
    if !(parent.is_finite() && left.is_finite() && right.is_finite()) || parent <= 0.0 {
        return None;
    }
    Some((parent - (left + right)) / parent * 100.0)
}

/// Cuts `text` to exactly `max_chars` characters, ending in an ellipsis.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push(ELLIPSIS);
    out
}

pub fn node_label(tree: &SubdivisionTree, node: &SubdomainNode, style: &VisualizationStyle) -> String {
    if !style.show_labels {
        return String::new();
    }
    let text = match node.kind {
        NodeKind::Leaf { .. } => {
            if node.l2_error.is_finite() {
                format_sig(node.l2_error, style.label_sig_digits)
            } else {
                String::new()
            }
        }
        NodeKind::Internal {
            split_dim,
            left,
            right,
            ..
        } => {
            let mut text = format!("x{split_dim}");
            if style.show_error_reduction {
                let reduction = match (tree.node(left), tree.node(right)) {
                    (Some(l), Some(r)) => error_reduction(node.l2_error, l.l2_error, r.l2_error),
                    _ => None,
                };
                if let Some(pct) = reduction {
                    if pct >= 0.0 {
                        text.push_str(&format!(" ↓{pct:.1}%"));
                    } else {
                        text.push_str(&format!(" ↑{:.1}%", -pct));
                    }
                }
            }
            text
        }
    };
    truncate_label(&text, style.label_max_chars)
}
