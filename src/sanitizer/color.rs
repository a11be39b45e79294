//! Strict color-literal recognition for `color` settings fields.

use std::sync::LazyLock;

use regex::Regex;

static HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid regex")
});

static FUNCTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    let num = r"[+-]?(?:\d+\.?\d*|\.\d+)(?:%|deg|rad|turn)?";
    Regex::new(&format!(
        r"(?i)^(?:rgba?|hsla?)\(\s*{num}(?:\s*[,/\s]\s*{num}){{2,3}}\s*\)$"
    ))
    .expect("valid regex")
});

static VAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^var\(\s*--[A-Za-z0-9_-]+\s*\)$").expect("valid regex"));

const NAMED_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "currentcolor", "cyan",
    "darkblue", "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki",
    "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon",
    "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise",
    "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick",
    "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod",
    "gray", "green", "greenyellow", "grey", "honeydew", "hotpink", "indianred", "indigo",
    "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon", "lightblue",
    "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightslategrey", "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta",
    "maroon", "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple",
    "mediumseagreen", "mediumslateblue", "mediumspringgreen", "mediumturquoise",
    "mediumvioletred", "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite",
    "navy", "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
    "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru", "pink",
    "plum", "powderblue", "purple", "rebeccapurple", "red", "rosybrown", "royalblue",
    "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
    "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue", "tan",
    "teal", "thistle", "tomato", "transparent", "turquoise", "violet", "wheat", "white",
    "whitesmoke", "yellow", "yellowgreen",
];

/// Returns `true` if `value` is a color literal that can be passed through
/// as-is: hex, `rgb[a]()`/`hsl[a]()` with numeric arguments, a named
/// color, a `var(--name)` reference, or empty (unset).
pub fn is_color_literal(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || HEX.is_match(value)
        || FUNCTIONAL.is_match(value)
        || VAR_REF.is_match(value)
        || NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_color_shapes() {
        for color in [
            "#ff0000",
            "#FFF",
            "#ff000080",
            "#abcd",
            "rgb(255, 0, 0)",
            "rgba(0,0,0,0.5)",
            "rgb(0 0 0 / 50%)",
            "hsl(120deg, 100%, 50%)",
            "HSLA(120, 100%, 50%, .3)",
            "red",
            "RebeccaPurple",
            "transparent",
            "var(--e-global-color-primary)",
            "",
        ] {
            assert!(is_color_literal(color), "{color}");
        }
    }

    #[test]
    fn rejects_anything_else() {
        for value in [
            "#ff00f",
            "#gggggg",
            "red; background: url(javascript:alert(1))",
            "rgb(255,0,0) url(x)",
            "expression(alert(1))",
            "var(--x, url(javascript:alert(1)))",
            "<b>red</b>",
            "notacolor",
        ] {
            assert!(!is_color_literal(value), "{value}");
        }
    }
}
