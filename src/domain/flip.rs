/// Mirroring applied by the server when rendering the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlipSettings {
    pub horizontal: bool,
    pub vertical: bool,
}

impl FlipSettings {
    pub fn new(horizontal: bool, vertical: bool) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Wire form of a flag: the literal strings `"true"` / `"false"`.
pub fn flag_literal(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Parse a stored flag. Only the exact literal `"true"` counts as set.
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw == Some("true")
}
