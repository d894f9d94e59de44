use std::fmt;

/// Joins the request text and context into one prompt.
pub fn compose_prompt(text: &str, context: &str) -> String {
    format!("{text} {context}").trim().to_string()
}

/// Appends `", {style} style"` unless the style is the default realistic one.
pub fn apply_style(text: &str, style: &str) -> String {
    if style == ArtStyle::Realistic.as_str() {
        text.to_string()
    } else {
        format!("{text}, {style} style")
    }
}

/// Styles offered by the form UI. The JSON API accepts any string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtStyle {
    #[default]
    Realistic,
    OilPainting,
    Cartoon,
    Cyberpunk,
}

impl ArtStyle {
    pub const ALL: [ArtStyle; 4] = [
        ArtStyle::Realistic,
        ArtStyle::OilPainting,
        ArtStyle::Cartoon,
        ArtStyle::Cyberpunk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtStyle::Realistic => "realistic",
            ArtStyle::OilPainting => "oil painting",
            ArtStyle::Cartoon => "cartoon",
            ArtStyle::Cyberpunk => "cyberpunk",
        }
    }
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("snowy mountains", "sunset", "snowy mountains sunset")]
    #[case("cat in forest, cartoon style", "sunset", "cat in forest, cartoon style sunset")]
    #[case("@#$%^&*() invalid", "sunset", "@#$%^&*() invalid sunset")]
    #[case("a cat", "", "a cat")]
    #[case("", "sunset", "sunset")]
    #[case("", "", "")]
    #[case("  padded ", " ", "padded")]
    fn composes(#[case] text: &str, #[case] context: &str, #[case] expected: &str) {
        assert_eq!(compose_prompt(text, context), expected);
    }

    #[rstest]
    #[case("a cat", "realistic", "a cat")]
    #[case("a cat", "cartoon", "a cat, cartoon style")]
    #[case("a city", "oil painting", "a city, oil painting style")]
    #[case("a city", "watercolor", "a city, watercolor style")]
    fn styles(#[case] text: &str, #[case] style: &str, #[case] expected: &str) {
        assert_eq!(apply_style(text, style), expected);
    }

    #[test]
    fn default_style_is_realistic() {
        assert_eq!(ArtStyle::default().to_string(), "realistic");
        assert_eq!(ArtStyle::ALL.len(), 4);
    }
}
