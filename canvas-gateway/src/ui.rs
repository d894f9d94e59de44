//! Server-rendered form for generating images from a browser.

use std::{fmt::Write, sync::Arc};

use axum::{extract::State, response::Html, Form};
use canvas_proto::{ArtStyle, ResponseEnvelope};
use escaper::{encode_attribute, encode_minimal};

use crate::{request_image, AppState, GenerateRequest, ImageBackend};

const TITLE: &str = "Text-to-Image Generator (gRPC)";
const DESCRIPTION: &str = "Generate images using a gRPC-based Stable Diffusion service. \
Use negative prompts to exclude unwanted elements and select an art style.";

/// Prefilled rows: prompt, context, negative prompt, style.
const EXAMPLES: [[&str; 4]; 2] = [
    ["a cat in forest", "sunset", "no blurry images", "realistic"],
    ["a futuristic city", "night", "no text", "cyberpunk"],
];

pub async fn index() -> Html<String> {
    Html(render_page(&GenerateRequest::empty(), None))
}

pub async fn submit<B: ImageBackend>(
    State(state): State<Arc<AppState<B>>>,
    Form(form): Form<GenerateRequest>,
) -> Html<String> {
    let envelope = request_image(&state.backend, form.clone()).await;
    Html(render_page(&form, Some(&envelope)))
}

impl GenerateRequest {
    fn empty() -> Self {
        Self {
            text: String::new(),
            context: String::new(),
            negative_prompt: String::new(),
            style: ArtStyle::default().to_string(),
        }
    }
}

fn text_area(name: &str, label: &str, placeholder: &str, value: &str) -> String {
    format!(
        r#"<label for="{name}">{label}</label>
<textarea id="{name}" name="{name}" rows="2" placeholder="{placeholder}">{value}</textarea>
"#,
        placeholder = encode_attribute(placeholder),
        value = encode_minimal(value),
    )
}

fn style_select(selected: &str) -> String {
    let mut html = String::from(
        "<label for=\"style\">Art Style</label>\n<select id=\"style\" name=\"style\">\n",
    );
    for style in ArtStyle::ALL {
        let marker = if style.as_str() == selected { " selected" } else { "" };
        let _ = writeln!(html, r#"<option value="{style}"{marker}>{style}</option>"#);
    }
    html.push_str("</select>\n");
    html
}

fn examples() -> String {
    let mut html = String::from("<h2>Examples</h2>\n");
    for [text, context, negative_prompt, style] in EXAMPLES {
        let _ = writeln!(
            html,
            r#"<form method="post" action="/" class="example">
<input type="hidden" name="text" value="{text}">
<input type="hidden" name="context" value="{context}">
<input type="hidden" name="negative_prompt" value="{negative_prompt}">
<input type="hidden" name="style" value="{style}">
<button type="submit">{label}</button>
</form>"#,
            text = encode_attribute(text),
            context = encode_attribute(context),
            negative_prompt = encode_attribute(negative_prompt),
            style = encode_attribute(style),
            label = encode_minimal(&format!("{text} / {context} / {negative_prompt} / {style}")),
        );
    }
    html
}

fn result(envelope: &ResponseEnvelope) -> String {
    if envelope.is_success() {
        // the base64 alphabet needs no escaping inside an attribute
        format!(
            r#"<img alt="Generated Image" src="data:image/png;base64,{}">"#,
            envelope.image_base64
        )
    } else {
        let error = envelope.error.as_deref().unwrap_or("unknown error");
        format!(
            r#"<p class="error">{}</p>"#,
            encode_minimal(&format!(
                "Error: {error} (Status Code: {})",
                envelope.status_code
            ))
        )
    }
}

pub fn render_page(form: &GenerateRequest, envelope: Option<&ResponseEnvelope>) -> String {
    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{TITLE}</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
label {{ display: block; margin-top: 1rem; font-weight: bold; }}
textarea, select {{ width: 100%; }}
.error {{ color: #b00020; }}
.example {{ display: inline-block; margin-right: 0.5rem; }}
img {{ max-width: 100%; margin-top: 1rem; }}
</style>
</head>
<body>
<h1>{TITLE}</h1>
<p>{DESCRIPTION}</p>
<form method="post" action="/">
"#
    );
    html.push_str(&text_area(
        "text",
        "Prompt",
        "Enter your prompt (e.g., 'cat in forest')",
        &form.text,
    ));
    html.push_str(&text_area(
        "context",
        "Context",
        "Add context (optional, e.g., 'sunset')",
        &form.context,
    ));
    html.push_str(&text_area(
        "negative_prompt",
        "Negative Prompt",
        "Negative prompt (e.g., 'no blurry images')",
        &form.negative_prompt,
    ));
    html.push_str(&style_select(&form.style));
    html.push_str("<p><button type=\"submit\">Generate</button></p>\n</form>\n");
    if let Some(envelope) = envelope {
        html.push_str("<section id=\"result\">\n");
        html.push_str(&result(envelope));
        html.push_str("\n</section>\n");
    }
    html.push_str(&examples());
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(text: &str) -> GenerateRequest {
        GenerateRequest {
            text: text.to_string(),
            ..GenerateRequest::empty()
        }
    }

    #[test]
    fn blank_page_has_every_field() {
        let html = render_page(&GenerateRequest::empty(), None);
        for name in ["text", "context", "negative_prompt", "style"] {
            assert!(html.contains(&format!(r#"name="{name}""#)), "missing {name}");
        }
        assert!(html.contains(r#"<option value="realistic" selected>"#));
        assert!(html.contains("a futuristic city"));
        assert!(!html.contains("id=\"result\""));
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_page(&form("<script>alert(1)</script>"), None);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn success_shows_inline_png() {
        let envelope = ResponseEnvelope::success("a cat", "aGVsbG8=");
        let html = render_page(&form("a cat"), Some(&envelope));
        assert!(html.contains(r#"src="data:image/png;base64,aGVsbG8=""#));
    }

    #[test]
    fn failure_shows_code_and_message() {
        let envelope = ResponseEnvelope::failure("", 400, "Empty prompt provided");
        let html = render_page(&form(""), Some(&envelope));
        assert!(html.contains("Error: Empty prompt provided (Status Code: 400)"));
        assert!(!html.contains("data:image/png"));
    }

    #[test]
    fn keeps_selected_style() {
        let mut request = form("a city");
        request.style = "cyberpunk".to_string();
        let html = render_page(&request, None);
        assert!(html.contains(r#"<option value="cyberpunk" selected>"#));
        assert!(html.contains(r#"<option value="realistic">"#));
    }
}
