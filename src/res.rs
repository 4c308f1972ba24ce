use axum::{debug_handler, http::StatusCode, response::{Html, IntoResponse, Response}, Json};
use pulldown_cmark::{html, Event, Options, Parser};
use serde_json::json;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

pub fn sorry(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("no such {what}") })),
    )
        .into_response()
}

#[debug_handler]
pub async fn auth_code_error() -> impl IntoResponse {
    Html(include_res!(str, "/pages/auth_code_error.html"))
}

/// Renders chat Markdown; raw HTML in the source comes out escaped.
pub fn render_markdown(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_STRIKETHROUGH)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            _ => event,
        });

    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_escapes_raw_html() {
        let out = render_markdown("hi <script>alert(1)</script> **there**");
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("<strong>there</strong>"));
        assert!(!out.contains("<script>"));
    }
}
