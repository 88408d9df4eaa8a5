//! Home page rendering.
//!
//! Templates use `[[` `]]` delimiters so they do not clash with client-side
//! frameworks. Supported placeholders are `[[.Version]]`, `[[.Debug]]` and
//! `[[.User.Name]]`.

/// Built-in home page.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Fills the placeholders of `template`.
pub fn render_home(template: &str, version: i64, debug: bool, user: &str) -> String {
    template
        .replace("[[.Version]]", &version.to_string())
        .replace("[[.Debug]]", if debug { "true" } else { "false" })
        .replace("[[.User.Name]]", &escape_html(user))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
