//! Server-rendered HTML for the index page.

use crate::models::{Analysis, Category};

/// Optional panel shown above the history table.
pub enum Flash<'a> {
    Empty,
    Stored(&'a Analysis),
    Error(&'a str),
}

/// Escape text for safe inclusion in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn opt(s: &Option<String>) -> String {
    escape_html(s.as_deref().unwrap_or(""))
}

fn render_flash(flash: &Flash<'_>) -> String {
    match flash {
        Flash::Empty => String::new(),
        Flash::Error(message) => format!(
            r#"<div class="flash error" role="alert"><strong>Analysis failed:</strong> {}</div>"#,
            escape_html(message)
        ),
        Flash::Stored(a) => format!(
            r#"<section class="flash result">
    <h2>Result #{}</h2>
    <dl>
        <dt>Summary</dt><dd class="summary">{}</dd>
        <dt>Persons</dt><dd class="persons">{}</dd>
        <dt>Category</dt><dd class="category">{}</dd>
    </dl>
</section>"#,
            a.id,
            opt(&a.summary),
            opt(&a.persons),
            opt(&a.category),
        ),
    }
}

fn render_rows(entries: &[Analysis]) -> String {
    if entries.is_empty() {
        return r#"<tr><td colspan="4" class="empty">No analyses yet. Paste a text above to get started.</td></tr>"#
            .to_string();
    }
    entries
        .iter()
        .map(|a| {
            format!(
                r#"
        <tr>
            <td>{}</td>
            <td>{}</td>
            <td>{}</td>
            <td><span class="badge">{}</span></td>
        </tr>"#,
                a.id,
                opt(&a.summary),
                opt(&a.persons),
                opt(&a.category)
            )
        })
        .collect()
}

/// Full index page: input form, optional flash panel, and recent history.
///
/// `draft` is placed back into the textarea (used after an error so the
/// text is not lost).
pub fn index_page(entries: &[Analysis], flash: Flash<'_>, draft: &str) -> String {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Insight</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }}
        textarea {{ width: 100%; min-height: 12rem; font: inherit; }}
        table {{ width: 100%; border-collapse: collapse; margin-top: 1rem; }}
        th, td {{ text-align: left; padding: .5rem; border-bottom: 1px solid #ddd; vertical-align: top; }}
        .flash {{ padding: 1rem; margin: 1rem 0; border-radius: 4px; }}
        .flash.error {{ background: #fde8e8; color: #8a1c1c; }}
        .flash.result {{ background: #e8f4fd; }}
        .badge {{ background: #eee; border-radius: 3px; padding: 0 .4rem; }}
        .empty, .muted {{ color: #777; }}
    </style>
</head>
<body>
<h1>Insight</h1>
<p class="muted">Paste an article to get a summary, the people mentioned, and a category ({}).</p>
<form method="post" action="/analyze">
    <textarea name="text" placeholder="Paste text here..." required>{}</textarea>
    <button type="submit">Analyze</button>
</form>
{}
<h2>Recent analyses</h2>
<p><a href="/export">Export all as JSON</a></p>
<table>
    <thead>
        <tr><th>#</th><th>Summary</th><th>Persons</th><th>Category</th></tr>
    </thead>
    <tbody>{}
    </tbody>
</table>
</body>
</html>
"#,
        categories.join(", "),
        escape_html(draft),
        render_flash(&flash),
        render_rows(entries)
    )
}
