//! Renders normalized text runs, applying span annotations as inline markup.

use maud::{Markup, html};

use crate::normalize::{Span, TextRun};

/// Renders a block body. Consecutive list items are grouped into one list.
pub fn render_runs(runs: &[TextRun]) -> Markup {
    let mut groups: Vec<(&str, Vec<&TextRun>)> = Vec::new();
    for run in runs {
        let list = match run.kind.as_str() {
            "list-item" => "ul",
            "o-list-item" => "ol",
            _ => "",
        };
        match groups.last_mut() {
            Some((kind, items)) if !list.is_empty() && *kind == list => items.push(run),
            _ => groups.push((list, vec![run])),
        }
    }

    html! {
        @for (list, items) in &groups {
            @match *list {
                "ul" => {
                    ul { @for run in items { li { (render_inline(run)) } } }
                },
                "ol" => {
                    ol { @for run in items { li { (render_inline(run)) } } }
                },
                _ => {
                    @for run in items { (render_block(run)) }
                },
            }
        }
    }
}

fn render_block(run: &TextRun) -> Markup {
    let inline = render_inline(run);
    match run.kind.as_str() {
        "heading1" => html! { h1 { (inline) } },
        "heading2" => html! { h2 { (inline) } },
        "heading3" => html! { h3 { (inline) } },
        "heading4" => html! { h4 { (inline) } },
        "heading5" => html! { h5 { (inline) } },
        "heading6" => html! { h6 { (inline) } },
        "preformatted" => html! { pre { (inline) } },
        _ => html! { p { (inline) } },
    }
}

/// Splits the text at every span boundary and wraps each piece in the spans
/// covering it. Offsets are character offsets, clamped to the text length.
pub fn render_inline(run: &TextRun) -> Markup {
    let chars: Vec<char> = run.text.chars().collect();
    let len = chars.len();

    let mut cuts = vec![0, len];
    for span in &run.spans {
        cuts.push(span.start.min(len));
        cuts.push(span.end.min(len));
    }
    cuts.sort_unstable();
    cuts.dedup();

    html! {
        @for pair in cuts.windows(2) {
            @let (from, to) = (pair[0], pair[1]);
            @let piece: String = chars[from..to].iter().collect();
            @let covering: Vec<&Span> = run
                .spans
                .iter()
                .filter(|s| s.start <= from && s.end >= to && s.start < s.end)
                .collect();
            (wrap(&piece, &covering))
        }
    }
}

fn wrap(text: &str, spans: &[&Span]) -> Markup {
    let Some((span, rest)) = spans.split_first() else {
        return html! { (text) };
    };
    let inner = wrap(text, rest);
    match span.kind.as_str() {
        "strong" => html! { strong { (inner) } },
        "em" => html! { em { (inner) } },
        "hyperlink" => match link_target(span) {
            Some(href) => html! { a href=(href) rel="noreferrer noopener" { (inner) } },
            None => inner,
        },
        "label" => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|l| l.as_str())
                .unwrap_or_default();
            html! { span class=(label) { (inner) } }
        }
        _ => inner,
    }
}

/// Web links use their url; links to other posts resolve to the detail route.
fn link_target(span: &Span) -> Option<String> {
    let data = span.data.as_ref()?;
    if let Some(url) = data.get("url").and_then(|u| u.as_str()) {
        return Some(url.to_string());
    }
    let uid = data.get("uid").and_then(|u| u.as_str())?;
    Some(format!("/post/{uid}"))
}
