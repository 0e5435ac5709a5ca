use figdex_collector::CaptionItem;
use figdex_core::FigdexError;
use figdex_core::FigdexResult;
use figdex_dom::collapse_whitespace;
use figdex_html::serialize_node;

use crate::cli::OutputFormat;
use crate::host::Frame;

pub(crate) fn format_list(
    format: OutputFormat,
    items: &[CaptionItem],
    frame: &Frame,
) -> FigdexResult<String> {
    match format {
        OutputFormat::Text => Ok(format_text(items)),
        OutputFormat::Json => serde_json::to_string_pretty(items)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|error| FigdexError::new("cli.encode_failed", error.to_string())),
        OutputFormat::Html => Ok(frame
            .list
            .map(|list| {
                let mut html = serialize_node(&frame.output, list);
                html.push('\n');
                html
            })
            .unwrap_or_default()),
    }
}

fn format_text(items: &[CaptionItem]) -> String {
    let width = items.len().to_string().len();
    let mut out = String::new();
    for (idx, item) in items.iter().enumerate() {
        out.push_str(&format!(
            "{:>width$}. {}  {}\n",
            idx + 1,
            collapse_whitespace(&item.title),
            item.href
        ));
    }
    out
}
