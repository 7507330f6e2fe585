//! Server-rendered HTML: the model gallery and the viewer page shell.

use std::fmt::Write;

use feature_viewer::render::escape_html;
use shared::{ModelCard, ProcessData};

use crate::config::Variant;
use crate::storage::{model_stem, PROCESS_DATA_FILE};

const MACHINING_OPERATIONS: [(&str, &str); 2] = [
    ("machining_milling", "Milling"),
    ("machining_turning", "Lathe+Milling"),
];

pub fn gallery(variant: Variant, cards: &[ModelCard]) -> String {
    let title = escape_html(variant.page_title());
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
         <link rel=\"stylesheet\" href=\"/stylesheets/style.css\"></head><body>\
         <header><h1>{title}</h1></header><main>"
    );

    out.push_str("<form class=\"upload\" action=\"/model\" method=\"post\" enctype=\"multipart/form-data\">");
    out.push_str("<input type=\"file\" name=\"data\" required>");
    if variant == Variant::Machining {
        out.push_str("<select name=\"operation\">");
        for (value, label) in MACHINING_OPERATIONS {
            let _ = write!(out, "<option value=\"{value}\">{label}</option>");
        }
        out.push_str("</select>");
    }
    out.push_str("<button type=\"submit\">Upload</button></form>");

    out.push_str("<section class=\"gallery\">");
    if cards.is_empty() {
        out.push_str("<p class=\"empty\">No converted models yet</p>");
    }
    for card in cards {
        let _ = write!(
            out,
            "<a class=\"card\" href=\"{href}\"><img src=\"{src}\" alt=\"{name}\">\
             <div class=\"card-process\">{process}</div><div class=\"card-title\">{name}</div></a>",
            href = escape_html(&card.href),
            src = escape_html(&card.src),
            name = escape_html(&card.title),
            process = escape_html(&card.process_title),
        );
    }
    out.push_str("</section></main></body></html>");
    out
}

/// Page shell for one model: part selector, mode selectors and the initial tree.
///
/// `unfolded_available` tells the sheet-metal scripts whether the converter
/// produced the unfolded geometry; without it they show the tree only.
pub fn viewer(
    variant: Variant,
    model_path: &str,
    data: &ProcessData,
    tree_html: &str,
    unfolded_available: bool,
) -> String {
    let model = escape_html(model_path);
    let folder = model_path.rsplit('/').next().unwrap_or(model_path);
    let assets = format!("/data/models/native/{model}/");
    let stem = escape_html(&model_stem(folder));
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{model}</title>\
         <link rel=\"stylesheet\" href=\"/stylesheets/style.css\"></head>\
         <body data-model=\"{model}\" data-assets=\"{assets}\" data-geometry=\"{assets}{stem}.cdxfb\""
    );
    if variant == Variant::SheetMetal {
        let _ = write!(out, " data-unfolded-available=\"{unfolded_available}\"");
        if unfolded_available {
            let _ = write!(out, " data-unfolded-geometry=\"{assets}{stem}_unfolded.cdxfb\"");
        }
    }
    let _ = write!(
        out,
        "><header><a href=\"/\">{}</a><h1>{model}</h1></header><aside class=\"controls\">",
        escape_html(variant.page_title()),
    );

    out.push_str("<select id=\"part-selector\">");
    for part in &data.parts {
        let id = escape_html(&part.part_id);
        let _ = write!(out, "<option value=\"{id}\">{id}</option>");
    }
    out.push_str("</select>");
    out.push_str(
        "<select id=\"tree-selector\"><option value=\"features\">Features</option>\
         <option value=\"dfm\">DFM</option></select>",
    );
    if variant == Variant::SheetMetal {
        out.push_str(
            "<select id=\"fold-selector\"><option value=\"folded\">Folded</option>\
             <option value=\"unfolded\">Unfolded</option></select>",
        );
    }
    out.push_str("</aside><div id=\"scene\"></div><section class=\"tree-panel\">");
    if variant == Variant::Machining {
        let _ = write!(
            out,
            "<a id=\"export-json\" href=\"{assets}{PROCESS_DATA_FILE}\" download=\"{}.json\">Export JSON</a>",
            escape_html(folder)
        );
    }
    let _ = write!(
        out,
        "<div id=\"feature-tree\">{tree_html}</div></section></body></html>"
    );
    out
}
