//! Lot tree handler.

use serde::Serialize;
use tabled::Tabled;

use dhub_core::{Entity, IdentityCache, Lot, LotNode, Lots, Thing};

use super::HttpResources;
use crate::cli::{GlobalOpts, LotsArgs};
use crate::error::CliError;
use crate::output;

/// One visible lot with its depth in the tree.
#[derive(Debug, Serialize)]
struct LotEntry {
    id: String,
    title: String,
    depth: usize,
    delivery_note: bool,
}

impl LotEntry {
    fn new(lot: &Entity<Lot>, depth: usize) -> Self {
        let lot = lot.load();
        Self {
            id: lot.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            title: lot.title(),
            depth,
            delivery_note: lot.deliverynote.is_some(),
        }
    }
}

#[derive(Tabled)]
struct LotRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    title: String,
    #[tabled(rename = "Delivery note")]
    delivery_note: String,
}

fn lot_row(entry: &LotEntry) -> LotRow {
    LotRow {
        id: entry.id.clone(),
        title: entry.title.clone(),
        delivery_note: if entry.delivery_note { "yes".into() } else { String::new() },
    }
}

/// Visible nodes in pre-order.
fn flatten(nodes: &[LotNode], depth: usize, cache: &IdentityCache, out: &mut Vec<LotEntry>) -> Result<(), CliError> {
    for node in nodes.iter().filter(|node| node.is_visible) {
        out.push(LotEntry::new(&node.lot(cache)?, depth));
        flatten(&node.nodes, depth + 1, cache, out)?;
    }
    Ok(())
}

fn tree_text(entries: &[LotEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}{}", "  ".repeat(e.depth), e.title))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(resources: &HttpResources, args: LotsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut lots = Lots::fetch(resources).await?;
    let text = args.text.unwrap_or_default();

    let out = if args.flat {
        let entries: Vec<LotEntry> = lots.filter_lots(&text).iter().map(|lot| LotEntry::new(lot, 0)).collect();
        output::render_list(&global.output, &entries, lot_row, |e| e.id.clone())?
    } else {
        lots.make_nodes_with_text_visible(&text, resources.cache())?;
        let mut entries = Vec::new();
        flatten(&lots.tree, 0, resources.cache(), &mut entries)?;
        output::render_text(&global.output, &entries, || tree_text(&entries))?
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use dhub_core::EntityId;

    use super::*;

    fn entry(title: &str, depth: usize) -> LotEntry {
        LotEntry {
            id: title.to_lowercase(),
            title: title.into(),
            depth,
            delivery_note: false,
        }
    }

    #[test]
    fn tree_text_indents_by_depth() {
        let entries = [entry("Warehouse", 0), entry("Shelf", 1), entry("Box", 2)];
        assert_eq!(tree_text(&entries), "Warehouse\n  Shelf\n    Box");
    }

    #[test]
    fn hidden_nodes_are_skipped_with_their_subtree() {
        let cache = IdentityCache::new();
        let mut hidden = LotNode::new(EntityId::from("b"));
        hidden.is_visible = false;
        hidden.nodes.push(LotNode::new(EntityId::from("c")));

        let mut out = Vec::new();
        flatten(&[hidden], 0, &cache, &mut out).unwrap_or_else(|e| panic!("{e}"));
        assert!(out.is_empty());
    }
}
