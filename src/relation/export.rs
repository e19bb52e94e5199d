//! Spreadsheet export of relations

use crate::annotation::{EntitySnapshot, Relation};

const BOM: char = '\u{feff}';

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn entity_cell(entity: &EntitySnapshot) -> String {
    format!("{}｜{}", entity.label, entity.text)
}

/// CSV with a byte-order mark so spreadsheet tools detect UTF-8.
///
/// Columns: entity 1, entity 2, relation. Entities render as `label｜text`.
pub fn relations_csv(relations: &[Relation]) -> String {
    let mut out = String::new();
    out.push(BOM);
    out.push_str(&["entity1", "entity2", "relation"].map(quote).join(","));
    out.push_str("\r\n");
    for relation in relations {
        let row = [
            quote(&entity_cell(&relation.entity1)),
            quote(&entity_cell(&relation.entity2)),
            quote(&relation.relation_name),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

/// File name for an export: characters illegal in file names become `_`.
pub fn export_file_name(document_name: &str) -> String {
    let cleaned: String = document_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let base = if cleaned.is_empty() { "document".to_string() } else { cleaned };
    format!("{}_relations.csv", base)
}
