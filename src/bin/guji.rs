//! Guji CLI: documents, entity spans and relations from the command line.
//!
//! Usage:
//!   guji doc <put|list|show|delete> [--db path] [--config path]
//!   guji label <add|list|remove> ...
//!   guji span <add|list|delete> ...
//!   guji relation <add|list|delete|export> ...
//!   guji annotate <doc> | stats <doc> | chunks <file> | normalize <file>

use clap::{Parser, Subcommand};
use guji::ai::CancellationToken;
use guji::api::{AnnotationApi, ManualAdd};
use guji::{Chunker, ContentFormat, Document, DocumentId, GujiConfig, RelationId, SpanFilter, SpanId};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "guji", version, about = "Entity and relation annotation for classical Chinese texts")]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage documents
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },
    /// Manage the label vocabulary
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },
    /// Manage entity spans of a document
    Span {
        #[command(subcommand)]
        action: SpanAction,
    },
    /// Manage relations between spans
    Relation {
        #[command(subcommand)]
        action: RelationAction,
    },
    /// Annotate a document with the AI annotation service
    Annotate {
        /// Document id
        doc: String,
    },
    /// Entity statistics for a document
    Stats {
        /// Document id
        doc: String,
    },
    /// Show how a text file would be chunked for AI annotation
    Chunks {
        file: PathBuf,
    },
    /// Print the plain text of a rich-text file
    Normalize {
        file: PathBuf,
        /// auto, plain, html or markdown
        #[arg(long, default_value = "auto")]
        format: String,
    },
}

#[derive(Subcommand)]
enum DocAction {
    /// Store a document from a file
    Put {
        /// Display name
        name: String,
        /// File holding the document content
        file: PathBuf,
        /// Document id (defaults to a new id)
        #[arg(long)]
        id: Option<String>,
        /// auto, plain, html or markdown
        #[arg(long, default_value = "auto")]
        format: String,
    },
    /// List stored documents
    List,
    /// Print a document's plain text with annotations marked
    Show {
        doc: String,
    },
    /// Delete a document with its spans and relations
    Delete {
        doc: String,
    },
}

#[derive(Subcommand)]
enum LabelAction {
    /// Add a custom label
    Add {
        value: String,
    },
    /// List built-in and custom labels
    List,
    /// Remove a custom label no span uses
    Remove {
        value: String,
    },
}

#[derive(Subcommand)]
enum SpanAction {
    /// Annotate [start, end) of the plain text
    Add {
        doc: String,
        start: usize,
        end: usize,
        label: String,
        /// Replace a span with exactly the same range
        #[arg(long, conflicts_with = "keep")]
        replace: bool,
        /// Keep a span with exactly the same range next to the new one
        #[arg(long)]
        keep: bool,
    },
    /// List spans
    List {
        doc: String,
        /// Only spans with this label
        #[arg(long)]
        label: Option<String>,
        /// Only spans whose text contains this
        #[arg(long)]
        text: Option<String>,
    },
    /// Delete a span by id
    Delete {
        doc: String,
        id: String,
    },
}

#[derive(Subcommand)]
enum RelationAction {
    /// Relate two spans by id
    Add {
        doc: String,
        entity1: String,
        entity2: String,
        name: String,
    },
    /// List relations
    List {
        doc: String,
    },
    /// Delete a relation by id
    Delete {
        doc: String,
        id: String,
    },
    /// Write relations as CSV
    Export {
        doc: String,
        /// Output file (defaults to a name derived from the document)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<GujiConfig, String> {
    match path {
        Some(path) => GujiConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(GujiConfig::default()),
    }
}

fn open_api(db: Option<PathBuf>, config: GujiConfig) -> Result<AnnotationApi, String> {
    let db_path = db.unwrap_or_else(|| config.db_path());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    AnnotationApi::open(&db_path, config).map_err(|e| format!("Failed to open database: {}", e))
}

fn parse_format(raw: &str) -> Result<ContentFormat, String> {
    ContentFormat::parse(raw).ok_or_else(|| format!("unknown format '{}'", raw))
}

fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))
}

fn fail(message: impl std::fmt::Display) -> i32 {
    eprintln!("Error: {}", message);
    1
}

fn cmd_doc_put(api: &AnnotationApi, name: &str, file: &Path, id: Option<String>, format: &str) -> i32 {
    let content = match read_file(file) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let format = match parse_format(format) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };
    let mut document = Document::new(name, content).with_format(format);
    if let Some(id) = id {
        document = document.with_id(id);
    }
    match api.put_document(&document) {
        Ok(id) => {
            println!("Stored document '{}' ({})", name, id);
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_doc_list(api: &AnnotationApi) -> i32 {
    let documents = match api.list_documents() {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    if documents.is_empty() {
        println!("No documents stored.");
        return 0;
    }
    println!("{:<36}  {:<24}  {:>7}", "ID", "NAME", "SPANS");
    println!("{}", "-".repeat(72));
    for document in documents {
        let spans = api.spans(&document.id).len();
        println!("{:<36}  {:<24}  {:>7}", document.id, document.name, spans);
    }
    0
}

fn cmd_doc_show(api: &AnnotationApi, doc: &DocumentId) -> i32 {
    match api.segments(doc) {
        Ok(segments) => {
            let mut out = String::new();
            for segment in segments {
                match segment.annotation {
                    Some(a) => out.push_str(&format!("[{}|{}]", segment.text, a.label)),
                    None => out.push_str(&segment.text),
                }
            }
            println!("{}", out);
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_doc_delete(api: &AnnotationApi, doc: &DocumentId) -> i32 {
    match api.delete_document(doc) {
        Ok(true) => {
            println!("Deleted document {}", doc);
            0
        }
        Ok(false) => fail(format!("document '{}' not found", doc)),
        Err(e) => fail(e),
    }
}

fn cmd_label_add(api: &AnnotationApi, value: &str) -> i32 {
    match api.add_label(value) {
        Ok(label) => {
            println!("Added label '{}' ({})", label.value, label.color);
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_label_list(api: &AnnotationApi) -> i32 {
    println!("{:<16}  {:<16}  {:<20}  KIND", "VALUE", "NAME", "COLOR");
    println!("{}", "-".repeat(64));
    for label in api.labels_snapshot() {
        let kind = if label.is_custom { "custom" } else { "built-in" };
        println!("{:<16}  {:<16}  {:<20}  {}", label.value, label.display_name, label.color, kind);
    }
    0
}

fn cmd_label_remove(api: &AnnotationApi, value: &str) -> i32 {
    match api.remove_label(value) {
        Ok(label) => {
            println!("Removed label '{}'", label.value);
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_span_add(api: &AnnotationApi, doc: &DocumentId, start: usize, end: usize, label: &str, replace: bool, keep: bool) -> i32 {
    let result = match api.add_span(doc, start, end, label) {
        Ok(ManualAdd::Added(span)) => Ok(span),
        Ok(ManualAdd::Conflict { existing, candidate }) => {
            if replace {
                api.replace_span(doc, &existing.id, candidate)
            } else if keep {
                api.keep_both(doc, candidate)
            } else {
                eprintln!(
                    "Error: [{}, {}) is already annotated as '{}' ({}); pass --replace or --keep",
                    existing.start, existing.end, existing.label, existing.id
                );
                return 1;
            }
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(span) => {
            println!("Added {} [{}, {}) {} '{}'", span.id, span.start, span.end, span.label, span.text);
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_span_list(api: &AnnotationApi, doc: &DocumentId, label: Option<String>, text: Option<String>) -> i32 {
    let mut filter = SpanFilter::new();
    if let Some(label) = label {
        filter = filter.with_label(label);
    }
    if let Some(text) = text {
        filter = filter.with_text(text);
    }
    let spans = api.search_spans(doc, &filter);
    if spans.is_empty() {
        println!("No spans.");
        return 0;
    }
    println!("{:<36}  {:>6}  {:>6}  {:<10}  {:<6}  TEXT", "ID", "START", "END", "LABEL", "SOURCE");
    println!("{}", "-".repeat(80));
    for span in spans {
        println!(
            "{:<36}  {:>6}  {:>6}  {:<10}  {:<6}  {}",
            span.id,
            span.start,
            span.end,
            span.label,
            span.source.as_str(),
            span.text
        );
    }
    0
}

fn cmd_span_delete(api: &AnnotationApi, doc: &DocumentId, id: &str) -> i32 {
    match api.delete_span(doc, &SpanId::from_string(id)) {
        Ok(true) => {
            println!("Deleted span {}", id);
            0
        }
        Ok(false) => fail(format!("span '{}' not found", id)),
        Err(e) => fail(e),
    }
}

fn cmd_annotate(api: &AnnotationApi, doc: &DocumentId) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return fail(format!("failed to create tokio runtime: {}", e)),
    };
    let cancel = CancellationToken::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<guji::ai::ImportProgress>();
    rt.block_on(async {
        let watcher = tokio::spawn(async move {
            while let Some(p) = rx.recv().await {
                eprintln!("chunk {}/{}: {} span(s) so far", p.chunks_done, p.chunks_total, p.spans_committed);
            }
        });
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
        let result = api.auto_annotate(doc, &cancel, Some(tx)).await;
        watcher.await.ok();
        match result {
            Ok(report) => {
                println!("{}", report.summary());
                0
            }
            Err(e) => fail(e),
        }
    })
}

fn cmd_stats(api: &AnnotationApi, doc: &DocumentId) -> i32 {
    let overview = match api.overview(doc) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    println!("characters:      {}", overview.total_chars);
    println!("entities:        {}", overview.total_entities);
    println!("unique persons:  {}", overview.unique_persons);
    println!("unique places:   {}", overview.unique_places);
    println!("unique times:    {}", overview.unique_times);
    for (label, count) in &overview.label_counts {
        println!("  {:<12} {}", label, count);
    }
    match api.person_network(doc) {
        Ok(links) if !links.is_empty() => {
            println!("co-occurring persons:");
            for link in links.iter().take(10) {
                println!("  {} - {} ({})", link.a, link.b, link.count);
            }
        }
        Ok(_) => {}
        Err(e) => return fail(e),
    }
    0
}

fn cmd_relation_add(api: &AnnotationApi, doc: &DocumentId, e1: &str, e2: &str, name: &str) -> i32 {
    match api.add_relation(doc, &SpanId::from_string(e1), &SpanId::from_string(e2), name) {
        Ok(r) => {
            println!(
                "Added {}: {}|{} -[{}]-> {}|{}",
                r.id, r.entity1.label, r.entity1.text, r.relation_name, r.entity2.label, r.entity2.text
            );
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_relation_list(api: &AnnotationApi, doc: &DocumentId) -> i32 {
    let relations = api.list_relations(doc);
    if relations.is_empty() {
        println!("No relations.");
        return 0;
    }
    for r in relations {
        println!(
            "{}  {}|{} -[{}]-> {}|{}",
            r.id, r.entity1.label, r.entity1.text, r.relation_name, r.entity2.label, r.entity2.text
        );
    }
    0
}

fn cmd_relation_delete(api: &AnnotationApi, doc: &DocumentId, id: &str) -> i32 {
    match api.delete_relation(doc, &RelationId::from_string(id)) {
        Ok(true) => {
            println!("Deleted relation {}", id);
            0
        }
        Ok(false) => fail(format!("relation '{}' not found", id)),
        Err(e) => fail(e),
    }
}

fn cmd_relation_export(api: &AnnotationApi, doc: &DocumentId, out: Option<PathBuf>) -> i32 {
    let (file_name, csv) = match api.export_relations(doc) {
        Ok(x) => x,
        Err(e) => return fail(e),
    };
    let path = out.unwrap_or_else(|| PathBuf::from(file_name));
    match std::fs::write(&path, csv) {
        Ok(()) => {
            println!("Wrote {}", path.display());
            0
        }
        Err(e) => fail(format!("cannot write '{}': {}", path.display(), e)),
    }
}

fn cmd_chunks(config: &GujiConfig, file: &Path) -> i32 {
    let content = match read_file(file) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let plain = guji::to_plain_text(&content);
    let chunks = Chunker::new(config.import.chunker.clone()).chunk(&plain);
    println!("{:>5}  {:>7}  {:>7}  {:>6}", "CHUNK", "START", "END", "CHARS");
    for chunk in chunks {
        println!("{:>5}  {:>7}  {:>7}  {:>6}", chunk.index, chunk.start, chunk.end, chunk.end - chunk.start);
    }
    0
}

fn cmd_normalize(file: &Path, format: &str) -> i32 {
    let content = match read_file(file) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    match parse_format(format) {
        Ok(format) => {
            println!("{}", guji::text::to_plain_text_as(&content, format));
            0
        }
        Err(e) => fail(e),
    }
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => std::process::exit(fail(e)),
    };

    let code = match cli.command {
        Commands::Chunks { file } => cmd_chunks(&config, &file),
        Commands::Normalize { file, format } => cmd_normalize(&file, &format),
        command => {
            let api = match open_api(cli.db, config) {
                Ok(api) => api,
                Err(e) => std::process::exit(fail(e)),
            };
            match command {
                Commands::Doc { action } => match action {
                    DocAction::Put { name, file, id, format } => cmd_doc_put(&api, &name, &file, id, &format),
                    DocAction::List => cmd_doc_list(&api),
                    DocAction::Show { doc } => cmd_doc_show(&api, &doc.into()),
                    DocAction::Delete { doc } => cmd_doc_delete(&api, &doc.into()),
                },
                Commands::Label { action } => match action {
                    LabelAction::Add { value } => cmd_label_add(&api, &value),
                    LabelAction::List => cmd_label_list(&api),
                    LabelAction::Remove { value } => cmd_label_remove(&api, &value),
                },
                Commands::Span { action } => match action {
                    SpanAction::Add { doc, start, end, label, replace, keep } => {
                        cmd_span_add(&api, &doc.into(), start, end, &label, replace, keep)
                    }
                    SpanAction::List { doc, label, text } => cmd_span_list(&api, &doc.into(), label, text),
                    SpanAction::Delete { doc, id } => cmd_span_delete(&api, &doc.into(), &id),
                },
                Commands::Relation { action } => match action {
                    RelationAction::Add { doc, entity1, entity2, name } => {
                        cmd_relation_add(&api, &doc.into(), &entity1, &entity2, &name)
                    }
                    RelationAction::List { doc } => cmd_relation_list(&api, &doc.into()),
                    RelationAction::Delete { doc, id } => cmd_relation_delete(&api, &doc.into(), &id),
                    RelationAction::Export { doc, out } => cmd_relation_export(&api, &doc.into(), out),
                },
                Commands::Annotate { doc } => cmd_annotate(&api, &doc.into()),
                Commands::Stats { doc } => cmd_stats(&api, &doc.into()),
                Commands::Chunks { .. } | Commands::Normalize { .. } => 0,
            }
        }
    };
    std::process::exit(code);
}
