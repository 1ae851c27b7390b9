use std::io::ErrorKind;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use parlor::{Document, DocumentReader, LayoutKind, ParlorConfig, Store, LAYOUT_FILE};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, format),
        Command::Verify(args) => cmd_verify(args, format),
        Command::Config(args) => cmd_config(args, format),
    }
}

#[derive(Debug, Serialize)]
struct DocumentSummary {
    name: String,
    entries: usize,
    bytes: usize,
}

#[derive(Debug, Serialize)]
struct CollectionSummary {
    name: String,
    documents: Vec<DocumentSummary>,
}

/// What a datastore directory holds. Flat stores list their documents
/// directly and have no collections.
#[derive(Debug, Serialize)]
struct TreeSummary {
    layout: LayoutKind,
    collections: Vec<CollectionSummary>,
    documents: Vec<DocumentSummary>,
}

impl TreeSummary {
    fn entry_count(&self) -> usize {
        self.all_documents().map(|d| d.entries).sum()
    }

    fn document_count(&self) -> usize {
        self.all_documents().count()
    }

    fn all_documents(&self) -> impl Iterator<Item = &DocumentSummary> {
        self.collections
            .iter()
            .flat_map(|c| c.documents.iter())
            .chain(self.documents.iter())
    }
}

fn summarize_document(document: &Document) -> DocumentSummary {
    let items = document.get_all();
    DocumentSummary {
        name: document.name().to_string(),
        entries: items.len(),
        bytes: items.iter().map(|item| item.value.len()).sum(),
    }
}

fn summarize_documents(mut documents: Vec<Document>) -> Vec<DocumentSummary> {
    documents.sort_by(|a, b| a.name().cmp(b.name()));
    documents.iter().map(summarize_document).collect()
}

fn summarize(store: &Store) -> TreeSummary {
    match store {
        Store::Collections(datastore) => {
            let mut collections = datastore.collections();
            collections.sort_by(|a, b| a.name().cmp(b.name()));
            TreeSummary {
                layout: LayoutKind::Collections,
                collections: collections
                    .iter()
                    .map(|c| CollectionSummary {
                        name: c.name().to_string(),
                        documents: summarize_documents(c.documents()),
                    })
                    .collect(),
                documents: Vec::new(),
            }
        }
        Store::Documents(flat) => TreeSummary {
            layout: LayoutKind::Documents,
            collections: Vec::new(),
            documents: summarize_documents(flat.documents()),
        },
    }
}

/// Read the layout named by the marker file, or assume the collection
/// layout for unmarked trees.
fn detect_layout(dir: &Path) -> anyhow::Result<LayoutKind> {
    let marker = dir.join(LAYOUT_FILE);
    match std::fs::read_to_string(&marker) {
        Ok(content) => {
            let name = content.split_whitespace().next().unwrap_or_default();
            name.parse::<LayoutKind>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("reading {}", marker.display()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(LayoutKind::Collections),
        Err(e) => Err(e).with_context(|| format!("reading {}", marker.display())),
    }
}

/// Open an existing datastore directory. Unlike `Store::open`, a missing
/// directory is an error rather than a fresh store.
fn open_existing(dir: &Path, layout: Option<LayoutKind>) -> anyhow::Result<Store> {
    if !dir.exists() {
        bail!("{} does not exist", dir.display());
    }
    let layout = match layout {
        Some(layout) => layout,
        None => detect_layout(dir)?,
    };
    Ok(Store::open(dir, layout)?)
}

fn print_documents(documents: &[DocumentSummary], indent: &str) {
    for doc in documents {
        println!(
            "{indent}{} {}",
            doc.name.yellow(),
            format!("({} entries, {} bytes)", doc.entries, doc.bytes).dimmed()
        );
    }
}

fn cmd_inspect(args: InspectArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_existing(&args.dir, args.layout)?;
    let summary = summarize(&store);

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} ({} layout)",
        args.dir.display().to_string().bold(),
        summary.layout.to_string().cyan()
    );
    for collection in &summary.collections {
        println!("  {}", collection.name.green().bold());
        print_documents(&collection.documents, "    ");
    }
    print_documents(&summary.documents, "  ");
    println!(
        "{} collections, {} documents, {} entries",
        summary.collections.len(),
        summary.document_count(),
        summary.entry_count()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    layout: LayoutKind,
    collections: usize,
    documents: usize,
    entries: usize,
}

fn cmd_verify(args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = match open_existing(&args.dir, args.layout) {
        Ok(store) => store,
        Err(e) => {
            if let OutputFormat::Text = format {
                println!("{} {}", "✗".red().bold(), args.dir.display());
            }
            return Err(e.context(format!("verifying {}", args.dir.display())));
        }
    };
    let summary = summarize(&store);
    let report = VerifyReport {
        layout: summary.layout,
        collections: summary.collections.len(),
        documents: summary.document_count(),
        entries: summary.entry_count(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{} {} opens cleanly", "✓".green().bold(), args.dir.display());
            println!("  Layout: {}", report.layout.to_string().cyan());
            println!("  Collections: {}", report.collections);
            println!("  Documents: {}", report.documents);
            println!("  Entries: {}", report.entries);
        }
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = match &args.file {
        Some(path) => ParlorConfig::load(path)?,
        None => ParlorConfig::default(),
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor::{Datastore, DocumentStore, DocumentWriter};
    use std::fs;
    use tempfile::TempDir;

    fn sample_datastore(root: &Path) {
        let store = Datastore::new();
        let users = store.collection("users");
        users.document("alice").set("nick", "al").unwrap();
        users.document("alice").set("age", &30u32).unwrap();
        users.document("bob").set("nick", "bo").unwrap();
        store.collection("rooms").document("lobby").set("topic", "hi").unwrap();
        store.close(root).unwrap();
    }

    #[test]
    fn summarize_counts_collections_documents_and_bytes() {
        let tmp = TempDir::new().unwrap();
        sample_datastore(tmp.path());

        let store = open_existing(tmp.path(), None).unwrap();
        let summary = summarize(&store);
        assert_eq!(summary.layout, LayoutKind::Collections);
        assert_eq!(summary.collections.len(), 2);
        assert_eq!(summary.collections[0].name, "rooms");
        assert_eq!(summary.collections[1].documents[0].name, "alice");
        assert_eq!(summary.collections[1].documents[0].entries, 2);
        // bincode u32 is four bytes
        assert!(summary.collections[1].documents[0].bytes >= 4);
        assert_eq!(summary.document_count(), 3);
        assert_eq!(summary.entry_count(), 4);
    }

    #[test]
    fn detects_documents_layout_from_marker() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::new();
        store.document("alice").set("nick", "al").unwrap();
        store.close(tmp.path()).unwrap();

        assert_eq!(detect_layout(tmp.path()).unwrap(), LayoutKind::Documents);
        let summary = summarize(&open_existing(tmp.path(), None).unwrap());
        assert!(summary.collections.is_empty());
        assert_eq!(summary.documents.len(), 1);
    }

    #[test]
    fn unmarked_tree_defaults_to_collections() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(detect_layout(tmp.path()).unwrap(), LayoutKind::Collections);
    }

    #[test]
    fn unknown_marker_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(LAYOUT_FILE), "shelves v1\n").unwrap();
        assert!(detect_layout(tmp.path()).is_err());
    }

    #[test]
    fn missing_directory_is_not_created() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(open_existing(&missing, None).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn verify_fails_on_deep_tree() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b/c/d")).unwrap();
        let args = VerifyArgs {
            dir: tmp.path().to_path_buf(),
            layout: None,
        };
        assert!(cmd_verify(args, OutputFormat::Json).is_err());
    }

    #[test]
    fn config_loads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("parlor.toml");
        fs::write(&path, "token_length = 16\n").unwrap();
        let args = ConfigArgs { file: Some(path) };
        assert!(cmd_config(args, OutputFormat::Text).is_ok());
    }
}
