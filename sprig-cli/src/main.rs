//! Sprig CLI
//!
//! Runs a selector against a document described as JSON and prints the
//! matching elements.
//!
//! Logging goes through `env_logger`; set `RUST_LOG=sprig_select=debug` to
//! see how selectors are parsed.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use sprig_dom::{Document, NodeId, TreeNode};
use sprig_select::Selector;

/// Sprig: query JSON document trees with CSS-like selectors
#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(name = "sprig")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"DOCUMENT FORMAT:
    Text is a JSON string, an element is an object:
    {"tag": "ul", "attrs": {"id": "menu"}, "children": [{"tag": "li", "children": ["Home"]}]}

EXAMPLES:
    # Every link inside the navigation
    sprig page.json -s 'nav a'

    # Count list items, reading the document from stdin
    cat page.json | sprig -s 'li' --count

    # Query relative to the first matching element
    sprig page.json --root '#menu' -s '> li'

    # Show how a selector is understood
    sprig page.json -s '.foo > ol, ol li + li' --explain
"#)]
struct Cli {
    /// Path to a JSON document (reads stdin when omitted or "-")
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Selector to run
    #[arg(short, long, value_name = "SELECTOR")]
    selector: String,

    /// Start the query from the first element matching this selector
    #[arg(short, long, value_name = "SELECTOR")]
    root: Option<String>,

    /// Print the parsed matcher tree before the results
    #[arg(long)]
    explain: bool,

    /// Print only the number of matches
    #[arg(short, long, conflicts_with = "json")]
    count: bool,

    /// Print matching subtrees as a JSON array
    #[arg(long)]
    json: bool,

    /// Disable colored output (also honours NO_COLOR)
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn color(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let doc = load_document(cli.path.as_deref())?;
    let output = run(&cli, &doc)?;
    print!("{output}");
    Ok(())
}

/// Read and build the document named on the command line.
fn load_document(path: Option<&Path>) -> Result<Document> {
    let json = match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            let _ = io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read document from stdin")?;
            buffer
        }
    };

    let tree: TreeNode = serde_json::from_str(&json).context("document is not a valid tree")?;
    let doc = Document::from_tree(&tree)?;
    log::debug!("loaded document with {} nodes", doc.len());
    Ok(doc)
}

/// Run the query described by `cli` and render the output.
fn run(cli: &Cli, doc: &Document) -> Result<String> {
    let selector: Selector = cli
        .selector
        .parse()
        .with_context(|| format!("invalid selector `{}`", cli.selector))?;

    let root = match &cli.root {
        Some(root_selector) => {
            let root_selector: Selector = root_selector
                .parse()
                .with_context(|| format!("invalid root selector `{root_selector}`"))?;
            match root_selector.select_document(doc)?.first() {
                Some(&root) => root,
                None => bail!("no element matches root selector `{}`", root_selector.source()),
            }
        }
        None => doc.root().context("document has no root element")?,
    };

    let found = selector.select(doc, root)?;
    let mut out = String::new();

    if cli.explain {
        let _ = writeln!(out, "matcher: {selector}");
    }

    if cli.count {
        let _ = writeln!(out, "{}", found.len());
    } else if cli.json {
        let trees: Vec<TreeNode> = found.iter().filter_map(|&id| doc.to_tree(id)).collect();
        let _ = writeln!(out, "{}", serde_json::to_string_pretty(&trees)?);
    } else {
        for &id in &found {
            let _ = writeln!(out, "{}", describe(doc, id, cli.color()));
        }
    }

    Ok(out)
}

/// One-line summary of an element: its start tag and its text.
fn describe(doc: &Document, id: NodeId, color: bool) -> String {
    let Some(element) = doc.as_element(id) else {
        return String::new();
    };

    let mut attrs: Vec<(&str, &str)> = element.attrs().iter().collect();
    attrs.sort_unstable();

    let mut tag = format!("<{}", element.tag_name());
    for (name, value) in attrs {
        if value.is_empty() {
            let _ = write!(tag, " {name}");
        } else {
            let _ = write!(tag, " {name}=\"{value}\"");
        }
    }
    tag.push('>');

    let text = doc.text(id);
    match (color, text.is_empty()) {
        (true, true) => tag.cyan().to_string(),
        (true, false) => format!("{} {}", tag.cyan(), format!("{text:?}").dimmed()),
        (false, true) => tag,
        (false, false) => format!("{tag} {text:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        let tree = TreeNode::element(
            "ul",
            &[("id", "menu")],
            vec![
                TreeNode::element(
                    "li",
                    &[("class", "a"), ("title", "")],
                    vec![TreeNode::text("Home")],
                ),
                TreeNode::element("li", &[], vec![TreeNode::element("br", &[], vec![])]),
            ],
        );
        Document::from_tree(&tree).unwrap()
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sprig").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_lists_matches() {
        let out = run(&cli(&["-s", "li", "--no-color"]), &doc()).unwrap();
        assert_eq!(out, "<li class=\"a\" title> \"Home\"\n<li>\n");
    }

    #[test]
    fn test_count_and_explain() {
        let out = run(&cli(&["-s", "ul > li", "--count", "--explain"]), &doc()).unwrap();
        assert_eq!(out, "matcher: li :parent(ul)\n2\n");
    }

    #[test]
    fn test_root_selector() {
        let out = run(&cli(&["--root", "li:eq(1)", "-s", "*", "--count"]), &doc()).unwrap();
        assert_eq!(out, "2\n");

        let err = run(&cli(&["--root", "ol", "-s", "*"]), &doc()).unwrap_err();
        assert!(err.to_string().contains("no element matches root selector `ol`"));
    }

    #[test]
    fn test_json_output() {
        let out = run(&cli(&["-s", "br", "--json"]), &doc()).unwrap();
        let trees: Vec<TreeNode> = serde_json::from_str(&out).unwrap();
        assert_eq!(trees, vec![TreeNode::element("br", &[], vec![])]);
    }

    #[test]
    fn test_invalid_selector_has_context() {
        let err = run(&cli(&["-s", "li:eq(x)"]), &doc()).unwrap_err();
        assert_eq!(err.to_string(), "invalid selector `li:eq(x)`");
    }

    #[test]
    fn test_count_conflicts_with_json() {
        let args = ["sprig", "-s", "li", "--count", "--json"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
