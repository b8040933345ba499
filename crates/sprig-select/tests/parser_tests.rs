//! Integration tests for selector parsing and reuse of parsed selectors.

use sprig_dom::{Document, TreeNode};
use sprig_select::{AttributeMatcher, Matcher, ParseError, SelectError, Selector, parse, query};

/// `<div id="d"><p class="info">foo</p><p class="info">bar</p></div>`
fn info_doc() -> Document {
    let p = |text| TreeNode::element("p", &[("class", "info")], vec![TreeNode::text(text)]);
    let tree = TreeNode::element("div", &[("id", "d")], vec![p("foo"), p("bar")]);
    Document::from_tree(&tree).unwrap()
}

#[test]
fn test_compound_is_flat_and() {
    let matcher = parse("#foo[bar]").unwrap();
    let Matcher::And(parts) = &matcher else {
        panic!("expected And, got {matcher:?}");
    };
    assert_eq!(parts.len(), 2);
    assert!(matches!(&parts[0], Matcher::Id(id) if id == "foo"));
    assert!(matches!(
        &parts[1],
        Matcher::Attribute(AttributeMatcher::Exists(key)) if key == "bar"
    ));
}

#[test]
fn test_group_branches_render_separately() {
    let matcher = parse(".foo > ol, ol li + li").unwrap();
    let Matcher::Or(branches) = &matcher else {
        panic!("expected Or, got {matcher:?}");
    };
    let rendered: Vec<String> = branches.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["ol :parent(.foo)", "li :prev(li :ancestor(ol))"]);
}

#[test]
fn test_whitespace_around_combinators() {
    for query in ["div>p", "div > p", "div\t>\np", "  div >p  "] {
        assert_eq!(parse(query).unwrap().to_string(), "p :parent(div)", "{query:?}");
    }
    assert_eq!(parse("div \n p").unwrap().to_string(), "p :ancestor(div)");
}

#[test]
fn test_nested_groups_stay_inside_pseudo_classes() {
    let matcher = parse("ul:has(li > a, li > b) + p").unwrap();
    assert_eq!(
        matcher.to_string(),
        "p :prev(ul :has(a :parent(li), b :parent(li)))"
    );
}

#[test]
fn test_info_document() {
    let doc = info_doc();
    let root = doc.root().unwrap();

    let infos = query(&doc, root, ".info").unwrap();
    assert_eq!(infos.len(), 2);
    assert_eq!(doc.text(infos[0]), "foo");
    assert_eq!(doc.text(infos[1]), "bar");

    assert_eq!(query(&doc, root, "p:eq(0)").unwrap(), vec![infos[0]]);
    assert_eq!(query(&doc, root, "p:contains(bar)").unwrap(), vec![infos[1]]);
    assert!(query(&doc, root, "div:has(.info)").unwrap().contains(&root));
    assert_eq!(query(&doc, root, "#d").unwrap(), vec![root]);
    assert!(query(&doc, root, "#D").unwrap().is_empty());
}

#[test]
fn test_selector_is_reusable() {
    let doc = info_doc();
    let root = doc.root().unwrap();
    let selector = Selector::parse("p + p").unwrap();

    let first = selector.select(&doc, root).unwrap();
    let second = selector.select(&doc, root).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert!(selector.matches(&doc, root, first[0]));
    assert_eq!(parse("p + p").unwrap().to_string(), selector.to_string());
}

#[test]
fn test_parse_errors() {
    assert!(matches!(parse(":lt(x)"), Err(ParseError::InvalidIndex { .. })));
    assert!(matches!(Selector::parse(""), Err(SelectError::EmptySelector)));
    assert!(matches!(
        Selector::parse("p:not()"),
        Err(SelectError::Parse(ParseError::EmptyArgument { pseudo: ":not", .. }))
    ));
    assert!(matches!(
        parse("[href~=(]"),
        Err(ParseError::InvalidRegex { .. })
    ));

    let message = parse("div ^x").unwrap_err().to_string();
    assert!(message.contains("^x"), "{message}");
}
