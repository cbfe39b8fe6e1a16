use super::error::FragTreeError;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::{many1, separated_list1},
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};
use std::collections::BTreeMap;

// ================================================================================================
// Error Handling Structures
// ================================================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum DetailedErrorKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// nom error that keeps the chain of contexts, innermost first.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedError<'a> {
    pub errors: Vec<(&'a str, DetailedErrorKind)>,
}

impl<'a> ParseError<&'a str> for DetailedError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for DetailedError<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.errors.push((input, DetailedErrorKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for DetailedError<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        DetailedError {
            errors: vec![(input, DetailedErrorKind::Nom(kind))],
        }
    }
}

// ================================================================================================
// Intermediate Structure
// ================================================================================================

/// Recursive parse result, turned into an arena [`FragTree`](super::FragTree)
/// once the formulas are checked.
#[derive(Debug, Default)]
pub struct ParsedNode {
    pub name: Option<String>,
    /// NHX tags, `[&&NHX:id=sample]`
    pub properties: Option<BTreeMap<String, String>>,
    pub children: Vec<ParsedNode>,
}

// ================================================================================================
// Parsers
// ================================================================================================

// Ignores whitespace around `inner`
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// Node label: unquoted, 'single' or "double" quoted.
// Fragment labels are formulas, quoting is accepted for tools that quote every label.
fn parse_label(input: &str) -> IResult<&str, String, DetailedError<'_>> {
    let unquoted = map(
        take_while(|c: char| !"():;,[]".contains(c)),
        |s: &str| s.trim().to_string(),
    );

    let single_quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );

    let double_quoted = delimited(
        char('"'),
        map(is_not("\""), |s: &str| s.replace("\"\"", "\"")),
        char('"'),
    );

    context("label", alt((single_quoted, double_quoted, unquoted))).parse(input)
}

// Branch length, ":0.123". Fragmentation trees carry no lengths, they are
// accepted and dropped.
fn parse_length(input: &str) -> IResult<&str, f64, DetailedError<'_>> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                recognize((
                    opt(char('-')),
                    digit1,
                    opt((char('.'), digit1)),
                    opt((
                        alt((char('e'), char('E'))),
                        opt(alt((char('+'), char('-')))),
                        digit1,
                    )),
                )),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

// [&&NHX:key=value:...] or [key=value key=value]; other comments are dropped
fn parse_comment(
    input: &str,
) -> IResult<&str, Option<BTreeMap<String, String>>, DetailedError<'_>> {
    let comment_content = delimited(ws(char('[')), is_not("]"), char(']'));

    context(
        "comment",
        map(opt(comment_content), |content: Option<&str>| {
            let s = content?;
            let parts: Vec<&str> = match s.strip_prefix("&&NHX") {
                Some(rest) => rest.split(':').collect(),
                None => s.split_whitespace().collect(),
            };
            let props: BTreeMap<String, String> = parts
                .iter()
                .filter_map(|part| part.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            if props.is_empty() {
                None
            } else {
                Some(props)
            }
        }),
    )
    .parse(input)
}

// (child1, child2, ...)Label:Length[Comment]
fn parse_subtree(input: &str) -> IResult<&str, ParsedNode, DetailedError<'_>> {
    let (input, children) = context(
        "children",
        opt(delimited(
            ws(char('(')),
            separated_list1(ws(char(',')), parse_subtree),
            ws(char(')')),
        )),
    )
    .parse(input)?;

    let (input, label) = opt(parse_label).parse(input)?;

    // comments may come before or after the length
    let (input, comment1) = parse_comment(input)?;
    let (input, _length) = opt(parse_length).parse(input)?;
    let (input, comment2) = parse_comment(input)?;

    let mut node = ParsedNode {
        children: children.unwrap_or_default(),
        name: label.filter(|l| !l.is_empty()),
        properties: None,
    };
    if comment1.is_some() || comment2.is_some() {
        let mut props = BTreeMap::new();
        props.extend(comment1.unwrap_or_default());
        props.extend(comment2.unwrap_or_default());
        node.properties = Some(props);
    }

    Ok((input, node))
}

// ================================================================================================
// Entry Points
// ================================================================================================

/// Deepest parenthesis nesting accepted by [`parse_newick_multi`].
pub const MAX_NESTING: usize = 256;

// The subtree parser recurses once per level; reject deeper inputs up front.
// Parentheses inside comments and quoted labels do not count.
fn check_nesting(input: &str) -> Result<(), FragTreeError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    for (offset, c) in input.char_indices() {
        match (quote, in_comment, c) {
            (Some(q), _, c) if c == q => quote = None,
            (Some(_), _, _) => {}
            (None, true, ']') => in_comment = false,
            (None, true, _) => {}
            (None, false, '[') => in_comment = true,
            (None, false, '\'' | '"') => quote = Some(c),
            (None, false, '(') => {
                depth += 1;
                if depth > MAX_NESTING {
                    let rest = &input[offset..];
                    return Err(FragTreeError::ParseError {
                        message: format!("trees nested deeper than {} levels", MAX_NESTING),
                        line: line_of(input, rest),
                        column: column_of(input, rest),
                        snippet: rest.chars().take(50).collect(),
                    });
                }
            }
            (None, false, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Parses every tree of `input`. Top-level `[...]` blocks between trees are
/// skipped.
pub fn parse_newick_multi(input: &str) -> Result<Vec<ParsedNode>, FragTreeError> {
    check_nesting(input)?;

    let valid_tree = map((ws(parse_subtree), ws(char(';'))), |(root, _)| Some(root));

    let garbage = map(
        ws(delimited(char('['), take_while(|c| c != ']'), char(']'))),
        |_| None,
    );

    let mut parser = (many1(alt((valid_tree, garbage))), multispace0);

    match parser.parse(input) {
        Ok((rest, _)) if !rest.is_empty() => Err(FragTreeError::ParseError {
            message: "unexpected input after the last tree".to_string(),
            line: line_of(input, rest),
            column: column_of(input, rest),
            snippet: rest.chars().take(50).collect(),
        }),
        Ok((_, (roots, _))) => Ok(roots.into_iter().flatten().collect()),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(FragTreeError::ParseError {
            message: "Incomplete input".to_string(),
            line: 0,
            column: 0,
            snippet: "".to_string(),
        }),
    }
}

fn line_of(input: &str, remaining: &str) -> usize {
    let offset = input.offset(remaining);
    input[..offset].chars().filter(|&c| c == '\n').count() + 1
}

fn column_of(input: &str, remaining: &str) -> usize {
    let offset = input.offset(remaining);
    let last_newline = input[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
    offset - last_newline + 1
}

// nom error to a positioned FragTreeError
fn make_tree_error(input: &str, e: DetailedError) -> FragTreeError {
    let remaining = e.errors.first().map_or(input, |(r, _)| *r);

    let mut msg = String::new();
    for (_, kind) in e.errors.iter().rev() {
        match kind {
            DetailedErrorKind::Context(ctx) => {
                msg.push_str(&format!("while parsing {}:\n", ctx));
            }
            DetailedErrorKind::Nom(k) => {
                msg.push_str(&format!("  error: {:?}\n", k));
            }
        }
    }

    FragTreeError::ParseError {
        message: msg,
        line: line_of(input, remaining),
        column: column_of(input, remaining),
        snippet: remaining.chars().take(50).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragments() {
        let roots =
            parse_newick_multi("((C5H5)C7H7,C6H5:1.5)C8H10O[&&NHX:id=tol:ce=35];").unwrap();
        assert_eq!(roots.len(), 1);
        let root = &roots[0];
        assert_eq!(root.name.as_deref(), Some("C8H10O"));
        let props = root.properties.as_ref().unwrap();
        assert_eq!(props.get("id").map(String::as_str), Some("tol"));
        assert_eq!(props.get("ce").map(String::as_str), Some("35"));

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name.as_deref(), Some("C7H7"));
        assert_eq!(root.children[0].children[0].name.as_deref(), Some("C5H5"));
        assert_eq!(root.children[1].name.as_deref(), Some("C6H5"));
        assert!(root.children[1].properties.is_none());
    }

    #[test]
    fn test_parse_multi() {
        let input = "[header]\n(CO)C2H4O;\n'C6H6';\n";
        let roots = parse_newick_multi(input).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].name.as_deref(), Some("C6H6"));
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse_newick_multi("(CO,C2H4\n:x)C3H4O;").unwrap_err();
        match err {
            FragTreeError::ParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}C{};", "(".repeat(100_000), ")C".repeat(100_000));
        match parse_newick_multi(&deep).unwrap_err() {
            FragTreeError::ParseError { message, column, .. } => {
                assert!(message.contains("nested deeper"));
                assert_eq!(column, MAX_NESTING + 1);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let ok = format!("{}C{};", "(".repeat(MAX_NESTING), ")C".repeat(MAX_NESTING));
        assert!(check_nesting(&ok).is_ok());
        // brackets in comments and quotes are not nesting
        let quoted = format!("('{}')C[{}];", "(".repeat(300), "(".repeat(300));
        assert!(check_nesting(&quoted).is_ok());
    }
}
