//! RcDoc-based pretty-printer with termcolor annotations for trees.
//!
//! This is a diagnostics printer for logs and tests. It shows every node type, including
//! system forms such as `trig(x, 0)` and pattern placeholders, and is not meant as the
//! user-facing layout renderer.

use std::io::{self, Write};

use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::number::Number;
use crate::pattern::placeholder::Filter;
use crate::tree::node::TreeRef;
use crate::tree::node_type::NodeType;
use crate::tree::owned::OwnedTree;

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct, // commas
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Function, // cos, ln, user functions
    Operator, // +, *, ^, -, /
    Ident,    // user symbols
    Number,
    Constant,    // π, e, i
    Placeholder, // A, B*, C+
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    _ => Color::Magenta,
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Function => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Number => {
                s.set_fg(Some(Color::White));
            }
            Style::Constant => {
                s.set_fg(Some(Color::Magenta));
            }
            Style::Placeholder => {
                s.set_fg(Some(Color::Red)).set_bold(true);
            }
        }
        s
    }
}

fn styled(style: Style, s: impl Into<String>) -> RcDoc<'static, Style> {
    RcDoc::as_string(s.into()).annotate(style)
}

fn punct(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Punct, s)
}

#[inline]
fn lparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> RcDoc<'static, Style> {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn op(s: &'static str) -> RcDoc<'static, Style> {
    styled(Style::Operator, s)
}

const ATOM: u8 = u8::MAX;

fn precedence(tree: TreeRef<'_>) -> u8 {
    use NodeType::*;

    match tree.node_type() {
        Add | Sub => 1,
        Mult | Div => 2,
        Opposite => 3,
        Pow => 4,
        Factorial => 5,
        t if t.is_number() => match Number::read(tree) {
            Some(n) if n.is_negative() => 3,
            Some(Number::Rational(r)) if !r.is_integer() => 2,
            _ => ATOM,
        },
        _ => ATOM,
    }
}

/// Operators whose operands cannot be regrouped freely.
#[inline]
fn is_non_associative(t: NodeType) -> bool {
    matches!(t, NodeType::Pow | NodeType::Sub | NodeType::Div)
}

#[inline]
fn requires_parens(current: TreeRef<'_>, parent: TreeRef<'_>) -> bool {
    let current_prec = precedence(current);
    let parent_prec = precedence(parent);
    if current_prec == ATOM || parent_prec == ATOM {
        return false;
    }
    (parent_prec > current_prec)
        || (parent_prec == current_prec
            && (current.node_type() != parent.node_type()
                || is_non_associative(parent.node_type())))
}

#[inline]
fn to_doc_parenthesized_with_depth(
    tree: TreeRef<'_>,
    parent: TreeRef<'_>,
    depth: u8,
) -> RcDoc<'static, Style> {
    if requires_parens(tree, parent) {
        lparen(depth)
            .append(to_doc_with_depth(tree, depth.wrapping_add(1)))
            .append(rparen(depth))
            .group()
    } else {
        to_doc_with_depth(tree, depth)
    }
}

fn infix(tree: TreeRef<'_>, symbol: &'static str, depth: u8) -> RcDoc<'static, Style> {
    let separator = if tree.node_type() == NodeType::Pow {
        op(symbol)
    } else {
        RcDoc::line().append(op(symbol)).append(RcDoc::space())
    };
    RcDoc::intersperse(
        tree.children()
            .map(|child| to_doc_parenthesized_with_depth(child, tree, depth)),
        separator,
    )
    .group()
    .nest(2)
}

fn call(name: impl Into<String>, tree: TreeRef<'_>, depth: u8) -> RcDoc<'static, Style> {
    styled(Style::Function, name)
        .append(lparen(depth))
        .append(
            RcDoc::intersperse(
                tree.children()
                    .map(|child| to_doc_with_depth(child, depth.wrapping_add(1))),
                punct(",").append(RcDoc::line()),
            )
            .nest(2),
        )
        .append(rparen(depth))
        .group()
}

fn bracketed(
    open: &'static str,
    close: &'static str,
    tree: TreeRef<'_>,
    depth: u8,
) -> RcDoc<'static, Style> {
    punct(open)
        .append(
            RcDoc::intersperse(
                tree.children()
                    .map(|child| to_doc_with_depth(child, depth.wrapping_add(1))),
                punct(",").append(RcDoc::line()),
            )
            .nest(1),
        )
        .append(punct(close))
        .group()
}

/// Depth-aware variant that colors parentheses by nesting level.
fn to_doc_with_depth(tree: TreeRef<'_>, depth: u8) -> RcDoc<'static, Style> {
    use NodeType::*;

    let node_type = tree.node_type();
    match node_type {
        t if t.is_number() => match Number::read(tree) {
            Some(n) => styled(Style::Number, n.to_string()),
            None => styled(Style::Number, "?"),
        },
        Constant => match tree.constant() {
            Some(kind) => styled(Style::Constant, kind.symbol()),
            None => styled(Style::Constant, "?"),
        },
        UserSymbol => styled(Style::Ident, tree.name().unwrap_or("?").to_string()),
        UserFunction => call(tree.name().unwrap_or("?").to_string(), tree, depth),
        UserSequence => styled(Style::Ident, tree.name().unwrap_or("?").to_string())
            .append(bracketed("[", "]", tree, depth)),
        Placeholder => match crate::pattern::placeholder::Placeholder::read(tree) {
            Some(placeholder) => {
                let suffix = match placeholder.filter {
                    Filter::One => "",
                    Filter::ZeroOrMore => "*",
                    Filter::OneOrMore => "+",
                };
                styled(Style::Placeholder, format!("{:?}{suffix}", placeholder.tag))
            }
            None => styled(Style::Placeholder, "?"),
        },
        Undefined => styled(Style::Constant, "undef"),
        NonReal => styled(Style::Constant, "nonreal"),

        Add if tree.number_of_children() == 0 => styled(Style::Function, "add").append(punct("()")),
        Mult if tree.number_of_children() == 0 => {
            styled(Style::Function, "mult").append(punct("()"))
        }
        Add => infix(tree, "+", depth),
        Mult => infix(tree, "*", depth),
        Sub => infix(tree, "-", depth),
        Div => infix(tree, "/", depth),
        Pow => infix(tree, "^", depth),
        Opposite => match tree.child(0) {
            Some(child) => op("-").append(to_doc_parenthesized_with_depth(child, tree, depth)),
            None => op("-"),
        },
        Factorial => match tree.child(0) {
            Some(child) => to_doc_parenthesized_with_depth(child, tree, depth).append(op("!")),
            None => op("!"),
        },

        List => bracketed("[", "]", tree, depth),
        Set => bracketed("{", "}", tree, depth),
        CodePointLayout => styled(
            Style::Ident,
            format!("'{}'", tree.code_point().unwrap_or('?')),
        ),

        Exp => call("exp", tree, depth),
        Ln => call("ln", tree, depth),
        Abs => call("abs", tree, depth),
        Trig => call("trig", tree, depth),
        ATrig => call("atrig", tree, depth),
        Sqrt => call("sqrt", tree, depth),
        NthRoot => call("root", tree, depth),
        Log | Logarithm => call("log", tree, depth),
        Cos => call("cos", tree, depth),
        Sin => call("sin", tree, depth),
        Tan => call("tan", tree, depth),
        ACos => call("acos", tree, depth),
        ASin => call("asin", tree, depth),
        ATan => call("atan", tree, depth),
        Dependency => call("dep", tree, depth),
        RackLayout => call("rack", tree, depth),
        FractionLayout => call("fraction", tree, depth),
        ParenthesesLayout => call("parentheses", tree, depth),
        VerticalOffsetLayout => call("superscript", tree, depth),
        _ => call(node_type.name().to_lowercase(), tree, depth),
    }
}

// A writer that maps Style annotations to termcolor ColorSpec on a WriteColor sink.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

/// Render a document to a `termcolor::WriteColor` with width-aware layout.
fn render_to<W: WriteColor + Write>(
    doc: &RcDoc<'_, Style>,
    width: usize,
    out: &mut W,
) -> io::Result<()> {
    let mut cw = ColorWriter { out };
    doc.render_raw(width, &mut cw)
}

/// Format a tree to a plain string without colors.
pub fn to_plain_string(tree: TreeRef<'_>, width: usize) -> String {
    let mut buf = String::new();
    let _ = to_doc_with_depth(tree, 0).render_fmt(width, &mut buf);
    buf
}

/// Width of the terminal, or 80 if it cannot be determined.
fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Pretty-printing conveniences for trees.
pub trait PrettyTree {
    /// Build an RcDoc representation of this tree with style annotations.
    fn pretty_doc(&self) -> RcDoc<'static, Style>;

    /// Render with colors to any termcolor writer at the given width.
    fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        render_to(&self.pretty_doc(), width, out)
    }

    /// Print to stdout with colors (TTY-aware) at the terminal width.
    fn pretty_print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.pretty_render_to(terminal_width(), &mut stdout)?;
        writeln!(stdout)
    }

    /// Format into a plain string (no colors).
    fn pretty_string(&self) -> String {
        let mut buf = String::new();
        let _ = self.pretty_doc().render_fmt(80, &mut buf);
        buf
    }
}

impl PrettyTree for TreeRef<'_> {
    #[inline]
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(*self, 0)
    }
}

impl PrettyTree for OwnedTree {
    #[inline]
    fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self.root(), 0)
    }
}

impl std::fmt::Display for TreeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = FmtWrite::new(f);
        self.pretty_doc().render_raw(80, &mut w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::placeholder::Tag;
    use crate::tree::owned::shapes::*;

    #[test]
    fn operators_and_parentheses() {
        let tree = mult([int(2), add([sym("x"), int(1)])]);
        assert_eq!(tree.pretty_string(), "2 * (x + 1)");
        let tree = pow(pow(sym("x"), int(2)), rational(1, 2));
        assert_eq!(tree.pretty_string(), "(x^2)^(1/2)");
        let tree = add([sym("a"), mult([int(-1), sym("b")])]);
        assert_eq!(tree.pretty_string(), "a + -1 * b");
    }

    #[test]
    fn functions_and_placeholders() {
        assert_eq!(trig(sym("x"), int(0)).pretty_string(), "trig(x, 0)");
        assert_eq!(ln(e()).pretty_string(), "ln(e)");
        let pattern = add([Tag::A.one(), Tag::B.zero_or_more()]);
        assert_eq!(pattern.pretty_string(), "A + B*");
    }
}
