//! Hand-written recursive-descent parser for the template language.
//!
//! Text mode scans for `$` references, `#` directives, comments and escapes;
//! everything else is collected into [`Node::Text`]. Expression mode is used
//! inside directive parentheses, method arguments and index brackets.

use crate::ast::{BinaryOp, Expr, Node, Reference, Segment, Template, UnaryOp};
use crate::error::ParseError;

const DIRECTIVES: &[&str] = &["set", "if", "elseif", "else", "end", "foreach", "break", "stop"];

/// Combined limit on block nesting, bracket nesting and operator chains.
/// Keeps parsing and evaluation within a thread's default stack.
const MAX_NESTING_DEPTH: usize = 64;

/// Parse template text into a [`Template`].
pub fn parse(src: &str) -> Result<Template, ParseError> {
    parse_at_depth(src, 0)
}

fn parse_at_depth(src: &str, depth: usize) -> Result<Template, ParseError> {
    let mut parser = Parser { src, pos: 0, depth };
    let (nodes, end, at) = parser.parse_block()?;
    match end {
        Terminator::Eof => Ok(Template { nodes }),
        other => Err(parser.error_at(at, format!("unexpected {}", other.keyword()))),
    }
}

/// What ended a block of nodes.
enum Terminator {
    Eof,
    End,
    Else,
    ElseIf(Expr),
}

impl Terminator {
    fn keyword(&self) -> &'static str {
        match self {
            Terminator::Eof => "end of template",
            Terminator::End => "#end",
            Terminator::Else => "#else",
            Terminator::ElseIf(_) => "#elseif",
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.src, pos, message)
    }

    /// Count one more level of nesting at `at`.
    fn enter(&mut self, at: usize) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_at(at, "template nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one level deeper. Levels entered inside it are released
    /// on return, whether or not it succeeded.
    fn nested<T>(
        &mut self,
        at: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.depth;
        self.enter(at)?;
        let result = parse(self);
        self.depth = saved;
        result
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset..).and_then(|s| s.chars().next())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_inline_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches([' ', '\t']);
        self.pos += rest.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        if rest[word.len()..].chars().next().is_some_and(is_ident_char) {
            return false;
        }
        self.pos += word.len();
        true
    }

    fn expect(&mut self, token: &str) -> Result<(), ParseError> {
        self.skip_ws();
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error_at(self.pos, format!("expected '{token}'")))
        }
    }

    fn ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    // -----------------------------------------------------------------------
    // Text mode
    // -----------------------------------------------------------------------

    fn parse_block(&mut self) -> Result<(Vec<Node>, Terminator, usize), ParseError> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            match c {
                '\\' => self.escape(&mut text),
                '$' => match self.reference(true)? {
                    Some(reference) => {
                        flush(&mut text, &mut nodes);
                        nodes.push(Node::Reference(reference));
                    }
                    None => {
                        text.push('$');
                        self.pos += 1;
                    }
                },
                '#' => {
                    let start = self.pos;
                    if self.comment_or_raw(&mut text)? {
                        continue;
                    }
                    let Some((name, end)) = self.directive_name() else {
                        text.push('#');
                        self.pos += 1;
                        continue;
                    };
                    self.pos = end;
                    match name {
                        "set" => {
                            let node = self.set_args()?;
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            nodes.push(node);
                        }
                        "if" => {
                            let cond = self.paren_expr("#if")?;
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            nodes.push(self.nested(start, |p| p.if_body(cond, start))?);
                        }
                        "foreach" => {
                            let (var, iterable) = self.foreach_args()?;
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            nodes.push(self.nested(start, |p| p.foreach_body(var, iterable, start))?);
                        }
                        "break" | "stop" => {
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            nodes.push(if name == "break" { Node::Break } else { Node::Stop });
                        }
                        "elseif" => {
                            let cond = self.paren_expr("#elseif")?;
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            return Ok((nodes, Terminator::ElseIf(cond), start));
                        }
                        "else" => {
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            return Ok((nodes, Terminator::Else, start));
                        }
                        _ => {
                            self.gobble_line(&mut text, start);
                            flush(&mut text, &mut nodes);
                            return Ok((nodes, Terminator::End, start));
                        }
                    }
                }
                _ => {
                    text.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        flush(&mut text, &mut nodes);
        Ok((nodes, Terminator::Eof, self.pos))
    }

    /// `\$ref` and `\#directive` render their source literally.
    fn escape(&mut self, text: &mut String) {
        self.pos += 1;
        match self.peek() {
            Some(c @ ('$' | '#')) => {
                text.push(c);
                self.pos += 1;
            }
            _ => text.push('\\'),
        }
    }

    /// Handle `##`, `#* *#` and `#[[ ]]#`. Returns `false` when the `#` at
    /// the cursor starts none of them.
    fn comment_or_raw(&mut self, text: &mut String) -> Result<bool, ParseError> {
        let start = self.pos;
        let rest = self.rest();
        if rest.starts_with("##") {
            self.trim_indent(text, start);
            self.pos = match rest.find('\n') {
                Some(i) => start + i + 1,
                None => self.src.len(),
            };
            return Ok(true);
        }
        if rest.starts_with("#*") {
            let Some(i) = rest[2..].find("*#") else {
                return Err(self.error_at(start, "unterminated block comment"));
            };
            self.pos = start + 2 + i + 2;
            self.gobble_line(text, start);
            return Ok(true);
        }
        if let Some(raw) = rest.strip_prefix("#[[") {
            let Some(i) = raw.find("]]#") else {
                return Err(self.error_at(start, "unterminated #[[ block"));
            };
            text.push_str(&raw[..i]);
            self.pos = start + 3 + i + 3;
            return Ok(true);
        }
        Ok(false)
    }

    /// Recognise `#name` or `#{name}` for a known directive, returning the
    /// name and the offset just past it.
    fn directive_name(&self) -> Option<(&'a str, usize)> {
        let rest = &self.src[self.pos + 1..];
        let (name, end) = if let Some(inner) = rest.strip_prefix('{') {
            let len = inner.bytes().take_while(u8::is_ascii_alphabetic).count();
            if len == 0 || !inner[len..].starts_with('}') {
                return None;
            }
            (&inner[..len], self.pos + 2 + len + 1)
        } else {
            let len = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
            (&rest[..len], self.pos + 1 + len)
        };
        DIRECTIVES.contains(&name).then_some((name, end))
    }

    /// `true` when only spaces or tabs precede `start` on its line and `text`
    /// still ends with them.
    fn indent_of(&self, text: &str, start: usize) -> Option<usize> {
        let line_start = self.src[..start].rfind('\n').map_or(0, |i| i + 1);
        let indent = &self.src[line_start..start];
        (indent.bytes().all(|b| b == b' ' || b == b'\t') && text.ends_with(indent))
            .then_some(indent.len())
    }

    fn trim_indent(&self, text: &mut String, start: usize) {
        if let Some(indent) = self.indent_of(text, start) {
            text.truncate(text.len() - indent);
        }
    }

    /// Drop the indentation and trailing newline of a line that holds only
    /// the construct spanning `start..self.pos`.
    fn gobble_line(&mut self, text: &mut String, start: usize) {
        let Some(indent) = self.indent_of(text, start) else {
            return;
        };
        let rest = self.rest();
        let after = rest.trim_start_matches([' ', '\t']);
        let newline = if after.starts_with("\r\n") {
            2
        } else if after.starts_with('\n') {
            1
        } else if after.is_empty() {
            0
        } else {
            return;
        };
        text.truncate(text.len() - indent);
        self.pos += rest.len() - after.len() + newline;
    }

    fn set_args(&mut self) -> Result<Node, ParseError> {
        self.skip_inline_ws();
        self.expect("(")?;
        self.skip_ws();
        let at = self.pos;
        let Some(target) = self.reference(false)? else {
            return Err(self.error_at(at, "expected a reference after #set("));
        };
        if target.segments.iter().any(|s| matches!(s, Segment::Method(..))) {
            return Err(self.error_at(at, "cannot assign to a method call"));
        }
        self.expect("=")?;
        let value = self.expr()?;
        self.expect(")")?;
        Ok(Node::Set { target, value })
    }

    fn paren_expr(&mut self, directive: &str) -> Result<Expr, ParseError> {
        self.skip_inline_ws();
        if !self.eat("(") {
            return Err(self.error_at(self.pos, format!("expected '(' after {directive}")));
        }
        let expr = self.expr()?;
        self.expect(")")?;
        Ok(expr)
    }

    fn foreach_args(&mut self) -> Result<(String, Expr), ParseError> {
        self.skip_inline_ws();
        self.expect("(")?;
        self.skip_ws();
        let at = self.pos;
        let var = match self.reference(false)? {
            Some(r) if r.segments.is_empty() => r.name,
            _ => return Err(self.error_at(at, "expected a loop variable such as $item")),
        };
        self.skip_ws();
        if !self.eat_word("in") {
            return Err(self.error_at(self.pos, "expected 'in' in #foreach"));
        }
        let iterable = self.expr()?;
        self.expect(")")?;
        Ok((var, iterable))
    }

    fn if_body(&mut self, first: Expr, start: usize) -> Result<Node, ParseError> {
        let mut branches = Vec::new();
        let mut cond = first;
        loop {
            let (body, end, _) = self.parse_block()?;
            branches.push((cond, body));
            match end {
                Terminator::ElseIf(next) => cond = next,
                Terminator::End => return Ok(Node::If { branches, otherwise: None }),
                Terminator::Else => {
                    let otherwise = self.closing_block("#if", start)?;
                    return Ok(Node::If { branches, otherwise: Some(otherwise) });
                }
                Terminator::Eof => return Err(self.error_at(start, "unterminated #if: missing #end")),
            }
        }
    }

    fn foreach_body(&mut self, var: String, iterable: Expr, start: usize) -> Result<Node, ParseError> {
        let (body, end, at) = self.parse_block()?;
        let otherwise = match end {
            Terminator::End => None,
            Terminator::Else => Some(self.closing_block("#foreach", start)?),
            Terminator::ElseIf(_) => return Err(self.error_at(at, "#elseif is not allowed in #foreach")),
            Terminator::Eof => {
                return Err(self.error_at(start, "unterminated #foreach: missing #end"))
            }
        };
        Ok(Node::Foreach { var, iterable, body, otherwise })
    }

    /// The block after `#else`, which must be closed by `#end`.
    fn closing_block(&mut self, directive: &str, start: usize) -> Result<Vec<Node>, ParseError> {
        let (body, end, at) = self.parse_block()?;
        match end {
            Terminator::End => Ok(body),
            Terminator::Eof => Err(self.error_at(start, format!("unterminated {directive}: missing #end"))),
            other => Err(self.error_at(at, format!("unexpected {} after #else", other.keyword()))),
        }
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------

    /// Parse `$[!][{]name(.seg|[idx])*[}]` at the cursor. Returns `None`
    /// (cursor untouched) when the `$` does not start a reference.
    ///
    /// In `lenient` (text) mode an index bracket that does not parse is left
    /// as text.
    fn reference(&mut self, lenient: bool) -> Result<Option<Reference>, ParseError> {
        let start = self.pos;
        let mut i = 1;
        let quiet = self.peek_at(i) == Some('!');
        if quiet {
            i += 1;
        }
        let braced = self.peek_at(i) == Some('{');
        if braced {
            i += 1;
        }
        if !self.peek_at(i).is_some_and(is_ident_start) {
            return Ok(None);
        }
        self.pos += i;
        let name = self.ident();

        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Some('.') if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.pos += 1;
                    let member = self.ident();
                    if self.peek() == Some('(') {
                        self.pos += 1;
                        segments.push(Segment::Method(member, self.args()?));
                    } else {
                        segments.push(Segment::Property(member));
                    }
                }
                Some('[') => {
                    let save = self.pos;
                    match self.index() {
                        Ok(expr) => segments.push(Segment::Index(expr)),
                        Err(_) if lenient => {
                            self.pos = save;
                            break;
                        }
                        Err(err) => return Err(err),
                    }
                }
                _ => break,
            }
        }

        if braced && !self.eat("}") {
            return Err(self.error_at(self.pos, "expected '}' to close ${...} reference"));
        }

        Ok(Some(Reference {
            name,
            segments,
            quiet,
            source: self.src[start..self.pos].to_string(),
        }))
    }

    fn args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            self.skip_ws();
            if self.eat(",") {
                continue;
            }
            if self.eat(")") {
                return Ok(args);
            }
            return Err(self.error_at(self.pos, "expected ',' or ')' in argument list"));
        }
    }

    fn index(&mut self) -> Result<Expr, ParseError> {
        self.pos += 1;
        let expr = self.expr()?;
        self.expect("]")?;
        Ok(expr)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Every nested expression passes through here. Operators consumed by
    /// the precedence loops below also count against the nesting limit, so
    /// long chains cannot build an arbitrarily deep tree.
    fn expr(&mut self) -> Result<Expr, ParseError> {
        let at = self.pos;
        self.nested(at, Self::or)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            if self.eat("||") || self.eat_word("or") {
                self.enter(at)?;
                let rhs = self.and()?;
                lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.equality()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            if self.eat("&&") || self.eat_word("and") {
                self.enter(at)?;
                let rhs = self.equality()?;
                lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.relational()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            let op = if self.eat("==") || self.eat_word("eq") {
                BinaryOp::Eq
            } else if self.eat("!=") || self.eat_word("ne") {
                BinaryOp::Ne
            } else {
                return Ok(lhs);
            };
            self.enter(at)?;
            let rhs = self.relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.additive()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            let op = if self.eat("<=") || self.eat_word("le") {
                BinaryOp::Le
            } else if self.eat(">=") || self.eat_word("ge") {
                BinaryOp::Ge
            } else if self.eat("<") || self.eat_word("lt") {
                BinaryOp::Lt
            } else if self.eat(">") || self.eat_word("gt") {
                BinaryOp::Gt
            } else {
                return Ok(lhs);
            };
            self.enter(at)?;
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            let op = if self.eat("+") {
                BinaryOp::Add
            } else if self.eat("-") {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            self.enter(at)?;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            let op = if self.eat("*") {
                BinaryOp::Mul
            } else if self.eat("/") {
                BinaryOp::Div
            } else if self.eat("%") {
                BinaryOp::Rem
            } else {
                return Ok(lhs);
            };
            self.enter(at)?;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_ws();
        let at = self.pos;
        if self.eat("!") || self.eat_word("not") {
            self.enter(at)?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat("-") {
            self.enter(at)?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some('$') => match self.reference(false)? {
                Some(reference) => Ok(Expr::Ref(reference)),
                None => Err(self.error_at(start, "expected a reference after '$'")),
            },
            Some('\'') => Ok(Expr::Str(self.quoted('\'')?)),
            Some('"') => {
                let content = self.quoted('"')?;
                if !content.contains(['$', '#']) {
                    return Ok(Expr::Str(content));
                }
                match parse_at_depth(&content, self.depth) {
                    Ok(template) => Ok(Expr::Interpolated(template.nodes)),
                    Err(err) => Err(self.error_at(start, format!("in string literal: {}", err.message))),
                }
            }
            Some(c) if c.is_ascii_digit() => self.number(),
            Some('[') => self.list(),
            Some('{') => self.map(),
            Some('(') => {
                self.pos += 1;
                let expr = self.expr()?;
                self.expect(")")?;
                Ok(expr)
            }
            Some(c) if is_ident_start(c) => {
                if self.eat_word("true") {
                    Ok(Expr::Bool(true))
                } else if self.eat_word("false") {
                    Ok(Expr::Bool(false))
                } else if self.eat_word("null") {
                    Ok(Expr::Null)
                } else {
                    let word = self.ident();
                    Err(self.error_at(start, format!("unexpected identifier '{word}'")))
                }
            }
            Some(c) => Err(self.error_at(start, format!("unexpected character '{c}'"))),
            None => Err(self.error_at(start, "unexpected end of template in expression")),
        }
    }

    /// A quoted literal; a doubled quote character stands for itself.
    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error_at(start, "unterminated string literal")),
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.pos += 1;
                        out.push(quote);
                    } else {
                        return Ok(out);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.skip_digits();
        let is_float = self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            self.skip_digits();
        }
        let literal = &self.src[start..self.pos];
        if !is_float {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Expr::Int(i));
            }
        }
        literal
            .parse::<f64>()
            .map(Expr::Float)
            .map_err(|_| self.error_at(start, format!("invalid number '{literal}'")))
    }

    fn skip_digits(&mut self) {
        let count = self.rest().bytes().take_while(u8::is_ascii_digit).count();
        self.pos += count;
    }

    fn list(&mut self) -> Result<Expr, ParseError> {
        self.pos += 1;
        self.skip_ws();
        if self.eat("]") {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.expr()?;
        self.skip_ws();
        if self.eat("..") {
            let last = self.expr()?;
            self.expect("]")?;
            return Ok(Expr::Range(Box::new(first), Box::new(last)));
        }
        let mut items = vec![first];
        loop {
            self.skip_ws();
            if self.eat("]") {
                return Ok(Expr::List(items));
            }
            if !self.eat(",") {
                return Err(self.error_at(self.pos, "expected ',' or ']' in list literal"));
            }
            items.push(self.expr()?);
        }
    }

    fn map(&mut self) -> Result<Expr, ParseError> {
        self.pos += 1;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.eat("}") {
            return Ok(Expr::Map(entries));
        }
        loop {
            let key = self.expr()?;
            self.expect(":")?;
            let value = self.expr()?;
            entries.push((key, value));
            self.skip_ws();
            if self.eat("}") {
                return Ok(Expr::Map(entries));
            }
            if !self.eat(",") {
                return Err(self.error_at(self.pos, "expected ',' or '}' in map literal"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(src: &str) -> Vec<Node> {
        parse(src).unwrap_or_else(|e| panic!("parse failed for {src:?}: {e}")).nodes
    }

    fn single_ref(src: &str) -> Reference {
        match nodes(src).as_slice() {
            [Node::Reference(r)] => r.clone(),
            other => panic!("expected a single reference, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_one_node() {
        assert_eq!(nodes("hello world"), vec![Node::Text("hello world".into())]);
    }

    #[test]
    fn reference_with_property_chain() {
        let r = single_ref("$input.body");
        assert_eq!(r.name, "input");
        assert_eq!(r.segments, vec![Segment::Property("body".into())]);
        assert_eq!(r.source, "$input.body");
    }

    #[test]
    fn method_call_with_string_argument() {
        let r = single_ref("$util.base64Encode('Hello, World!@#$%^&*()')");
        assert_eq!(
            r.segments,
            vec![Segment::Method(
                "base64Encode".into(),
                vec![Expr::Str("Hello, World!@#$%^&*()".into())]
            )]
        );
    }

    #[test]
    fn chained_method_property_and_index() {
        let r = single_ref("$util.parseJson($input.body).hello[0]");
        assert_eq!(r.segments.len(), 3);
        assert!(matches!(&r.segments[1], Segment::Property(p) if p == "hello"));
        assert_eq!(r.segments[2], Segment::Index(Expr::Int(0)));
    }

    #[test]
    fn trailing_dot_stays_text() {
        let parsed = nodes("$a.b.");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], Node::Text(".".into()));
    }

    #[test]
    fn unparseable_index_in_text_stays_text() {
        let parsed = nodes("$price[USD]");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], Node::Text("[USD]".into()));
    }

    #[test]
    fn quiet_and_braced_forms() {
        let r = single_ref("$!{user.name}");
        assert!(r.quiet);
        assert_eq!(r.source, "$!{user.name}");
        let parsed = nodes("${a}b");
        assert_eq!(parsed[1], Node::Text("b".into()));
    }

    #[test]
    fn dollar_without_identifier_is_text() {
        assert_eq!(nodes("cost: $5"), vec![Node::Text("cost: $5".into())]);
    }

    #[test]
    fn escaped_reference_is_text() {
        assert_eq!(nodes(r"\$input.body"), vec![Node::Text("$input.body".into())]);
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(nodes("a## note\nb#* block *#c"), vec![Node::Text("abc".into())]);
    }

    #[test]
    fn raw_block_is_verbatim() {
        assert_eq!(nodes("#[[$not.parsed #if]]#"), vec![Node::Text("$not.parsed #if".into())]);
    }

    #[test]
    fn unknown_directive_is_text() {
        assert_eq!(nodes("color: #fff #hashtag"), vec![Node::Text("color: #fff #hashtag".into())]);
    }

    #[test]
    fn if_elseif_else_structure() {
        let parsed = nodes("#if($a)A#elseif($b)B#{else}C#end");
        match parsed.as_slice() {
            [Node::If { branches, otherwise: Some(otherwise) }] => {
                assert_eq!(branches.len(), 2);
                assert_eq!(otherwise, &vec![Node::Text("C".into())]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn directive_lines_are_gobbled() {
        let parsed = nodes("a\n  #set($x = 1)\nb");
        assert_eq!(parsed[0], Node::Text("a\n".into()));
        assert_eq!(parsed[2], Node::Text("b".into()));
    }

    #[test]
    fn operator_precedence() {
        let parsed = nodes("#set($x = 1 + 2 * 3 == 7 && !false)");
        let Node::Set { value, .. } = &parsed[0] else { panic!("expected #set") };
        assert!(matches!(value, Expr::Binary(BinaryOp::And, _, _)));
    }

    #[test]
    fn range_and_map_literals() {
        let parsed = nodes("#set($r = [1..3])#set($m = {'a': 1, \"b\": [2]})");
        assert!(matches!(&parsed[0], Node::Set { value: Expr::Range(_, _), .. }));
        assert!(matches!(&parsed[1], Node::Set { value: Expr::Map(e), .. } if e.len() == 2));
    }

    #[test]
    fn double_quoted_strings_interpolate() {
        let parsed = nodes("#set($g = \"hi $name\")");
        assert!(matches!(&parsed[0], Node::Set { value: Expr::Interpolated(_), .. }));
    }

    #[test]
    fn doubled_quotes_escape_themselves() {
        let r = single_ref("$a.b('it''s')");
        assert_eq!(r.segments[0], Segment::Method("b".into(), vec![Expr::Str("it's".into())]));
    }

    #[test]
    fn unterminated_if_is_an_error() {
        let err = parse("#if($a) open").unwrap_err();
        assert!(err.message.contains("missing #end"), "{err}");
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn stray_end_is_an_error() {
        let err = parse("text\n#end").unwrap_err();
        assert_eq!(err.message, "unexpected #end");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn unterminated_string_in_method_call_is_an_error() {
        let err = parse("$util.parseJson('{)").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn missing_closing_brace_is_an_error() {
        assert!(parse("${input.body").is_err());
    }

    #[test]
    fn foreach_requires_plain_variable() {
        assert!(parse("#foreach($a.b in $list)#end").is_err());
        assert!(parse("#foreach($a in $list)x#end").is_ok());
    }

    #[test]
    fn unclosed_brackets_fail_instead_of_recursing() {
        let src = format!("$util.urlEncode({}", "[".repeat(10_000));
        let err = parse(&src).unwrap_err();
        assert_eq!(err.message, "template nested too deeply");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let depth = 200;
        let src = format!("#set($x = {}1{})", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&src).unwrap_err().message, "template nested too deeply");
    }

    #[test]
    fn moderate_nesting_is_accepted() {
        let src = format!("#set($x = {}1{})", "(".repeat(20), ")".repeat(20));
        assert!(parse(&src).is_ok());
        let src = format!("#set($x = {}{})", "[".repeat(20), "]".repeat(20));
        assert!(parse(&src).is_ok());
    }

    #[test]
    fn deep_directive_nesting_is_rejected() {
        let deep = format!("{}x{}", "#if(true)".repeat(100), "#end".repeat(100));
        assert_eq!(parse(&deep).unwrap_err().message, "template nested too deeply");
        let shallow = format!("{}x{}", "#if(true)".repeat(10), "#end".repeat(10));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let src = format!("#set($x = 1{})", " + 1".repeat(10_000));
        assert_eq!(parse(&src).unwrap_err().message, "template nested too deeply");
        let src = format!("#if({}true)x#end", "!".repeat(10_000));
        assert_eq!(parse(&src).unwrap_err().message, "template nested too deeply");
        assert!(parse("#if($a == 1 && $b == 2 || $c + 3 * 4 > 5)x#end").is_ok());
    }

    #[test]
    fn deep_index_in_text_stays_literal() {
        let src = format!("$a{}", "[".repeat(10_000));
        let parsed = nodes(&src);
        assert_eq!(parsed.len(), 2);
        assert!(matches!(&parsed[1], Node::Text(t) if t.len() == 10_000));
    }

    #[test]
    fn nesting_inside_string_literals_counts() {
        let src = format!("#set($x = \"$a.b({}\")", "[".repeat(500));
        assert!(parse(&src).is_err());
    }
}
