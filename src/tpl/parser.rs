use std::mem;

use crate::error::ParseError;
use crate::tpl::ast::{
    Block, Expression, HashPair, Mustache, Partial, PathExpression, Program, Statement,
    SubExpression,
};

/// Deepest block nesting accepted by the parser.
pub const MAX_NESTING: usize = 256;

/// An open `{{#helper}}` waiting for its closing tag.
struct BlockFrame {
    open: usize,
    path: PathExpression,
    params: Vec<Expression>,
    hash: Vec<HashPair>,
    block_params: Vec<String>,
    /// Main program, set once `{{else}}` was seen.
    program: Option<Program>,
    /// Opened by `{{else if ..}}`; closed by the parent's closing tag.
    chained: bool,
}

impl BlockFrame {
    fn new(open: usize, call: Call, chained: bool) -> Result<Self, String> {
        let Expression::Path(path) = call.head else {
            return Err(format!(
                "block helper name must be a path, found `{}`",
                call.head.as_written()
            ));
        };
        Ok(Self {
            open,
            path,
            params: call.params,
            hash: call.hash,
            block_params: call.block_params,
            program: None,
            chained,
        })
    }

    fn into_block(self, body: Vec<Statement>) -> Block {
        let (program, inverse) = match self.program {
            Some(program) => (program, Some(Program::new(body))),
            None => (
                Program {
                    body,
                    block_params: self.block_params,
                },
                None,
            ),
        };
        Block {
            path: self.path,
            params: self.params,
            hash: self.hash,
            program,
            inverse,
        }
    }
}

enum TagKind<'a> {
    Comment(&'a str),
    Unescaped(&'a str),
    Plain(&'a str),
}

struct Tag<'a> {
    kind: TagKind<'a>,
    trim_left: bool,
    trim_right: bool,
    end: usize,
}

/// Parses a Handlebars template into its program.
pub fn parse_template(source: &str) -> Result<Program, ParseError> {
    let mut nodes_stack: Vec<Vec<Statement>> = vec![Vec::new()];
    let mut frames: Vec<BlockFrame> = Vec::new();
    let mut strip_next = false;
    let mut pos = 0;

    while pos < source.len() {
        let remaining = &source[pos..];
        let Some(found) = remaining.find("{{") else {
            append_text(current(&mut nodes_stack), remaining, strip_next);
            break;
        };
        let open = pos + found;
        let text = &source[pos..open];

        // `\{{..}}` is emitted literally, `\\{{..}}` keeps one backslash
        if text.ends_with('\\') && !text.ends_with("\\\\") {
            let end = scan_until(source, open + 2, "}}").map_or(source.len(), |i| i + 2);
            append_text(current(&mut nodes_stack), &text[..text.len() - 1], strip_next);
            append_text(current(&mut nodes_stack), &source[open..end], false);
            strip_next = false;
            pos = end;
            continue;
        }
        let text = text.strip_suffix('\\').unwrap_or(text);
        append_text(current(&mut nodes_stack), text, strip_next);

        let tag = read_tag(source, open)?;
        if tag.trim_left {
            trim_trailing_whitespace(current(&mut nodes_stack));
        }
        strip_next = tag.trim_right;
        pos = tag.end;

        let at = |message: String| ParseError::at(source, open, message);

        let body = match tag.kind {
            TagKind::Comment(text) => {
                current(&mut nodes_stack).push(Statement::Comment(text.to_string()));
                continue;
            }
            TagKind::Unescaped(body) => {
                let mustache = parse_mustache(body, false).map_err(at)?;
                current(&mut nodes_stack).push(Statement::Mustache(mustache));
                continue;
            }
            TagKind::Plain(body) => body.trim(),
        };

        let Some(first) = body.chars().next() else {
            return Err(at("empty tag".to_string()));
        };
        let rest = &body[first.len_utf8()..];

        match first {
            '#' => {
                if rest.starts_with('>') {
                    return Err(at("partial blocks are not supported".to_string()));
                }
                if rest.starts_with('*') {
                    return Err(at("decorators are not supported".to_string()));
                }
                let call = parse_call(rest).map_err(at)?;
                let frame = BlockFrame::new(open, call, false).map_err(at)?;
                push_frame(&mut frames, &mut nodes_stack, frame).map_err(at)?;
            }
            '/' => close_frames(&mut frames, &mut nodes_stack, rest.trim()).map_err(at)?,
            '^' if rest.trim().is_empty() => {
                start_inverse(&mut frames, &mut nodes_stack).map_err(at)?
            }
            '^' => return Err(at("inverse sections are not supported".to_string())),
            '*' => return Err(at("decorators are not supported".to_string())),
            '>' => {
                let call = parse_call(rest).map_err(at)?;
                current(&mut nodes_stack).push(Statement::Partial(Partial {
                    name: call.head,
                    params: call.params,
                    hash: call.hash,
                }));
            }
            '&' => {
                let mustache = parse_mustache(rest, false).map_err(at)?;
                current(&mut nodes_stack).push(Statement::Mustache(mustache));
            }
            _ if body == "else" => start_inverse(&mut frames, &mut nodes_stack).map_err(at)?,
            _ if is_chained_else(body) => {
                start_inverse(&mut frames, &mut nodes_stack).map_err(at)?;
                let call = parse_call(&body[4..]).map_err(at)?;
                let frame = BlockFrame::new(open, call, true).map_err(at)?;
                push_frame(&mut frames, &mut nodes_stack, frame).map_err(at)?;
            }
            _ => {
                let mustache = parse_mustache(body, true).map_err(at)?;
                current(&mut nodes_stack).push(Statement::Mustache(mustache));
            }
        }
    }

    if let Some(frame) = frames.iter().find(|f| !f.chained) {
        return Err(ParseError::at(
            source,
            frame.open,
            format!("unclosed block `{{{{#{}}}}}`", frame.path.original),
        ));
    }

    Ok(Program::new(nodes_stack.pop().unwrap_or_default()))
}

fn current(nodes_stack: &mut [Vec<Statement>]) -> &mut Vec<Statement> {
    nodes_stack.last_mut().expect("Stack underflow")
}

fn is_chained_else(body: &str) -> bool {
    body.strip_prefix("else")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}

fn push_frame(
    frames: &mut Vec<BlockFrame>,
    nodes_stack: &mut Vec<Vec<Statement>>,
    frame: BlockFrame,
) -> Result<(), String> {
    // `else if` links share the depth of the block they continue
    let depth = frames.iter().filter(|f| !f.chained).count();
    if !frame.chained && depth >= MAX_NESTING {
        return Err(format!("blocks nested deeper than {}", MAX_NESTING));
    }
    frames.push(frame);
    nodes_stack.push(Vec::new());
    Ok(())
}

fn start_inverse(
    frames: &mut [BlockFrame],
    nodes_stack: &mut Vec<Vec<Statement>>,
) -> Result<(), String> {
    let Some(frame) = frames.last_mut() else {
        return Err("`{{else}}` outside of a block".to_string());
    };
    if frame.program.is_some() {
        return Err(format!(
            "duplicate `{{{{else}}}}` in `{{{{#{}}}}}`",
            frame.path.original
        ));
    }
    let body = nodes_stack.pop().unwrap_or_default();
    frame.program = Some(Program {
        body,
        block_params: mem::take(&mut frame.block_params),
    });
    nodes_stack.push(Vec::new());
    Ok(())
}

fn close_frames(
    frames: &mut Vec<BlockFrame>,
    nodes_stack: &mut Vec<Vec<Statement>>,
    name: &str,
) -> Result<(), String> {
    loop {
        let Some(frame) = frames.pop() else {
            return Err(format!("unexpected closing tag `{{{{/{}}}}}`", name));
        };
        let chained = frame.chained;
        if !chained && frame.path.original != name {
            return Err(format!(
                "`{{{{#{}}}}}` closed by `{{{{/{}}}}}`",
                frame.path.original, name
            ));
        }
        let body = nodes_stack.pop().unwrap_or_default();
        let block = frame.into_block(body);
        current(nodes_stack).push(Statement::Block(block));
        if !chained {
            return Ok(());
        }
    }
}

fn append_text(nodes: &mut Vec<Statement>, text: &str, strip_leading: bool) {
    let text = if strip_leading { text.trim_start() } else { text };
    if text.is_empty() {
        return;
    }
    if let Some(Statement::Content(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Statement::Content(text.to_string()));
    }
}

fn trim_trailing_whitespace(nodes: &mut Vec<Statement>) {
    if let Some(Statement::Content(last)) = nodes.last_mut() {
        let trimmed = last.trim_end().len();
        last.truncate(trimmed);
        if last.is_empty() {
            nodes.pop();
        }
    }
}

/// Finds `pat` at or after `from`, skipping over quoted strings.
fn scan_until(source: &str, from: usize, pat: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == b'\\' && bytes.get(i + 1) == Some(&q) => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if bytes[i..].starts_with(pat.as_bytes()) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn read_tag(source: &str, open: usize) -> Result<Tag<'_>, ParseError> {
    let bytes = source.as_bytes();
    let mut i = open + 2;
    let trim_left = bytes.get(i) == Some(&b'~');
    if trim_left {
        i += 1;
    }
    let rest = &source[i..];

    if rest.starts_with("{{") {
        return Err(ParseError::at(source, open, "raw blocks are not supported"));
    }

    if let Some(after) = rest.strip_prefix("!--") {
        let body_start = source.len() - after.len();
        let close = [after.find("--}}"), after.find("--~}}")]
            .into_iter()
            .flatten()
            .min()
            .ok_or_else(|| ParseError::at(source, open, "unclosed comment"))?;
        let close = body_start + close;
        let trim_right = source[close..].starts_with("--~}}");
        return Ok(Tag {
            kind: TagKind::Comment(&source[body_start..close]),
            trim_left,
            trim_right,
            end: close + if trim_right { 5 } else { 4 },
        });
    }

    if rest.starts_with('!') {
        let body_start = i + 1;
        let close = source[body_start..]
            .find("}}")
            .map(|c| body_start + c)
            .ok_or_else(|| ParseError::at(source, open, "unclosed comment"))?;
        let trim_right = close > body_start && bytes[close - 1] == b'~';
        let body_end = if trim_right { close - 1 } else { close };
        return Ok(Tag {
            kind: TagKind::Comment(&source[body_start..body_end]),
            trim_left,
            trim_right,
            end: close + 2,
        });
    }

    if rest.starts_with('{') {
        let body_start = i + 1;
        let close = scan_until(source, body_start, "}")
            .ok_or_else(|| ParseError::at(source, open, "unclosed tag"))?;
        let mut after = close + 1;
        let trim_right = bytes.get(after) == Some(&b'~');
        if trim_right {
            after += 1;
        }
        if !source[after..].starts_with("}}") {
            return Err(ParseError::at(source, open, "expected `}}}`"));
        }
        return Ok(Tag {
            kind: TagKind::Unescaped(&source[body_start..close]),
            trim_left,
            trim_right,
            end: after + 2,
        });
    }

    let close =
        scan_until(source, i, "}}").ok_or_else(|| ParseError::at(source, open, "unclosed tag"))?;
    let trim_right = close > i && bytes[close - 1] == b'~';
    let body_end = if trim_right { close - 1 } else { close };
    Ok(Tag {
        kind: TagKind::Plain(&source[i..body_end]),
        trim_left,
        trim_right,
        end: close + 2,
    })
}

fn parse_mustache(body: &str, escaped: bool) -> Result<Mustache, String> {
    let call = parse_call(body)?;
    if let Expression::SubExpression(_) = call.head {
        return Err("a sub-expression cannot be interpolated directly".to_string());
    }
    if !call.block_params.is_empty() {
        return Err("block parameters are only allowed on blocks".to_string());
    }
    Ok(Mustache {
        path: call.head,
        params: call.params,
        hash: call.hash,
        escaped,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Open,
    Close,
    Equals,
    Pipe,
}

fn lex_expression(body: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '=' | '|' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    '=' => Token::Equals,
                    _ => Token::Pipe,
                });
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(ch) = chars.next() {
                    // only the opening quote can be escaped
                    if ch == '\\' && chars.peek() == Some(&c) {
                        value.push(c);
                        chars.next();
                        continue;
                    }
                    if ch == c {
                        closed = true;
                        break;
                    }
                    value.push(ch);
                }
                if !closed {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Str(value));
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || matches!(ch, '(' | ')' | '=' | '|' | '"' | '\'') {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

fn classify_word(word: &str) -> Expression {
    match word {
        "true" => Expression::Boolean(true),
        "false" => Expression::Boolean(false),
        "undefined" => Expression::Undefined,
        "null" => Expression::Null,
        _ if is_number(word) => Expression::Number(word.to_string()),
        _ => Expression::Path(PathExpression::parse(word)),
    }
}

fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// A helper invocation: `head params.. key=value.. as |a b|`.
struct Call {
    head: Expression,
    params: Vec<Expression>,
    hash: Vec<HashPair>,
    block_params: Vec<String>,
}

fn parse_call(body: &str) -> Result<Call, String> {
    let tokens = lex_expression(body)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    parser.parse_call(false)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_call(&mut self, nested: bool) -> Result<Call, String> {
        let head = self.parse_expression()?;
        let mut params = Vec::new();
        let mut hash = Vec::new();
        let mut block_params = Vec::new();

        loop {
            match self.peek().cloned() {
                None if nested => return Err("unterminated sub-expression".to_string()),
                None => break,
                Some(Token::Close) if nested => {
                    self.next();
                    break;
                }
                Some(Token::Close) => return Err("unexpected `)`".to_string()),
                Some(Token::Word(w))
                    if w == "as" && !nested && self.peek_at(1) == Some(&Token::Pipe) =>
                {
                    self.pos += 2;
                    block_params = self.parse_block_params()?;
                }
                Some(Token::Word(key)) if self.peek_at(1) == Some(&Token::Equals) => {
                    self.pos += 2;
                    let value = self.parse_expression()?;
                    hash.push(HashPair { key, value });
                }
                Some(Token::Equals) => return Err("unexpected `=`".to_string()),
                Some(Token::Pipe) => return Err("unexpected `|`".to_string()),
                Some(_) => {
                    if !hash.is_empty() {
                        return Err("positional argument after hash argument".to_string());
                    }
                    params.push(self.parse_expression()?);
                }
            }
        }

        Ok(Call {
            head,
            params,
            hash,
            block_params,
        })
    }

    fn parse_block_params(&mut self) -> Result<Vec<String>, String> {
        let mut names = Vec::new();
        loop {
            match self.next() {
                Some(Token::Word(name)) => names.push(name),
                Some(Token::Pipe) => break,
                _ => return Err("malformed block parameters".to_string()),
            }
        }
        if self.peek().is_some() {
            return Err("unexpected input after block parameters".to_string());
        }
        Ok(names)
    }

    fn parse_expression(&mut self) -> Result<Expression, String> {
        match self.next() {
            Some(Token::Word(word)) => Ok(classify_word(&word)),
            Some(Token::Str(value)) => Ok(Expression::String(value)),
            Some(Token::Open) => {
                let call = self.parse_call(true)?;
                let Expression::Path(path) = call.head else {
                    return Err(format!(
                        "sub-expression helper must be a path, found `{}`",
                        call.head.as_written()
                    ));
                };
                Ok(Expression::SubExpression(SubExpression {
                    path,
                    params: call.params,
                    hash: call.hash,
                }))
            }
            Some(Token::Close) => Err("unexpected `)`".to_string()),
            Some(Token::Equals) => Err("unexpected `=`".to_string()),
            Some(Token::Pipe) => Err("unexpected `|`".to_string()),
            None => Err("unexpected end of tag".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(stmt: &Statement) -> &Block {
        match stmt {
            Statement::Block(b) => b,
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_text() {
        let program = parse_template("hello world").unwrap();
        assert_eq!(program.body, vec![Statement::Content("hello world".into())]);
    }

    #[test]
    fn test_parse_mustache() {
        let program = parse_template("Hello {{name}}!").unwrap();
        assert_eq!(program.body.len(), 3);
        match &program.body[1] {
            Statement::Mustache(m) => {
                assert!(m.escaped);
                assert_eq!(m.path, Expression::Path(PathExpression::parse("name")));
            }
            _ => panic!("Expected Mustache"),
        }
    }

    #[test]
    fn test_parse_unescaped() {
        let program = parse_template("{{{html}}}{{& raw}}").unwrap();
        for stmt in &program.body {
            match stmt {
                Statement::Mustache(m) => assert!(!m.escaped),
                _ => panic!("Expected Mustache"),
            }
        }
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_parse_comments() {
        let program = parse_template("{{! short }}{{!-- long }} --}}").unwrap();
        assert_eq!(
            program.body,
            vec![
                Statement::Comment(" short ".into()),
                Statement::Comment(" long }} ".into()),
            ]
        );
    }

    #[test]
    fn test_parse_each_with_block_params() {
        let program = parse_template("{{#each items as |key val|}}{{val}}{{/each}}").unwrap();
        let each = block(&program.body[0]);
        assert_eq!(each.helper(), "each");
        assert_eq!(each.program.block_params, vec!["key", "val"]);
        assert_eq!(each.params.len(), 1);
        assert!(each.inverse.is_none());
    }

    #[test]
    fn test_parse_else_if_chain() {
        let program =
            parse_template("{{#if a}}A{{else if b}}B{{else}}C{{/if}}").unwrap();
        assert_eq!(program.body.len(), 1);
        let outer = block(&program.body[0]);
        assert_eq!(outer.program.body, vec![Statement::Content("A".into())]);

        let inverse = outer.inverse.as_ref().unwrap();
        assert_eq!(inverse.body.len(), 1);
        let chained = block(&inverse.body[0]);
        assert_eq!(chained.helper(), "if");
        assert_eq!(chained.program.body, vec![Statement::Content("B".into())]);
        assert_eq!(
            chained.inverse.as_ref().unwrap().body,
            vec![Statement::Content("C".into())]
        );
    }

    #[test]
    fn test_parse_caret_else() {
        let program = parse_template("{{#if a}}A{{^}}B{{/if}}").unwrap();
        let outer = block(&program.body[0]);
        assert!(outer.inverse.is_some());
    }

    #[test]
    fn test_parse_sub_expressions_and_hash() {
        let program = parse_template(
            r#"{{carbon-icon "close" class=(add variant "--icon") size=16}}"#,
        )
        .unwrap();
        match &program.body[0] {
            Statement::Mustache(m) => {
                assert_eq!(m.params, vec![Expression::String("close".into())]);
                assert_eq!(m.hash.len(), 2);
                assert_eq!(m.hash[0].key, "class");
                match &m.hash[0].value {
                    Expression::SubExpression(sub) => {
                        assert_eq!(sub.helper(), "add");
                        assert_eq!(sub.params.len(), 2);
                    }
                    _ => panic!("Expected SubExpression"),
                }
                assert_eq!(m.hash[1].value, Expression::Number("16".into()));
            }
            _ => panic!("Expected Mustache"),
        }
    }

    #[test]
    fn test_parse_partials() {
        let program = parse_template(
            "{{> components/button.hbs label=title}}{{> \"a.hbs\"}}{{> (lookup . 'tpl')}}",
        )
        .unwrap();
        assert_eq!(program.body.len(), 3);
        match &program.body[0] {
            Statement::Partial(p) => {
                assert_eq!(
                    p.name,
                    Expression::Path(PathExpression::parse("components/button.hbs"))
                );
                assert_eq!(p.hash[0].key, "label");
            }
            _ => panic!("Expected Partial"),
        }
        match &program.body[2] {
            Statement::Partial(p) => assert!(matches!(p.name, Expression::SubExpression(_))),
            _ => panic!("Expected Partial"),
        }
    }

    #[test]
    fn test_whitespace_control() {
        let program = parse_template("a  {{~name~}}  b").unwrap();
        assert_eq!(program.body.len(), 3);
        assert_eq!(program.body[0], Statement::Content("a".into()));
        assert_eq!(program.body[2], Statement::Content("b".into()));
    }

    #[test]
    fn test_escaped_mustache() {
        let program = parse_template("a \\{{name}} b").unwrap();
        assert_eq!(program.body, vec![Statement::Content("a {{name}} b".into())]);
    }

    #[test]
    fn test_literals() {
        assert_eq!(classify_word("12"), Expression::Number("12".into()));
        assert_eq!(classify_word("-1.5"), Expression::Number("-1.5".into()));
        assert_eq!(classify_word("true"), Expression::Boolean(true));
        assert_eq!(classify_word("null"), Expression::Null);
        assert!(matches!(classify_word("1.x"), Expression::Path(_)));
        assert!(matches!(classify_word("-"), Expression::Path(_)));
    }

    #[test]
    fn test_mismatched_close() {
        let err = parse_template("{{#if a}}x{{/each}}").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 11);
        assert!(err.message.contains("closed by"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_template("line\n{{#each items}}x").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_stray_else_and_duplicate_else() {
        assert!(parse_template("{{else}}").is_err());
        assert!(parse_template("{{#if a}}{{else}}{{else}}{{/if}}").is_err());
    }

    #[test]
    fn test_unclosed_tag_and_string() {
        assert!(parse_template("{{name").is_err());
        assert!(parse_template("{{t \"abc}}").is_err());
        assert!(parse_template("{{!-- open").is_err());
        assert!(parse_template("{{f (g x}}").is_err());
    }

    #[test]
    fn test_unsupported_syntax() {
        assert!(parse_template("{{{{raw}}}}x{{{{/raw}}}}").is_err());
        assert!(parse_template("{{^items}}none{{/items}}").is_err());
        assert!(parse_template("{{#> layout}}x{{/layout}}").is_err());
        assert!(parse_template("{{#\"lit\"}}x{{/lit}}").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "{{#if a}}".repeat(MAX_NESTING + 1);
        let err = parse_template(&deep).unwrap_err();
        assert!(err.message.contains("nested deeper"));
    }

    #[test]
    fn test_long_else_if_chain_is_not_nesting() {
        let mut source = String::from("{{#if a}}0");
        for i in 1..=MAX_NESTING + 44 {
            source.push_str(&format!("{{{{else if b{}}}}}{}", i, i));
        }
        source.push_str("{{else}}end{{/if}}");

        let program = parse_template(&source).unwrap();
        assert_eq!(program.body.len(), 1);

        let mut links = 0;
        let mut inverse = block(&program.body[0]).inverse.as_ref();
        while let Some(Statement::Block(chained)) = inverse.and_then(|p| p.body.first()) {
            links += 1;
            inverse = chained.inverse.as_ref();
        }
        assert_eq!(links, MAX_NESTING + 44);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            lex_expression(r#"t "a\b" 'it\'s' "say \"hi\"""#).unwrap(),
            vec![
                Token::Word("t".into()),
                Token::Str("a\\b".into()),
                Token::Str("it's".into()),
                Token::Str("say \"hi\"".into()),
            ]
        );

        let program = parse_template(r#"{{t "a\"}}b"}}"#).unwrap();
        let Statement::Mustache(m) = &program.body[0] else {
            panic!("Expected Mustache, got {:?}", program.body[0]);
        };
        assert_eq!(m.params, vec![Expression::String("a\"}}b".into())]);
    }
}
