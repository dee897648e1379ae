//! Minimal GLSL ES front-end.
//!
//! This is not a compiler. It tokenizes the source, checks delimiter balance and
//! the presence of `main`, and records the interface declarations (attributes,
//! uniforms, varyings) together with whether the function bodies reference
//! them. That is enough to produce driver-style diagnostics and the
//! active-attribute/uniform lists a real linker would report.

use std::collections::HashSet;

use crate::device::ShaderStage;

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Spanned {
    tok: Token,
    line: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn tokenize(mut self) -> Result<(Vec<Spanned>, usize), String> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok((tokens, self.line))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            let rest = &self.src[self.pos..];
            // Preprocessor directives are accepted and ignored.
            if rest.starts_with("//") || rest.starts_with('#') {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.advance();
                }
            } else if rest.starts_with("/*") {
                self.advance();
                self.advance();
                loop {
                    if self.src[self.pos..].starts_with("*/") {
                        self.advance();
                        self.advance();
                        break;
                    }
                    if self.advance().is_none() {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, String> {
        self.skip_trivia();
        let line = self.line;
        let Some(ch) = self.peek() else { return Ok(None) };

        let tok = match ch {
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                    self.advance();
                }
                Token::Ident(self.src[start..self.pos].to_string())
            }
            c if c.is_ascii_digit() || c == '.' => {
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '.') {
                    self.advance();
                }
                Token::Number
            }
            '{' | '}' | '(' | ')' | '[' | ']' | ';' | ',' | '=' | '+' | '-' | '*' | '/' | '<'
            | '>' | '!' | '&' | '|' | '^' | '%' | '?' | ':' | '~' => {
                self.advance();
                Token::Punct(ch)
            }
            other => return Err(format!("ERROR: 0:{line}: '{other}' : syntax error")),
        };
        Ok(Some(Spanned { tok, line }))
    }
}

// ── Interface scan ────────────────────────────────────────────────────────

/// Interface of a single compiled stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StageInterface {
    /// Vertex inputs, in declaration order.
    pub attributes: Vec<Declared>,
    pub uniforms: Vec<Declared>,
    /// `varying`/`out` in vertex, `varying`/`in` in fragment.
    pub varyings: Vec<Declared>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Declared {
    pub name: String,
    pub used: bool,
}

const PRECISION: [&str; 3] = ["lowp", "mediump", "highp"];

/// Scans `source` for `stage`, returning a driver-style info log on failure.
pub(crate) fn scan(stage: ShaderStage, source: &str) -> Result<StageInterface, String> {
    let (tokens, last_line) = Lexer::new(source).tokenize()?;

    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut statement: Vec<&Spanned> = Vec::new();
    let mut declarations: Vec<(&str, Vec<String>, usize)> = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();
    let mut has_main = false;

    for spanned in &tokens {
        let in_body = stack.iter().any(|(open, _)| *open == '{');
        match &spanned.tok {
            Token::Punct(open @ ('{' | '(' | '[')) => {
                if *open == '{' && !in_body {
                    has_main |= is_main_header(&statement);
                    statement.clear();
                } else if !in_body {
                    statement.push(spanned);
                }
                stack.push((*open, spanned.line));
            }
            Token::Punct(close @ ('}' | ')' | ']')) => {
                let expected = match close {
                    '}' => '{',
                    ')' => '(',
                    _ => '[',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Err(format!("ERROR: 0:{}: '{close}' : syntax error", spanned.line)),
                }
                if !stack.iter().any(|(open, _)| *open == '{') && *close != '}' {
                    statement.push(spanned);
                }
            }
            Token::Punct(';') if !in_body && stack.is_empty() => {
                if let Some(decl) = declaration(&statement) {
                    declarations.push((decl.0, decl.1, spanned.line));
                }
                statement.clear();
            }
            Token::Ident(name) if in_body => {
                used.insert(name.as_str());
            }
            _ if !in_body => statement.push(spanned),
            _ => {}
        }
    }

    if let Some((open, line)) = stack.last() {
        return Err(format!(
            "ERROR: 0:{last_line}: '' : unexpected end of input (unclosed '{open}' from line {line})"
        ));
    }
    if !statement.is_empty() {
        return Err(format!("ERROR: 0:{last_line}: '' : syntax error, missing ';'"));
    }
    if !has_main {
        return Err(format!("ERROR: 0:{last_line}: '' : missing main() function"));
    }

    let mut iface = StageInterface::default();
    for (storage, names, line) in declarations {
        let bucket = match (stage, storage) {
            (_, "uniform") => &mut iface.uniforms,
            (ShaderStage::Vertex, "attribute" | "in") => &mut iface.attributes,
            (ShaderStage::Vertex, "varying" | "out") => &mut iface.varyings,
            (ShaderStage::Fragment, "varying" | "in") => &mut iface.varyings,
            (ShaderStage::Fragment, "attribute") => {
                return Err(format!(
                    "ERROR: 0:{line}: 'attribute' : supported in vertex shaders only"
                ));
            }
            _ => continue,
        };
        for name in names {
            if bucket.iter().any(|d| d.name == name) {
                return Err(format!("ERROR: 0:{line}: '{name}' : redefinition"));
            }
            let is_used = used.contains(name.as_str());
            bucket.push(Declared { name, used: is_used });
        }
    }
    Ok(iface)
}

fn is_main_header(statement: &[&Spanned]) -> bool {
    let idents: Vec<&str> = statement
        .iter()
        .filter_map(|s| match &s.tok {
            Token::Ident(i) => Some(i.as_str()),
            _ => None,
        })
        .collect();
    matches!(idents.as_slice(), ["void", "main"] | ["void", "main", "void"])
}

/// Splits `[layout(..)] storage [precision] type name[, name]*` into storage + names.
fn declaration<'t>(statement: &[&'t Spanned]) -> Option<(&'t str, Vec<String>)> {
    let mut idents = statement.iter().copied().filter_map(|s: &'t Spanned| match &s.tok {
        Token::Ident(i) => Some(i.as_str()),
        _ => None,
    });
    let storage = idents.find(|i| matches!(*i, "attribute" | "uniform" | "varying" | "in" | "out"))?;
    let mut rest = idents.filter(|i| !PRECISION.contains(i));
    let _ty = rest.next()?;
    let names: Vec<String> = rest.map(str::to_string).collect();
    if names.is_empty() { None } else { Some((storage, names)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "
        attribute vec3 a_position;
        attribute vec2 a_texCoord;
        attribute float a_unused;
        uniform mat4 u_projection;
        varying vec2 v_texCoord;
        void main() {
            v_texCoord = a_texCoord;
            gl_Position = u_projection * vec4(a_position, 1.0);
        }";

    const FS: &str = "
        precision mediump float;
        uniform sampler2D u_diffuse;
        varying vec2 v_texCoord;
        void main() {
            gl_FragColor = texture2D(u_diffuse, v_texCoord);
        }";

    fn names(decls: &[Declared]) -> Vec<(&str, bool)> {
        decls.iter().map(|d| (d.name.as_str(), d.used)).collect()
    }

    #[test]
    fn vertex_interface_tracks_usage() {
        let iface = scan(ShaderStage::Vertex, VS).unwrap();
        assert_eq!(
            names(&iface.attributes),
            vec![("a_position", true), ("a_texCoord", true), ("a_unused", false)]
        );
        assert_eq!(names(&iface.uniforms), vec![("u_projection", true)]);
        assert_eq!(names(&iface.varyings), vec![("v_texCoord", true)]);
    }

    #[test]
    fn fragment_precision_statement_is_not_a_declaration() {
        let iface = scan(ShaderStage::Fragment, FS).unwrap();
        assert!(iface.attributes.is_empty());
        assert_eq!(names(&iface.uniforms), vec![("u_diffuse", true)]);
        assert_eq!(names(&iface.varyings), vec![("v_texCoord", true)]);
    }

    #[test]
    fn stray_character_reports_line() {
        let src = "void main() {\n  gl_FragColor = vec4(1.0) @;\n}";
        let err = scan(ShaderStage::Fragment, src).unwrap_err();
        assert_eq!(err, "ERROR: 0:2: '@' : syntax error");
    }

    #[test]
    fn unbalanced_braces() {
        let err = scan(ShaderStage::Vertex, "void main() {\n gl_Position = vec4(0.0);\n").unwrap_err();
        assert!(err.contains("unexpected end of input"), "{err}");

        let err = scan(ShaderStage::Vertex, "void main() { }\n}").unwrap_err();
        assert!(err.contains("'}' : syntax error"), "{err}");
    }

    #[test]
    fn missing_main() {
        let err = scan(ShaderStage::Vertex, "attribute vec3 a_position;").unwrap_err();
        assert!(err.contains("missing main()"), "{err}");
    }

    #[test]
    fn missing_semicolon_at_top_level() {
        let err = scan(ShaderStage::Vertex, "void main() {}\nuniform vec4 u_color").unwrap_err();
        assert!(err.contains("missing ';'"), "{err}");
    }

    #[test]
    fn attribute_in_fragment_is_rejected() {
        let err = scan(ShaderStage::Fragment, "attribute vec3 a;\nvoid main() {}").unwrap_err();
        assert!(err.contains("vertex shaders only"), "{err}");
    }

    #[test]
    fn comments_and_directives_are_ignored() {
        let src = "#version 100\n// uniform vec4 u_ghost;\n/* uniform vec4 u_other; */\nuniform vec4 u_color;\nvoid main() { gl_FragColor = u_color; }";
        let iface = scan(ShaderStage::Fragment, src).unwrap();
        assert_eq!(names(&iface.uniforms), vec![("u_color", true)]);
    }
}
