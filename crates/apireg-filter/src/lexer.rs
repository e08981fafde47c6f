use crate::error::{FilterError, FilterResult};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    /// Unsigned; a leading `-` is folded in by the parser.
    Int(u64),
    True,
    False,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Minus,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn syntax(pos: usize, message: impl Into<String>) -> FilterError {
    FilterError::Syntax {
        position: pos,
        message: message.into(),
    }
}

pub(crate) fn tokenize(input: &str) -> FilterResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).map(|(_, c)| *c);
        let (token, width) = match (c, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Not, 1),
            ('-', _) => (Token::Minus, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('"' | '\'', _) => {
                let (s, end) = lex_string(&chars, i)?;
                tokens.push(Spanned {
                    token: Token::Str(s),
                    pos,
                });
                i = end;
                continue;
            }
            (c, _) if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let n = text
                    .parse::<u64>()
                    .map_err(|_| syntax(pos, format!("integer literal out of range: {text}")))?;
                tokens.push(Spanned {
                    token: Token::Int(n),
                    pos,
                });
                continue;
            }
            (c, _) if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().map(|(_, c)| c).collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "in" => Token::In,
                    _ => Token::Ident(word),
                };
                tokens.push(Spanned { token, pos });
                continue;
            }
            (c, _) => return Err(syntax(pos, format!("unexpected character {c:?}"))),
        };
        tokens.push(Spanned { token, pos });
        i += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: input.len(),
    });
    Ok(tokens)
}

/// Lex a quoted string starting at `chars[start]`. Returns the unescaped
/// contents and the index just past the closing quote.
fn lex_string(chars: &[(usize, char)], start: usize) -> FilterResult<(String, usize)> {
    let (pos, quote) = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i].1 {
            c if c == quote => return Ok((out, i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .map(|(_, c)| *c)
                    .ok_or_else(|| syntax(chars[i].0, "unterminated escape"))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' | '"' | '\'' => escaped,
                    other => return Err(syntax(chars[i].0, format!("unknown escape \\{other}"))),
                });
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(syntax(pos, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn operators_and_literals() {
        assert_eq!(
            kinds(r#"a >= 10 && b != "x""#),
            vec![
                Token::Ident("a".into()),
                Token::Ge,
                Token::Int(10),
                Token::And,
                Token::Ident("b".into()),
                Token::Ne,
                Token::Str("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(
            kinds("true false in"),
            vec![Token::True, Token::False, Token::In, Token::Eof]
        );
    }

    #[test]
    fn single_quotes_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\"b""#),
            vec![Token::Str("it's".into()), Token::Str("a\"b".into()), Token::Eof]
        );
    }

    #[test]
    fn unterminated_string() {
        assert!(matches!(
            tokenize("\"open"),
            Err(FilterError::Syntax { position: 0, .. })
        ));
    }

    #[test]
    fn unexpected_character() {
        assert!(matches!(
            tokenize("a # b"),
            Err(FilterError::Syntax { position: 2, .. })
        ));
    }
}
