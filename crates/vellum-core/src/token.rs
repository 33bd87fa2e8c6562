//! The lexical tokenizer. Turns a raw expression string into an ordered list
//! of [Token]s, each carrying its lexeme, byte offset, and [TokenCategory].
//! The pattern table is `regex`-driven; decoding a matched STRING lexeme's
//! escapes is a small `winnow` sub-grammar, the same combinator the
//! teacher's own quoted-literal parser is built on.

use regex::Regex;
use std::sync::LazyLock;
use winnow::{Parser, ascii::escaped, combinator::alt, token::take_till};

/// The lexical class assigned to a token. Orthogonal to [crate::ValueCategory
/// ](the runtime value category); this one drives grammar decisions in the
/// parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenCategory {
    Str,
    Space,
    Lp,
    Rp,
    Comma,
    AndOr,
    Compare,
    Sgqa,
    Word,
    Number,
    Not,
    Assign,
    BinaryOp,
    /// An opening quote with no matching close before the end of input.
    UnterminatedStr,
    Other,
}

/// A single lexical token: its text, where it started in the source, and
/// what kind of token it is
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub lexeme: String,
    pub offset: usize,
    pub category: TokenCategory,
}

impl Token {
    pub(crate) fn new(lexeme: &str, offset: usize, category: TokenCategory) -> Self {
        Self {
            lexeme: lexeme.to_owned(),
            offset,
            category,
        }
    }

    /// Case-insensitive lexeme comparison, used for keyword-form operators
    /// (`and`, `or`, `le`, `eq`, ...)
    pub fn lexeme_eq_ignore_case(&self, other: &str) -> bool {
        self.lexeme.eq_ignore_ascii_case(other)
    }
}

/// One entry in the lexical pattern table: a category plus the regex that
/// recognizes it, anchored to the start of the remaining input.
struct Pattern {
    category: TokenCategory,
    regex: &'static LazyLock<Regex>,
}

macro_rules! anchored {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(concat!("^(?:", $pattern, ")")).unwrap());
    };
}

// Quoted strings: double- or single-quoted, allowing an escaped matching
// quote inside (`\"` / `\'`). Escapes are decoded post-match.
anchored!(STRING_DOUBLE, r#""(?:\\"|[^"])*""#);
anchored!(STRING_SINGLE, r"'(?:\\'|[^'])*'");
anchored!(SPACE, r"\s+");
anchored!(INCDEC, r"\+\+|--");
anchored!(ASSIGN, r"\+=|-=|\*=|/=|=");
anchored!(COMPARE_SYMBOL, r"<=|<|>=|>|==|!=");
anchored!(COMPARE_WORD, r"(?i)\b(?:le|lt|ge|gt|eq|ne)\b");
anchored!(AND_OR_SYMBOL, r"&&|\|\|");
anchored!(AND_OR_WORD, r"(?i)\b(?:and|or)\b");
anchored!(SGQA, r"\d+X\d+X\d+(?:[A-Za-z0-9_]+)?(?:#[12])?");
anchored!(
    WORD,
    r"[A-Za-z][A-Za-z0-9_]*(?::[A-Za-z][A-Za-z0-9_]*)?(?:\.[A-Za-z][A-Za-z0-9_]*){0,4}"
);
anchored!(NUMBER, r"\d+\.\d+|\.\d+|\d+");
anchored!(BINARY_OP, r"[+\-*/]");
anchored!(LP, r"\(");
anchored!(RP, r"\)");
anchored!(COMMA, r",");
anchored!(NOT, r"!");
anchored!(OTHER, r".");

/// Patterns in priority order. Matching proceeds longest-match-first across
/// the whole table; ties (e.g. a 3-char `and` keyword vs. nothing else of
/// that length) are broken by this declaration order, so operator keywords
/// are listed ahead of the general [TokenCategory::Word] pattern.
static PATTERNS: &[Pattern] = &[
    Pattern {
        category: TokenCategory::Str,
        regex: &STRING_DOUBLE,
    },
    Pattern {
        category: TokenCategory::Str,
        regex: &STRING_SINGLE,
    },
    Pattern {
        category: TokenCategory::Space,
        regex: &SPACE,
    },
    Pattern {
        category: TokenCategory::Other,
        regex: &INCDEC,
    },
    Pattern {
        category: TokenCategory::Compare,
        regex: &COMPARE_SYMBOL,
    },
    Pattern {
        category: TokenCategory::Compare,
        regex: &COMPARE_WORD,
    },
    Pattern {
        category: TokenCategory::AndOr,
        regex: &AND_OR_SYMBOL,
    },
    Pattern {
        category: TokenCategory::AndOr,
        regex: &AND_OR_WORD,
    },
    Pattern {
        category: TokenCategory::Assign,
        regex: &ASSIGN,
    },
    Pattern {
        category: TokenCategory::Sgqa,
        regex: &SGQA,
    },
    Pattern {
        category: TokenCategory::Word,
        regex: &WORD,
    },
    Pattern {
        category: TokenCategory::Number,
        regex: &NUMBER,
    },
    Pattern {
        category: TokenCategory::BinaryOp,
        regex: &BINARY_OP,
    },
    Pattern {
        category: TokenCategory::Lp,
        regex: &LP,
    },
    Pattern {
        category: TokenCategory::Rp,
        regex: &RP,
    },
    Pattern {
        category: TokenCategory::Comma,
        regex: &COMMA,
    },
    Pattern {
        category: TokenCategory::Not,
        regex: &NOT,
    },
    // Fallback: always matches exactly one char, so a syntax error can still
    // point at the offending position
    Pattern {
        category: TokenCategory::Other,
        regex: &OTHER,
    },
];

/// Tokenize `source` into an ordered list of tokens, including [TokenCategory
/// ::Space] tokens. Callers that only care about the grammar should filter
/// those out; they're kept here so offsets stay exact and so lossless
/// re-tokenization is possible.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    while offset < source.len() {
        let remaining = &source[offset..];
        // Longest match wins; on a length tie the earlier pattern in the
        // table wins, which is why operator keywords are declared ahead of
        // the general WORD pattern above. `Iterator::max_by_key` keeps the
        // *last* element on ties, so ties are broken manually here instead.
        let mut best: Option<(TokenCategory, &str)> = None;
        for pattern in PATTERNS {
            if let Some(m) = pattern.regex.find(remaining) {
                debug_assert_eq!(m.start(), 0, "patterns are anchored");
                let is_longer = match best {
                    Some((_, lexeme)) => m.len() > lexeme.len(),
                    None => true,
                };
                if is_longer {
                    best = Some((pattern.category, m.as_str()));
                }
            }
        }

        // The OTHER fallback always matches a single char, so `best` is
        // never `None`
        let (category, matched) = best.expect("OTHER pattern always matches");
        // A quote character winning as the single-char OTHER fallback means
        // the STRING patterns above it in the table failed to match, i.e.
        // there is no closing quote before the end of input.
        let category = if category == TokenCategory::Other
            && (matched == "\"" || matched == "'")
        {
            TokenCategory::UnterminatedStr
        } else {
            category
        };
        let lexeme = if category == TokenCategory::Str {
            decode_string_lexeme(matched)
        } else {
            matched.to_owned()
        };
        tokens.push(Token::new(&lexeme, offset, category));
        offset += matched.len();
    }
    tokens
}

/// Strip the surrounding quotes from a matched string lexeme and decode
/// standard backslash escapes (`\\`, `\n`, `\r`, `\t`, and the escaped quote
/// character itself). Built on `winnow::ascii::escaped`, the same combinator
/// the teacher's own quoted-literal parser uses to decode escapes in a
/// single pass.
fn decode_string_lexeme(matched: &str) -> String {
    let quote = matched.chars().next().expect("quoted strings are non-empty");
    let inner = &matched[1..matched.len() - 1];
    escaped(
        take_till(1.., |c: char| c == '\\'),
        '\\',
        alt((
            "\\".value('\\'),
            "n".value('\n'),
            "r".value('\r'),
            "t".value('\t'),
            quote,
        )),
    )
    .parse(inner)
    .unwrap_or_else(|_| inner.to_owned())
}

/// Remove [TokenCategory::Space] tokens, the only post-processing step the
/// driver applies before handing tokens to the parser
pub fn strip_spaces(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|token| token.category != TokenCategory::Space)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn categories(source: &str) -> Vec<TokenCategory> {
        strip_spaces(tokenize(source))
            .into_iter()
            .map(|t| t.category)
            .collect()
    }

    #[rstest]
    #[case("1 + 2", vec![TokenCategory::Number, TokenCategory::BinaryOp, TokenCategory::Number])]
    #[case(
        "a and b",
        vec![TokenCategory::Word, TokenCategory::AndOr, TokenCategory::Word]
    )]
    #[case(
        "a && b || c",
        vec![
            TokenCategory::Word,
            TokenCategory::AndOr,
            TokenCategory::Word,
            TokenCategory::AndOr,
            TokenCategory::Word,
        ]
    )]
    #[case("x += 1", vec![TokenCategory::Word, TokenCategory::Assign, TokenCategory::Number])]
    #[case("++a", vec![TokenCategory::Other, TokenCategory::Word])]
    #[case(
        "12X34X56 * 12X3X5lab1_ber",
        vec![TokenCategory::Sgqa, TokenCategory::BinaryOp, TokenCategory::Sgqa]
    )]
    #[case(
        "f(1, 'hi')",
        vec![
            TokenCategory::Word,
            TokenCategory::Lp,
            TokenCategory::Number,
            TokenCategory::Comma,
            TokenCategory::Str,
            TokenCategory::Rp,
        ]
    )]
    fn test_tokenize_categories(
        #[case] source: &str,
        #[case] expected: Vec<TokenCategory>,
    ) {
        assert_eq!(categories(source), expected);
    }

    #[test]
    fn test_android_is_not_and_or() {
        // "android" must tokenize as a single WORD, not AND_OR + WORD, since
        // longest-match wins over the shorter keyword match
        assert_eq!(categories("android"), vec![TokenCategory::Word]);
    }

    #[test]
    fn test_string_escape_decoding() {
        let tokens = strip_spaces(tokenize(r#""hi \"there\"""#));
        assert_eq!(tokens[0].lexeme, "hi \"there\"");
        assert_eq!(tokens[0].category, TokenCategory::Str);
    }

    #[test]
    fn test_unterminated_double_quote_is_flagged() {
        let tokens = strip_spaces(tokenize("1 + \"hello"));
        let quote = tokens
            .iter()
            .find(|t| t.category == TokenCategory::UnterminatedStr)
            .expect("opening quote should be flagged");
        assert_eq!(quote.offset, 4);
    }

    #[test]
    fn test_unterminated_single_quote_is_flagged() {
        let tokens = strip_spaces(tokenize("'no closing quote"));
        assert_eq!(tokens[0].category, TokenCategory::UnterminatedStr);
        assert_eq!(tokens[0].offset, 0);
    }

    #[test]
    fn test_offsets_are_lossless_for_non_string_tokens() {
        let source = "one + two * 3";
        for token in strip_spaces(tokenize(source)) {
            if token.category != TokenCategory::Str {
                let end = token.offset + token.lexeme.len();
                assert_eq!(
                    &source[token.offset..end],
                    token.lexeme,
                    "token {token:?} did not round-trip"
                );
            }
        }
    }

    #[test]
    fn test_other_token_for_unsupported_char() {
        let tokens = strip_spaces(tokenize("a @ b"));
        assert_eq!(tokens[1].category, TokenCategory::Other);
        assert_eq!(tokens[1].offset, 2);
    }

    proptest::proptest! {
        #[test]
        fn test_tokenize_never_panics(source in "\\PC*") {
            let _ = tokenize(&source);
        }

        /// Generalizes [test_offsets_are_lossless_for_non_string_tokens] to
        /// arbitrary input: every non-string token's lexeme is an exact
        /// slice of the source at its recorded offset.
        #[test]
        fn test_tokenize_offsets_lossless_property(source in "\\PC*") {
            for token in tokenize(&source) {
                if !matches!(
                    token.category,
                    TokenCategory::Str | TokenCategory::UnterminatedStr
                ) {
                    let end = token.offset + token.lexeme.len();
                    proptest::prop_assert!(end <= source.len());
                    proptest::prop_assert_eq!(
                        &source[token.offset..end],
                        token.lexeme.as_str()
                    );
                }
            }
        }
    }
}
