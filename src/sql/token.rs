//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings. Bound parameters travel inside the stream
//! as [`Token::Param`], so placeholder numbering is assigned in a single
//! left-to-right pass at render time and always matches argument order.

use crate::model::Value;

use super::dialect::SqlDialect;

/// SQL Token - every element the compiler emits.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    As,
    On,
    Join,
    Left,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,
    In,
    Not,
    Like,
    IsNull,
    IsNotNull,
    Distinct,
    Array,

    // === DML Keywords ===
    Insert,
    Ignore,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Returning,
    Conflict,
    Do,
    Nothing,
    DuplicateKey,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,
    LBracket,
    RBracket,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    /// PostgreSQL array containment `@>`
    Contains,
    /// PostgreSQL text-search match `@@`
    Matches,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Simple identifier (table, column, alias)
    Ident(String),
    /// Qualified identifier: alias.column
    QualifiedIdent {
        qualifier: Option<String>,
        name: String,
    },
    /// Integer literal
    LitInt(i64),
    /// Bound parameter, rendered as a dialect placeholder
    Param(Value),
    /// Function name, rendered upper-cased
    FunctionName(String),

    // === Escape Hatch ===
    /// Raw SQL passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Raw SQL is not sanitized.
    /// The compiler only routes aggregate expressions through it after
    /// checking them against a restricted character set.
    Raw(String),
}

/// Options that affect how identifiers are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Quote identifiers with the dialect's quoting style.
    pub quote_identifiers: bool,
}

/// SQL text plus positional arguments, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedSql {
    pub text: String,
    pub args: Vec<Value>,
}

impl Token {
    /// Serialize this token to a string for the given dialect.
    ///
    /// Parameters serialize to the first placeholder; use
    /// [`TokenStream::render`] to number them.
    pub fn serialize(&self, dialect: &dyn SqlDialect, opts: RenderOptions) -> String {
        match self {
            // Keywords
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::Join => "JOIN".into(),
            Token::Left => "LEFT".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::Limit => "LIMIT".into(),
            Token::Offset => "OFFSET".into(),
            Token::In => "IN".into(),
            Token::Not => "NOT".into(),
            Token::Like => "LIKE".into(),
            Token::IsNull => "IS NULL".into(),
            Token::IsNotNull => "IS NOT NULL".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::Array => "ARRAY".into(),

            // DML keywords
            Token::Insert => "INSERT".into(),
            Token::Ignore => "IGNORE".into(),
            Token::Into => "INTO".into(),
            Token::Values => "VALUES".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),
            Token::Returning => "RETURNING".into(),
            Token::Conflict => "CONFLICT".into(),
            Token::Do => "DO".into(),
            Token::Nothing => "NOTHING".into(),
            Token::DuplicateKey => "DUPLICATE KEY".into(),

            // Punctuation
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),

            // Operators
            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),
            Token::Contains => "@>".into(),
            Token::Matches => "@@".into(),

            Token::Space => " ".into(),

            // Dynamic - dialect-specific formatting
            Token::Ident(name) => render_ident(dialect, opts, name),
            Token::QualifiedIdent { qualifier, name } => match qualifier {
                Some(q) => format!(
                    "{}.{}",
                    render_ident(dialect, opts, q),
                    render_ident(dialect, opts, name)
                ),
                None => render_ident(dialect, opts, name),
            },
            Token::LitInt(n) => n.to_string(),
            Token::Param(_) => dialect.placeholder(1),
            Token::FunctionName(name) => name.to_uppercase(),

            // Escape hatch
            Token::Raw(s) => s.clone(),
        }
    }
}

fn render_ident(dialect: &dyn SqlDialect, opts: RenderOptions, name: &str) -> String {
    if opts.quote_identifiers {
        dialect.quote_identifier(name)
    } else {
        name.to_string()
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of bound parameters in the stream.
    pub fn param_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, Token::Param(_)))
            .count()
    }

    /// Render to SQL text, numbering placeholders with one running counter
    /// and collecting their values in the same order.
    pub fn render(&self, dialect: &dyn SqlDialect, opts: RenderOptions) -> RenderedSql {
        let mut text = String::new();
        let mut args = Vec::with_capacity(self.param_count());
        for token in &self.tokens {
            match token {
                Token::Param(value) => {
                    args.push(value.clone());
                    text.push_str(&dialect.placeholder(args.len()));
                }
                other => text.push_str(&other.serialize(dialect, opts)),
            }
        }
        RenderedSql { text, args }
    }

    /// Serialize all tokens to a SQL string, discarding arguments.
    pub fn serialize(&self, dialect: &dyn SqlDialect) -> String {
        self.render(dialect, RenderOptions::default()).text
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }

    /// Append `items` separated by `, `.
    pub fn comma_separated<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a TokenStream>,
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.comma().space();
            }
            self.append(item);
        }
        self
    }
}
