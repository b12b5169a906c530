//! Tokens, keyword recognition, and XML tag recognition.
//!
//! The keyword table is the contract both text front ends share: a string
//! maps to a token plus a [`Syntax`] mask saying in which grammar variants
//! the word is reserved. Callers must intersect the mask with the active
//! variant before treating a hit as a keyword — `do` is a keyword in the new
//! syntax and a plain identifier in the old one, while `trans` is reserved
//! in both.
//!
//! Builtin type names (`int`, `bool`, `chan`, `clock`, `void`, `scalar`,
//! `meta`) are deliberately absent: they are contextual identifiers that
//! only the type grammar gives meaning to.

use bitflags::bitflags;

bitflags! {
    /// Grammar variants a keyword is reserved in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Syntax: u8 {
        const OLD = 1;
        const NEW = 2;
        const PROPERTY = 4;
    }
}

/// Tokens produced by the XTA lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Nat(i32),

    // Keywords (subject to the syntax mask).
    Assign,
    And,
    Break,
    Broadcast,
    Case,
    Commit,
    Const,
    Continue,
    Deadlock,
    Default,
    Do,
    Else,
    False,
    For,
    Guard,
    If,
    Imply,
    Init,
    Not,
    Or,
    Process,
    Quit,
    Return,
    State,
    Struct,
    Switch,
    Sync,
    System,
    Trans,
    True,
    Typedef,
    Urgent,
    While,

    // Punctuation.
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Question,
    /// `'`, the clock rate mark.
    Apostrophe,
    /// `->`
    Arrow,
    /// `-u->`, an uncontrollable edge.
    ArrowU,

    // Operators.
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `<?`
    MinOp,
    /// `>?`
    MaxOp,
    Lt,
    Le,
    EqEq,
    Ne,
    Ge,
    Gt,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Inc,
    Dec,
    Asgn,
    /// `:=`, the old-syntax assignment.
    AsgnColon,
    AsgnPlus,
    AsgnMinus,
    AsgnMult,
    AsgnDiv,
    AsgnMod,
    AsgnOr,
    AsgnAnd,
    AsgnXor,
    AsgnShl,
    AsgnShr,

    Eof,
}

/// A keyword hit: the token plus the variants it is reserved in.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub token: Tok,
    pub syntax: Syntax,
}

/// Looks up an identifier in the keyword table.
///
/// Returns `None` for anything that is not a keyword in *any* variant.
/// The caller still has to check the mask against the active variant.
pub fn keyword(ident: &str) -> Option<Keyword> {
    let both = Syntax::OLD | Syntax::NEW;
    let (token, syntax) = match ident {
        "assign" => (Tok::Assign, both),
        "and" => (Tok::And, Syntax::PROPERTY),
        "break" => (Tok::Break, Syntax::NEW),
        "broadcast" => (Tok::Broadcast, both),
        "case" => (Tok::Case, Syntax::NEW),
        "commit" => (Tok::Commit, both),
        "const" => (Tok::Const, both),
        "continue" => (Tok::Continue, Syntax::NEW),
        "deadlock" => (Tok::Deadlock, Syntax::PROPERTY),
        "default" => (Tok::Default, Syntax::NEW),
        "do" => (Tok::Do, Syntax::NEW),
        "else" => (Tok::Else, Syntax::NEW),
        "false" => (Tok::False, Syntax::NEW | Syntax::PROPERTY),
        "for" => (Tok::For, Syntax::NEW),
        "guard" => (Tok::Guard, both),
        "if" => (Tok::If, Syntax::NEW),
        "imply" => (Tok::Imply, Syntax::PROPERTY),
        "init" => (Tok::Init, both),
        "not" => (Tok::Not, Syntax::PROPERTY),
        "or" => (Tok::Or, Syntax::PROPERTY),
        "process" => (Tok::Process, both),
        "quit" => (Tok::Quit, Syntax::PROPERTY),
        "return" => (Tok::Return, Syntax::NEW),
        "state" => (Tok::State, both),
        "struct" => (Tok::Struct, Syntax::NEW),
        "switch" => (Tok::Switch, Syntax::NEW),
        "sync" => (Tok::Sync, both),
        "system" => (Tok::System, both),
        "trans" => (Tok::Trans, both),
        "true" => (Tok::True, Syntax::NEW | Syntax::PROPERTY),
        "typedef" => (Tok::Typedef, Syntax::NEW),
        "urgent" => (Tok::Urgent, both),
        "while" => (Tok::While, Syntax::NEW),
        _ => return None,
    };
    Some(Keyword { token, syntax })
}

/// The XML document vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Nta,
    Imports,
    Declaration,
    Template,
    Instantiation,
    System,
    Name,
    Parameter,
    Location,
    Init,
    Transition,
    Urgent,
    Committed,
    Source,
    Target,
    Label,
    Nail,
}

impl Tag {
    /// The tag's element name as written in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Nta => "nta",
            Tag::Imports => "imports",
            Tag::Declaration => "declaration",
            Tag::Template => "template",
            Tag::Instantiation => "instantiation",
            Tag::System => "system",
            Tag::Name => "name",
            Tag::Parameter => "parameter",
            Tag::Location => "location",
            Tag::Init => "init",
            Tag::Transition => "transition",
            Tag::Urgent => "urgent",
            Tag::Committed => "committed",
            Tag::Source => "source",
            Tag::Target => "target",
            Tag::Label => "label",
            Tag::Nail => "nail",
        }
    }
}

/// Looks up an XML element name; unknown names return `None`.
pub fn tag(name: &str) -> Option<Tag> {
    let tag = match name {
        "nta" => Tag::Nta,
        "imports" => Tag::Imports,
        "declaration" => Tag::Declaration,
        "template" => Tag::Template,
        "instantiation" => Tag::Instantiation,
        "system" => Tag::System,
        "name" => Tag::Name,
        "parameter" => Tag::Parameter,
        "location" => Tag::Location,
        "init" => Tag::Init,
        "transition" => Tag::Transition,
        "urgent" => Tag::Urgent,
        "committed" => Tag::Committed,
        "source" => Tag::Source,
        "target" => Tag::Target,
        "label" => Tag::Label,
        "nail" => Tag::Nail,
        _ => return None,
    };
    Some(tag)
}
