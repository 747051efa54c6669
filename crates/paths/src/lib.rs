//! Крейт pjs-paths компилирует текстовые выражения путей и сопоставляет их
//! с деревьями JSON.
//!
//! Выражение пути — это последовательность токенов, разделённых `/`. Каждый
//! токен имеет вид `KEY` или `KEY=VALUE`, где `KEY` и `VALUE` — шаблоны:
//! `*` соответствует любому одиночному шагу, `**` рекурсивно спускается по
//! поддереву, `..` поднимается к родителю, `^pat` инвертирует шаблон,
//! `N..M` — включительный целочисленный диапазон, `a|b` и `(…)` передаются
//! движку регулярных выражений как есть, `\x` экранирует символ.
//!
//! Результат сопоставления — упорядоченный, свободный от дубликатов набор
//! *путей совпадений*: последовательностей пар ключ/значение от корня
//! документа до выбранного узла. Набор также умеет представлять себя через
//! протокол итерации pjs-value, чтобы кодировщик отобразил объединение
//! совпавших поддеревьев как обычный JSON.
//!
//! # Пример
//!
//! ```
//! use pjs_paths::PathExpr;
//! use pjs_value::Value;
//!
//! let doc: Value = serde_json::json!({
//!     "address": {"city": "Cupertino", "pos": ["Apple", "HQ"]},
//!     "age": 30,
//! }).into();
//! let path = PathExpr::new("address/**=Apple/..")?;
//! let set = path.matches(&doc);
//! assert_eq!(1, set.len());
//! # Ok::<(), pjs_paths::Error>(())
//! ```

#![deny(missing_docs)]

use std::fmt;

use regex_automata::meta::Regex;

pub use crate::walk::{DataNode, MatchPath, MatchSet};

use crate::{matcher::PathToken, parser::parse};

mod matcher;
mod parser;
mod tree;
mod walk;

/// Скомпилированное выражение пути.
///
/// Компилируется один раз на аргумент пользователя и переиспользуется для
/// каждого входного документа.
#[derive(Clone, Debug)]
pub struct PathExpr {
    raw: String,
    tokens: Vec<PathToken>,
}

impl PathExpr {
    /// Компилирует текстовое выражение пути.
    pub fn new(path: &str) -> Result<PathExpr, Error> {
        let tokens = parse(path)?;
        log::debug!("compiled path {:?} into {} token(s)", path, tokens.len());
        Ok(PathExpr { raw: path.to_string(), tokens })
    }

    /// Исходный текст выражения.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Сопоставляет выражение с документом и возвращает упорядоченный
    /// набор путей совпадений.
    pub fn matches(&self, doc: &pjs_value::Value) -> MatchSet {
        walk::find_matches(&self.tokens, doc)
    }

    /// True тогда и только тогда, когда набор совпадений непуст.
    pub fn is_match(&self, doc: &pjs_value::Value) -> bool {
        !self.matches(doc).is_empty()
    }

    pub(crate) fn tokens(&self) -> &[PathToken] {
        &self.tokens
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl std::str::FromStr for PathExpr {
    type Err = Error;

    fn from_str(path: &str) -> Result<PathExpr, Error> {
        PathExpr::new(path)
    }
}

/// Ошибка компиляции выражения пути.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }

    /// Вид ошибки.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// Вид ошибки компиляции выражения пути.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Пустое выражение.
    Empty,
    /// Более одного `=` в одном токене.
    MultipleEq,
    /// `..` в позиции значения.
    ParentInValue,
    /// `**` в позиции значения.
    RecursiveInValue,
    /// Шаблон не скомпилировался в регулярное выражение.
    Regex(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::Empty => f.write_str("Paths can't be empty"),
            ErrorKind::MultipleEq => f.write_str(
                "Multiple '=' invalid. Use \\= to match character.",
            ),
            ErrorKind::ParentInValue => f.write_str(
                "Invalid path value '..'. Use '\\.\\.' to match characters.",
            ),
            ErrorKind::RecursiveInValue => f.write_str(
                "Invalid path value '**'. Use '\\*\\*' to match characters.",
            ),
            ErrorKind::Regex(ref err) => {
                write!(f, "Invalid path pattern: {}", err)
            }
        }
    }
}

/// Строит регулярное выражение так же, как это делает наш компилятор
/// шаблонов: без Unicode-классов, с `.`-соответствием переводу строки.
pub(crate) fn new_regex(pat: &str) -> Result<Regex, Error> {
    let syntax = regex_automata::util::syntax::Config::new()
        .utf8(false)
        .dot_matches_new_line(true);
    let config = Regex::config()
        .utf8_empty(false)
        .nfa_size_limit(Some(10 * (1 << 20)))
        .hybrid_cache_capacity(10 * (1 << 20));
    Regex::builder().syntax(syntax).configure(config).build(pat).map_err(
        |err| Error::new(ErrorKind::Regex(err.to_string())),
    )
}
