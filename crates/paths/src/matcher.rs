use regex_automata::meta::Regex;

use pjs_value::Value;

/// Один токен скомпилированного пути: обязательный сопоставитель ключа и
/// необязательный сопоставитель значения.
#[derive(Clone, Debug)]
pub(crate) struct PathToken {
    pub(crate) key: Matcher,
    pub(crate) value: Option<Matcher>,
}

impl PathToken {
    pub(crate) fn new(key: Matcher, value: Option<Matcher>) -> PathToken {
        PathToken { key, value }
    }

    /// Шаг (ключ, значение) проходит токен, когда ключ совпадает и либо
    /// сопоставителя значения нет, либо он тоже совпадает.
    pub(crate) fn matches(&self, key: &Value, value: &Value) -> bool {
        self.key.matches(key)
            && self.value.as_ref().is_none_or(|m| m.matches(value))
    }

    /// Голый `**`: рекурсивный `*` без собственного сопоставителя значения.
    /// Только такой токен может быть поглощён соседом справа.
    pub(crate) fn is_bare_recursive(&self) -> bool {
        self.key.kind == MatcherKind::Any
            && self.key.recursive
            && !self.key.inverse
            && self.value.is_none()
    }
}

/// Вид сопоставителя.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MatcherKind {
    /// Заякоренное регулярное выражение по строковому представлению.
    Str,
    /// Целое с регулярным запасным вариантом.
    Int,
    /// Булево с регулярным запасным вариантом.
    Bool,
    /// Включительный целочисленный диапазон.
    Range,
    /// `..`: структурный подъём, как ключ не совпадает никогда.
    Parent,
    /// `*`: совпадает всегда.
    Any,
    /// `null`: совпадает только со значением `Null`.
    Nil,
}

/// Сопоставитель одного литерала ключа или значения.
#[derive(Clone, Debug)]
pub(crate) struct Matcher {
    kind: MatcherKind,
    regex: Option<Regex>,
    int_value: i64,
    bool_value: bool,
    range: (i64, i64),
    recursive: bool,
    inverse: bool,
    exclusive: bool,
}

impl Matcher {
    fn with_kind(kind: MatcherKind) -> Matcher {
        Matcher {
            kind,
            regex: None,
            int_value: 0,
            bool_value: false,
            range: (0, 0),
            recursive: false,
            inverse: false,
            exclusive: false,
        }
    }

    pub(crate) fn string(re: Regex) -> Matcher {
        Matcher { regex: Some(re), ..Matcher::with_kind(MatcherKind::Str) }
    }

    pub(crate) fn int(n: i64, re: Regex) -> Matcher {
        Matcher {
            regex: Some(re),
            int_value: n,
            ..Matcher::with_kind(MatcherKind::Int)
        }
    }

    pub(crate) fn bool(b: bool, re: Regex) -> Matcher {
        Matcher {
            regex: Some(re),
            bool_value: b,
            ..Matcher::with_kind(MatcherKind::Bool)
        }
    }

    pub(crate) fn range(lo: i64, hi: i64) -> Matcher {
        Matcher { range: (lo, hi), ..Matcher::with_kind(MatcherKind::Range) }
    }

    pub(crate) fn parent() -> Matcher {
        Matcher::with_kind(MatcherKind::Parent)
    }

    pub(crate) fn any() -> Matcher {
        Matcher::with_kind(MatcherKind::Any)
    }

    pub(crate) fn recursive_any() -> Matcher {
        Matcher { recursive: true, ..Matcher::with_kind(MatcherKind::Any) }
    }

    pub(crate) fn nil() -> Matcher {
        Matcher::with_kind(MatcherKind::Nil)
    }

    pub(crate) fn inverse(mut self, yes: bool) -> Matcher {
        self.inverse = yes;
        self
    }

    pub(crate) fn set_recursive(&mut self) {
        self.recursive = true;
    }

    pub(crate) fn set_exclusive(&mut self) {
        self.exclusive = true;
    }

    pub(crate) fn kind(&self) -> MatcherKind {
        self.kind
    }

    pub(crate) fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub(crate) fn is_inverse(&self) -> bool {
        self.inverse
    }

    pub(crate) fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Инверсный сопоставитель — это отрицание того же сопоставителя без
    /// инверсии.
    pub(crate) fn matches(&self, v: &Value) -> bool {
        let hit = self.matches_plain(v);
        if self.inverse { !hit } else { hit }
    }

    fn matches_plain(&self, v: &Value) -> bool {
        match self.kind {
            MatcherKind::Any => true,
            MatcherKind::Parent => false,
            MatcherKind::Nil => matches!(*v, Value::Null),
            MatcherKind::Str => self.regex_match(v),
            // Нецелевые типы уходят в регулярный запасной вариант, чтобы
            // `"2"` совпадало с целочисленным шаблоном, а `"true"` — с
            // булевым.
            MatcherKind::Int => match *v {
                Value::Int(n) => n == self.int_value,
                _ => self.regex_match(v),
            },
            MatcherKind::Bool => match *v {
                Value::Bool(b) => b == self.bool_value,
                _ => self.regex_match(v),
            },
            MatcherKind::Range => match *v {
                Value::Int(n) => self.range.0 <= n && n <= self.range.1,
                _ => false,
            },
        }
    }

    fn regex_match(&self, v: &Value) -> bool {
        let rendered = v.to_string();
        self.regex.as_ref().is_some_and(|re| re.is_match(rendered.as_str()))
    }
}
