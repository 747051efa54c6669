use crate::{
    Error, ErrorKind,
    matcher::{Matcher, MatcherKind, PathToken},
};

/// Разбирает выражение пути в последовательность токенов.
///
/// Разбор идёт в два прохода: сначала текст режется на литералы ключей и
/// значений (с учётом экранирования), каждый литерал компилируется в
/// сопоставитель; затем пост-проходы навешивают флаги, зависящие от
/// соседей: поглощение голого `**` последующим `*`/`..` и исключающий
/// режим для `^…`, за которым идёт `..`.
pub(crate) fn parse(path: &str) -> Result<Vec<PathToken>, Error> {
    if path.is_empty() {
        return Err(Error::new(ErrorKind::Empty));
    }

    let mut tokens: Vec<PathToken> = vec![];
    let mut key: Option<Matcher> = None;
    let mut segs: Vec<Seg> = vec![];
    let mut esc = false;

    for ch in path.chars() {
        if esc {
            segs.push(Seg::Esc(ch));
            esc = false;
            continue;
        }
        match ch {
            '\\' => esc = true,
            '/' => {
                // Пустой сегмент ключа («//», ведущий или замыкающий `/`)
                // токена не образует.
                if key.is_some() || !segs.is_empty() {
                    let in_value = key.is_some();
                    let matcher = compile(&mut segs, in_value)?;
                    let (k, v) = match key.take() {
                        Some(k) => (k, Some(matcher)),
                        None => (matcher, None),
                    };
                    tokens.push(PathToken::new(k, v));
                }
            }
            '=' => {
                if key.is_some() {
                    return Err(Error::new(ErrorKind::MultipleEq));
                }
                key = Some(compile(&mut segs, false)?);
            }
            _ => segs.push(Seg::from_char(ch)),
        }
    }
    // Завершающий литерал закрывается так же, как на `/`.
    if key.is_some() || !segs.is_empty() {
        let in_value = key.is_some();
        let matcher = compile(&mut segs, in_value)?;
        let (k, v) = match key.take() {
            Some(k) => (k, Some(matcher)),
            None => (matcher, None),
        };
        tokens.push(PathToken::new(k, v));
    }

    merge_recursive(&mut tokens);
    mark_exclusive(&mut tokens);

    Ok(tokens)
}

/// Один разобранный символ литерала.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Seg {
    /// Обычный символ; кавычится при трансляции в регулярное выражение
    /// и участвует в распознавании специальных форм.
    Lit(char),
    /// Экранированный символ; кавычится, но специальные формы не образует
    /// (`\.\.` — это литеральные точки, а не родитель).
    Esc(char),
    /// `*` → `.*`.
    Star,
    /// `?` → `.`.
    Qmark,
    /// `(`, `)`, `|` — сквозная передача движку регулярных выражений.
    Raw(char),
}

impl Seg {
    fn from_char(ch: char) -> Seg {
        match ch {
            '*' => Seg::Star,
            '?' => Seg::Qmark,
            '(' | ')' | '|' => Seg::Raw(ch),
            _ => Seg::Lit(ch),
        }
    }
}

/// Компилирует накопленный литерал в сопоставитель и очищает накопитель.
fn compile(segs: &mut Vec<Seg>, in_value: bool) -> Result<Matcher, Error> {
    let mut segs = std::mem::take(segs);

    // Ведущий неэкранированный `^` — инверсия.
    let inverse = matches!(segs.first(), Some(&Seg::Lit('^')));
    if inverse {
        segs.remove(0);
    }

    // Специальные формы распознаются только по неэкранированному тексту.
    if segs == [Seg::Lit('.'), Seg::Lit('.')] {
        if in_value {
            return Err(Error::new(ErrorKind::ParentInValue));
        }
        return Ok(Matcher::parent());
    }
    if segs == [Seg::Star, Seg::Star] {
        if in_value {
            return Err(Error::new(ErrorKind::RecursiveInValue));
        }
        return Ok(Matcher::recursive_any().inverse(inverse));
    }
    if segs == [Seg::Star] {
        return Ok(Matcher::any().inverse(inverse));
    }

    if let Some(plain) = plain_text(&segs) {
        if let Some((lo, hi)) = parse_range(&plain) {
            return Ok(Matcher::range(lo, hi).inverse(inverse));
        }
        if let Ok(n) = plain.parse::<i64>() {
            // Голое целое хранится и как целочисленный сопоставитель, и
            // как регулярный запасной вариант, чтобы `2` совпадало и с
            // `2`, и с `"2"`.
            let re = crate::new_regex(&anchored(&segs))?;
            return Ok(Matcher::int(n, re).inverse(inverse));
        }
        match plain.as_str() {
            "true" => {
                let re = crate::new_regex(&anchored(&segs))?;
                return Ok(Matcher::bool(true, re).inverse(inverse));
            }
            "false" => {
                let re = crate::new_regex(&anchored(&segs))?;
                return Ok(Matcher::bool(false, re).inverse(inverse));
            }
            // `null` осмыслен только в позиции значения; как ключ это
            // обычная строка.
            "null" if in_value => {
                return Ok(Matcher::nil().inverse(inverse));
            }
            _ => {}
        }
    }

    let re = crate::new_regex(&anchored(&segs))?;
    Ok(Matcher::string(re).inverse(inverse))
}

/// Литерал без глобов и сквозных символов, как простой текст.
fn plain_text(segs: &[Seg]) -> Option<String> {
    let mut out = String::new();
    for seg in segs {
        match *seg {
            Seg::Lit(ch) => out.push(ch),
            _ => return None,
        }
    }
    Some(out)
}

/// `N..M` — включительный диапазон; обе границы могут быть отрицательными.
fn parse_range(plain: &str) -> Option<(i64, i64)> {
    let (lo, hi) = plain.split_once("..")?;
    Some((lo.parse().ok()?, hi.parse().ok()?))
}

/// Транслирует литерал в заякоренное регулярное выражение.
fn anchored(segs: &[Seg]) -> String {
    let mut re = String::from("^");
    for seg in segs {
        match *seg {
            Seg::Lit(ch) | Seg::Esc(ch) => {
                regex_syntax::escape_into(ch.encode_utf8(&mut [0; 4]), &mut re);
            }
            Seg::Star => re.push_str(".*"),
            Seg::Qmark => re.push('.'),
            Seg::Raw(ch) => re.push(ch),
        }
    }
    re.push('$');
    re
}

/// Голый `**` перед токеном с ключом `*` или `..` избыточен: следующий
/// токен забирает флаг рекурсии, а сам `**` выбрасывается. `**` со
/// своим сопоставителем значения (`**=x`) не поглощается никогда.
fn merge_recursive(tokens: &mut Vec<PathToken>) {
    let mut i = 0;
    while i + 1 < tokens.len() {
        let absorb = tokens[i].is_bare_recursive()
            && matches!(
                tokens[i + 1].key.kind(),
                MatcherKind::Any | MatcherKind::Parent
            );
        if absorb {
            tokens.remove(i);
            tokens[i].key.set_recursive();
        } else {
            i += 1;
        }
    }
}

/// `^KEY`, сразу за которым идёт `..`, дополнительно получает
/// исключающий режим: родитель выживает, только если инверсный тест
/// проходят все дети.
fn mark_exclusive(tokens: &mut [PathToken]) {
    for i in 0..tokens.len().saturating_sub(1) {
        if tokens[i].key.is_inverse()
            && matches!(tokens[i + 1].key.kind(), MatcherKind::Parent)
        {
            tokens[i].key.set_exclusive();
        }
    }
}
