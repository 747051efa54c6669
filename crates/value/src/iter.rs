use std::cmp::Ordering;

use crate::{NotTraversable, Record, Value};

/// Протокол итерации, потребляемый кодировщиком.
///
/// Протокол намеренно узкий: `next` продвигает курсор, `current`
/// возвращает текущий элемент, `child` строит итератор по значению
/// текущего элемента (если оно обходимо), а `has_named_keys`/`is_first`/
/// `is_last` дают кодировщику всё, что нужно для скобок и разделителей.
///
/// Реализации две: обход значения ([`DataIter`]) и обход набора
/// совпадений в pjs-paths. Кодировщик различает их только через этот
/// трейт.
pub trait ValueIter {
    /// Продвигает курсор; true тогда и только тогда, когда элемент доступен.
    fn next(&mut self) -> bool;

    /// Элемент, открытый последним успешным `next`.
    fn current(&self) -> Option<IterEntry>;

    /// Итератор по значению текущего элемента, если оно обходимо.
    ///
    /// Режим сортировки наследуется.
    fn child(&self) -> Option<Box<dyn ValueIter>>;

    /// True, если подлежащий контейнер — карта или запись (`{…}`),
    /// false — последовательность (`[…]`).
    fn has_named_keys(&self) -> bool;

    /// True на первом элементе.
    fn is_first(&self) -> bool;

    /// True на последнем элементе.
    fn is_last(&self) -> bool;
}

/// Один элемент, открытый итератором.
#[derive(Clone, Debug)]
pub struct IterEntry {
    /// Позиция элемента, начиная с нуля.
    pub index: usize,
    /// Ключ карты или имя поля записи; пустая строка для последовательностей.
    pub name: String,
    /// Ключ как значение: строка для карт и записей, целое для
    /// последовательностей.
    pub key: Value,
    /// Значение элемента.
    pub value: Value,
}

/// Полный порядок ключей для сортированного режима.
///
/// Числовые ключи сравниваются через приведение к float; во всех остальных
/// случаях — лексикографически по строковому представлению.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    a.to_string().cmp(&b.to_string())
}

fn numeric(v: &Value) -> Option<f64> {
    match *v {
        Value::Int(i) => Some(i as f64),
        Value::Float(x) => Some(x),
        _ => None,
    }
}

/// Разворачивает поля записи: анонимно встроенные под-записи вклеиваются
/// на месте, в глубину. Встроенное поле, не являющееся записью, опускается.
pub(crate) fn record_entries(rec: &dyn Record) -> Vec<(String, Value)> {
    let mut out = vec![];
    for field in rec.fields() {
        if field.embedded {
            if let Value::Record(ref sub) = field.value {
                out.extend(record_entries(&**sub));
            }
        } else {
            out.push((field.name, field.value));
        }
    }
    out
}

/// Итератор по детям одного [`Value`].
///
/// Ключи и значения материализуются при построении, поэтому итератор
/// владеет своими данными и не держит ссылок на родителя. Построение по
/// скаляру или `Null` завершается ошибкой [`NotTraversable`].
#[derive(Debug)]
pub struct DataIter {
    entries: Vec<(Value, Value)>,
    named: bool,
    sorted: bool,
    pos: Option<usize>,
}

impl DataIter {
    /// Итератор в обычном режиме: карты — в порядке хранения, ключи
    /// записей — в порядке объявления, последовательности — позиционно.
    pub fn new(v: &Value) -> Result<DataIter, NotTraversable> {
        DataIter::with_mode(v, false)
    }

    /// Итератор в сортированном режиме: ключи карт и записей по
    /// возрастанию через [`compare_values`]; последовательности не
    /// переупорядочиваются. Режим наследуют все дочерние итераторы.
    pub fn sorted(v: &Value) -> Result<DataIter, NotTraversable> {
        DataIter::with_mode(v, true)
    }

    fn with_mode(v: &Value, sorted: bool) -> Result<DataIter, NotTraversable> {
        let (entries, named) = match *v {
            Value::Seq(ref xs) => {
                let entries = xs
                    .iter()
                    .enumerate()
                    .map(|(i, x)| (Value::Int(i as i64), x.clone()))
                    .collect();
                (entries, false)
            }
            Value::Map(ref m) => {
                let entries = m
                    .iter()
                    .map(|(k, x)| (Value::Str(k.clone()), x.clone()))
                    .collect();
                (entries, true)
            }
            Value::Record(ref r) => {
                let entries = record_entries(&**r)
                    .into_iter()
                    .map(|(name, x)| (Value::Str(name), x))
                    .collect();
                (entries, true)
            }
            _ => return Err(NotTraversable::new(v)),
        };
        let mut it = DataIter { entries, named, sorted, pos: None };
        if sorted && named {
            it.entries.sort_by(|a, b| compare_values(&a.0, &b.0));
        }
        Ok(it)
    }
}

impl ValueIter for DataIter {
    fn next(&mut self) -> bool {
        let pos = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(pos);
        pos < self.entries.len()
    }

    fn current(&self) -> Option<IterEntry> {
        let pos = self.pos?;
        let (key, value) = self.entries.get(pos)?;
        let name =
            if self.named { key.to_string() } else { String::new() };
        Some(IterEntry { index: pos, name, key: key.clone(), value: value.clone() })
    }

    fn child(&self) -> Option<Box<dyn ValueIter>> {
        let (_, value) = self.entries.get(self.pos?)?;
        match DataIter::with_mode(value, self.sorted) {
            Ok(it) => Some(Box::new(it)),
            Err(_) => None,
        }
    }

    fn has_named_keys(&self) -> bool {
        self.named
    }

    fn is_first(&self) -> bool {
        self.pos == Some(0)
    }

    fn is_last(&self) -> bool {
        !self.entries.is_empty() && self.pos == Some(self.entries.len() - 1)
    }
}
