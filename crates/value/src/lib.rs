/*!
Крейт pjs-value предоставляет динамическую модель значений JSON и протокол
итерации, на котором построен остальной pjs.

Каждый декодированный узел JSON представлен одним типом-суммой [`Value`].
Хост может также встраивать собственные структурированные объекты через
трейт [`Record`]: это явно реализуемое описание формы (имена публичных
полей в порядке объявления, с разворачиванием анонимно встроенных
под-записей), а не универсальная рефлексия.

Протокол итерации ([`ValueIter`]) — единственная возможность, которую
потребляет кодировщик: `next`/`current`/`child`/`has_named_keys`/
`is_first`/`is_last`. Итераторы строятся в обычном или сортированном
режиме; сортированный режим упорядочивает ключи карт и записей по
возрастанию (числовое сравнение, когда обе стороны числовые, иначе
лексикографическое) и распространяется на всех потомков.

# Пример

```
use pjs_value::{DataIter, Value, ValueIter};

let doc: Value = serde_json::json!({"b": 1, "a": [true, null]}).into();
let mut it = DataIter::sorted(&doc)?;
assert!(it.has_named_keys());
assert!(it.next());
assert_eq!("a", it.current().unwrap().name);
# Ok::<(), pjs_value::NotTraversable>(())
```
*/

#![deny(missing_docs)]

use std::{collections::BTreeMap, fmt, sync::Arc};

pub use crate::iter::{DataIter, IterEntry, ValueIter, compare_values};

mod iter;

/// Любой декодированный узел JSON.
///
/// Числа, пересекающие границу декодера, могут быть расширены до float;
/// кодировщик в pjs-fmt сужает обратно те, что точно представимы целым.
/// Ключи карт — только строки (ограничение JSON). Вариант `Record`
/// непрозрачен: его поля перечисляются через трейт [`Record`].
#[derive(Clone, Debug)]
pub enum Value {
    /// JSON `null`.
    Null,
    /// JSON `true`/`false`.
    Bool(bool),
    /// Целое число.
    Int(i64),
    /// Число с плавающей точкой.
    Float(f64),
    /// Строка.
    Str(String),
    /// Упорядоченная последовательность.
    Seq(Vec<Value>),
    /// Карта строка → значение. Порядок вставки не сохраняется.
    Map(BTreeMap<String, Value>),
    /// Встроенный объект хоста, перечисляемый через [`Record`].
    Record(Arc<dyn Record>),
}

impl Default for Value {
    /// По умолчанию — `Null`.
    fn default() -> Value {
        Value::Null
    }
}

impl Value {
    /// Возвращает true тогда и только тогда, когда по этому значению можно
    /// построить итератор (последовательность, карта или запись).
    pub fn is_container(&self) -> bool {
        matches!(*self, Value::Seq(_) | Value::Map(_) | Value::Record(_))
    }

    /// Короткое имя вида значения, используемое в сообщениях об ошибках.
    pub fn kind_name(&self) -> &'static str {
        match *self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Seq(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Записи сравниваются по идентичности: у формы хоста нет
            // общего понятия структурного равенства.
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Строковое представление, используемое сопоставителями путей, сортировкой
/// ключей и хешами путей совпадений.
///
/// Скаляры отображаются естественно; float, равный своему целому усечению,
/// отображается без дробной части (`5.0` → `5`), так что числовые ключи и
/// значения, расширенные декодером, по-прежнему совпадают с целочисленными
/// шаблонами через регулярный запасной вариант.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{:.0}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Str(ref s) => f.write_str(s),
            // Контейнеры отображаются только ради предсказуемого провала
            // заякоренных скалярных шаблонов.
            Value::Seq(ref xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", x)?;
                }
                f.write_str("]")
            }
            Value::Map(ref m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Record(ref r) => {
                f.write_str("{")?;
                for (i, (name, v)) in iter::record_entries(&**r).iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", name, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // u64 за пределами i64 и всё дробное расширяется
                    // до float; сужением занимается кодировщик.
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(xs) => {
                Value::Seq(xs.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(m) => Value::Map(
                m.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

/// Явно реализуемое описание формы встроенного объекта хоста.
///
/// Реализация перечисляет публичные поля в порядке объявления. Поле,
/// помеченное как встроенное и содержащее другую запись, разворачивается
/// на месте, в глубину — так же, как анонимное встраивание структур.
/// Непубличные поля просто не перечисляются.
pub trait Record: fmt::Debug {
    /// Поля записи в порядке объявления.
    fn fields(&self) -> Vec<Field>;
}

/// Одно поле, перечисленное реализацией [`Record`].
#[derive(Clone, Debug)]
pub struct Field {
    /// Имя поля, используемое как ключ карты.
    pub name: String,
    /// Значение поля.
    pub value: Value,
    /// Анонимно встроенная под-запись: поля разворачиваются на месте.
    pub embedded: bool,
}

impl Field {
    /// Обычное именованное поле.
    pub fn new<S: Into<String>>(name: S, value: Value) -> Field {
        Field { name: name.into(), value, embedded: false }
    }

    /// Анонимно встроенное поле.
    pub fn embedded(value: Value) -> Field {
        Field { name: String::new(), value, embedded: true }
    }
}

/// Ошибка построения итератора по не-обходимому значению (скаляру).
///
/// Сопоставитель путей молча пропускает такие узлы; кодировщик отображает
/// их как скаляры.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NotTraversable {
    kind: &'static str,
}

impl NotTraversable {
    pub(crate) fn new(v: &Value) -> NotTraversable {
        NotTraversable { kind: v.kind_name() }
    }
}

impl std::error::Error for NotTraversable {}

impl fmt::Display for NotTraversable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "non-traversable data structure: {}", self.kind)
    }
}
