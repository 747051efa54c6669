use std::{collections::VecDeque, io};

use pjs_value::{DataIter, Value, ValueIter};

/// Ленивый сериализатор значений в сырой JSON.
///
/// Обходит значения в глубину через протокол итерации pjs-value и
/// производит байты по требованию: каждый вызов [`io::Read::read`]
/// пополняет внутренний накопительный буфер ровно настолько, чтобы
/// ответить вызывающему. Несколько документов в очереди разделяются
/// одиночным `\n`; дальше по конвейеру сканер превращает его в токен
/// `NewDocument`.
///
/// Ключи карт и записей кодируются в сортированном режиме. Float, точно
/// равный своему целому усечению, отображается целым: это компенсирует
/// хост-декодеры, расширяющие каждое число до float.
pub struct Encoder {
    queue: VecDeque<Root>,
    stack: Vec<Frame>,
    pending: Vec<u8>,
}

enum Root {
    Value(Value),
    Iter(Box<dyn ValueIter>),
}

struct Frame {
    it: Box<dyn ValueIter>,
    opened: bool,
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("queued", &self.queue.len())
            .field("depth", &self.stack.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Default for Encoder {
    fn default() -> Encoder {
        Encoder::new()
    }
}

impl Encoder {
    /// Пустой кодировщик; документы добавляются в очередь.
    pub fn new() -> Encoder {
        Encoder { queue: VecDeque::new(), stack: vec![], pending: vec![] }
    }

    /// Ставит значение в очередь корней.
    pub fn push_value(&mut self, v: &Value) {
        self.queue.push_back(Root::Value(v.clone()));
    }

    /// Ставит в очередь готовый итератор (например, набор совпадений).
    pub fn push_iter(&mut self, it: Box<dyn ValueIter>) {
        self.queue.push_back(Root::Iter(it));
    }

    /// Пополняет накопительный буфер, пока в нём не окажется хотя бы
    /// `want` байтов или вход не исчерпается.
    fn refill(&mut self, want: usize) -> Result<(), EncodeError> {
        while self.pending.len() < want {
            if let Some(frame) = self.stack.last_mut() {
                if frame.it.next() {
                    let Some(entry) = frame.it.current() else { continue };
                    if frame.it.is_first() {
                        self.pending.push(open_bracket(frame.it.has_named_keys()));
                        frame.opened = true;
                    }
                    if frame.it.has_named_keys() {
                        encode_scalar(
                            &Value::Str(entry.name),
                            &mut self.pending,
                        )?;
                        self.pending.push(b':');
                    }
                    match frame.it.child() {
                        Some(child) => {
                            self.stack.push(Frame { it: child, opened: false });
                        }
                        None => {
                            encode_scalar(&entry.value, &mut self.pending)?;
                            if !frame.it.is_last() {
                                self.pending.push(b',');
                            }
                        }
                    }
                } else {
                    // Итератор исчерпан: закрываем контейнер. Пустой
                    // контейнер так и не открывался — выпускаем обе
                    // скобки разом.
                    let frame = match self.stack.pop() {
                        Some(frame) => frame,
                        None => continue,
                    };
                    let named = frame.it.has_named_keys();
                    if !frame.opened {
                        self.pending.push(open_bracket(named));
                    }
                    self.pending.push(close_bracket(named));
                    match self.stack.last() {
                        Some(parent) => {
                            if !parent.it.is_last() {
                                self.pending.push(b',');
                            }
                        }
                        None => {
                            if !self.queue.is_empty() {
                                self.pending.push(b'\n');
                            }
                        }
                    }
                }
            } else if let Some(root) = self.queue.pop_front() {
                match root {
                    Root::Iter(it) => {
                        self.stack.push(Frame { it, opened: false });
                    }
                    Root::Value(v) => match DataIter::sorted(&v) {
                        Ok(it) => self.stack.push(Frame {
                            it: Box::new(it),
                            opened: false,
                        }),
                        Err(_) => {
                            // Скалярный корень.
                            encode_scalar(&v, &mut self.pending)?;
                            if !self.queue.is_empty() {
                                self.pending.push(b'\n');
                            }
                        }
                    },
                }
            } else {
                break;
            }
        }
        Ok(())
    }
}

impl io::Read for Encoder {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        self.refill(p.len()).map_err(io::Error::other)?;
        let n = p.len().min(self.pending.len());
        p[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn open_bracket(named: bool) -> u8 {
    if named { b'{' } else { b'[' }
}

fn close_bracket(named: bool) -> u8 {
    if named { b'}' } else { b']' }
}

/// Кодирует скаляр в JSON-байты.
fn encode_scalar(v: &Value, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    match *v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Value::Float(x) => {
            if !x.is_finite() {
                return Err(EncodeError::NonFinite(x));
            }
            // Обратное сужение расширенных декодером целых.
            if x.fract() == 0.0 {
                out.extend_from_slice(format!("{:.0}", x).as_bytes());
            } else {
                let rendered = serde_json::to_string(&x)
                    .map_err(|err| EncodeError::Json(err.to_string()))?;
                out.extend_from_slice(rendered.as_bytes());
            }
        }
        Value::Str(ref s) => {
            let rendered = serde_json::to_string(s)
                .map_err(|err| EncodeError::Json(err.to_string()))?;
            out.extend_from_slice(rendered.as_bytes());
        }
        // Контейнеры сюда не попадают: обходимое значение всегда уходит
        // в дочерний итератор.
        Value::Seq(_) | Value::Map(_) | Value::Record(_) => {
            return Err(EncodeError::Unencodable(v.kind_name()));
        }
    }
    Ok(())
}

/// Ошибка кодирования: значение, не представимое в JSON.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// NaN или бесконечность.
    NonFinite(f64),
    /// Контейнер в скалярной позиции.
    Unencodable(&'static str),
    /// Отказ нижележащего сериализатора строк.
    Json(String),
}

impl std::error::Error for EncodeError {}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            EncodeError::NonFinite(x) => {
                write!(f, "cannot encode non-finite number {}", x)
            }
            EncodeError::Unencodable(kind) => {
                write!(f, "cannot encode {} as a scalar", kind)
            }
            EncodeError::Json(ref err) => {
                write!(f, "string encoding failed: {}", err)
            }
        }
    }
}
