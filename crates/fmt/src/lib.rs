/*!
Крейт pjs-fmt — конвейер форматирования JSON: потоковый сканер, ленивый
кодировщик и цепочка процессоров токенов.

Конвейер двухступенчатый нарочно: кодировщик производит сырые JSON-байты
из любого значения, а сканер токенизирует их заново, чтобы процессоры
работали с каноническим потоком токенов независимо от того, откуда JSON
пришёл — из кодировщика или прямо со входа. Процессор — чистая функция
токен → строка; форматтер прогоняет токен через процессоры по очереди,
подставляя вывод процессора *k* как полезную нагрузку для *k+1*, и пишет
результат в приёмник.

# Пример

```
use pjs_fmt::{Formatter, Indenter};

let mut out = vec![];
let f = Formatter::new(vec![Box::new(Indenter::new("", "  "))]);
f.process("[1, 2]".as_bytes(), &mut out)?;
assert_eq!("[\n  1,\n  2\n]", String::from_utf8(out).unwrap());
# Ok::<(), pjs_fmt::Error>(())
```
*/

#![deny(missing_docs)]

use std::io;

pub use crate::{
    encoder::{EncodeError, Encoder},
    scanner::{ScanError, Scanner, Token, TokenKind},
};

mod encoder;
mod scanner;

/// Ошибка конвейера форматирования.
#[derive(Debug)]
pub enum Error {
    /// Сканер встретил невалидный вход; байты, записанные до ошибки,
    /// остаются в приёмнике.
    Scan(ScanError),
    /// Ошибка чтения или записи. Сюда же попадают ошибки кодировщика,
    /// когда он стоит на месте читателя.
    Io(io::Error),
}

impl From<ScanError> for Error {
    fn from(err: ScanError) -> Error {
        Error::Scan(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Scan(ref err) => Some(err),
            Error::Io(ref err) => Some(err),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Error::Scan(ref err) => err.fmt(f),
            Error::Io(ref err) => err.fmt(f),
        }
    }
}

/// Чистый переписыватель токена в строку.
///
/// Процессоры составляются в конвейер; каждый видит токен с полезной
/// нагрузкой, уже переписанной предыдущим.
pub trait Processor {
    /// Отображение одного токена.
    fn handle(&self, token: &Token) -> String;
}

/// Раскраска скалярных токенов последовательностями ANSI SGR.
///
/// Структурные токены проходят без изменений, поэтому раскрашенный вывод
/// остаётся валидным JSON по модулю управляющих последовательностей —
/// сканер пропускает их при повторной токенизации.
#[derive(Clone, Debug)]
pub struct ConsoleColorizer {
    string_color: &'static str,
    number_color: &'static str,
    bool_color: &'static str,
    null_color: &'static str,
}

impl Default for ConsoleColorizer {
    fn default() -> ConsoleColorizer {
        ConsoleColorizer::new()
    }
}

impl ConsoleColorizer {
    /// Палитра по умолчанию: строки — циан, числа — жёлтый, булевы —
    /// пурпурный, null — красный.
    pub fn new() -> ConsoleColorizer {
        ConsoleColorizer {
            string_color: "0;36",
            number_color: "0;33",
            bool_color: "1;35",
            null_color: "1;31",
        }
    }

    fn wrap(&self, payload: &str, color: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", color, payload)
    }
}

impl Processor for ConsoleColorizer {
    fn handle(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::String => self.wrap(&token.payload, self.string_color),
            TokenKind::Integer | TokenKind::Float | TokenKind::Scientific => {
                self.wrap(&token.payload, self.number_color)
            }
            TokenKind::Boolean => self.wrap(&token.payload, self.bool_color),
            TokenKind::Null => self.wrap(&token.payload, self.null_color),
            _ => token.payload.clone(),
        }
    }
}

/// Расстановка переводов строк и отступов.
///
/// `prefix` открывает каждую строку вывода, `indent` повторяется по
/// глубине токена. Открывающая скобка сразу выпускает заготовку
/// следующей строки, поэтому элементы и ключи идут без собственного
/// отступа, а разделитель добавляет заготовку строки своего уровня.
/// Токен верхнего уровня — скаляр, пустой контейнер или открывающая
/// скобка — несёт префикс сам.
#[derive(Clone, Debug)]
pub struct Indenter {
    prefix: String,
    indent: String,
}

impl Indenter {
    /// Процессор отступов с данными префиксом строки и единицей отступа.
    pub fn new<S1, S2>(prefix: S1, indent: S2) -> Indenter
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Indenter { prefix: prefix.into(), indent: indent.into() }
    }

    fn line(&self, depth: usize) -> String {
        format!("{}{}", self.prefix, self.indent.repeat(depth))
    }
}

impl Processor for Indenter {
    fn handle(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::MapStart | TokenKind::ArrayStart => {
                let head = if !token.in_map && token.depth == 0 {
                    format!("{}{}", self.prefix, token.payload)
                } else {
                    token.payload.clone()
                };
                format!("{}\n{}", head, self.line(token.depth + 1))
            }
            TokenKind::MapEnd | TokenKind::ArrayEnd => {
                format!("\n{}{}", self.line(token.depth), token.payload)
            }
            TokenKind::MapColon => format!("{} ", token.payload),
            TokenKind::ValueSeparator => {
                format!("{}\n{}", token.payload, self.line(token.depth))
            }
            TokenKind::NewDocument => "\n\n".to_string(),
            // Литералы, ключи и пустые контейнеры: внутри контейнера
            // заготовку строки уже выпустила открывающая скобка или
            // разделитель, а на верхнем уровне строку открывает сам
            // токен — с префиксом.
            _ => {
                if !token.in_map && token.depth == 0 {
                    format!("{}{}", self.prefix, token.payload)
                } else {
                    token.payload.clone()
                }
            }
        }
    }
}

/// Форматтер: сканирует вход, прогоняет каждый токен через цепочку
/// процессоров и инкрементально пишет результат в приёмник.
pub struct Formatter {
    processors: Vec<Box<dyn Processor>>,
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("processors", &self.processors.len())
            .finish()
    }
}

impl Formatter {
    /// Форматтер с данной цепочкой процессоров. Пустая цепочка выдаёт
    /// вход без пробелов и управляющих последовательностей.
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Formatter {
        Formatter { processors }
    }

    /// Прогоняет весь вход через конвейер. Останавливается на первой
    /// ошибке сканера; уже записанные байты остаются в приёмнике.
    pub fn process<R, W>(&self, rdr: R, wtr: &mut W) -> Result<(), Error>
    where
        R: io::Read,
        W: io::Write,
    {
        let mut scanner = Scanner::new(rdr);
        while let Some(token) = scanner.next_token()? {
            let rendered = self.handle(token);
            wtr.write_all(rendered.as_bytes())?;
        }
        Ok(())
    }

    /// Отображение одного токена цепочкой: вывод процессора *k* — это
    /// полезная нагрузка для процессора *k+1*.
    pub fn handle(&self, token: Token) -> String {
        let mut token = token;
        for processor in &self.processors {
            token.payload = processor.handle(&token);
        }
        token.payload
    }
}
