use std::io;

use bstr::decode_utf8;

use crate::Error;

/// Размер внутреннего буфера чтения.
const BUF_SIZE: usize = 1024;

/// Сколько байтов разрешено накопить без единого валидного символа,
/// прежде чем декодирование признаётся безнадёжным.
const MAX_RUNE_LEN: usize = 8;

/// Одна лексическая единица потока JSON.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    /// Буквальный срез входа, который потребил сканер. Пуст у
    /// `NewDocument`.
    pub payload: String,
    /// Вид токена.
    pub kind: TokenKind,
    /// Глубина вложенности: размер стека контейнеров в момент выпуска.
    /// Открывающие скобки выпускаются до помещения контейнера в стек,
    /// закрывающие — после снятия, поэтому обе стороны несут глубину
    /// родителя.
    pub depth: usize,
    /// True, если ближайший объемлющий контейнер — карта.
    pub in_map: bool,
}

/// Вид токена.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// `"…"`.
    String,
    /// `1234`.
    Integer,
    /// `0.234`.
    Float,
    /// `0.234E-2`.
    Scientific,
    /// `true` / `false`.
    Boolean,
    /// `null`.
    Null,
    /// Ключ карты `"…"`.
    MapKey,
    /// `{`.
    MapStart,
    /// `}`.
    MapEnd,
    /// `:`.
    MapColon,
    /// `{}`.
    EmptyMap,
    /// `[`.
    ArrayStart,
    /// `]`.
    ArrayEnd,
    /// `[]`.
    EmptyArray,
    /// `,`.
    ValueSeparator,
    /// Разделитель верхнеуровневых документов в одном потоке; полезной
    /// нагрузки не несёт.
    NewDocument,
}

impl TokenKind {
    /// Имя контекста в сообщениях об ошибках.
    pub(crate) fn context_name(self) -> &'static str {
        match self {
            TokenKind::String => "string",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::Scientific => "scientific",
            TokenKind::Boolean => "boolean",
            TokenKind::Null => "null",
            TokenKind::MapKey => "map key",
            TokenKind::MapStart
            | TokenKind::MapEnd
            | TokenKind::MapColon
            | TokenKind::EmptyMap => "map",
            TokenKind::ArrayStart
            | TokenKind::ArrayEnd
            | TokenKind::EmptyArray => "array",
            TokenKind::ValueSeparator => "data structure",
            TokenKind::NewDocument => "JSON",
        }
    }
}

/// Ошибка токенизации. Несёт символьное (не байтовое) смещение от начала
/// потока.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanError {
    kind: ScanErrorKind,
    pos: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum ScanErrorKind {
    Unexpected { ch: char, context: &'static str },
    Utf8,
}

impl ScanError {
    /// Символьное смещение ошибки от начала потока, с нуля.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl std::error::Error for ScanError {}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ScanErrorKind::Unexpected { ch, context } => write!(
                f,
                "Unexpected character '{}' in {} at position {}",
                ch, context, self.pos,
            ),
            ScanErrorKind::Utf8 => {
                write!(f, "Unparsable UTF-8 at position {}", self.pos)
            }
        }
    }
}

/// Контейнер в стеке типов сканера.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Container {
    Map,
    Array,
}

/// Состояние конечного автомата. Каждое состояние — ветка `match` в
/// `Scanner::step`; полезные нагрузки различают ключи и значения строк.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Вход: начало значения.
    Any,
    /// После `{`: пустая карта или первый ключ.
    MapOpen,
    /// После `[`: пустой массив или первое значение.
    ArrayOpen,
    /// Ожидание открывающей кавычки ключа.
    KeyStart,
    /// Внутри строки; `key` различает ключ и значение.
    Str { key: bool },
    /// Символ после `\` внутри строки.
    StrEsc { key: bool },
    /// Ожидание `:` после ключа.
    Colon,
    /// После завершённого значения: `,`, закрывающая скобка или новый
    /// документ.
    Next,
    /// Цифры целого.
    Int,
    /// После ведущего `-`.
    NegInt,
    /// После `.`: обязательна цифра.
    FloatDigit,
    /// Цифры дробной части.
    FloatRest,
    /// После `e`/`E`: знак или цифра.
    SciSign,
    /// После знака порядка: обязательна цифра.
    SciDigit,
    /// Цифры порядка.
    SciRest,
    /// Посимвольный разбор `true`.
    True,
    /// Посимвольный разбор `false`.
    False,
    /// Посимвольный разбор `null`.
    Null,
}

/// Стадия пропуска управляющей последовательности `\e[…m`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EscStage {
    Bracket,
    Body,
}

/// Потоковый сканер JSON.
///
/// Байтовый конечный автомат: читает источник кусками, декодирует по
/// одному символу и выпускает по одному токену за вызов
/// [`next_token`](Scanner::next_token). Терпим к последовательностям
/// ANSI-раскраски (`\e[…m` молча пропускается где угодно), поэтому
/// повторная токенизация уже раскрашенного вывода безопасна. Несколько
/// верхнеуровневых документов в одном потоке разделяются синтетическим
/// токеном `NewDocument`.
#[derive(Debug)]
pub struct Scanner<R> {
    rdr: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    flushed: bool,
    /// Односимвольный буфер возврата.
    pending: Option<char>,
    /// Символьный индекс следующего потребляемого символа.
    pos: usize,
    state: State,
    esc: Option<EscStage>,
    stack: Vec<Container>,
    value: String,
    token: Option<Token>,
    failed: bool,
    tolerate_ansi: bool,
}

impl<R: io::Read> Scanner<R> {
    /// Сканер над источником байтов.
    pub fn new(rdr: R) -> Scanner<R> {
        Scanner {
            rdr,
            buf: vec![0; BUF_SIZE],
            start: 0,
            end: 0,
            eof: false,
            flushed: false,
            pending: None,
            pos: 0,
            state: State::Any,
            esc: None,
            stack: vec![],
            value: String::new(),
            token: None,
            failed: false,
            tolerate_ansi: true,
        }
    }

    /// Отключает пропуск ANSI-последовательностей.
    pub fn strict_ansi(mut self) -> Scanner<R> {
        self.tolerate_ansi = false;
        self
    }

    /// Следующий токен потока; `None` в конце входа. После первой ошибки
    /// сканер останавливается и дальше возвращает `None`.
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        if self.failed {
            return Ok(None);
        }
        loop {
            if let Some(token) = self.token.take() {
                return Ok(Some(token));
            }
            let ch = match self.pending.take() {
                Some(ch) => ch,
                None => match self.read_char() {
                    Err(err) => {
                        self.failed = true;
                        return Err(err);
                    }
                    Ok(Some(ch)) => ch,
                    Ok(None) => {
                        // Принудительно завершаем незаконченный скаляр
                        // одним синтетическим пробелом.
                        if !self.flushed {
                            self.flushed = true;
                            if let Err(err) = self.step(' ') {
                                self.failed = true;
                                return Err(Error::Scan(err));
                            }
                            continue;
                        }
                        return Ok(self.token.take());
                    }
                },
            };
            if let Err(err) = self.step(ch) {
                self.failed = true;
                return Err(Error::Scan(err));
            }
            // Возвращённый символ не продвигает позицию: он будет
            // потреблён повторно.
            if self.pending.is_none() {
                self.pos += 1;
            }
        }
    }

    /// Декодирует следующий символ, подтягивая байты по мере надобности.
    fn read_char(&mut self) -> Result<Option<char>, Error> {
        loop {
            let (ch, size) = decode_utf8(&self.buf[self.start..self.end]);
            if let Some(ch) = ch {
                self.start += size;
                return Ok(Some(ch));
            }
            let rest = self.end - self.start;
            if rest >= MAX_RUNE_LEN || (self.eof && rest > 0) {
                self.failed = true;
                return Err(Error::Scan(ScanError {
                    kind: ScanErrorKind::Utf8,
                    pos: self.pos,
                }));
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Сдвигает недоеденный хвост в начало буфера и дочитывает из
    /// источника.
    fn fill(&mut self) -> Result<(), Error> {
        self.buf.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
        let n = self.rdr.read(&mut self.buf[self.end..])?;
        if n == 0 {
            self.eof = true;
        }
        self.end += n;
        Ok(())
    }

    fn put_back(&mut self, ch: char) {
        self.pending = Some(ch);
    }

    /// Выпускает токен: забирает накопленную полезную нагрузку, снимает
    /// контекст со стека контейнеров и переводит автомат в `Next`.
    fn finish(&mut self, kind: TokenKind) {
        self.token = Some(Token {
            payload: std::mem::take(&mut self.value),
            kind,
            depth: self.stack.len(),
            in_map: self.stack.last() == Some(&Container::Map),
        });
        self.state = State::Next;
    }

    fn error(&self, ch: char, context: &'static str) -> ScanError {
        ScanError {
            kind: ScanErrorKind::Unexpected { ch, context },
            pos: self.pos,
        }
    }

    /// Скармливает автомату один символ.
    fn step(&mut self, ch: char) -> Result<(), ScanError> {
        // Пропуск `\e[…m` возможен в любой точке, включая внутренность
        // строк: кодировщик мог уже раскрасить этот вход.
        if let Some(stage) = self.esc {
            return self.step_esc(stage, ch);
        }
        if ch == '\u{1b}' && self.tolerate_ansi {
            self.esc = Some(EscStage::Bracket);
            return Ok(());
        }
        match self.state {
            State::Any => self.step_any(ch),
            State::MapOpen => self.step_map_open(ch),
            State::ArrayOpen => self.step_array_open(ch),
            State::KeyStart => self.step_key_start(ch),
            State::Str { key } => self.step_str(ch, key),
            State::StrEsc { key } => {
                self.value.push(ch);
                self.state = State::Str { key };
                Ok(())
            }
            State::Colon => self.step_colon(ch),
            State::Next => self.step_next(ch),
            State::Int => self.step_int(ch),
            State::NegInt => self.step_neg_int(ch),
            State::FloatDigit => self.step_float_digit(ch),
            State::FloatRest => self.step_float_rest(ch),
            State::SciSign => self.step_sci_sign(ch),
            State::SciDigit => self.step_sci_digit(ch),
            State::SciRest => self.step_sci_rest(ch),
            State::True => self.step_literal(ch, "true", TokenKind::Boolean),
            State::False => self.step_literal(ch, "false", TokenKind::Boolean),
            State::Null => self.step_literal(ch, "null", TokenKind::Null),
        }
    }

    fn step_esc(&mut self, stage: EscStage, ch: char) -> Result<(), ScanError> {
        match stage {
            EscStage::Bracket => {
                if ch != '[' {
                    return Err(self.error(ch, "JSON"));
                }
                self.esc = Some(EscStage::Body);
            }
            EscStage::Body => match ch {
                'm' => self.esc = None,
                ';' | '0'..='9' => {}
                _ => return Err(self.error(ch, "JSON")),
            },
        }
        Ok(())
    }

    fn step_any(&mut self, ch: char) -> Result<(), ScanError> {
        if is_blank(ch) {
            return Ok(());
        }
        match ch {
            '{' => self.state = State::MapOpen,
            '[' => self.state = State::ArrayOpen,
            '"' => self.state = State::Str { key: false },
            't' => self.state = State::True,
            'f' => self.state = State::False,
            'n' => self.state = State::Null,
            '-' => self.state = State::NegInt,
            '0'..='9' => self.state = State::Int,
            _ => return Err(self.error(ch, "JSON")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_map_open(&mut self, ch: char) -> Result<(), ScanError> {
        if is_blank(ch) {
            return Ok(());
        }
        if ch == '}' {
            self.value.push(ch);
            self.finish(TokenKind::EmptyMap);
        } else {
            self.put_back(ch);
            self.finish(TokenKind::MapStart);
            self.stack.push(Container::Map);
            self.state = State::KeyStart;
        }
        Ok(())
    }

    fn step_array_open(&mut self, ch: char) -> Result<(), ScanError> {
        if is_blank(ch) {
            return Ok(());
        }
        if ch == ']' {
            self.value.push(ch);
            self.finish(TokenKind::EmptyArray);
        } else {
            self.put_back(ch);
            self.finish(TokenKind::ArrayStart);
            self.stack.push(Container::Array);
            self.state = State::Any;
        }
        Ok(())
    }

    fn step_key_start(&mut self, ch: char) -> Result<(), ScanError> {
        if is_blank(ch) {
            return Ok(());
        }
        if ch != '"' {
            return Err(self.error(ch, "map key"));
        }
        self.value.push(ch);
        self.state = State::Str { key: true };
        Ok(())
    }

    fn step_str(&mut self, ch: char, key: bool) -> Result<(), ScanError> {
        self.value.push(ch);
        match ch {
            '\\' => self.state = State::StrEsc { key },
            '"' => {
                if key {
                    self.finish(TokenKind::MapKey);
                    self.state = State::Colon;
                } else {
                    self.finish(TokenKind::String);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn step_colon(&mut self, ch: char) -> Result<(), ScanError> {
        if is_blank(ch) {
            return Ok(());
        }
        if ch != ':' {
            return Err(self.error(ch, "map"));
        }
        self.value.push(ch);
        self.finish(TokenKind::MapColon);
        self.state = State::Any;
        Ok(())
    }

    fn step_next(&mut self, ch: char) -> Result<(), ScanError> {
        if is_blank(ch) {
            return Ok(());
        }
        if ch == ',' && !self.stack.is_empty() {
            self.value.push(ch);
            self.finish(TokenKind::ValueSeparator);
            self.state = if self.stack.last() == Some(&Container::Map) {
                State::KeyStart
            } else {
                State::Any
            };
            return Ok(());
        }
        if ch == ']' && self.stack.last() == Some(&Container::Array) {
            self.value.push(ch);
            self.stack.pop();
            self.finish(TokenKind::ArrayEnd);
            return Ok(());
        }
        if ch == '}' && self.stack.last() == Some(&Container::Map) {
            self.value.push(ch);
            self.stack.pop();
            self.finish(TokenKind::MapEnd);
            return Ok(());
        }
        if self.stack.is_empty() && !is_termination(ch) {
            // Конец документа: стек пуст, а вход продолжается.
            self.put_back(ch);
            self.finish(TokenKind::NewDocument);
            self.state = State::Any;
            return Ok(());
        }
        Err(self.error(ch, "data structure"))
    }

    fn step_int(&mut self, ch: char) -> Result<(), ScanError> {
        if is_end_of_value(ch) {
            self.put_back(ch);
            self.finish(TokenKind::Integer);
            return Ok(());
        }
        match ch {
            '.' => self.state = State::FloatDigit,
            'e' | 'E' => self.state = State::SciSign,
            '0'..='9' => {
                // Ведущий ноль допустим только сам по себе или перед
                // точкой.
                if self.value == "0" || self.value == "-0" {
                    return Err(self.error(ch, "float"));
                }
            }
            _ => return Err(self.error(ch, "integer")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_neg_int(&mut self, ch: char) -> Result<(), ScanError> {
        match ch {
            '0'..='9' => self.state = State::Int,
            _ => return Err(self.error(ch, "integer")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_float_digit(&mut self, ch: char) -> Result<(), ScanError> {
        match ch {
            '0'..='9' => self.state = State::FloatRest,
            _ => return Err(self.error(ch, "float")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_float_rest(&mut self, ch: char) -> Result<(), ScanError> {
        if is_end_of_value(ch) {
            self.put_back(ch);
            self.finish(TokenKind::Float);
            return Ok(());
        }
        match ch {
            'e' | 'E' => self.state = State::SciSign,
            '0'..='9' => {}
            _ => return Err(self.error(ch, "float")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_sci_sign(&mut self, ch: char) -> Result<(), ScanError> {
        match ch {
            '-' | '+' => self.state = State::SciDigit,
            '0'..='9' => self.state = State::SciRest,
            _ => return Err(self.error(ch, "scientific")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_sci_digit(&mut self, ch: char) -> Result<(), ScanError> {
        match ch {
            '0'..='9' => self.state = State::SciRest,
            _ => return Err(self.error(ch, "scientific")),
        }
        self.value.push(ch);
        Ok(())
    }

    fn step_sci_rest(&mut self, ch: char) -> Result<(), ScanError> {
        if is_end_of_value(ch) {
            self.put_back(ch);
            self.finish(TokenKind::Scientific);
            return Ok(());
        }
        match ch {
            '0'..='9' => {}
            _ => return Err(self.error(ch, "scientific")),
        }
        self.value.push(ch);
        Ok(())
    }

    /// Строгое посимвольное сопоставление `true`/`false`/`null`.
    fn step_literal(
        &mut self,
        ch: char,
        lit: &'static str,
        kind: TokenKind,
    ) -> Result<(), ScanError> {
        if is_end_of_value(ch) && self.value == lit {
            self.put_back(ch);
            self.finish(kind);
            return Ok(());
        }
        if lit.starts_with(&self.value) && lit[self.value.len()..].starts_with(ch)
        {
            self.value.push(ch);
            return Ok(());
        }
        Err(self.error(ch, kind.context_name()))
    }
}

fn is_blank(ch: char) -> bool {
    ch == '\n' || ch == '\t' || ch == '\r' || ch == ' '
}

fn is_termination(ch: char) -> bool {
    ch == ',' || ch == '}' || ch == ']'
}

fn is_end_of_value(ch: char) -> bool {
    is_blank(ch) || is_termination(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &str) -> Vec<Token> {
        let mut scan = Scanner::new(input.as_bytes());
        let mut out = vec![];
        while let Some(tok) = scan.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    fn scan_err(input: &str) -> String {
        let mut scan = Scanner::new(input.as_bytes());
        loop {
            match scan.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected a scan error for {:?}", input),
                Err(err) => return err.to_string(),
            }
        }
    }

    fn tok(
        payload: &str,
        kind: TokenKind,
        depth: usize,
        in_map: bool,
    ) -> Token {
        Token { payload: payload.to_string(), kind, depth, in_map }
    }

    macro_rules! scans {
        ($name:ident, $input:expr, $($tok:expr),+ $(,)?) => {
            #[test]
            fn $name() {
                assert_eq!(vec![$($tok),+], scan_all($input));
            }
        };
    }

    macro_rules! scanerr {
        ($name:ident, $input:expr, $msg:expr) => {
            #[test]
            fn $name() {
                assert_eq!($msg, scan_err($input));
            }
        };
    }

    scans!(integer, " 123", tok("123", TokenKind::Integer, 0, false));
    scans!(neg_integer, "-123", tok("-123", TokenKind::Integer, 0, false));
    scans!(float, "1.23", tok("1.23", TokenKind::Float, 0, false));
    scans!(neg_float, "-0.123", tok("-0.123", TokenKind::Float, 0, false));
    scans!(sci, "1.23e3", tok("1.23e3", TokenKind::Scientific, 0, false));
    scans!(
        sci_upper,
        "-1.12E3",
        tok("-1.12E3", TokenKind::Scientific, 0, false),
    );
    scans!(
        sci_signed,
        "1.12e-3",
        tok("1.12e-3", TokenKind::Scientific, 0, false),
    );
    scans!(
        sci_from_int,
        "112e+3",
        tok("112e+3", TokenKind::Scientific, 0, false),
    );
    scans!(bool_true, "true", tok("true", TokenKind::Boolean, 0, false));
    scans!(bool_false, "false", tok("false", TokenKind::Boolean, 0, false));
    scans!(null, "null", tok("null", TokenKind::Null, 0, false));
    scans!(
        string,
        "\"quote \\\"thing\\\"\"",
        tok("\"quote \\\"thing\\\"\"", TokenKind::String, 0, false),
    );
    scans!(
        numeric_string,
        "\"123\"",
        tok("\"123\"", TokenKind::String, 0, false),
    );
    scans!(empty_string, "\"\"", tok("\"\"", TokenKind::String, 0, false));
    scans!(
        leading_blank_string,
        "\" hi\"",
        tok("\" hi\"", TokenKind::String, 0, false),
    );
    scans!(empty_map, "{}", tok("{}", TokenKind::EmptyMap, 0, false));
    scans!(empty_array, "[]", tok("[]", TokenKind::EmptyArray, 0, false));

    scanerr!(
        bad_integer,
        "1-23",
        "Unexpected character '-' in integer at position 1",
    );
    scanerr!(
        bad_integer_alpha,
        "1lskd23",
        "Unexpected character 'l' in integer at position 1",
    );
    scanerr!(
        bad_leading_zero,
        "023",
        "Unexpected character '2' in float at position 1",
    );
    scanerr!(
        bad_neg_leading_zero,
        "-023",
        "Unexpected character '2' in float at position 2",
    );
    scanerr!(
        bad_float,
        "0.23.3",
        "Unexpected character '.' in float at position 4",
    );
    scanerr!(
        bad_sci,
        "1.23e--3",
        "Unexpected character '-' in scientific at position 6",
    );
    scanerr!(
        bad_sci_tail,
        "1.23e-3.",
        "Unexpected character '.' in scientific at position 7",
    );
    scanerr!(
        bad_literal,
        "nulk",
        "Unexpected character 'k' in null at position 3",
    );
    scanerr!(
        bad_map_key,
        "{123: 123",
        "Unexpected character '1' in map key at position 1",
    );
    scanerr!(
        bad_any,
        "xyz",
        "Unexpected character 'x' in JSON at position 0",
    );
    scanerr!(
        bad_colon,
        "{\"a\" 1}",
        "Unexpected character '1' in map at position 5",
    );

    #[test]
    fn scanner_halts_after_error() {
        let mut scan = Scanner::new("1-23".as_bytes());
        assert!(scan.next_token().is_err());
        assert!(scan.next_token().unwrap().is_none());
    }

    #[test]
    fn nested_structure_depths() {
        let toks = scan_all("{\"foo\":[1,[-23,\"hi\"],{}],\"bar\":null}");
        let expected = vec![
            tok("{", TokenKind::MapStart, 0, false),
            tok("\"foo\"", TokenKind::MapKey, 1, true),
            tok(":", TokenKind::MapColon, 1, true),
            tok("[", TokenKind::ArrayStart, 1, true),
            tok("1", TokenKind::Integer, 2, false),
            tok(",", TokenKind::ValueSeparator, 2, false),
            tok("[", TokenKind::ArrayStart, 2, false),
            tok("-23", TokenKind::Integer, 3, false),
            tok(",", TokenKind::ValueSeparator, 3, false),
            tok("\"hi\"", TokenKind::String, 3, false),
            tok("]", TokenKind::ArrayEnd, 2, false),
            tok(",", TokenKind::ValueSeparator, 2, false),
            tok("{}", TokenKind::EmptyMap, 2, false),
            tok("]", TokenKind::ArrayEnd, 1, true),
            tok(",", TokenKind::ValueSeparator, 1, true),
            tok("\"bar\"", TokenKind::MapKey, 1, true),
            tok(":", TokenKind::MapColon, 1, true),
            tok("null", TokenKind::Null, 1, true),
            tok("}", TokenKind::MapEnd, 0, false),
        ];
        assert_eq!(expected, toks);
    }

    #[test]
    fn payload_concat_equals_input_minus_whitespace() {
        let input = "{\"foo\": [1, [-23, false, \"hi\"], 0.23, [], {}, 2.3e-23], \"bar\": null}";
        let joined: String =
            scan_all(input).into_iter().map(|t| t.payload).collect();
        let stripped: String =
            input.chars().filter(|&c| !is_blank(c)).collect();
        assert_eq!(stripped, joined);
    }

    #[test]
    fn balanced_containers() {
        let mut depth = 0usize;
        for t in scan_all("{\"a\":[[{\"b\":[]}],{}]}") {
            match t.kind {
                TokenKind::MapStart | TokenKind::ArrayStart => {
                    assert_eq!(depth, t.depth);
                    depth += 1;
                }
                TokenKind::MapEnd | TokenKind::ArrayEnd => {
                    depth -= 1;
                    assert_eq!(depth, t.depth);
                }
                _ => assert!(t.depth <= depth),
            }
        }
        assert_eq!(0, depth);
    }

    #[test]
    fn multi_document_stream() {
        let toks = scan_all("123 \"foo\" {}");
        let expected = vec![
            tok("123", TokenKind::Integer, 0, false),
            tok("", TokenKind::NewDocument, 0, false),
            tok("\"foo\"", TokenKind::String, 0, false),
            tok("", TokenKind::NewDocument, 0, false),
            tok("{}", TokenKind::EmptyMap, 0, false),
        ];
        assert_eq!(expected, toks);
    }

    #[test]
    fn multi_document_without_separator() {
        let toks = scan_all("{}[]");
        let kinds: Vec<TokenKind> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            vec![
                TokenKind::EmptyMap,
                TokenKind::NewDocument,
                TokenKind::EmptyArray,
            ],
            kinds,
        );
    }

    #[test]
    fn ansi_sequences_are_skipped() {
        let input = "\u{1b}[0;36m\"hi\"\u{1b}[0m";
        assert_eq!(
            vec![tok("\"hi\"", TokenKind::String, 0, false)],
            scan_all(input),
        );
        // Внутри числа и между токенами — тоже.
        let input = "[1\u{1b}[0;33m2\u{1b}[0m, 3]";
        let payloads: Vec<String> =
            scan_all(input).into_iter().map(|t| t.payload).collect();
        assert_eq!(vec!["[", "12", ",", "3", "]"], payloads);
    }

    #[test]
    fn strict_ansi_rejects_escapes() {
        let mut scan = Scanner::new("\u{1b}[0m1".as_bytes()).strict_ansi();
        assert!(scan.next_token().is_err());
    }

    #[test]
    fn multibyte_across_buffer_boundary() {
        // Символы по 4 байта: граница куска попадает внутрь кодовой
        // последовательности.
        let body: String = std::iter::repeat('🍷').take(600).collect();
        let input = format!("\"{}\"", body);
        let toks = scan_all(&input);
        assert_eq!(1, toks.len());
        assert_eq!(input, toks[0].payload);
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let input: &[u8] = &[b'"', 0xff, 0xfe, 0xff, 0xfe, b'"'];
        let mut scan = Scanner::new(input);
        let err = loop {
            match scan.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected utf8 error"),
                Err(err) => break err,
            }
        };
        assert_eq!("Unparsable UTF-8 at position 1", err.to_string());
    }

    #[test]
    fn unterminated_scalar_flushes_at_eof() {
        assert_eq!(
            vec![tok("42", TokenKind::Integer, 0, false)],
            scan_all("42"),
        );
    }

    #[test]
    fn unterminated_string_yields_nothing() {
        assert!(scan_all("\"abc").is_empty());
    }
}
