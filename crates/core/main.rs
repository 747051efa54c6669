/*!
Точка входа в pjs.
*/

use std::{io::Write, process::ExitCode};

use anyhow::Context;

use pjs_fmt::{ConsoleColorizer, Encoder, Formatter, Indenter, Processor};
use pjs_paths::MatchSet;
use pjs_value::Value;

#[macro_use]
mod messages;

mod flags;
mod logger;

fn main() -> ExitCode {
    match run(flags::parse()) {
        Ok(code) => code,
        Err(err) => {
            // Ищем ошибку разрыва канала. В этом случае мы хотим выйти
            // «грациозно» с кодом выхода успеха, по существующему
            // соглашению Unix. Среда выполнения Rust не запрашивает
            // сигналы PIPE, поэтому вместо сигнала мы получаем ошибку
            // ввода-вывода.
            for cause in err.chain() {
                if let Some(ioerr) = cause.downcast_ref::<std::io::Error>() {
                    if ioerr.kind() == std::io::ErrorKind::BrokenPipe {
                        return ExitCode::from(0);
                    }
                }
            }
            eprintln_locked!("Error: {:#}", err);
            exit_code_for(&err)
        }
    }
}

/// Сопоставляет цепочку причин ошибки с кодами выхода: 1 — ошибка
/// использования или файла, 2 — невалидный JSON, 3 — ввод-вывод.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if cause.downcast_ref::<serde_json::Error>().is_some() {
            return ExitCode::from(2);
        }
        if let Some(err) = cause.downcast_ref::<pjs_fmt::Error>() {
            return match *err {
                pjs_fmt::Error::Scan(_) => ExitCode::from(2),
                pjs_fmt::Error::Io(_) => ExitCode::from(3),
            };
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ExitCode::from(3);
        }
    }
    ExitCode::from(1)
}

/// Основная точка входа pjs.
///
/// Документы декодируются целиком, прогоняются через фильтр путей (если
/// он задан) и ставятся в очередь одного кодировщика: так разделение
/// документов обрабатывает сам конвейер форматирования.
fn run(result: flags::ParseResult) -> anyhow::Result<ExitCode> {
    use flags::ParseResult;

    let args = match result {
        ParseResult::Err(err) => return Err(err),
        ParseResult::Special(mode) => return special(mode),
        ParseResult::Ok(args) => args,
    };

    let docs = read_documents(&args)?;
    log::debug!("decoded {} document(s)", docs.len());

    let mut enc = Encoder::new();
    let mut queued = 0;
    for doc in &docs {
        if queue_document(&args, doc, &mut enc) {
            queued += 1;
        }
    }
    if queued == 0 {
        return Ok(ExitCode::from(0));
    }

    let mut processors: Vec<Box<dyn Processor>> = vec![];
    if args.color {
        processors.push(Box::new(ConsoleColorizer::new()));
    }
    processors.push(Box::new(Indenter::new("", " ".repeat(args.indent))));
    let formatter = Formatter::new(processors);

    let stdout = std::io::stdout().lock();
    let mut wtr = std::io::BufWriter::new(stdout);
    formatter.process(enc, &mut wtr)?;
    wtr.write_all(b"\n")?;
    wtr.flush()?;
    Ok(ExitCode::from(0))
}

/// Ставит один документ в очередь кодировщика; false, если документ
/// выводить не нужно.
fn queue_document(
    args: &flags::Args,
    doc: &Value,
    enc: &mut Encoder,
) -> bool {
    if args.paths.is_empty() {
        enc.push_value(doc);
        return true;
    }
    let sets: Vec<MatchSet> =
        args.paths.iter().map(|p| p.matches(doc)).collect();
    let set = MatchSet::concat(sets);
    log::debug!("{} match(es) in document", set.len());
    if set.is_empty() {
        if args.hide_empty {
            return false;
        }
        // Пустой результат отображается пустым контейнером того же
        // вида, что и документ; у скалярного документа поддеревьев нет.
        return match *doc {
            Value::Map(_) | Value::Record(_) => {
                enc.push_value(&Value::Map(Default::default()));
                true
            }
            Value::Seq(_) => {
                enc.push_value(&Value::Seq(vec![]));
                true
            }
            _ => false,
        };
    }
    match set.to_iter() {
        Some(it) => enc.push_iter(it),
        // Корневое совпадение по скалярному документу.
        None => enc.push_value(doc),
    }
    true
}

/// Декодирует все документы входа в динамические значения.
fn read_documents(args: &flags::Args) -> anyhow::Result<Vec<Value>> {
    let rdr: Box<dyn std::io::Read> = match args.file {
        Some(ref path) => {
            let file = std::fs::File::open(path).map_err(|err| {
                anyhow::anyhow!("{}: {}", path.display(), err)
            })?;
            Box::new(file)
        }
        None => Box::new(std::io::stdin().lock()),
    };
    let mut docs = vec![];
    let stream = serde_json::Deserializer::from_reader(rdr)
        .into_iter::<serde_json::Value>();
    for result in stream {
        let doc = result.context("invalid JSON input")?;
        docs.push(Value::from(doc));
    }
    Ok(docs)
}

/// Вывод справки или версии.
fn special(mode: flags::SpecialMode) -> anyhow::Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();
    match mode {
        flags::SpecialMode::Help => {
            write!(stdout, "{}", flags::USAGE)?;
        }
        flags::SpecialMode::Version => {
            writeln!(stdout, "pjs {}", env!("CARGO_PKG_VERSION"))?;
        }
    }
    Ok(ExitCode::from(0))
}
