/*!
Разбирает аргументы командной строки в структурированное и типизированное
представление.
*/

use std::{ffi::OsString, path::PathBuf};

use anyhow::Context;

/// Результат разбора аргументов CLI.
///
/// Это в основном `anyhow::Result<Args>`, но с одним дополнительным
/// вариантом для «специальных» режимов `-h/--help` и `-V/--version`:
/// они коротко замыкают разбор и не требуют ни чтения окружения, ни
/// компиляции путей.
#[derive(Debug)]
pub(crate) enum ParseResult {
    Special(SpecialMode),
    Ok(Args),
    Err(anyhow::Error),
}

/// Режим, при котором вместо обработки данных выводится служебный текст.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SpecialMode {
    Help,
    Version,
}

/// Уровень журналирования, запрошенный флагами.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LoggingMode {
    Debug,
    Trace,
}

/// Высокоуровневые аргументы: значения флагов поверх значений окружения,
/// с уже скомпилированными выражениями путей.
#[derive(Debug)]
pub(crate) struct Args {
    /// Раскрашивать ли скаляры последовательностями ANSI.
    pub(crate) color: bool,
    /// Ширина одной ступени отступа в пробелах.
    pub(crate) indent: usize,
    /// Подавлять ли вывод документа, в котором фильтр ничего не нашёл.
    pub(crate) hide_empty: bool,
    /// Файл входа; `None` — stdin.
    pub(crate) file: Option<PathBuf>,
    /// Скомпилированные выражения путей (всё после `--`).
    pub(crate) paths: Vec<pjs_paths::PathExpr>,
}

/// Разбирает аргументы CLI и окружение в высокоуровневое представление.
pub(crate) fn parse() -> ParseResult {
    if let Err(err) = crate::logger::Logger::init() {
        let err = anyhow::anyhow!("не удалось инициализировать логгер: {err}");
        return ParseResult::Err(err);
    }
    let low = match parse_low() {
        Ok(low) => low,
        Err(err) => return ParseResult::Err(err),
    };
    set_log_levels(&low);
    if let Some(special) = low.special {
        return ParseResult::Special(special);
    }
    match Args::from_low(low) {
        Ok(args) => ParseResult::Ok(args),
        Err(err) => ParseResult::Err(err),
    }
}

/// Низкоуровневые аргументы: ровно то, что пользователь передал флагами,
/// до наложения значений окружения.
#[derive(Debug, Default)]
struct LowArgs {
    special: Option<SpecialMode>,
    logging: Option<LoggingMode>,
    color: Option<bool>,
    indent: Option<usize>,
    hide_empty: Option<bool>,
    file: Option<PathBuf>,
    path_args: Vec<String>,
}

fn parse_low() -> anyhow::Result<LowArgs> {
    let mut argv: Vec<OsString> = std::env::args_os().skip(1).collect();
    let mut low = LowArgs::default();

    // Всё после `--` — выражения путей, lexopt их не видит.
    if let Some(sep) = argv.iter().position(|a| a == "--") {
        for arg in argv.split_off(sep).into_iter().skip(1) {
            let arg = arg.into_string().map_err(|arg| {
                anyhow::anyhow!("invalid path argument {:?}", arg)
            })?;
            low.path_args.push(arg);
        }
    }

    use lexopt::prelude::*;
    let mut parser = lexopt::Parser::from_args(argv);
    while let Some(arg) = parser.next().context("invalid arguments")? {
        match arg {
            Short('h') | Long("help") => {
                low.special = Some(SpecialMode::Help);
            }
            Short('V') | Long("version") => {
                low.special = Some(SpecialMode::Version);
            }
            Short('c') | Long("color") => {
                low.color = Some(match parser.optional_value() {
                    None => true,
                    Some(v) => {
                        let v = v.string()?;
                        // Для короткой формы `-c=false` знак равенства
                        // остаётся в присоединённом значении.
                        parse_bool(v.strip_prefix('=').unwrap_or(&v))?
                    }
                });
            }
            Short('i') | Long("indent") => {
                let v = parser.value()?.string()?;
                let width: usize = v
                    .parse()
                    .with_context(|| format!("invalid indent width {:?}", v))?;
                low.indent = Some(width);
            }
            Short('m') | Long("hide-empty") => {
                low.hide_empty = Some(true);
            }
            Long("debug") => low.logging = Some(LoggingMode::Debug),
            Long("trace") => low.logging = Some(LoggingMode::Trace),
            Value(v) => {
                if low.file.is_some() {
                    anyhow::bail!("Only one file name may be specified");
                }
                low.file = Some(PathBuf::from(v));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }
    Ok(low)
}

impl Args {
    /// Накладывает флаги на значения окружения и компилирует пути.
    fn from_low(low: LowArgs) -> anyhow::Result<Args> {
        let color = match low.color {
            Some(yes) => yes,
            None => env_bool("PJS_COLOR")?.unwrap_or(true),
        };
        let indent = match low.indent {
            Some(width) => width,
            None => env_usize("PJS_INDENT")?.unwrap_or(2),
        };
        let hide_empty = match low.hide_empty {
            Some(yes) => yes,
            None => env_bool("PJS_HIDE_EMPTY")?.unwrap_or(false),
        };
        let mut paths = vec![];
        for arg in &low.path_args {
            paths.push(pjs_paths::PathExpr::new(arg)?);
        }
        log::debug!(
            "color={}, indent={}, hide_empty={}, {} path(s)",
            color,
            indent,
            hide_empty,
            paths.len()
        );
        Ok(Args { color, indent, hide_empty, file: low.file, paths })
    }
}

/// Устанавливает глобальный уровень журнала из низкоуровневых аргументов.
fn set_log_levels(low: &LowArgs) {
    match low.logging {
        Some(LoggingMode::Trace) => {
            log::set_max_level(log::LevelFilter::Trace)
        }
        Some(LoggingMode::Debug) => {
            log::set_max_level(log::LevelFilter::Debug)
        }
        None => log::set_max_level(log::LevelFilter::Warn),
    }
}

fn parse_bool(v: &str) -> anyhow::Result<bool> {
    match v {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => anyhow::bail!("expected 'true' or 'false', got {:?}", v),
    }
}

fn env_bool(name: &str) -> anyhow::Result<Option<bool>> {
    match std::env::var_os(name) {
        None => Ok(None),
        Some(v) => {
            let v = v.into_string().map_err(|v| {
                anyhow::anyhow!("${}: invalid value {:?}", name, v)
            })?;
            parse_bool(&v).map(Some).with_context(|| format!("${}", name))
        }
    }
}

fn env_usize(name: &str) -> anyhow::Result<Option<usize>> {
    match std::env::var_os(name) {
        None => Ok(None),
        Some(v) => {
            let v = v.into_string().map_err(|v| {
                anyhow::anyhow!("${}: invalid value {:?}", name, v)
            })?;
            let parsed = v.parse::<usize>().with_context(|| {
                format!("${}: invalid value {:?}", name, v)
            })?;
            Ok(Some(parsed))
        }
    }
}

/// Текст краткой справки.
pub(crate) const USAGE: &str = "\
pjs - Pretty print and manipulate JSON data

USAGE:
    pjs [options] [file] [-- path ...]

Reads whitespace-separated JSON documents from stdin or the given file,
pretty prints them and, when path expressions are given after `--`,
renders only the union of the matched subtrees.

OPTIONS:
    -c, --color[=BOOL]   Colorize output (default: true; env: PJS_COLOR)
    -i, --indent N       Indent width (default: 2; env: PJS_INDENT)
    -m, --hide-empty     Skip documents with no path matches
                         (env: PJS_HIDE_EMPTY)
        --debug          Show debug messages
        --trace          Show trace messages
    -h, --help           Show this help
    -V, --version        Show version

PATHS:
    A path is a `/`-separated list of KEY or KEY=VALUE patterns:
    `*` matches any step, `**` descends recursively, `..` pops to the
    parent, `^pat` inverts a pattern, `N..M` matches an integer range,
    `a|b` and `(...)` pass through to the regex engine, `\\x` escapes.
";
