/*!
Журналирование pjs поверх крейта `log`.

Вся диагностика pjs — это горстка строк `debug!`/`trace!` из разбора
аргументов, компиляции путей и драйвера, поэтому логгер предельно
простой: один формат, вывод в stderr через `eprintln_locked!`, чтобы
строки журнала не перемешивались с форматируемым JSON, когда оба потока
подключены к одному tty.
*/

use log::Log;

/// Логгер в stderr с единственным форматом `УРОВЕНЬ|цель: сообщение`.
#[derive(Debug)]
pub(crate) struct Logger(());

/// Одиночка, используемый как цель для реализации трейта `Log`.
const LOGGER: &Logger = &Logger(());

impl Logger {
    /// Устанавливает логгер глобальным. Порог задаётся позже, при
    /// разборе флагов, через `log::set_max_level`.
    pub(crate) fn init() -> Result<(), log::SetLoggerError> {
        log::set_logger(LOGGER)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Имени цели достаточно, чтобы привязать строку к подсистеме:
        // источников журнала в pjs единицы, file:line ничего не добавил
        // бы, кроме шума.
        eprintln_locked!(
            "{}|{}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        // eprintln_locked! сбрасывает stderr при каждом вызове.
    }
}
