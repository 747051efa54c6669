/*!
Этот модуль определяет макрос для сообщений в stderr.

pjs пишет диагностику в stderr, но блокирует при этом stdout: когда оба
потока подключены к одному tty, это не даёт строкам перемешиваться с
форматируемым JSON.
*/

/// Как eprintln, но блокирует stdout для предотвращения перемешивания строк.
#[macro_export]
macro_rules! eprintln_locked {
    ($($tt:tt)*) => {{
        {
            use std::io::Write;

            let stdout = std::io::stdout().lock();
            let mut stderr = std::io::stderr().lock();
            // Ошибки записи в stderr здесь намеренно не поднимаются:
            // правдоподобный случай — разрыв канала, и тогда мы
            // завершаемся по соглашению Unix.
            if let Err(err) = writeln!(stderr, $($tt)*) {
                if err.kind() == std::io::ErrorKind::BrokenPipe {
                    std::process::exit(0);
                } else {
                    std::process::exit(3);
                }
            }
            drop(stdout);
        }
    }}
}
