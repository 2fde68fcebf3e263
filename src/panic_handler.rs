use std::io::{self, Write};
use std::panic;

use crossterm::{
    cursor::Show,
    event::DisableMouseCapture,
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};

/// Put the terminal back before any panic report reaches stderr
pub fn install_panic_hook() {
    better_panic::install();

    let report = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore_terminal();

        let at = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        log::error!("Viewer panicked at {at}: {info}");
        log::logger().flush();

        report(info);
        std::process::exit(1);
    }));
}

/// Leave raw mode and the alternate screen with the cursor visible
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen, Show);
    let _ = writeln!(io::stderr());
}
