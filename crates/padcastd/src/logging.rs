// Colorized wrappers for logging

use fern::Dispatch;

#[inline(always)]
pub(crate) fn format_log(message: &str) -> String {
    let now = chrono::Local::now().format("%Y.%m.%d %H:%M:%S").to_string();
    format!("[{now}] {message}")
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::error!("{}", message.bright_red());
    }
}

#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::info!("{message}");
    }
}

#[macro_export]
macro_rules! print_debug {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::debug!("{}", message.dimmed());
    }
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::warn!("{}", message.bright_yellow());
    }
}

/// Setup the logger.
pub fn setup(verbose: bool, no_color: bool) -> Result<(), log::SetLoggerError> {
    let log_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    // Registry records are raw, give them the same timestamp as our own lines.
    let registry = Dispatch::new()
        .filter(|meta| meta.target().starts_with("padcast_registry"))
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_log(&format!("{}: {message}", record.level()))
            ));
        })
        .chain(std::io::stdout());
    let own = Dispatch::new()
        .filter(|meta| !meta.target().starts_with("padcast_registry"))
        .chain(std::io::stdout());
    Dispatch::new()
        .level(log::LevelFilter::Warn)
        .level_for("padcastd", log_level)
        .level_for("padcast_registry", log_level)
        .chain(registry)
        .chain(own)
        .apply()?;

    if no_color {
        colored::control::set_override(false);
    }
    Ok(())
}
