
// imports
use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

// -v / -q counts around the default `info` level
pub fn level_from_flags(verbose: u8, quiet: u8) -> LevelFilter {
    match verbose as i16 - quiet as i16 {
        i16::MIN..=-2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger. `RUST_LOG`, when set, wins over the flags.
pub fn init(verbose: u8, quiet: u8) {
    let level = level_from_flags(verbose, quiet);
    let env = Env::default().default_filter_or(level.as_str());

    // a second call (tests, embedding applications) keeps the first logger
    let _ = Builder::from_env(env)
        .format(|buf, record| {
            writeln!(buf, "{} [{}] {} - {}",
                buf.timestamp_seconds(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args())
        })
        .try_init();
}
