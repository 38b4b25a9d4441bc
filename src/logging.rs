use env_logger::{Builder, Env, Target};
use log::LevelFilter;

const LOG_ENV: &str = "SQL2ES_LOG";

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Route `log` output to stderr. `SQL2ES_LOG` takes precedence over `-v`.
pub fn init(verbosity: u8) {
    let mut builder = Builder::new();
    builder
        .filter_level(level_for(verbosity))
        .target(Target::Stderr)
        .format_timestamp_millis()
        .parse_env(Env::new().filter(LOG_ENV));
    let _ = builder.try_init();
}
