//! Console logging setup.
//!
//! Uses the `log` facade with `env_logger`; lines carry a local wall-clock
//! timestamp. `RUST_LOG` overrides the default `info` level.

use chrono::Local;
use std::io::Write;

pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let timestamp = Local::now().format("%H:%M:%S%.3f");
            match record.level() {
                log::Level::Info => writeln!(buf, "[{}] {}", timestamp, record.args()),
                level => writeln!(buf, "[{}] {}: {}", timestamp, level, record.args()),
            }
        })
        .init();
}
