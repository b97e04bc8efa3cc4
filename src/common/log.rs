//! Logging helpers

/// Initialize the logger
///
/// `RUST_LOG` wins when set, otherwise `level` is used as the default filter.
/// Calling this more than once is harmless; later calls are ignored.
///
/// # Parameters
///
/// * `level` - Log level
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice() {
        // The global logger can only be installed once per process
        init_logger("debug");
        init_logger("trace");
    }
}
