use env_logger::{Builder, Env};

pub const LOG_ENV: &str = "FBK_LOG";
pub const DEFAULT_FILTER: &str = "info";

fn builder() -> Builder {
    let mut builder = Builder::from_env(Env::default().filter_or(LOG_ENV, DEFAULT_FILTER));
    builder.format_timestamp(None).format_target(false);
    builder
}

/// Installs the stderr logger. The filter comes from `FBK_LOG` using
/// env_logger syntax (`warn`, `first_blood_king=debug`, ...), default info.
/// Calling it twice is harmless.
pub fn init() {
    if let Err(err) = builder().try_init() {
        log::debug!("logger already installed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_ignored() {
        init();
        init();
        log::info!("still logging");
    }
}
