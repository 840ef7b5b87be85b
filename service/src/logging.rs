use crate::config::{Config, RustEnv};
use log::LevelFilter;
use simplelog::{self, ColorChoice, ConfigBuilder};

/// Modules to filter out from logging when not in Trace mode.
/// These are HTTP stack internals that clutter request-level log output.
const FILTERED_MODULES: &[&str] = &[
    "tower", "tracing", "hyper", "axum", "reqwest", "rustls", "h2", "mockito",
];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger with configuration based on the provided Config.
    ///
    /// When the log level is set to Trace, all logs including dependency logs are shown.
    /// For all other log levels, HTTP stack logs are filtered out. Production output is
    /// never colored so log collectors receive plain text.
    pub fn init_logger(config: &Config) {
        let log_level_filter = Self::convert_level_filter(config.log_level_filter);
        let apply_filters = Self::should_filter_dependencies(config.log_level_filter);
        let log_config = Self::build_log_config(apply_filters);

        simplelog::TermLogger::init(
            log_level_filter,
            log_config,
            simplelog::TerminalMode::Mixed,
            Self::color_choice(&config.runtime_env),
        )
        .expect("Failed to start simplelog");
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn color_choice(runtime_env: &RustEnv) -> ColorChoice {
        match runtime_env {
            RustEnv::Production => ColorChoice::Never,
            RustEnv::Development | RustEnv::Staging => ColorChoice::Auto,
        }
    }

    /// Builds a simplelog Config with optional module filtering.
    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_cover_http_stack() {
        // Server and client HTTP internals are noisy below Trace
        for module in ["tower", "hyper", "axum", "reqwest", "rustls"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{} should be filtered",
                module
            );
        }
    }

    #[test]
    fn test_filtered_modules_keep_workspace_crates() {
        // Our own crates must never be silenced by a prefix filter
        for module in ["web", "domain", "service", "chatbot_auth", "chatbot_ai"] {
            assert!(
                !FILTERED_MODULES.iter().any(|f| module.starts_with(f)),
                "{} should not be filtered",
                module
            );
        }
    }

    #[test]
    fn test_only_trace_shows_dependency_logs() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(Logger::should_filter_dependencies(level), "{:?}", level);
        }
    }

    #[test]
    fn test_production_logs_are_uncolored() {
        assert!(matches!(
            Logger::color_choice(&RustEnv::Production),
            ColorChoice::Never
        ));
        assert!(matches!(
            Logger::color_choice(&RustEnv::Development),
            ColorChoice::Auto
        ));
    }

    #[test]
    fn test_build_log_config_does_not_panic() {
        let _filtered = Logger::build_log_config(true);
        let _unfiltered = Logger::build_log_config(false);
    }

    #[test]
    fn test_convert_level_filter_preserves_order() {
        assert_eq!(
            Logger::convert_level_filter(LevelFilter::Warn) as u8,
            simplelog::LevelFilter::Warn as u8
        );
        assert!(
            Logger::convert_level_filter(LevelFilter::Debug)
                > Logger::convert_level_filter(LevelFilter::Info)
        );
    }
}
