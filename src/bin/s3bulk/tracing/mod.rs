use std::env;

use rusty_fork::rusty_fork_test;
use tracing_subscriber::fmt::format::FmtSpan;

use s3bulk::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";
const AWS_SDK_TARGETS: [&str; 4] = ["aws_sdk_s3", "aws_smithy_runtime", "aws_config", "aws_sigv4"];

pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (event_filter, show_target) =
        build_event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = tracing_subscriber::fmt()
        .compact()
        .with_ansi(!config.disable_color_tracing)
        .with_span_events(fmt_span)
        .with_env_filter(event_filter)
        .with_target(show_target);

    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}

// Returns the filter directives and whether event targets are worth showing.
fn build_event_filter(config: &TracingConfig, env_filter: Option<String>) -> (String, bool) {
    let tracing_level = config.tracing_level;

    if config.aws_sdk_tracing {
        let mut directives = vec![format!("s3bulk={tracing_level}")];
        directives.extend(
            AWS_SDK_TARGETS
                .iter()
                .map(|target| format!("{target}={tracing_level}")),
        );
        return (directives.join(","), true);
    }

    match env_filter {
        Some(env_filter) => (env_filter, true),
        None => (format!("s3bulk={tracing_level}"), false),
    }
}


#[cfg(test)]
fn forked_tracing_config(json_tracing: bool, span_events_tracing: bool) -> TracingConfig {
    TracingConfig {
        tracing_level: log::Level::Info,
        json_tracing,
        aws_sdk_tracing: span_events_tracing,
        span_events_tracing,
        disable_color_tracing: !json_tracing,
    }
}

rusty_fork_test! {
    #[test]
    fn init_json_tracing() {
        init_tracing(&forked_tracing_config(true, false));
    }

    #[test]
    fn init_span_events_tracing() {
        init_tracing(&forked_tracing_config(false, true));
    }

    #[test]
    fn init_with_env() {
        // separated process, so the environment can be changed.
        unsafe { env::set_var(EVENT_FILTER_ENV_VAR, "trace") };

        init_tracing(&forked_tracing_config(false, false));
    }
}
