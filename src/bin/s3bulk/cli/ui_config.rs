use s3bulk::Config;

pub fn is_progress_indicator_needed(config: &Config) -> bool {
    if config.show_no_progress {
        return false;
    }

    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return true;
    };

    if log::Level::Warn < tracing_config.tracing_level {
        return false;
    }

    !tracing_config.json_tracing
}

pub fn is_show_result_needed(config: &Config) -> bool {
    config
        .tracing_config
        .as_ref()
        .is_none_or(|tracing_config| !tracing_config.json_tracing)
}

#[cfg(test)]
mod tests {
    use s3bulk::config::args::parse_from_args;

    use super::*;

    fn build_config(extra_args: &[&str]) -> Config {
        let mut args = vec!["s3bulk", "--profile", "profile"];
        args.extend_from_slice(extra_args);
        args.extend_from_slice(&["./src", "s3://upload-bucket"]);

        Config::try_from(parse_from_args(args).unwrap()).unwrap()
    }

    #[test]
    fn is_progress_indicator_needed_default() {
        init_dummy_tracing_subscriber();

        assert!(is_progress_indicator_needed(&build_config(&[])));
    }

    #[test]
    fn is_progress_indicator_needed_json_tracing() {
        init_dummy_tracing_subscriber();

        assert!(!is_progress_indicator_needed(&build_config(&[
            "--json-tracing"
        ])));
    }

    #[test]
    fn is_progress_indicator_needed_no_tracing_config() {
        init_dummy_tracing_subscriber();

        assert!(is_progress_indicator_needed(&build_config(&["-qqq"])));
    }

    #[test]
    fn is_progress_indicator_needed_info() {
        init_dummy_tracing_subscriber();

        assert!(!is_progress_indicator_needed(&build_config(&["-v"])));
    }

    #[test]
    fn is_progress_indicator_needed_show_no_progress() {
        init_dummy_tracing_subscriber();

        assert!(!is_progress_indicator_needed(&build_config(&[
            "--show-no-progress"
        ])));
    }

    #[test]
    fn is_show_result_needed_default() {
        init_dummy_tracing_subscriber();

        assert!(is_show_result_needed(&build_config(&[])));
        assert!(is_show_result_needed(&build_config(&["-qqq"])));
    }

    #[test]
    fn is_show_result_needed_show_no_progress() {
        init_dummy_tracing_subscriber();

        let config = build_config(&["--show-no-progress"]);
        assert!(!is_progress_indicator_needed(&config));
        assert!(is_show_result_needed(&config));
    }

    #[test]
    fn is_show_result_needed_json_tracing() {
        init_dummy_tracing_subscriber();

        assert!(!is_show_result_needed(&build_config(&[
            "-v",
            "--json-tracing"
        ])));
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
