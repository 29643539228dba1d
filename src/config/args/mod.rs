use crate::Config;
use crate::config::args::value_parser::{bucket, url};
use crate::config::{CLITimeoutConfig, ClientConfig, RetryConfig, TracingConfig};
use crate::types::error::BulkError;
use crate::types::{AccessKeys, ClientConfigLocation, S3Credentials};
use aws_smithy_types::checksum_config::RequestChecksumCalculation;
use clap::Parser;
use clap::builder::{ArgPredicate, NonEmptyStringValueParser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
#[cfg(feature = "version")]
use shadow_rs::shadow;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

mod value_parser;

const DEFAULT_WORKER_SIZE: u16 = 200;
const DEFAULT_MAX_KEYS: i32 = 1000;
const DEFAULT_SINGLE_PAGE_LISTING: bool = false;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_ENDPOINT_URL_TEMPLATE: &str = "https://{account_id}.r2.cloudflarestorage.com";
const DEFAULT_ACCOUNT_ENDPOINT_REGION: &str = "auto";
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_SHOW_NO_PROGRESS: bool = false;
const DEFAULT_IGNORE_SYMLINKS: bool = false;
const DEFAULT_NO_GUESS_MIME_TYPE: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;

const SOURCE_DIR_NOT_FOUND: &str = "directory must be specified as a source\n";
const NO_SOURCE_SPECIFIED: &str = "SOURCE must be specified\n";

#[cfg(feature = "version")]
shadow!(build);

#[derive(Parser, Clone, Debug)]
#[cfg_attr(feature = "version", command(version=format!("{} ({} {}), {}", build::PKG_VERSION, build::SHORT_COMMIT, build::BUILD_TARGET, build::RUST_VERSION)))]
pub struct CLIArgs {
    #[arg(env, help = "local directory whose files are uploaded", default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "."), required = false)]
    source: String,

    #[arg(env, help = "s3://<BUCKET_NAME> or <BUCKET_NAME>", value_parser = bucket::check_bucket, default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "s3://ignored"), required = false)]
    bucket: String,

    /// bucket drained after the upload. The default is BUCKET itself
    #[arg(long, env, value_parser = bucket::check_bucket, help_heading = "General")]
    drain_bucket: Option<String>,

    /// list only one page per drain iteration instead of following continuation tokens
    #[arg(long, env, default_value_t = DEFAULT_SINGLE_PAGE_LISTING, help_heading = "General")]
    single_page_listing: bool,

    /// AWS config file read for the region of --profile
    #[arg(long, env, value_name = "FILE", help_heading = "AWS Configuration")]
    aws_config_file: Option<PathBuf>,

    /// AWS shared credentials file read for --profile
    #[arg(long, env, value_name = "FILE", help_heading = "AWS Configuration")]
    aws_shared_credentials_file: Option<PathBuf>,

    /// named profile of the AWS shared config
    #[arg(long, env, conflicts_with_all = ["access_key", "secret_access_key", "session_token"], help_heading = "AWS Configuration")]
    profile: Option<String>,

    /// access key id used instead of a profile
    #[arg(long, env, conflicts_with_all = ["profile"], requires = "secret_access_key", help_heading = "AWS Configuration")]
    access_key: Option<String>,

    /// secret access key paired with --access-key
    #[arg(long, env, conflicts_with_all = ["profile"], requires = "access_key", help_heading = "AWS Configuration")]
    secret_access_key: Option<String>,

    /// session token of temporary credentials
    #[arg(long, env, conflicts_with_all = ["profile"], requires = "access_key", help_heading = "AWS Configuration")]
    session_token: Option<String>,

    /// region. With --account-id, the default is "auto"
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Endpoint Options")]
    region: Option<String>,

    /// endpoint url
    #[arg(long, env, value_parser = url::check_scheme, conflicts_with = "account_id", help_heading = "Endpoint Options")]
    endpoint_url: Option<String>,

    /// account id substituted into --endpoint-url-template
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Endpoint Options")]
    account_id: Option<String>,

    /// endpoint url template used with --account-id
    #[arg(long, env, default_value = DEFAULT_ENDPOINT_URL_TEMPLATE, value_parser = url::check_endpoint_url_template, help_heading = "Endpoint Options")]
    endpoint_url_template: String,

    /// force path-style addressing for the endpoint
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "Endpoint Options")]
    force_path_style: bool,

    /// number of workers for upload and deletion
    #[arg(long, env, default_value_t = DEFAULT_WORKER_SIZE, value_parser = clap::value_parser!(u16).range(1..), help_heading = "Performance")]
    worker_size: u16,

    /// maximum number of objects returned in a single list object request
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, value_parser = clap::value_parser!(i32).range(1..=1000), help_heading = "Performance")]
    max_keys: i32,

    /// tracing level. -v enables info, -vv debug and -vvv trace. -qq disables tracing
    #[clap(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// emit tracing events as JSON lines
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing/Logging")]
    json_tracing: bool,

    /// include the tracing events of the AWS SDK
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Tracing/Logging")]
    aws_sdk_tracing: bool,

    /// include span open and close events
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Tracing/Logging")]
    span_events_tracing: bool,

    /// plain tracing output without ANSI colors
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Tracing/Logging")]
    disable_color_tracing: bool,

    /// do not print a line per uploaded/deleted object
    #[arg(long, env, default_value_t = DEFAULT_SHOW_NO_PROGRESS, help_heading = "Tracing/Logging")]
    show_no_progress: bool,

    /// attempts per request, including the first one, made by the SDK retry handler
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, value_name = "ATTEMPTS", help_heading = "Retry Options")]
    aws_max_attempts: u32,

    /// base of the exponential backoff with jitter between SDK retries (milliseconds)
    #[arg(long, env, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, value_name = "MILLISECONDS", help_heading = "Retry Options")]
    initial_backoff_milliseconds: u64,

    /// whole request timeout including retries (milliseconds). Unlimited by default
    #[arg(long, env, value_name = "MILLISECONDS", help_heading = "Timeout Options")]
    operation_timeout_milliseconds: Option<u64>,

    /// single attempt timeout (milliseconds). Unlimited by default
    #[arg(long, env, value_name = "MILLISECONDS", help_heading = "Timeout Options")]
    operation_attempt_timeout_milliseconds: Option<u64>,

    /// connection timeout (milliseconds). The SDK default applies when omitted
    #[arg(long, env, value_name = "MILLISECONDS", help_heading = "Timeout Options")]
    connect_timeout_milliseconds: Option<u64>,

    /// socket read timeout (milliseconds). Unlimited by default
    #[arg(long, env, value_name = "MILLISECONDS", help_heading = "Timeout Options")]
    read_timeout_milliseconds: Option<u64>,

    /// skip symbolic links instead of uploading their targets
    #[arg(long, env, default_value_t = DEFAULT_IGNORE_SYMLINKS, help_heading = "Advanced")]
    ignore_symlinks: bool,

    /// upload without a Content-Type guessed from the file extension
    #[arg(long, env, default_value_t = DEFAULT_NO_GUESS_MIME_TYPE, help_heading = "Advanced")]
    no_guess_mime_type: bool,

    /// turn off the stalled stream protection of the SDK
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "Advanced")]
    disable_stalled_stream_protection: bool,

    /// print a completion script for SHELL (bash, fish, zsh, powershell, elvish) and exit
    #[arg(long, env, value_name = "SHELL", value_parser = clap_complete::shells::Shell::from_str, help_heading = "Advanced")]
    auto_complete_shell: Option<clap_complete::shells::Shell>,
}

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    crate::Config::try_from(config_args)
}

impl CLIArgs {
    fn validate_source(&self) -> Result<(), String> {
        if self.auto_complete_shell.is_some() {
            return Ok(());
        }

        if self.source.is_empty() {
            return Err(NO_SOURCE_SPECIFIED.to_string());
        }

        if !PathBuf::from(&self.source).is_dir() {
            return Err(SOURCE_DIR_NOT_FOUND.to_string());
        }

        Ok(())
    }

    fn build_credential(&self) -> S3Credentials {
        if let Some(profile) = self.profile.clone() {
            return S3Credentials::Profile(profile);
        }

        match (&self.access_key, &self.secret_access_key) {
            (Some(access_key), Some(secret_access_key)) => S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: access_key.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                    session_token: self.session_token.clone(),
                },
            },
            _ => S3Credentials::FromEnvironment,
        }
    }

    fn build_endpoint_url(&self) -> Option<String> {
        if self.endpoint_url.is_some() {
            return self.endpoint_url.clone();
        }

        self.account_id.as_ref().map(|account_id| {
            url::expand_endpoint_url_template(&self.endpoint_url_template, account_id)
        })
    }

    fn build_region(&self) -> Option<String> {
        if self.region.is_some() {
            return self.region.clone();
        }

        self.account_id
            .as_ref()
            .map(|_| DEFAULT_ACCOUNT_ENDPOINT_REGION.to_string())
    }

    fn build_client_config(&self) -> ClientConfig {
        ClientConfig {
            client_config_location: ClientConfigLocation {
                aws_config_file: self.aws_config_file.clone(),
                aws_shared_credentials_file: self.aws_shared_credentials_file.clone(),
            },
            credential: self.build_credential(),
            region: self.build_region(),
            endpoint_url: self.build_endpoint_url(),
            force_path_style: self.force_path_style,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
            // S3-compatible stores often reject the newer default checksum headers.
            request_checksum_calculation: RequestChecksumCalculation::WhenRequired,
        }
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(value: CLIArgs) -> Result<Self, Self::Error> {
        value.validate_source()?;

        let tracing_config = value.verbosity.log_level().map(|log_level| TracingConfig {
            tracing_level: log_level,
            json_tracing: value.json_tracing,
            aws_sdk_tracing: value.aws_sdk_tracing,
            span_events_tracing: value.span_events_tracing,
            disable_color_tracing: value.disable_color_tracing,
        });

        let upload_bucket =
            bucket::parse_bucket_name(&value.bucket).map_err(|e: BulkError| e.to_string())?;
        let drain_bucket = match value.drain_bucket.as_ref() {
            Some(drain_bucket) => {
                bucket::parse_bucket_name(drain_bucket).map_err(|e| e.to_string())?
            }
            None => upload_bucket.clone(),
        };

        Ok(Config {
            source_dir: PathBuf::from(&value.source),
            upload_bucket,
            drain_bucket,
            client_config: Some(value.build_client_config()),
            tracing_config,
            worker_size: value.worker_size,
            max_keys: value.max_keys,
            follow_pagination: !value.single_page_listing,
            follow_symlinks: !value.ignore_symlinks,
            no_guess_mime_type: value.no_guess_mime_type,
            show_no_progress: value.show_no_progress,
            auto_complete_shell: value.auto_complete_shell,
        })
    }
}
