use std::path::Path;
use std::time::Duration;

use aws_config::meta::region::{ProvideRegion, RegionProviderChain};
use aws_config::profile::{ProfileFileCredentialsProvider, ProfileFileRegionProvider};
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, ConfigLoader};
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials};
use aws_smithy_runtime_api::client::stalled_stream_protection::StalledStreamProtectionConfig;
use aws_smithy_types::timeout::TimeoutConfig;
use aws_types::SdkConfig;
use aws_types::region::Region;

use crate::config::ClientConfig;
use crate::types::S3Credentials;

impl ClientConfig {
    pub async fn create_client(&self) -> Client {
        let sdk_config = self.load_sdk_config().await;

        let mut config_builder = Builder::from(&sdk_config)
            .force_path_style(self.force_path_style)
            .request_checksum_calculation(self.request_checksum_calculation);
        if let Some(timeout_config) = self.build_timeout_config() {
            config_builder = config_builder.timeout_config(timeout_config);
        }

        Client::from_conf(config_builder.build())
    }

    async fn load_sdk_config(&self) -> SdkConfig {
        let stalled_stream_protection = if self.disable_stalled_stream_protection {
            StalledStreamProtectionConfig::disabled()
        } else {
            StalledStreamProtectionConfig::enabled().build()
        };

        let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
            .stalled_stream_protection(stalled_stream_protection)
            .region(self.build_region_provider())
            .retry_config(self.build_retry_config());
        config_loader = self.with_credentials_provider(config_loader);

        if let Some(endpoint_url) = &self.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint_url);
        }

        config_loader.load().await
    }

    // FromEnvironment leaves the default provider chain in place.
    fn with_credentials_provider(&self, config_loader: ConfigLoader) -> ConfigLoader {
        match &self.credential {
            S3Credentials::Credentials { access_keys } => {
                config_loader.credentials_provider(Credentials::new(
                    access_keys.access_key.to_string(),
                    access_keys.secret_access_key.to_string(),
                    access_keys.session_token.clone(),
                    None,
                    "",
                ))
            }
            S3Credentials::Profile(profile_name) => {
                let mut builder = ProfileFileCredentialsProvider::builder().profile_name(profile_name);
                if let Some(profile_files) = profile_files(
                    EnvConfigFileKind::Credentials,
                    self.client_config_location.aws_shared_credentials_file.as_deref(),
                ) {
                    builder = builder.profile_files(profile_files);
                }

                config_loader.credentials_provider(builder.build())
            }
            S3Credentials::FromEnvironment => config_loader,
        }
    }

    // An explicit region always wins over the profile and the environment.
    fn build_region_provider(&self) -> Box<dyn ProvideRegion> {
        let explicit_region = RegionProviderChain::first_try(self.region.clone().map(Region::new));

        let S3Credentials::Profile(profile_name) = &self.credential else {
            return Box::new(explicit_region.or_default_provider());
        };

        let mut builder = ProfileFileRegionProvider::builder().profile_name(profile_name);
        if let Some(profile_files) = profile_files(
            EnvConfigFileKind::Config,
            self.client_config_location.aws_config_file.as_deref(),
        ) {
            builder = builder.profile_files(profile_files);
        }

        Box::new(explicit_region.or_else(builder.build()))
    }

    fn build_retry_config(&self) -> RetryConfig {
        RetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    // None keeps the SDK defaults, which an all-None TimeoutConfig would not.
    fn build_timeout_config(&self) -> Option<TimeoutConfig> {
        let timeouts = &self.cli_timeout_config;
        if timeouts.operation_timeout_milliseconds.is_none()
            && timeouts.operation_attempt_timeout_milliseconds.is_none()
            && timeouts.connect_timeout_milliseconds.is_none()
            && timeouts.read_timeout_milliseconds.is_none()
        {
            return None;
        }

        let millis = |value: Option<u64>| value.map(Duration::from_millis);

        let mut builder = TimeoutConfig::builder();
        builder
            .set_operation_timeout(millis(timeouts.operation_timeout_milliseconds))
            .set_operation_attempt_timeout(millis(timeouts.operation_attempt_timeout_milliseconds))
            .set_connect_timeout(millis(timeouts.connect_timeout_milliseconds))
            .set_read_timeout(millis(timeouts.read_timeout_milliseconds));

        Some(builder.build())
    }
}

fn profile_files(kind: EnvConfigFileKind, path: Option<&Path>) -> Option<EnvConfigFiles> {
    path.map(|path| EnvConfigFiles::builder().with_file(kind, path).build())
}
