//! Report pipeline: defaulting, serialization and a single delivery attempt.
//!
//! Telemetry must never break the host tool. `report_request` and
//! `send_telemetry` therefore return a `ReportOutcome` rather than a
//! `Result`; every failure on the way (identity files, serialization,
//! transport) is routed to the `DiagnosticSink` and ends the call as
//! `ReportOutcome::Failed`.

mod defaults;
pub mod sink;

pub use sink::{DiagnosticSink, TracingSink};

use crate::app::Config;
use crate::domain::{ReportRecord, TelemetryError};
use crate::environment::{CiDetector, EnvCiDetector, HostInfo};
use crate::identity::{self, IdentityStore};
use crate::sender::{CheckpointClient, ClientConfig, Delivery, Transport};
use crate::{DEFAULT_PRODUCT, DISABLE_ENV_VAR, VERSION};
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The checkpoint service accepted the report.
    Delivered { status: u16 },
    /// Telemetry is switched off; nothing was built or sent.
    Disabled,
    /// Something failed and was logged through the diagnostic sink.
    Failed,
}

#[derive(Debug, Clone)]
pub struct ReporterSettings {
    pub product: String,
    pub version: String,
    pub disabled: bool,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            version: VERSION.to_string(),
            disabled: false,
        }
    }
}

/// True when `CHECKPOINT_DISABLE` is set to a non-empty value.
pub fn disable_flag_set() -> bool {
    std::env::var_os(DISABLE_ENV_VAR).is_some_and(|value| !value.is_empty())
}

pub struct Reporter {
    settings: ReporterSettings,
    transport: Arc<dyn Transport>,
    user_identity: Arc<dyn IdentityStore>,
    project_identity: Arc<dyn IdentityStore>,
    ci: Arc<dyn CiDetector>,
    host: HostInfo,
    sink: Arc<dyn DiagnosticSink>,
}

impl Reporter {
    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::default()
    }

    pub fn from_config(config: &Config) -> Result<Self, TelemetryError> {
        let client = CheckpointClient::new(ClientConfig {
            base_url: config.base_url.clone(),
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
        })?;

        let mut builder = Reporter::builder()
            .settings(ReporterSettings {
                product: config.product.clone(),
                version: config.tool_version.clone(),
                disabled: config.disable,
            })
            .transport(Arc::new(client))
            .project_dir(config.project_dir.clone());

        if let Some(home) = &config.home_dir {
            builder = builder.home_dir(home.clone());
        }

        builder.build()
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.settings
    }

    pub fn is_disabled(&self) -> bool {
        self.settings.disabled || disable_flag_set()
    }

    /// Fills defaults, serializes and posts `record` once.
    ///
    /// Resolves after the single attempt completes. Never fails observably.
    pub async fn report_request(&self, record: ReportRecord) -> ReportOutcome {
        if self.is_disabled() {
            debug!("telemetry disabled, skipping report");
            return ReportOutcome::Disabled;
        }

        match self.try_report(record).await {
            Ok(delivery) => {
                debug!(
                    status = delivery.status,
                    bytes_sent = delivery.bytes_sent,
                    "telemetry report delivered"
                );
                ReportOutcome::Delivered {
                    status: delivery.status,
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.sink.error(&message);
                self.sink.processor_error(&message);
                ReportOutcome::Failed
            }
        }
    }

    /// Reports one CLI command. `payload.language`, when a string, is also
    /// sent as the top-level `language` field.
    pub async fn send_telemetry(&self, command: &str, payload: Map<String, Value>) -> ReportOutcome {
        let language = payload
            .get("language")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut record = ReportRecord::new(self.settings.product.as_str())
            .with_command(command)
            .with_version(self.settings.version.as_str())
            .with_date_time(Utc::now())
            .with_payload(payload);
        if let Some(language) = language {
            record = record.with_language(language);
        }

        self.report_request(record).await
    }

    async fn try_report(&self, record: ReportRecord) -> Result<Delivery, TelemetryError> {
        let record = self.fill_defaults(record).await?;
        let body = record.to_json_bytes()?;
        Ok(self.transport.deliver(&record.product, body).await?)
    }
}

/// Assembles a `Reporter`; every part left unset falls back to the
/// production default.
#[derive(Default)]
pub struct ReporterBuilder {
    settings: ReporterSettings,
    transport: Option<Arc<dyn Transport>>,
    user_identity: Option<Arc<dyn IdentityStore>>,
    project_identity: Option<Arc<dyn IdentityStore>>,
    home_dir: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    ci: Option<Arc<dyn CiDetector>>,
    host: Option<HostInfo>,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl ReporterBuilder {
    pub fn settings(mut self, settings: ReporterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn user_identity(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.user_identity = Some(store);
        self
    }

    pub fn project_identity(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.project_identity = Some(store);
        self
    }

    /// Home directory for the user identity file, when no store is given.
    pub fn home_dir(mut self, home_dir: PathBuf) -> Self {
        self.home_dir = Some(home_dir);
        self
    }

    /// Project directory for the project identity file, when no store is given.
    pub fn project_dir(mut self, project_dir: PathBuf) -> Self {
        self.project_dir = Some(project_dir);
        self
    }

    pub fn ci_detector(mut self, ci: Arc<dyn CiDetector>) -> Self {
        self.ci = Some(ci);
        self
    }

    pub fn host(mut self, host: HostInfo) -> Self {
        self.host = Some(host);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<Reporter, TelemetryError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(CheckpointClient::new(ClientConfig::default())?),
        };

        let user_identity: Arc<dyn IdentityStore> = match self.user_identity {
            Some(store) => store,
            None => {
                let home = self
                    .home_dir
                    .or_else(identity::home_dir)
                    .ok_or(TelemetryError::HomeDirectoryUnavailable)?;
                Arc::new(identity::user_identity_store(home))
            }
        };

        let project_identity: Arc<dyn IdentityStore> = match self.project_identity {
            Some(store) => store,
            None => Arc::new(identity::project_identity_store(
                self.project_dir.unwrap_or_else(|| PathBuf::from(".")),
            )),
        };

        Ok(Reporter {
            settings: self.settings,
            transport,
            user_identity,
            project_identity,
            ci: self.ci.unwrap_or_else(|| Arc::new(EnvCiDetector)),
            host: self.host.unwrap_or_else(HostInfo::detect),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{RecordingSink, reporter_with};
    use super::*;
    use crate::environment::FixedCiDetector;
    use crate::sender::{MockTransport, TransportError};
    use serde_json::json;
    use std::time::Duration;

    fn delivered(status: u16) -> Result<Delivery, TransportError> {
        Ok(Delivery {
            status,
            latency: Duration::from_millis(5),
            bytes_sent: 0,
        })
    }

    #[tokio::test]
    async fn test_report_request_delivers_filled_record() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .withf(|product, body| {
                let value: Value = serde_json::from_slice(body).unwrap();
                product.to_string() == "cdktf"
                    && value["product"] == "cdktf"
                    && value["arch"] == "x64"
                    && value["userId"].is_string()
                    && value["projectId"].is_string()
                    && value.get("ci").is_none()
            })
            .times(1)
            .returning(|_, _| delivered(201));

        let reporter = reporter_with(FixedCiDetector::none())
            .transport(Arc::new(transport))
            .build()
            .unwrap();

        let outcome = reporter.report_request(ReportRecord::new("cdktf")).await;

        assert_eq!(outcome, ReportOutcome::Delivered { status: 201 });
    }

    #[tokio::test]
    async fn test_disabled_setting_skips_transport() {
        let mut transport = MockTransport::new();
        transport.expect_deliver().times(0);

        let reporter = reporter_with(FixedCiDetector::none())
            .transport(Arc::new(transport))
            .settings(ReporterSettings {
                disabled: true,
                ..Default::default()
            })
            .build()
            .unwrap();

        let outcome = reporter.report_request(ReportRecord::new("cdktf")).await;

        assert_eq!(outcome, ReportOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_transport_failure_is_logged_once() {
        let mut transport = MockTransport::new();
        transport.expect_deliver().times(1).returning(|_, _| {
            Err(TransportError::UnexpectedStatus {
                status: 500,
                message: "Internal Server Error".to_string(),
            })
        });
        let sink = Arc::new(RecordingSink::default());

        let reporter = reporter_with(FixedCiDetector::none())
            .transport(Arc::new(transport))
            .sink(sink.clone())
            .build()
            .unwrap();

        let outcome = reporter.report_request(ReportRecord::new("cdktf")).await;

        assert_eq!(outcome, ReportOutcome::Failed);
        let errors = sink.errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Internal Server Error"));
        assert_eq!(sink.processor_errors.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_send_telemetry_builds_record() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .withf(|_, body| {
                let value: Value = serde_json::from_slice(body).unwrap();
                value["command"] == "diff"
                    && value["language"] == "typescript"
                    && value["version"] == VERSION
                    && value["payload"]["resources"] == 3
                    && value["dateTime"].is_string()
            })
            .times(1)
            .returning(|_, _| delivered(200));

        let reporter = reporter_with(FixedCiDetector::none())
            .transport(Arc::new(transport))
            .build()
            .unwrap();

        let payload = json!({"language": "typescript", "resources": 3});
        let outcome = reporter
            .send_telemetry("diff", payload.as_object().cloned().unwrap())
            .await;

        assert_eq!(outcome, ReportOutcome::Delivered { status: 200 });
    }

    #[tokio::test]
    async fn test_non_string_language_is_not_promoted() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .withf(|_, body| {
                let value: Value = serde_json::from_slice(body).unwrap();
                value.get("language").is_none() && value["payload"]["language"] == 7
            })
            .times(1)
            .returning(|_, _| delivered(200));

        let reporter = reporter_with(FixedCiDetector::none())
            .transport(Arc::new(transport))
            .build()
            .unwrap();

        let payload = json!({"language": 7});
        reporter
            .send_telemetry("get", payload.as_object().cloned().unwrap())
            .await;
    }

    #[tokio::test]
    async fn test_ci_record_has_no_user_id() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .withf(|_, body| {
                let value: Value = serde_json::from_slice(body).unwrap();
                value["ci"] == "gitlab" && value.get("userId").is_none()
            })
            .times(1)
            .returning(|_, _| delivered(200));

        let reporter = reporter_with(FixedCiDetector::ci("gitlab"))
            .transport(Arc::new(transport))
            .build()
            .unwrap();

        let outcome = reporter.send_telemetry("deploy", Map::new()).await;

        assert_eq!(outcome, ReportOutcome::Delivered { status: 200 });
    }
}
