//! Lifecycle verbs of the SFTP file resource.
//!
//! Create is asynchronous: it starts an upload job and returns its id for the
//! caller to poll through Status. Update and Delete start jobs too but wait
//! for them, so they look synchronous to the caller. Read and List call the
//! remote directly. No verb returns an error; every failure is encoded in
//! the result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Error;
use crate::executor::JobExecutor;
use crate::job::{JobKind, JobState};
use crate::model::FileProperties;
use crate::remote::Connector;
use crate::resource::{
    CreateRequest, DeleteRequest, LabelConfig, ListRequest, ListResult, MatchFilter, Operation,
    OperationErrorCode, ProgressResult, RateLimitConfig, RateLimitScope, ReadRequest, ReadResult,
    StatusRequest, UpdateRequest,
};
use crate::store::OperationStore;
use crate::validate::{parse_file_properties, parse_mode};

/// The six verbs of the host protocol plus its configuration queries.
pub trait ResourcePlugin: Send + Sync {
    fn create(&self, req: &CreateRequest) -> ProgressResult;
    fn read(&self, req: &ReadRequest) -> ReadResult;
    fn update(&self, req: &UpdateRequest) -> ProgressResult;
    fn delete(&self, req: &DeleteRequest) -> ProgressResult;
    fn status(&self, req: &StatusRequest) -> ProgressResult;
    fn list(&self, req: &ListRequest) -> ListResult;

    fn rate_limit(&self) -> RateLimitConfig;
    fn discovery_filters(&self) -> Vec<MatchFilter>;
    fn label_config(&self) -> LabelConfig;
}

/// Tunables for [`Plugin`].
#[derive(Debug, Clone)]
pub struct PluginOptions {
    /// How often Update and Delete poll their job.
    pub poll_interval: Duration,
    /// Directory listed when a List request names none.
    pub default_directory: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            default_directory: "/upload".to_string(),
        }
    }
}

/// SFTP file resource plugin.
///
/// The remote connection is opened lazily by the first verb that needs one
/// and reused by every later call, whatever target config those calls carry.
pub struct Plugin {
    connector: Box<dyn Connector>,
    store: Arc<OperationStore>,
    executor: Mutex<Option<JobExecutor>>,
    options: PluginOptions,
}

impl Plugin {
    pub fn new(connector: impl Connector + 'static, options: PluginOptions) -> Self {
        Self {
            connector: Box::new(connector),
            store: Arc::new(OperationStore::new()),
            executor: Mutex::new(None),
            options,
        }
    }

    pub fn store(&self) -> &Arc<OperationStore> {
        &self.store
    }

    fn slot(&self) -> MutexGuard<'_, Option<JobExecutor>> {
        self.executor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executor over the shared connection, connecting on first use.
    fn executor(&self, target_config: &serde_json::Value) -> crate::error::Result<JobExecutor> {
        let mut slot = self.slot();
        if let Some(executor) = slot.as_ref() {
            return Ok(executor.clone());
        }
        let remote = self.connector.connect(target_config)?;
        let executor = JobExecutor::new(remote, Arc::clone(&self.store));
        *slot = Some(executor.clone());
        Ok(executor)
    }

    /// Drop the shared connection. Running jobs keep their own handle.
    pub fn close(&self) {
        if self.slot().take().is_some() {
            tracing::info!("remote connection closed");
        }
    }
}

fn internal(operation: Operation, err: impl ToString) -> ProgressResult {
    ProgressResult::failure(operation, OperationErrorCode::InternalFailure, err.to_string())
}

fn invalid(operation: Operation, err: Error) -> ProgressResult {
    ProgressResult::failure(operation, OperationErrorCode::InvalidRequest, err.to_string())
}

impl ResourcePlugin for Plugin {
    fn create(&self, req: &CreateRequest) -> ProgressResult {
        let props = match parse_file_properties(&req.properties) {
            Ok(props) => props,
            Err(e) => return invalid(Operation::Create, e),
        };
        let mode = match parse_mode(&props.permissions) {
            Ok(mode) => mode,
            Err(e) => return invalid(Operation::Create, e),
        };
        let executor = match self.executor(&req.target_config) {
            Ok(executor) => executor,
            Err(e) => return internal(Operation::Create, e),
        };

        let id = executor.start_upload(&props.path, &props.content, mode);
        tracing::info!(%id, path = %props.path, "create started");
        ProgressResult::in_progress(Operation::Create)
            .request_id(id)
            .native_id(props.path)
    }

    fn read(&self, req: &ReadRequest) -> ReadResult {
        let mut result = ReadResult {
            resource_type: req.resource_type.clone(),
            ..ReadResult::default()
        };
        let executor = match self.executor(&req.target_config) {
            Ok(executor) => executor,
            Err(e) => {
                tracing::warn!("read: {e}");
                result.error_code = Some(OperationErrorCode::InternalFailure);
                return result;
            }
        };
        match executor.remote().read(&req.native_id) {
            Ok(snapshot) => result.properties = Some(snapshot.to_json()),
            Err(e) if e.is_not_found() => result.error_code = Some(OperationErrorCode::NotFound),
            Err(e) => {
                tracing::warn!(path = %req.native_id, "read failed: {e}");
                result.error_code = Some(OperationErrorCode::InternalFailure);
            }
        }
        result
    }

    fn update(&self, req: &UpdateRequest) -> ProgressResult {
        let op = Operation::Update;
        let executor = match self.executor(&req.target_config) {
            Ok(executor) => executor,
            Err(e) => return internal(op, e),
        };
        let desired = match parse_file_properties(&req.desired_properties) {
            Ok(props) => props,
            Err(e) => return invalid(op, e),
        };
        let desired_mode = match parse_mode(&desired.permissions) {
            Ok(mode) => mode,
            Err(e) => return invalid(op, e),
        };
        let prior: Option<FileProperties> = parse_file_properties(&req.prior_properties).ok();
        let prior_mode = prior.as_ref().and_then(|p| parse_mode(&p.permissions).ok());

        match prior {
            Some(prior) if prior.content == desired.content => {
                if prior_mode != Some(desired_mode) {
                    tracing::info!(path = %req.native_id, permissions = %desired.permissions, "update permissions");
                    if let Err(e) = executor.remote().set_permissions(&req.native_id, desired_mode) {
                        return internal(op, e);
                    }
                }
            }
            _ => {
                let id = executor.start_upload(&req.native_id, &desired.content, desired_mode);
                tracing::info!(%id, path = %req.native_id, "update started");
                match executor.wait(id, self.options.poll_interval) {
                    Ok(job) if job.state == JobState::Failed => {
                        return internal(op, job.error.unwrap_or_default());
                    }
                    Ok(_) => {}
                    Err(e) => return internal(op, e),
                }
            }
        }

        match executor.remote().read(&req.native_id) {
            Ok(snapshot) => ProgressResult::success(op)
                .native_id(&req.native_id)
                .properties(snapshot.to_json()),
            Err(e) => internal(op, e),
        }
    }

    fn delete(&self, req: &DeleteRequest) -> ProgressResult {
        let op = Operation::Delete;
        let executor = match self.executor(&req.target_config) {
            Ok(executor) => executor,
            Err(e) => return internal(op, e),
        };

        if let Err(e) = executor.remote().read(&req.native_id) {
            if e.is_not_found() {
                // Absent already; the caller treats NotFound on delete as done.
                return ProgressResult::failure(op, OperationErrorCode::NotFound, "")
                    .native_id(&req.native_id);
            }
            return internal(op, e);
        }

        let id = executor.start_delete(&req.native_id);
        tracing::info!(%id, path = %req.native_id, "delete started");
        match executor.wait(id, self.options.poll_interval) {
            Ok(job) if job.state == JobState::Completed => {
                ProgressResult::success(op).native_id(&req.native_id)
            }
            Ok(job) => internal(op, job.error.unwrap_or_default()),
            Err(e) => internal(op, e),
        }
    }

    fn status(&self, req: &StatusRequest) -> ProgressResult {
        let op = Operation::CheckStatus;
        if self.slot().is_none() {
            return internal(op, "no client available");
        }
        let id = match uuid::Uuid::parse_str(&req.request_id) {
            Ok(id) => id,
            Err(_) => return internal(op, format!("operation not found: {}", req.request_id)),
        };
        let job = match self.store.get(id) {
            Ok(job) => job,
            Err(e) => return internal(op, e),
        };

        let result = match job.state {
            JobState::InProgress => ProgressResult::in_progress(op),
            JobState::Completed => {
                let mut result = ProgressResult::success(op);
                if job.kind == JobKind::Upload
                    && let Some(snapshot) = &job.result
                {
                    result = result.properties(snapshot.to_json());
                }
                result
            }
            JobState::Failed => internal(op, job.error.unwrap_or_default()),
        };
        result.request_id(job.id).native_id(job.target)
    }

    fn list(&self, req: &ListRequest) -> ListResult {
        let executor = match self.executor(&req.target_config) {
            Ok(executor) => executor,
            Err(e) => {
                tracing::warn!("list: {e}");
                return ListResult::default();
            }
        };
        let dir = req
            .additional_properties
            .get("directory")
            .map(String::as_str)
            .unwrap_or(&self.options.default_directory);

        match executor.remote().list(dir) {
            Ok(native_ids) => ListResult {
                native_ids,
                next_page_token: None,
            },
            Err(e) if e.is_not_found() => {
                tracing::debug!(dir, "list: directory absent");
                ListResult::default()
            }
            Err(e) => {
                tracing::warn!(dir, "list failed: {e}");
                ListResult::default()
            }
        }
    }

    /// SFTP servers limit concurrent connections; stay conservative.
    fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            scope: RateLimitScope::Namespace,
            max_requests_per_second_for_namespace: 5,
        }
    }

    fn discovery_filters(&self) -> Vec<MatchFilter> {
        Vec::new()
    }

    fn label_config(&self) -> LabelConfig {
        LabelConfig {
            default_query: "$.path".to_string(),
        }
    }
}
