use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::{TempDir, tempdir};

use sftpjobs::engine::serve_lines;
use sftpjobs::executor::JobExecutor;
use sftpjobs::job::JobState;
use sftpjobs::local::{LocalConnector, LocalStore};
use sftpjobs::plugin::{Plugin, PluginOptions, ResourcePlugin};
use sftpjobs::remote::RemoteStore;
use sftpjobs::reporter::Reporter;
use sftpjobs::resource::{
    CreateRequest, DeleteRequest, ListRequest, OperationErrorCode, OperationStatus, ProgressResult,
    ReadRequest, StatusRequest,
};
use sftpjobs::store::OperationStore;

const TICK: Duration = Duration::from_millis(5);

fn target() -> serde_json::Value {
    json!({"url": "sftp://localhost:2222"})
}

fn setup() -> (TempDir, Plugin) {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("upload")).unwrap();
    let options = PluginOptions {
        poll_interval: TICK,
        ..PluginOptions::default()
    };
    let plugin = Plugin::new(
        LocalConnector {
            root: dir.path().to_path_buf(),
        },
        options,
    );
    (dir, plugin)
}

fn create(plugin: &Plugin, path: &str, content: &str, permissions: &str) -> ProgressResult {
    plugin.create(&CreateRequest {
        resource_type: "SFTP::Files::File".into(),
        properties: json!({"path": path, "content": content, "permissions": permissions}),
        target_config: target(),
        ..CreateRequest::default()
    })
}

/// Poll Status until the job leaves InProgress.
fn poll_status(plugin: &Plugin, created: &ProgressResult) -> ProgressResult {
    let request_id = created.request_id.expect("create returns a request id").to_string();
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = plugin.status(&StatusRequest {
            request_id: request_id.clone(),
            target_config: target(),
            ..StatusRequest::default()
        });
        if status.operation_status != OperationStatus::InProgress {
            return status;
        }
        assert!(Instant::now() < deadline, "job did not finish in time");
        std::thread::sleep(TICK);
    }
}

fn delete(plugin: &Plugin, path: &str) -> ProgressResult {
    plugin.delete(&DeleteRequest {
        native_id: path.into(),
        target_config: target(),
        ..DeleteRequest::default()
    })
}

fn read_code(plugin: &Plugin, path: &str) -> Option<OperationErrorCode> {
    plugin
        .read(&ReadRequest {
            native_id: path.into(),
            target_config: target(),
            ..ReadRequest::default()
        })
        .error_code
}

fn list(plugin: &Plugin, dir: &str) -> Vec<String> {
    let mut req = ListRequest {
        target_config: target(),
        ..ListRequest::default()
    };
    req.additional_properties.insert("directory".into(), dir.into());
    plugin.list(&req).native_ids
}

#[test]
fn test_create_status_delete_read() {
    let (dir, plugin) = setup();

    let created = create(&plugin, "/upload/a.txt", "hi", "0644");
    assert_eq!(created.operation_status, OperationStatus::InProgress);
    assert_eq!(created.native_id.as_deref(), Some("/upload/a.txt"));

    let status = poll_status(&plugin, &created);
    assert_eq!(status.operation_status, OperationStatus::Success);
    assert_eq!(status.native_id.as_deref(), Some("/upload/a.txt"));
    let props = status.resource_properties.expect("completed upload carries properties");
    assert_eq!(props["size"], 2);
    assert_eq!(props["permissions"], "0644");
    assert_eq!(props["content"], "hi");
    assert_eq!(fs::read_to_string(dir.path().join("upload/a.txt")).unwrap(), "hi");

    let deleted = delete(&plugin, "/upload/a.txt");
    assert_eq!(deleted.operation_status, OperationStatus::Success);
    assert_eq!(read_code(&plugin, "/upload/a.txt"), Some(OperationErrorCode::NotFound));
}

#[test]
fn test_delete_missing_reports_not_found() {
    let (_dir, plugin) = setup();
    for _ in 0..2 {
        let result = delete(&plugin, "/upload/missing.txt");
        assert_eq!(result.operation_status, OperationStatus::Failure);
        assert_eq!(result.error_code, Some(OperationErrorCode::NotFound));
        assert_eq!(result.native_id.as_deref(), Some("/upload/missing.txt"));
    }
    assert!(plugin.store().is_empty());
}

#[test]
fn test_read_missing_is_flagged_not_failed() {
    let (_dir, plugin) = setup();
    let result = plugin.read(&ReadRequest {
        resource_type: "SFTP::Files::File".into(),
        native_id: "/upload/nothing.txt".into(),
        target_config: target(),
    });
    assert_eq!(result.error_code, Some(OperationErrorCode::NotFound));
    assert!(result.properties.is_none());
    assert_eq!(result.resource_type, "SFTP::Files::File");
}

#[test]
fn test_list_tracks_creates_and_deletes() {
    let (_dir, plugin) = setup();
    for name in ["one", "two", "three"] {
        let created = create(&plugin, &format!("/upload/{name}.txt"), name, "0644");
        assert_eq!(poll_status(&plugin, &created).operation_status, OperationStatus::Success);
    }
    assert_eq!(
        list(&plugin, "/upload"),
        vec!["/upload/one.txt", "/upload/three.txt", "/upload/two.txt"]
    );

    assert_eq!(delete(&plugin, "/upload/two.txt").operation_status, OperationStatus::Success);
    assert_eq!(list(&plugin, "/upload"), vec!["/upload/one.txt", "/upload/three.txt"]);
}

#[test]
fn test_list_missing_directory_is_empty() {
    let (_dir, plugin) = setup();
    assert!(list(&plugin, "/nowhere").is_empty());
}

#[test]
fn test_failed_upload_is_reported_through_status() {
    let (_dir, plugin) = setup();
    // Parent directory does not exist, so the write fails inside the job.
    let created = create(&plugin, "/absent/dir/a.txt", "hi", "0644");
    assert_eq!(created.operation_status, OperationStatus::InProgress);

    let status = poll_status(&plugin, &created);
    assert_eq!(status.operation_status, OperationStatus::Failure);
    assert_eq!(status.error_code, Some(OperationErrorCode::InternalFailure));
    assert!(status.status_message.unwrap().starts_with("upload failed"));
    assert!(status.resource_properties.is_none());
}

#[test]
fn test_concurrent_jobs_are_independent() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("upload"))?;
    let remote: Arc<dyn RemoteStore> = Arc::new(LocalStore::open(dir.path())?);
    let executor = JobExecutor::new(remote, Arc::new(OperationStore::new()));

    let good = executor.start_upload("/upload/good.txt", "content", 0o640);
    let bad = executor.start_upload("/missing-dir/bad.txt", "content", 0o640);
    assert_ne!(good, bad);

    let bad_job = executor.wait(bad, TICK)?;
    let good_job = executor.wait(good, TICK)?;
    assert_eq!(bad_job.state, JobState::Failed);
    assert_eq!(good_job.state, JobState::Completed);

    let read = executor.remote().read("/upload/good.txt")?;
    assert_eq!(read.content, "content");
    assert_eq!(read.size, "content".len() as u64);
    #[cfg(unix)]
    assert_eq!(read.permissions, "0640");
    Ok(())
}

#[test]
fn test_delete_job_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("upload"))?;
    let remote: Arc<dyn RemoteStore> = Arc::new(LocalStore::open(dir.path())?);
    let executor = JobExecutor::new(remote, Arc::new(OperationStore::new()));

    let up = executor.start_upload("/upload/a.txt", "x", 0o644);
    executor.wait(up, TICK)?;
    for _ in 0..2 {
        let id = executor.start_delete("/upload/a.txt");
        let job = executor.wait(id, TICK)?;
        assert_eq!(job.state, JobState::Completed);
        assert!(job.error.is_none());
    }
    assert!(executor.remote().read("/upload/a.txt").unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_serve_lines_dispatches_each_verb() -> Result<()> {
    let (_dir, plugin) = setup();
    let input = [
        json!({"verb": "create", "properties": {"path": "/upload/s.txt", "content": "s"}}),
        json!({"verb": "status", "requestId": "00000000-0000-0000-0000-000000000000"}),
        json!({"verb": "list", "additionalProperties": {"directory": "/upload"}}),
    ]
    .iter()
    .map(|v| format!("{v}\n"))
    .collect::<String>();

    let mut reporter = Reporter::new(Vec::new());
    let handled = serve_lines(&plugin, input.as_bytes(), &mut reporter)?;
    assert_eq!(handled, 3);

    let out = String::from_utf8(reporter.into_inner())?;
    let lines: Vec<serde_json::Value> =
        out.lines().map(serde_json::from_str).collect::<Result<_, _>>()?;
    assert_eq!(lines[0]["operation"], "Create");
    assert_eq!(lines[0]["operationStatus"], "InProgress");
    assert_eq!(lines[1]["operationStatus"], "Failure");
    assert!(lines[2]["nativeIds"].is_array());
    Ok(())
}
