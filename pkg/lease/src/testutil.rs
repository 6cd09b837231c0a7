//! Scripted provider for exercising publish and rebuild flows without
//! a real environment service.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use pkg_provider::{EnvironmentProvider, ProviderContext};
use pkg_types::error::{LeaseError, Result};

pub struct FakeProvider {
    counter: AtomicUsize,
    create_failure: AtomicBool,
    timeout_failure: AtomicBool,
    write_failure_path: Mutex<Option<String>>,
    /// Call-order log of provider method names.
    pub calls: Mutex<Vec<String>>,
    /// `(environment_ref, timeout_secs)` per set_timeout call.
    pub timeouts: Mutex<Vec<(String, u64)>>,
    /// `(environment_ref, command)` per run_command call.
    pub commands: Mutex<Vec<(String, String)>>,
    /// `(environment_ref, path, content)` per write_file call.
    pub files: Mutex<Vec<(String, String, String)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(1),
            create_failure: AtomicBool::new(false),
            timeout_failure: AtomicBool::new(false),
            write_failure_path: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_create(&self) {
        self.create_failure.store(true, Ordering::SeqCst);
    }

    pub fn fail_timeout(&self) {
        self.timeout_failure.store(true, Ordering::SeqCst);
    }

    pub fn fail_write(&self, path: &str) {
        *self.write_failure_path.lock().unwrap() = Some(path.to_string());
    }

    pub fn create_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == "create_environment")
            .count()
    }

    fn log(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl EnvironmentProvider for FakeProvider {
    async fn create_environment(&self, _ctx: &ProviderContext) -> Result<String> {
        self.log("create_environment");
        if self.create_failure.load(Ordering::SeqCst) {
            return Err(LeaseError::Provider("create rejected".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("env-{}", n))
    }

    async fn reconnect(&self, _environment_ref: &str, _ctx: &ProviderContext) -> Result<()> {
        self.log("reconnect");
        Ok(())
    }

    async fn set_timeout(
        &self,
        environment_ref: &str,
        duration: Duration,
        _ctx: &ProviderContext,
    ) -> Result<()> {
        self.log("set_timeout");
        if self.timeout_failure.load(Ordering::SeqCst) {
            return Err(LeaseError::Provider("timeout extension rejected".to_string()));
        }
        self.timeouts
            .lock()
            .unwrap()
            .push((environment_ref.to_string(), duration.as_secs()));
        Ok(())
    }

    async fn write_file(
        &self,
        environment_ref: &str,
        path: &str,
        content: &str,
        _ctx: &ProviderContext,
    ) -> Result<()> {
        self.log("write_file");
        if self.write_failure_path.lock().unwrap().as_deref() == Some(path) {
            return Err(LeaseError::Provider("disk full".to_string()));
        }
        self.files.lock().unwrap().push((
            environment_ref.to_string(),
            path.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn run_command(
        &self,
        environment_ref: &str,
        command: &str,
        _ctx: &ProviderContext,
    ) -> Result<()> {
        self.log("run_command");
        self.commands
            .lock()
            .unwrap()
            .push((environment_ref.to_string(), command.to_string()));
        Ok(())
    }

    fn host_url(&self, environment_ref: &str, port: u16) -> String {
        format!("https://{}-{}.sandbox.test", port, environment_ref)
    }
}
