//! Scripted command runner for testing
//!
//! Commands are matched by substring against scripted responses; the
//! first match wins and anything unscripted succeeds with empty output.
//! Every executed command is recorded for assertions.

use async_trait::async_trait;
use mergebot::error::Result;
use mergebot::pipeline::{CommandOutput, CommandRunner};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Runner with substring-scripted outcomes
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<Vec<(String, i32, String)>>,
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for commands containing `pattern`
    pub fn respond(&self, pattern: &str, exit_code: i32, output: &str) {
        self.responses.lock().unwrap().push((
            pattern.to_string(),
            exit_code,
            output.to_string(),
        ));
    }

    /// Script a failure for commands containing `pattern`
    pub fn fail_on(&self, pattern: &str, output: &str) {
        self.respond(pattern, 1, output);
    }

    /// All commands executed so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Whether any executed command contains `pattern`
    pub fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|c| c.contains(pattern))
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), command.to_string()));

        let responses = self.responses.lock().unwrap();
        let (exit_code, output) = responses
            .iter()
            .find(|(pattern, _, _)| command.contains(pattern))
            .map_or((0, String::new()), |(_, code, out)| (*code, out.clone()));

        Ok(CommandOutput { exit_code, output })
    }
}
