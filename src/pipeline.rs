//! External command pipeline
//!
//! The build is a fixed, ordered table of (working directory, command)
//! pairs executed sequentially with fail-fast abort. Commands run through
//! the [`CommandRunner`] trait so tests can script outcomes; the real
//! runner shells out synchronously, one command at a time. All output is
//! appended to a single rolling log whose tail is quoted in failure
//! reports.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::PullRequest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Exit code and captured output of one external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code (non-zero means failure)
    pub exit_code: i32,
    /// Interleaved stdout and stderr
    pub output: String,
}

impl CommandOutput {
    /// Whether the command exited successfully
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes external commands in a working directory
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `dir` as the working directory
    async fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput>;
}

/// Real command runner shelling out via `sh -c`
pub struct ShellRunner {
    /// Exported as `GIT_USER` to every command
    bot_name: String,
}

impl ShellRunner {
    /// Create a runner identifying as `bot_name` to git
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput> {
        info!(dir = %dir.display(), command, "executing");
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .env("GIT_USER", &self.bot_name)
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(1),
            output: combined,
        })
    }
}

/// Rolling per-run log of all pipeline output
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Create a log handle at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Truncate the log; called at the start of every build
    pub async fn clear(&self) -> Result<()> {
        fs::write(&self.path, "").await?;
        Ok(())
    }

    /// Append a chunk of command output
    pub async fn append(&self, text: &str) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            file.write_all(b"\n").await?;
        }
        Ok(())
    }

    /// Last `n` lines of the log, right-trimmed
    pub async fn tail(&self, n: usize) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path).await.unwrap_or_default();
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..]
            .iter()
            .map(|l| l.trim_end().to_string())
            .collect())
    }
}

/// Name of the stamp file recording which PR the workspace was built for
const STAMP_FILE: &str = ".built-for";

/// Identity of the build a workspace holds: `repo#number@head_sha`
pub fn build_stamp(pr: &PullRequest) -> String {
    format!("{}#{}@{}", pr.repo, pr.number, pr.head_sha)
}

/// Record in the workspace which pull request it was built for.
///
/// The workspace is wiped and rebuilt for one PR at a time; the stamp
/// lets a later cycle tell whether the checkout it is about to push
/// still belongs to the PR it decided on.
pub async fn write_build_stamp(config: &Config, pr: &PullRequest) -> Result<()> {
    fs::create_dir_all(config.build_path()).await?;
    fs::write(config.build_path().join(STAMP_FILE), build_stamp(pr)).await?;
    Ok(())
}

/// The stamp currently in the workspace, if any.
pub async fn read_build_stamp(config: &Config) -> Option<String> {
    let content = fs::read_to_string(config.build_path().join(STAMP_FILE))
        .await
        .ok()?;
    Some(content.trim().to_string())
}

/// The fixed build step table for one pull request.
///
/// Wipes and recreates the workspace, fetches the build system, builds
/// the dependency manifest, materializes the component checkout, applies
/// the PR's patch, and builds the component. Non-foundational components
/// also build the foundational one as a cross-component regression
/// check.
pub fn build_steps(config: &Config, pr: &PullRequest, build_branch: &str) -> Vec<(PathBuf, String)> {
    let builds_dir = config.paths.builds_dir.clone();
    let build_dir = config.build_dir_name();
    let build_path = config.build_path();
    let repo_dir = config.repo_checkout(&pr.repo);
    let component = config
        .repo(&pr.repo)
        .map(|r| r.component.clone())
        .unwrap_or_else(|| pr.repo.clone());

    let mut steps = vec![
        (builds_dir.clone(), format!("rm -rf {build_dir}")),
        (
            builds_dir,
            format!("hg clone {} {build_dir}", config.paths.build_repo_url),
        ),
        (build_path.clone(), "make manifest-latest".to_string()),
        (build_path.clone(), format!("make {component}-myclone")),
        (repo_dir.clone(), format!("git checkout {build_branch}")),
        (repo_dir, format!("curl -s {} | git am", pr.patch_url)),
        (build_path.clone(), format!("make {component}-build")),
    ];

    if component != config.foundation_component {
        steps.push((
            build_path,
            format!("make {}-build", config.foundation_component),
        ));
    }

    steps
}

/// Execute a step table with fail-fast abort.
///
/// Each step's output is appended to the run log; the first non-zero
/// exit aborts the remaining steps with [`Error::Build`] naming the
/// failing command.
pub async fn run_build(
    runner: &dyn CommandRunner,
    log: &RunLog,
    steps: &[(PathBuf, String)],
) -> Result<()> {
    for (dir, command) in steps {
        let result = runner.run(dir, command).await?;
        log.append(&result.output).await?;
        if !result.success() {
            debug!(command, exit_code = result.exit_code, "build step failed");
            return Err(Error::Build {
                command: command.clone(),
            });
        }
    }
    Ok(())
}
