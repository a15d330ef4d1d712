//! Isolated scorers: host processes and containers.
//!
//! Every invocation gets a fresh temporary directory holding the payload.
//! The directory and the child process are owned by the invocation future,
//! so both are released when it completes, fails, times out or is dropped.
//! Containers run under a unique name and are force-removed before the
//! payload directory goes away.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use super::error::ExecutionFailure;
use super::manifest::{OutputChannel, RuntimeKind};
use super::payload::{self, PAYLOAD_SCHEMA_VERSION};
use super::runtime::ScoringRuntime;
use crate::model::CanonicalTable;

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

pub const ENV_INPUT: &str = "VPMBENCH_INPUT";
pub const ENV_OUTPUT: &str = "VPMBENCH_OUTPUT";
pub const ENV_SCHEMA_VERSION: &str = "VPMBENCH_SCHEMA_VERSION";

const INPUT_FILE: &str = "input.csv";
const OUTPUT_FILE: &str = "output.csv";
/// Mount point of the payload directory inside containers.
const CONTAINER_WORKDIR: &str = "/vpmbench";
/// Trailing bytes of stderr kept in error messages.
const STDERR_TAIL: usize = 2000;

/// What gets spawned for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// `program args..`, run in `working_dir`.
    Host {
        program: PathBuf,
        args: Vec<String>,
        working_dir: PathBuf,
    },
    /// `engine run --rm --name vpmbench-<uuid> -v <payload>:/vpmbench image args..`.
    Container {
        engine: PathBuf,
        image: String,
        args: Vec<String>,
    },
}

/// Runs a plugin out of process with a wall-clock limit.
#[derive(Debug, Clone)]
pub struct IsolatedRuntime {
    launcher: Launcher,
    output: OutputChannel,
    timeout: Duration,
}

impl IsolatedRuntime {
    pub fn new(launcher: Launcher, output: OutputChannel, timeout: Duration) -> Self {
        Self {
            launcher,
            output,
            timeout,
        }
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, payload_dir: &Path, container_name: &str) -> Command {
        match &self.launcher {
            Launcher::Host {
                program,
                args,
                working_dir,
            } => {
                let input = payload_dir.join(INPUT_FILE);
                let output = payload_dir.join(OUTPUT_FILE);
                let mut command = Command::new(program);
                command
                    .args(substitute(args, &input, &output))
                    .current_dir(working_dir)
                    .env(ENV_INPUT, &input)
                    .env(ENV_OUTPUT, &output)
                    .env(ENV_SCHEMA_VERSION, PAYLOAD_SCHEMA_VERSION);
                command
            }
            Launcher::Container {
                engine,
                image,
                args,
            } => {
                let input = Path::new(CONTAINER_WORKDIR).join(INPUT_FILE);
                let output = Path::new(CONTAINER_WORKDIR).join(OUTPUT_FILE);
                let mut command = Command::new(engine);
                command
                    .arg("run")
                    .arg("--rm")
                    .arg("--name")
                    .arg(container_name)
                    .arg("-v")
                    .arg(format!("{}:{CONTAINER_WORKDIR}", payload_dir.display()))
                    .arg("-w")
                    .arg(CONTAINER_WORKDIR)
                    .arg("-e")
                    .arg(format!("{ENV_INPUT}={}", input.display()))
                    .arg("-e")
                    .arg(format!("{ENV_OUTPUT}={}", output.display()))
                    .arg("-e")
                    .arg(format!("{ENV_SCHEMA_VERSION}={PAYLOAD_SCHEMA_VERSION}"))
                    .arg(image)
                    .args(substitute(args, &input, &output));
                command
            }
        }
    }
}

#[async_trait]
impl ScoringRuntime for IsolatedRuntime {
    fn kind(&self) -> RuntimeKind {
        match self.launcher {
            Launcher::Host { .. } => RuntimeKind::Process,
            Launcher::Container { .. } => RuntimeKind::Container,
        }
    }

    async fn execute(&self, table: &CanonicalTable) -> Result<Vec<f64>, ExecutionFailure> {
        let start = Instant::now();
        let payload_dir = tempfile::Builder::new().prefix("vpmbench-").tempdir()?;
        let bytes = payload::encode_table(table).map_err(std::io::Error::from)?;
        tokio::fs::write(payload_dir.path().join(INPUT_FILE), bytes).await?;

        // Declared after the payload dir so it is dropped first.
        let mut container = match &self.launcher {
            Launcher::Container { engine, .. } => Some(ContainerGuard::new(engine)),
            Launcher::Host { .. } => None,
        };
        let name = container.as_ref().map_or("", |guard| guard.name.as_str());
        let mut command = self.command(payload_dir.path(), name);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        tracing::debug!(command = ?command.as_std(), rows = table.len(), "spawning plugin");

        let child = command.spawn()?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecutionFailure::Timeout {
                ms: self.timeout.as_millis() as u64,
            })??;
        if let Some(guard) = container.as_mut() {
            guard.disarm();
        }

        if !output.status.success() {
            return Err(ExecutionFailure::NonZeroExit {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let raw = match self.output {
            OutputChannel::Stdout => String::from_utf8_lossy(&output.stdout).into_owned(),
            OutputChannel::File => {
                let path = payload_dir.path().join(OUTPUT_FILE);
                tokio::fs::read_to_string(&path).await.map_err(|e| {
                    ExecutionFailure::InvalidOutput(format!("can't read output file: {e}"))
                })?
            }
        };
        let scores = payload::parse_scores(&raw, table.len())?;
        tracing::debug!(
            scores = scores.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "plugin process finished"
        );
        Ok(scores)
    }
}

/// Force-removes a named container on drop unless the run finished.
///
/// Killing the engine client does not stop the container it started.
struct ContainerGuard {
    engine: PathBuf,
    name: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(engine: &Path) -> Self {
        Self {
            engine: engine.to_path_buf(),
            name: format!("vpmbench-{}", Uuid::new_v4()),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let removed = std::process::Command::new(&self.engine)
            .args(["rm", "-f", self.name.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match removed {
            Ok(status) if status.success() => {
                tracing::debug!(container = %self.name, "removed container");
            }
            Ok(status) => {
                tracing::warn!(container = %self.name, %status, "container removal failed");
            }
            Err(e) => {
                tracing::warn!(container = %self.name, error = %e, "container removal failed");
            }
        }
    }
}

fn substitute(args: &[String], input: &Path, output: &Path) -> Vec<String> {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();
    args.iter()
        .map(|arg| {
            arg.replace(INPUT_PLACEHOLDER, &input)
                .replace(OUTPUT_PLACEHOLDER, &output)
        })
        .collect()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut cut = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &text[cut..])
}

/// Resolve `program` the way a launcher will: paths relative to `base_dir`,
/// bare names through `PATH`.
pub fn find_program(program: &str, base_dir: &Path) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        let resolved = base_dir.join(candidate);
        return resolved.is_file().then_some(resolved);
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| full.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathogenicityClass, ReferenceGenome, VariantRecord, VariationType};

    fn table() -> CanonicalTable {
        let record = |pos| {
            VariantRecord::new(
                "2",
                pos,
                "G",
                "A",
                PathogenicityClass::Benign,
                VariationType::Snp,
                ReferenceGenome::GRCh37,
            )
        };
        CanonicalTable::from_records(vec![record(10), record(20)]).unwrap()
    }

    fn shell(script: &str, output: OutputChannel, timeout: Duration) -> IsolatedRuntime {
        IsolatedRuntime::new(
            Launcher::Host {
                program: PathBuf::from("sh"),
                args: vec!["-c".to_string(), script.to_string(), INPUT_PLACEHOLDER.to_string()],
                working_dir: std::env::temp_dir(),
            },
            output,
            timeout,
        )
    }

    #[tokio::test]
    async fn test_stdout_scores() {
        let runtime = shell("echo 0.25; echo 0.75", OutputChannel::Stdout, Duration::from_secs(10));
        assert_eq!(runtime.kind(), RuntimeKind::Process);
        assert_eq!(runtime.execute(&table()).await.unwrap(), vec![0.25, 0.75]);
    }

    #[tokio::test]
    async fn test_input_placeholder_points_at_payload() {
        // $0 is the substituted {input} path; score = POS column.
        let runtime = shell(
            "tail -n +2 \"$0\" | cut -d, -f3",
            OutputChannel::Stdout,
            Duration::from_secs(10),
        );
        assert_eq!(runtime.execute(&table()).await.unwrap(), vec![10.0, 20.0]);
    }

    #[tokio::test]
    async fn test_output_file_channel() {
        let runtime = shell(
            "test \"$VPMBENCH_SCHEMA_VERSION\" = 1 && printf '[0.5, 1.5]' > \"$VPMBENCH_OUTPUT\"",
            OutputChannel::File,
            Duration::from_secs(10),
        );
        assert_eq!(runtime.execute(&table()).await.unwrap(), vec![0.5, 1.5]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr_and_cleans_up() {
        let runtime = shell(
            "echo \"$VPMBENCH_INPUT\" >&2; exit 3",
            OutputChannel::Stdout,
            Duration::from_secs(10),
        );
        let err = runtime.execute(&table()).await.unwrap_err();
        match err {
            ExecutionFailure::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.ends_with(INPUT_FILE));
                assert!(!Path::new(&stderr).exists());
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let runtime = shell("sleep 5", OutputChannel::Stdout, Duration::from_millis(200));
        let started = Instant::now();
        let err = runtime.execute(&table()).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::Timeout { ms: 200 }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_timeout_releases_payload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let seen = dir.path().join("seen");
        let runtime = shell(
            &format!("echo \"$0\" > '{}'; sleep 5", seen.display()),
            OutputChannel::Stdout,
            Duration::from_secs(1),
        );
        let err = runtime.execute(&table()).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::Timeout { ms: 1000 }));

        let input = std::fs::read_to_string(&seen).unwrap();
        let payload_dir = Path::new(input.trim()).parent().unwrap();
        assert!(payload_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("vpmbench-"));
        assert!(!payload_dir.exists());
    }

    #[tokio::test]
    async fn test_missing_output_file_is_invalid_output() {
        let runtime = shell("true", OutputChannel::File, Duration::from_secs(10));
        let err = runtime.execute(&table()).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::InvalidOutput(_)));
    }

    #[test]
    fn test_container_command_line() {
        let runtime = IsolatedRuntime::new(
            Launcher::Container {
                engine: PathBuf::from("docker"),
                image: "org/method:1".to_string(),
                args: vec!["score".to_string(), OUTPUT_PLACEHOLDER.to_string()],
            },
            OutputChannel::File,
            Duration::from_secs(1),
        );
        assert_eq!(runtime.kind(), RuntimeKind::Container);
        let command = runtime.command(Path::new("/tmp/payload"), "vpmbench-test");
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "run");
        assert_eq!(args[2..4], ["--name", "vpmbench-test"]);
        assert!(args.contains(&"/tmp/payload:/vpmbench".to_string()));
        assert!(args.contains(&"VPMBENCH_SCHEMA_VERSION=1".to_string()));
        assert_eq!(args[args.len() - 3], "org/method:1");
        assert_eq!(args[args.len() - 1], "/vpmbench/output.csv");
    }

    fn fake_engine() -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let engine = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources/fake-engine.sh");
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();
        engine
    }

    fn container(script: &str, timeout: Duration) -> IsolatedRuntime {
        IsolatedRuntime::new(
            Launcher::Container {
                engine: fake_engine(),
                image: "org/method:1".to_string(),
                args: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            },
            OutputChannel::Stdout,
            timeout,
        )
    }

    #[tokio::test]
    async fn test_container_reads_mounted_payload() {
        let runtime = container(
            "test \"$VPMBENCH_INPUT\" = \"$PWD/input.csv\" && tail -n +2 \"$VPMBENCH_INPUT\" | cut -d, -f3",
            Duration::from_secs(10),
        );
        assert_eq!(runtime.kind(), RuntimeKind::Container);
        assert_eq!(runtime.execute(&table()).await.unwrap(), vec![10.0, 20.0]);
    }

    #[tokio::test]
    async fn test_container_removed_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let seen = dir.path().join("seen");
        let leaked = dir.path().join("leaked");
        let runtime = container(
            &format!(
                "echo \"$VPMBENCH_INPUT\" > '{}'; sleep 1; touch '{}'",
                seen.display(),
                leaked.display()
            ),
            Duration::from_millis(300),
        );
        let err = runtime.execute(&table()).await.unwrap_err();
        assert!(matches!(err, ExecutionFailure::Timeout { ms: 300 }));

        let input = std::fs::read_to_string(&seen).unwrap();
        assert!(!Path::new(input.trim()).parent().unwrap().exists());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!leaked.exists(), "container outlived its run");
    }

    #[tokio::test]
    async fn test_container_removed_when_run_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let leaked = dir.path().join("leaked");
        let runtime = container(
            &format!("sleep 1; touch '{}'", leaked.display()),
            Duration::from_secs(30),
        );
        let table = table();
        let dropped =
            tokio::time::timeout(Duration::from_millis(300), runtime.execute(&table)).await;
        assert!(dropped.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!leaked.exists(), "container outlived its run");
    }

    #[test]
    fn test_stderr_tail_keeps_the_end() {
        let long = "x".repeat(STDERR_TAIL + 10) + "END";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.starts_with("..."));
        assert!(tail.ends_with("END"));
        assert_eq!(tail.len(), STDERR_TAIL + 3);
    }

    #[test]
    fn test_find_program() {
        assert!(find_program("sh", Path::new("/")).is_some());
        assert!(find_program("definitely-not-a-real-program-xyz", Path::new("/")).is_none());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.sh"), "exit 0").unwrap();
        assert!(find_program("./run.sh", dir.path()).is_some());
    }
}
