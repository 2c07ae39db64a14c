//! Snapshot of repository and build-host state.
//!
//! Status, origin and log are mandatory: the first failure aborts the whole
//! collection. Branch and local commits are best-effort, and the build
//! environment lookups only ever omit their own field.

use crate::codec::{FieldKey, Fields};
use crate::command::{CommandError, CommandOutput, CommandRunner};

/// Timestamp format of [`FieldKey::BuildTime`].
pub const BUILD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// `git log` format shared by the log and local-commit queries.
const LOG_FORMAT: &str = "--pretty=format:%h: %s";

/// Ambient facts about the build host.
pub trait Environment: Send + Sync {
    /// Current working directory.
    fn working_dir(&self) -> Option<String>;

    /// Host name.
    fn host_name(&self) -> Option<String>;

    /// Name of the user running the build.
    fn user_name(&self) -> Option<String>;

    /// Current local time formatted with [`BUILD_TIME_FORMAT`].
    fn build_time(&self) -> String;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn working_dir(&self) -> Option<String> {
        std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string())
    }

    fn host_name(&self) -> Option<String> {
        whoami::fallible::hostname().ok()
    }

    fn user_name(&self) -> Option<String> {
        whoami::fallible::realname()
            .ok()
            .filter(|name| !name.is_empty())
    }

    fn build_time(&self) -> String {
        chrono::Local::now().format(BUILD_TIME_FORMAT).to_string()
    }
}

/// Tunables for the git queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    /// Program used for all queries.
    pub git: String,
    /// Remote whose tracking branch defines "unpushed".
    pub remote: String,
    /// Number of commits in the log and local-commit fields.
    pub log_depth: usize,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            remote: "origin".to_string(),
            log_depth: 5,
        }
    }
}

/// Runs the snapshot queries in a fixed sequence.
pub struct Collector<'a> {
    runner: &'a dyn CommandRunner,
    env: &'a dyn Environment,
    options: CollectOptions,
}

impl<'a> Collector<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, env: &'a dyn Environment) -> Self {
        Self {
            runner,
            env,
            options: CollectOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CollectOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &CollectOptions {
        &self.options
    }

    /// Collect the snapshot.
    ///
    /// # Errors
    ///
    /// Returns the underlying error of the first failing mandatory query.
    pub async fn collect(&self) -> Result<Fields, CommandError> {
        let mut fields = Fields::new();
        let depth = self.options.log_depth.to_string();

        let status = self
            .git(&["status", "--porcelain=v1", "-b", "-uall"])
            .await?;
        fields.insert(FieldKey::GitStatus, status.text());

        let origin_key = format!("remote.{}.url", self.options.remote);
        let origin = self.git(&["config", "--get", origin_key.as_str()]).await?;
        fields.insert(FieldKey::GitOrigin, origin.text().trim_end());

        let log = self.git(&["log", "-n", depth.as_str(), LOG_FORMAT]).await?;
        fields.insert(FieldKey::GitLog, log.text());

        if let Some(branch) = self.current_branch().await {
            if let Some(local) = self.local_commits(&branch, &depth).await {
                fields.insert(FieldKey::GitLocalCommits, local);
            }
        }

        fields.insert(FieldKey::BuildTime, self.env.build_time());

        for (key, value) in [
            (FieldKey::BuildPath, self.env.working_dir()),
            (FieldKey::BuildHost, self.env.host_name()),
            (FieldKey::BuildUser, self.env.user_name()),
        ] {
            match value {
                // Unwrapped values must not carry the envelope separator
                Some(value) => {
                    fields.insert(key, value.replace(',', ""));
                }
                None => tracing::debug!(key = %key, "build environment value unavailable"),
            }
        }

        tracing::info!(fields = fields.len(), "collected build snapshot");
        Ok(fields)
    }

    async fn git(&self, args: &[&str]) -> Result<CommandOutput, CommandError> {
        self.runner.run(&self.options.git, args).await
    }

    /// Checked-out branch; `None` when detached or the query fails.
    async fn current_branch(&self) -> Option<String> {
        match self.git(&["branch", "--show-current"]).await {
            Ok(output) if output.success => {
                let branch = output.text().trim().to_string();
                (!branch.is_empty()).then_some(branch)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "branch query failed");
                None
            }
        }
    }

    async fn local_commits(&self, branch: &str, depth: &str) -> Option<String> {
        let range = format!("{}/{branch}..{branch}", self.options.remote);

        match self.git(&["log", range.as_str(), "-n", depth, LOG_FORMAT]).await {
            Ok(output) if output.success => Some(output.text()),
            Ok(_) => {
                tracing::debug!(range = %range, "no remote tracking branch");
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "local commits query failed");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::Environment;
    use crate::command::{CommandError, CommandOutput, CommandRunner};

    /// Scripted reply for one command line.
    pub enum Reply {
        Output(CommandOutput),
        Fail,
        Timeout,
    }

    /// Runner answering from a table keyed by `"program arg arg"`.
    #[derive(Default)]
    pub struct ScriptedRunner {
        replies: HashMap<String, Reply>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn reply(mut self, command: &str, reply: Reply) -> Self {
            self.replies.insert(command.to_string(), reply);
            self
        }

        pub fn ok(self, command: &str, stdout: &str) -> Self {
            self.reply(command, Reply::Output(CommandOutput::ok(stdout)))
        }

        pub fn called(&self, prefix: &str) -> bool {
            self.calls.lock().iter().any(|c| c.starts_with(prefix))
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
            let line = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.lock().push(line.clone());

            match self.replies.get(&line) {
                Some(Reply::Output(output)) => Ok(output.clone()),
                Some(Reply::Timeout) => Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: Duration::from_secs(5),
                }),
                Some(Reply::Fail) | None => Err(CommandError::Start {
                    program: program.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, line),
                }),
            }
        }
    }

    /// Environment with fixed answers.
    pub struct FixedEnvironment {
        pub dir: Option<String>,
        pub host: Option<String>,
        pub user: Option<String>,
    }

    impl Default for FixedEnvironment {
        fn default() -> Self {
            Self {
                dir: Some("/work/demo".to_string()),
                host: Some("builder-01".to_string()),
                user: Some("Jo Builder".to_string()),
            }
        }
    }

    impl Environment for FixedEnvironment {
        fn working_dir(&self) -> Option<String> {
            self.dir.clone()
        }

        fn host_name(&self) -> Option<String> {
            self.host.clone()
        }

        fn user_name(&self) -> Option<String> {
            self.user.clone()
        }

        fn build_time(&self) -> String {
            "2024-05-01T12:30:45".to_string()
        }
    }

    pub const STATUS: &str = "git status --porcelain=v1 -b -uall";
    pub const ORIGIN: &str = "git config --get remote.origin.url";
    pub const LOG: &str = "git log -n 5 --pretty=format:%h: %s";
    pub const BRANCH: &str = "git branch --show-current";
    pub const LOCAL: &str = "git log origin/main..main -n 5 --pretty=format:%h: %s";

    /// A repository on `main` with one unpushed commit.
    pub fn healthy_repo() -> ScriptedRunner {
        ScriptedRunner::default()
            .ok(STATUS, "## main...origin/main [ahead 1]\n M src/lib.rs\n")
            .ok(ORIGIN, "git@github.com:owner/repo.git\n")
            .ok(LOG, "abc1234: add collector\ndef5678: initial commit")
            .ok(BRANCH, "main\n")
            .ok(LOCAL, "abc1234: add collector")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn collects_every_field() {
        let runner = healthy_repo();
        let env = FixedEnvironment::default();

        let fields = Collector::new(&runner, &env).collect().await.unwrap();

        assert_eq!(fields.len(), 8);
        assert_eq!(
            fields.get(FieldKey::GitOrigin),
            Some("git@github.com:owner/repo.git")
        );
        assert_eq!(
            fields.get(FieldKey::GitLocalCommits),
            Some("abc1234: add collector")
        );
        assert_eq!(fields.get(FieldKey::BuildTime), Some("2024-05-01T12:30:45"));
        assert_eq!(fields.get(FieldKey::BuildUser), Some("Jo Builder"));
    }

    #[tokio::test]
    async fn status_failure_aborts_before_other_queries() {
        let runner = healthy_repo().reply(STATUS, Reply::Fail);
        let env = FixedEnvironment::default();

        let err = Collector::new(&runner, &env).collect().await.unwrap_err();

        assert!(matches!(err, CommandError::Start { .. }));
        assert!(!runner.called(ORIGIN));
        assert!(!runner.called("git log"));
    }

    #[tokio::test]
    async fn log_timeout_is_surfaced() {
        let runner = healthy_repo().reply(LOG, Reply::Timeout);
        let env = FixedEnvironment::default();

        let err = Collector::new(&runner, &env).collect().await.unwrap_err();

        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn branch_failure_omits_local_commits() {
        let runner = healthy_repo().reply(BRANCH, Reply::Fail);
        let env = FixedEnvironment::default();

        let fields = Collector::new(&runner, &env).collect().await.unwrap();

        assert!(!fields.contains(FieldKey::GitLocalCommits));
        assert!(fields.contains(FieldKey::GitLog));
        assert!(!runner.called("git log origin/"));
    }

    #[tokio::test]
    async fn detached_head_skips_local_commits() {
        let runner = healthy_repo().ok(BRANCH, "\n");
        let env = FixedEnvironment::default();

        let fields = Collector::new(&runner, &env).collect().await.unwrap();

        assert!(!fields.contains(FieldKey::GitLocalCommits));
    }

    #[tokio::test]
    async fn missing_tracking_branch_omits_local_commits() {
        let runner = healthy_repo().reply(
            LOCAL,
            Reply::Output(CommandOutput {
                stdout: Vec::new(),
                success: false,
            }),
        );
        let env = FixedEnvironment::default();

        let fields = Collector::new(&runner, &env).collect().await.unwrap();

        assert!(!fields.contains(FieldKey::GitLocalCommits));
    }

    #[tokio::test]
    async fn unavailable_environment_values_are_omitted() {
        let runner = healthy_repo();
        let env = FixedEnvironment {
            host: None,
            user: None,
            ..FixedEnvironment::default()
        };

        let fields = Collector::new(&runner, &env).collect().await.unwrap();

        assert!(!fields.contains(FieldKey::BuildHost));
        assert!(!fields.contains(FieldKey::BuildUser));
        assert_eq!(fields.get(FieldKey::BuildPath), Some("/work/demo"));
    }

    #[tokio::test]
    async fn commas_are_stripped_from_environment_values() {
        let runner = healthy_repo();
        let env = FixedEnvironment {
            user: Some("Doe, John".to_string()),
            ..FixedEnvironment::default()
        };

        let fields = Collector::new(&runner, &env).collect().await.unwrap();
        let decoded = crate::codec::decode(&crate::codec::encode(&fields));

        assert_eq!(fields.get(FieldKey::BuildUser), Some("Doe John"));
        assert_eq!(decoded.get(FieldKey::BuildUser), Some("Doe John"));
    }

    #[tokio::test]
    async fn options_change_remote_and_depth() {
        let runner = ScriptedRunner::default()
            .ok(STATUS, "")
            .ok(
                "git config --get remote.upstream.url",
                "https://example.com/r.git",
            )
            .ok("git log -n 2 --pretty=format:%h: %s", "abc: one\ndef: two")
            .ok(BRANCH, "dev\n")
            .ok("git log upstream/dev..dev -n 2 --pretty=format:%h: %s", "");
        let env = FixedEnvironment::default();
        let options = CollectOptions {
            remote: "upstream".to_string(),
            log_depth: 2,
            ..CollectOptions::default()
        };

        let fields = Collector::new(&runner, &env)
            .with_options(options)
            .collect()
            .await
            .unwrap();

        assert_eq!(
            fields.get(FieldKey::GitOrigin),
            Some("https://example.com/r.git")
        );
        assert_eq!(fields.get(FieldKey::GitLocalCommits), Some(""));
    }
}
