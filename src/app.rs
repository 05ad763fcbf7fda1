use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

use crate::cli::Cli;
use crate::config::{Config, Source, Target, TargetParams};
use crate::error::{self, ConfigError};
use crate::report::{self, Report};
use crate::source::SourceRegistry;
use crate::target::{self, TargetRegistry};

/// What a run processes.
#[derive(Debug, PartialEq, Eq)]
pub struct Plan {
    pub sources: Vec<Source>,
    pub targets: Vec<Target>,
}

impl Plan {
    /// Every configured source and target.
    pub fn full(config: &Config) -> Self {
        Self {
            sources: config.sources.clone(),
            targets: config.targets.clone(),
        }
    }

    /// Only the source called `name`, or failing that the sources of the
    /// account called `name`, reported to stdout.
    pub fn dry_run(config: &Config, name: &str) -> error::Result<Self> {
        let by_source: Vec<Source> = config
            .sources
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect();

        let sources = if by_source.is_empty() {
            config
                .sources
                .iter()
                .filter(|s| s.account == name)
                .cloned()
                .collect()
        } else {
            by_source
        };

        if sources.is_empty() {
            return Err(ConfigError::single(
                "--test",
                format!("no source or account named `{name}`"),
            )
            .into());
        }

        Ok(Self {
            sources,
            targets: vec![Target::stdout()],
        })
    }
}

/// Collect every source, then hand the report to every target.
pub async fn execute(
    config: &Config,
    plan: &Plan,
    sources: &SourceRegistry,
    targets: &TargetRegistry,
) -> error::Result<Report> {
    let report = report::collect(&plan.sources, &config.accounts, sources).await?;
    target::emit_all(&plan.targets, &report, targets).await?;
    Ok(report)
}

pub async fn run(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&path)?;
    info!(
        path = %path.display(),
        accounts = config.accounts.len(),
        sources = config.sources.len(),
        targets = config.targets.len(),
        "configuration loaded"
    );

    if cli.check {
        write_summary(&mut io::stdout().lock(), &config, &path)?;
        return Ok(());
    }

    let plan = match cli.test.as_deref() {
        Some(name) => Plan::dry_run(&config, name)?,
        None => Plan::full(&config),
    };

    let report = execute(
        &config,
        &plan,
        &SourceRegistry::builtin(),
        &TargetRegistry::builtin(),
    )
    .await?;
    info!(entries = report.len(), "run complete");

    Ok(())
}

fn write_summary(out: &mut impl Write, config: &Config, path: &Path) -> io::Result<()> {
    writeln!(out, "configuration {} is valid", path.display())?;
    for a in &config.accounts {
        let tls = if a.starttls { "starttls" } else { "tls" };
        writeln!(out, "account {}: {}@{}:{} ({tls})", a.name, a.username, a.host, a.port)?;
    }
    for s in &config.sources {
        let account = match report::resolve_account(s, &config.accounts) {
            Ok(a) => a.name.clone(),
            Err(_) => format!("{} (unresolved)", s.account),
        };
        writeln!(
            out,
            "source {}: {} on {} folder {} search {:?}",
            s.name, s.kind, account, s.folder, s.search
        )?;
    }
    for t in &config.targets {
        match &t.params {
            TargetParams::InfluxDb(p) => writeln!(
                out,
                "target {}: {} {} org {} bucket {}",
                t.name, t.kind, p.url, p.org, p.bucket
            )?,
            TargetParams::None => writeln!(out, "target {}: {}", t.name, t.kind)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Account;
    use crate::error::Error;
    use crate::source::SourceHandler;
    use crate::target::TargetHandler;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    const CONFIG: &str = r#"
[[accounts]]
name = "work"
host = "imap.work.example"
username = "me"
password = "p"

[[accounts]]
name = "home"
host = "imap.home.example"
username = "me"
password = "p"

[[sources]]
name = "unread"
type = "fake"
account = "work"
search = "UNSEEN"

[[sources]]
name = "flagged"
type = "fake"
account = "work"
search = "FLAGGED SINCE 2024-01-01"

[[sources]]
name = "family"
type = "fake"
account = "home"
search = ""

[[targets]]
type = "influxdb"
url = "http://influx.invalid:8086"
token = "t"
bucket = "b"
org = "o"
"#;

    /// Counts search words and remembers which sources ran.
    #[derive(Clone, Default)]
    struct FakeSource(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl SourceHandler for FakeSource {
        async fn count(&self, source: &Source, _account: &Account) -> error::Result<u64> {
            self.0.lock().unwrap().push(source.name.clone());
            Ok(source.search.split_whitespace().count() as u64)
        }
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<(String, Report)>>>);

    #[async_trait]
    impl TargetHandler for Capture {
        async fn emit(&self, target: &Target, report: &Report) -> error::Result<()> {
            self.0.lock().unwrap().push((target.kind.clone(), report.clone()));
            Ok(())
        }
    }

    fn registries(source: &FakeSource, capture: &Capture) -> (SourceRegistry, TargetRegistry) {
        let mut sources = SourceRegistry::empty();
        sources.register("fake", source.clone());
        let mut targets = TargetRegistry::empty();
        targets.register("stdout", capture.clone());
        targets.register("influxdb", capture.clone());
        (sources, targets)
    }

    fn config() -> Config {
        Config::parse(CONFIG, "test").unwrap()
    }

    #[test]
    fn dry_run_by_source_name() {
        let plan = Plan::dry_run(&config(), "flagged").unwrap();
        let names: Vec<_> = plan.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["flagged"]);
        assert_eq!(plan.targets, vec![Target::stdout()]);
    }

    #[test]
    fn dry_run_by_account_name() {
        let plan = Plan::dry_run(&config(), "work").unwrap();
        let names: Vec<_> = plan.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["unread", "flagged"]);
        assert_eq!(plan.targets, vec![Target::stdout()]);
    }

    #[test]
    fn dry_run_of_unknown_name_fails() {
        match Plan::dry_run(&config(), "nobody").unwrap_err() {
            Error::Config(err) => {
                assert_eq!(err.problems, vec!["no source or account named `nobody`"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn summary_flags_unresolvable_accounts() {
        let mut cfg = config();
        cfg.sources[0].account = "gone".to_string();
        cfg.accounts.push(cfg.accounts[1].clone());

        let mut out = Vec::new();
        write_summary(&mut out, &cfg, Path::new("/tmp/mailstat")).unwrap();
        let text = String::from_utf8(out).unwrap();
        let sources: Vec<_> = text.lines().filter(|l| l.starts_with("source ")).collect();

        assert_eq!(
            sources,
            vec![
                r#"source unread: fake on gone (unresolved) folder INBOX search "UNSEEN""#,
                r#"source flagged: fake on work folder INBOX search "FLAGGED SINCE 2024-01-01""#,
                r#"source family: fake on home (unresolved) folder INBOX search """#,
            ]
        );
    }

    #[tokio::test]
    async fn full_run_reaches_configured_targets() {
        let cfg = config();
        let (fake, capture) = (FakeSource::default(), Capture::default());
        let (sources, targets) = registries(&fake, &capture);

        let report = execute(&cfg, &Plan::full(&cfg), &sources, &targets).await.unwrap();

        let rows: Vec<_> = report
            .iter()
            .map(|e| (e.source.as_str(), e.account.as_str(), e.count))
            .collect();
        assert_eq!(rows, vec![("unread", "work", 1), ("flagged", "work", 3), ("family", "home", 0)]);

        let emitted = capture.0.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, "influxdb");
        assert_eq!(emitted[0].1, report);
    }

    #[tokio::test]
    async fn dry_run_only_prints_to_console() {
        let cfg = config();
        let (fake, capture) = (FakeSource::default(), Capture::default());
        let (sources, targets) = registries(&fake, &capture);

        let plan = Plan::dry_run(&cfg, "home").unwrap();
        execute(&cfg, &plan, &sources, &targets).await.unwrap();

        assert_eq!(*fake.0.lock().unwrap(), vec!["family"]);
        let emitted = capture.0.lock().unwrap();
        let kinds: Vec<_> = emitted.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(kinds, vec!["stdout"]);
    }

    #[tokio::test]
    async fn source_failure_emits_nothing() {
        let mut cfg = config();
        cfg.sources[1].account = "gone".to_string();
        let (fake, capture) = (FakeSource::default(), Capture::default());
        let (sources, targets) = registries(&fake, &capture);

        let err = execute(&cfg, &Plan::full(&cfg), &sources, &targets)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AccountNotFound { .. }));
        assert!(capture.0.lock().unwrap().is_empty());
    }
}
