//! Integration tests for promqlinter

use pretty_assertions::assert_eq;
use promqlinter::{
    cli, config::Config, discovery::collect_manifests, manifest, ColorMode, DeniedLabelPlugin,
    Diagnostic, Diagnostics, Expr, LintError, Linter, Plugin, PluginError, Severity, SourceRange,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn denied_job(pattern: &str) -> DeniedLabelPlugin {
    DeniedLabelPlugin::from_flags(&[format!("job={}", pattern)], ColorMode::Disabled).unwrap()
}

fn output(linter: Linter<Vec<u8>>) -> String {
    String::from_utf8(linter.into_output()).unwrap()
}

/// Counts calls and reports nothing
struct Spy {
    calls: Arc<AtomicUsize>,
}

impl Plugin for Spy {
    fn name(&self) -> &str {
        "spy"
    }

    fn execute(&self, _expr: &Expr) -> Result<Diagnostics, PluginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Diagnostics::new())
    }
}

/// Records its name into a shared log and reports one diagnostic
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    level: Severity,
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, expr: &Expr) -> Result<Diagnostics, PluginError> {
        self.log.lock().unwrap().push(self.name);
        let mut ds = Diagnostics::new();
        ds.add(Diagnostic::new(self.level, expr.range(), self.name, ColorMode::Disabled));
        Ok(ds)
    }
}

#[test]
fn test_denied_label_scenario() {
    let text = r#"http_requests_total{job="prometheus"}"#;
    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(denied_job("^prom.*"));

    let result = linter.execute(text, Severity::Error).unwrap();
    assert!(result.failed());
    assert_eq!(result.reported, 1);

    let expected = format!(
        "denied-labels<[ERROR] (1:0) matched to the denied label rule `^prom.*`\n\
         L1| {}\n\
         \x20   {} matched to the denied label rule `^prom.*`\n",
        text,
        "^".repeat(37)
    );
    assert_eq!(output(linter), expected);
}

#[test]
fn test_denied_label_other_value_passes() {
    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(denied_job("^prom.*"));

    let result = linter
        .execute(r#"http_requests_total{job="staging"}"#, Severity::Error)
        .unwrap();
    assert!(!result.failed());
    assert!(output(linter).is_empty());
}

#[test]
fn test_parse_failure_short_circuits_plugins() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(Spy {
        calls: Arc::clone(&calls),
    });

    let result = linter.execute("sum(rate(foo[5m]", Severity::Error).unwrap();
    assert!(result.failed());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(output(linter).starts_with("promql/parser<[ERROR] "));

    // A valid expression does reach the plugin
    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(Spy {
        calls: Arc::clone(&calls),
    });
    linter.execute("up", Severity::Error).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_plugins_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = |name, level| Recorder {
        name,
        log: Arc::clone(&log),
        level,
    };

    // Info registered before Error
    let mut linter = Linter::new(Vec::<u8>::new())
        .with_plugin(recorder("first", Severity::Info))
        .with_plugin(recorder("second", Severity::Error));
    linter.execute("up", Severity::Info).unwrap();

    let out = output(linter);
    let first = out.find("first<[INFO]").unwrap();
    let second = out.find("second<[ERROR]").unwrap();
    assert!(first < second);

    // Error registered before Info: output follows registration, not severity
    let mut linter = Linter::new(Vec::<u8>::new())
        .with_plugin(recorder("first", Severity::Error))
        .with_plugin(recorder("second", Severity::Info));
    linter.execute("up", Severity::Info).unwrap();

    let out = output(linter);
    let first = out.find("first<[ERROR]").unwrap();
    let second = out.find("second<[INFO]").unwrap();
    assert!(first < second);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["first", "second", "first", "second"]
    );
}

#[test]
fn test_aggregate_pass_fail() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let build = |level| {
        Linter::new(Vec::<u8>::new())
            .with_plugin(Recorder {
                name: "quiet",
                log: Arc::clone(&log),
                level: Severity::Info,
            })
            .with_plugin(Recorder {
                name: "loud",
                log: Arc::clone(&log),
                level,
            })
    };

    // Nothing at or above the filter: pass
    let mut linter = build(Severity::Info);
    assert!(!linter.execute("up", Severity::Warning).unwrap().failed());

    // One plugin above the filter fails the whole call
    let mut linter = build(Severity::Warning);
    let result = linter.execute("up", Severity::Warning).unwrap();
    assert!(result.failed());
    assert_eq!(result.reported, 1);
}

#[test]
fn test_output_is_deterministic() {
    let run = || {
        let mut linter = Linter::new(Vec::<u8>::new())
            .with_plugin(denied_job("^prom"))
            .with_plugin(denied_job("theus$"));
        let text = "sum(\n  rate(a{job=\"prometheus\"}[5m])\n) / on(job) b{job=\"prometheus\"}";
        let result = linter.execute(text, Severity::Info).unwrap();
        (result, output(linter))
    };

    let (first_result, first_output) = run();
    let (second_result, second_output) = run();
    assert_eq!(first_result, second_result);
    assert_eq!(first_output, second_output);
    assert_eq!(first_result.reported, 4);
}

#[test]
fn test_multiline_rendering() {
    let text = "sum(\n  up{job=\"prometheus\"}\n)";
    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(denied_job("prometheus"));
    linter.execute(text, Severity::Error).unwrap();

    let out = output(linter);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "denied-labels<[ERROR] (2:2) matched to the denied label rule `prometheus`",
            "L2|   up{job=\"prometheus\"}",
            "      ^^^^^^^^^^^^^^^^^^^^ matched to the denied label rule `prometheus`",
        ]
    );
}

#[test]
fn test_invalid_pattern_propagates() {
    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(denied_job("("));
    let err = linter.execute(r#"up{job="x"}"#, Severity::Error).unwrap_err();
    assert!(matches!(
        err,
        LintError::Plugin {
            source: PluginError::InvalidPattern { .. },
            ..
        }
    ));
}

#[test]
fn test_out_of_range_diagnostic_is_a_render_error() {
    struct OutOfRange;

    impl Plugin for OutOfRange {
        fn name(&self) -> &str {
            "out-of-range"
        }

        fn execute(&self, _expr: &Expr) -> Result<Diagnostics, PluginError> {
            let mut ds = Diagnostics::new();
            ds.add(Diagnostic::error(SourceRange::new(0, 100), "too far", ColorMode::Disabled));
            Ok(ds)
        }
    }

    let mut linter = Linter::new(Vec::<u8>::new()).with_plugin(OutOfRange);
    let err = linter.execute("up", Severity::Error).unwrap_err();
    assert!(matches!(err, LintError::Render(_)));
}

#[test]
fn test_fixture_discovery_and_manifests() {
    let dir = fixtures_path().join("manifests");

    let files = collect_manifests(&[&dir], true).unwrap();
    assert_eq!(files, vec![dir.join("clean.yaml"), dir.join("nested/denied.yml")]);

    let exprs = manifest::from_path(&files[1]).unwrap();
    assert_eq!(exprs.len(), 2);
    assert_eq!(exprs[0].expr, r#"sum(up{job="prometheus"})"#);
}

#[test]
fn test_cli_lints_every_manifest_expression() {
    let mut config = Config::new();
    config.manifests = vec![fixtures_path().join("manifests")];
    config.recursive = true;
    config
        .denied_labels
        .insert("job".to_string(), "^prometheus$".to_string());

    let mut out = Vec::new();
    let ok = cli::run(&config, ColorMode::Disabled, std::io::empty(), &mut out).unwrap();
    assert!(!ok);

    // Both rules of the denied manifest are reported, not just the first
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out.matches("denied-labels<[ERROR]").count(), 2);
    assert!(!out.ends_with("ok\n"));
}

#[test]
fn test_cli_clean_manifest_prints_ok() {
    let mut config = Config::new();
    config.manifests = vec![fixtures_path().join("manifests/clean.yaml")];
    config
        .denied_labels
        .insert("job".to_string(), "^prometheus$".to_string());

    let mut out = Vec::new();
    let ok = cli::run(&config, ColorMode::Disabled, std::io::empty(), &mut out).unwrap();
    assert!(ok);
    assert_eq!(String::from_utf8(out).unwrap(), "ok\n");
}

#[test]
fn test_cli_missing_manifest_is_an_error() {
    let mut config = Config::new();
    config.manifests = vec![fixtures_path().join("manifests/missing.yaml")];

    let mut out = Vec::new();
    assert!(cli::run(&config, ColorMode::Disabled, std::io::empty(), &mut out).is_err());
}
