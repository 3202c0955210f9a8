mod common;

use std::path::PathBuf;
use std::sync::Arc;

use kfix_core::config::{CiMode, HarnessConfig};
use kfix_core::outcome::{BuildStatus, TaskOutcome};
use kfix_fixture::assertions::assert_task_outcome;
use kfix_fixture::{BuildInvocation, BuildRunner, DaemonSettings, GradleRunner, ProjectFixture};

use common::{fake_fixture, test_config, FakeRunner};

#[test]
fn build_with_syntax_error_is_reported_as_unexpected_outcome() {
    let fixture = fake_fixture("syntax error");
    fixture.with_build_script("\nval p =\n").unwrap();

    let err = fixture.build(&["help"]).unwrap_err();
    assert!(
        err.to_string().contains("Expected build to succeed but it failed"),
        "got: {err}"
    );
}

#[test]
fn build_and_fail_returns_the_failing_output() {
    let fixture = fake_fixture("syntax error output");
    fixture.with_build_script("\nval p =\n").unwrap();

    let output = fixture.build_failure_output(&["help"]).unwrap();
    assert!(output.contains("build.gradle.kts:2:20: Expecting an expression"));

    let result = fixture.build_and_fail(&["help"]).unwrap();
    assert_eq!(result.status, BuildStatus::Failure);
    assert_task_outcome(&result, ":compileKotlin", TaskOutcome::Failed).unwrap();
}

#[test]
fn build_and_fail_rejects_a_passing_build() {
    let fixture = fake_fixture("unexpected success");
    fixture.with_build_script("").unwrap();
    let err = fixture.build_and_fail(&["help"]).unwrap_err();
    assert!(err.to_string().contains("Expected build to fail but it succeeded"));
}

#[test]
fn build_in_runs_in_the_given_directory() {
    let runner = Arc::new(FakeRunner::new());
    let fixture = ProjectFixture::builder("build_in")
        .config(test_config())
        .runner(runner.clone())
        .build()
        .unwrap();
    let nested = fixture.parent_of("included/build.gradle.kts").unwrap();
    fixture.with_build_script_in("included", "").unwrap();

    fixture.build_in(&nested, &["assemble"]).unwrap();
    assert_eq!(runner.invocations()[0].project_dir, nested);
    assert_eq!(runner.invocations()[0].arguments, vec!["assemble"]);
}

#[test]
fn explicit_daemon_settings_win_over_the_property_store() {
    let runner = Arc::new(FakeRunner::new());
    let settings = DaemonSettings::from_config(&test_config());
    let fixture = ProjectFixture::builder("explicit daemon")
        .config(test_config())
        .runner(runner.clone())
        .daemon(settings.clone())
        .build()
        .unwrap();

    fixture.build(&["help"]).unwrap();
    assert_eq!(runner.invocations()[0].daemon, settings);
    assert_eq!(settings.idle_timeout_ms, Some(1000));
}

#[test]
fn build_scan_publication() {
    let fixture = fake_fixture("build scan");
    fixture.with_build_script("").unwrap();
    fixture.can_publish_build_scan().unwrap();
}

#[test]
fn arguments_follow_caller_then_diagnostics_then_daemon() {
    let runner = GradleRunner::new("/opt/gradle").with_ci(CiMode::Ci).with_debug(true);
    let invocation = BuildInvocation::new("/p", &["classes"]).with_daemon(DaemonSettings {
        registry_base: Some(PathBuf::from("/r")),
        idle_timeout_ms: Some(1000),
    });

    assert_eq!(
        runner.arguments_for(&invocation),
        vec![
            "classes",
            "--stacktrace",
            "-Dkotlin-daemon.verbose=true",
            "--console=plain",
            "-Dorg.gradle.daemon.registry.base=/r",
            "-Dorg.gradle.daemon.idletimeout=1000",
            "-Dorg.gradle.debug=true",
        ]
    );
}

#[test]
fn local_runs_skip_ci_arguments() {
    let runner = GradleRunner::new("/opt/gradle");
    let args = runner.arguments_for(&BuildInvocation::new("/p", &["help"]));
    assert_eq!(args, vec!["help", "--stacktrace", "--console=plain"]);
}

#[test]
fn missing_launcher_is_an_installation_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = GradleRunner::new(dir.path());
    let err = runner
        .run(&BuildInvocation::new(dir.path(), &["help"]))
        .unwrap_err();
    assert!(err.to_string().contains("No launcher at"), "got: {err}");
}

#[test]
fn from_config_requires_an_installation() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        base_dir: dir.path().to_path_buf(),
        ..HarnessConfig::default()
    };
    assert!(GradleRunner::from_config(&config, CiMode::Local).is_err());
}

#[test]
fn fixture_environment_reaches_every_invocation() {
    let runner = Arc::new(FakeRunner::new());
    let fixture = ProjectFixture::builder("build env")
        .config(test_config())
        .runner(runner.clone())
        .env("JAVA_HOME", "/opt/jdk")
        .build()
        .unwrap();

    fixture.build(&["help"]).unwrap();
    fixture
        .build_with_env(&["help"], &[("GRADLE_OPTS", "-Xmx64m"), ("JAVA_HOME", "/opt/other")])
        .unwrap();

    let invocations = runner.invocations();
    assert_eq!(invocations[0].env.get("JAVA_HOME").map(String::as_str), Some("/opt/jdk"));
    assert!(!invocations[0].env.contains_key("GRADLE_OPTS"));
    assert_eq!(invocations[1].env.get("GRADLE_OPTS").map(String::as_str), Some("-Xmx64m"));
    assert_eq!(invocations[1].env.get("JAVA_HOME").map(String::as_str), Some("/opt/other"));
    assert_eq!(fixture.build_env().len(), 1);
}

#[cfg(unix)]
mod installation {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;

    /// A `bin/gradle` that prints its arguments as tasks, echoes `KFIX_MARKER`
    /// when set and fails on `broken`.
    fn fake_installation(dir: &Path) {
        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let launcher = bin.join("gradle");
        std::fs::write(
            &launcher,
            "#!/bin/sh\n\
             for a in \"$@\"; do\n\
               case \"$a\" in\n\
                 -*) ;;\n\
                 broken) echo '> Task :broken FAILED'; echo 'BUILD FAILED' >&2; exit 1 ;;\n\
                 *) echo \"> Task :$a\" ;;\n\
               esac\n\
             done\n\
             [ -n \"$KFIX_MARKER\" ] && echo \"marker=$KFIX_MARKER\"\n\
             echo 'BUILD SUCCESSFUL'\n",
        )
        .unwrap();
        std::fs::set_permissions(&launcher, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn successful_build_reports_executed_tasks() {
        let install = tempfile::tempdir().unwrap();
        fake_installation(install.path());
        let project = tempfile::tempdir().unwrap();

        let result = GradleRunner::new(install.path())
            .run(&BuildInvocation::new(project.path(), &["compileKotlin", "classes"]))
            .unwrap();

        assert_eq!(result.status, BuildStatus::Success);
        assert_eq!(
            result.task_paths(TaskOutcome::Success),
            vec![":compileKotlin", ":classes"]
        );
        assert!(result.output.contains("BUILD SUCCESSFUL"));
    }

    #[test]
    fn failing_build_carries_stdout_and_stderr() {
        let install = tempfile::tempdir().unwrap();
        fake_installation(install.path());
        let project = tempfile::tempdir().unwrap();

        let result = GradleRunner::new(install.path())
            .run(&BuildInvocation::new(project.path(), &["broken"]))
            .unwrap();

        assert_eq!(result.status, BuildStatus::Failure);
        assert_eq!(result.outcome_of(":broken"), Some(TaskOutcome::Failed));
        assert!(result.output.contains("BUILD FAILED"));
    }

    #[test]
    fn invocation_environment_reaches_the_launcher() {
        let install = tempfile::tempdir().unwrap();
        fake_installation(install.path());
        let project = tempfile::tempdir().unwrap();

        let result = GradleRunner::new(install.path())
            .run(&BuildInvocation::new(project.path(), &["help"]).with_env("KFIX_MARKER", "from-invocation"))
            .unwrap();
        assert!(result.output.contains("marker=from-invocation"), "got: {}", result.output);
    }

    #[test]
    fn fixture_environment_reaches_the_launcher() {
        let install = tempfile::tempdir().unwrap();
        fake_installation(install.path());
        let fixture = ProjectFixture::builder("launcher env")
            .config(test_config())
            .runner(GradleRunner::new(install.path()))
            .env("KFIX_MARKER", "from-fixture")
            .build()
            .unwrap();

        let result = fixture.build(&["help"]).unwrap();
        assert!(result.output.contains("marker=from-fixture"), "got: {}", result.output);

        let result = fixture
            .build_with_env(&["help"], &[("KFIX_MARKER", "per-build")])
            .unwrap();
        assert!(result.output.contains("marker=per-build"), "got: {}", result.output);
    }
}
