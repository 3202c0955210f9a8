mod common;

use std::path::PathBuf;

use kfix_fixture::assertions::{assert_class_path_for, assert_no_exceptions};
use kfix_fixture::ProjectFixture;

use common::{fake_fixture, test_config, FakeRunner};

fn slash(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[test]
fn sub_project_script_sees_parent_classpath_but_not_siblings() {
    let fixture = fake_fixture("sub-project classpath");
    fixture.with_settings("include(\"foo\", \"bar\")").unwrap();

    let parent_jar = fixture.with_jar("libs/parent.jar", Vec::<(&str, Vec<u8>)>::new()).unwrap();
    let foo_jar = fixture.with_jar("libs/foo.jar", Vec::<(&str, Vec<u8>)>::new()).unwrap();
    let bar_jar = fixture.with_jar("libs/bar.jar", Vec::<(&str, Vec<u8>)>::new()).unwrap();

    let buildscript = |jar: &PathBuf| {
        format!(
            "buildscript {{\n    dependencies {{ classpath(files(\"{}\")) }}\n}}\n",
            slash(jar)
        )
    };
    fixture.with_file("build.gradle", &buildscript(&parent_jar)).unwrap();
    let foo_script = fixture.with_build_script_in("foo", &buildscript(&foo_jar)).unwrap();
    let bar_script = fixture.with_build_script_in("bar", &buildscript(&bar_jar)).unwrap();

    let root = fixture.project_root().unwrap();

    let foo_model = fixture.kotlin_build_script_model_for(&root, &foo_script).unwrap();
    assert_class_path_for(&foo_model, &[parent_jar.clone(), foo_jar.clone()], &[bar_jar.clone()])
        .unwrap();

    let bar_model = fixture.kotlin_build_script_model_for(&root, &bar_script).unwrap();
    assert_class_path_for(&bar_model, &[parent_jar, bar_jar], &[foo_jar]).unwrap();
}

#[test]
fn script_plugin_classpath_ignores_failures_after_buildscript() {
    let fixture = fake_fixture("script plugin");
    let dependency = fixture.new_file("script-plugin-dependency.jar").unwrap();
    let plugin = fixture
        .with_file(
            "plugin.gradle.kts",
            "buildscript {\n    dependencies { classpath(files(\"script-plugin-dependency.jar\")) }\n}\n\n\
             // Shouldn't be evaluated\nthrow IllegalStateException()\n",
        )
        .unwrap();

    let model = fixture.script_model_for(&plugin).unwrap();
    assert_no_exceptions(&model).unwrap();
    assert_class_path_for(&model, &[dependency], &[]).unwrap();
}

#[test]
fn canonical_class_path_of_root_script() {
    let fixture = fake_fixture("root classpath");
    let jar = fixture.new_file("fixture.jar").unwrap();
    fixture
        .with_build_script("buildscript { dependencies { classpath(files(\"fixture.jar\")) } }")
        .unwrap();

    let class_path = fixture.canonical_class_path().unwrap();
    assert!(class_path.contains(&jar), "{class_path:?}");
    assert!(class_path
        .iter()
        .any(|p| p.ends_with("gradle-kotlin-dsl-1.0.jar")));

    let source_path = fixture
        .source_path_for(&fixture.existing("build.gradle.kts").unwrap())
        .unwrap();
    assert_eq!(source_path, vec![PathBuf::from("/gradle/src/core-api")]);
}

#[test]
fn querying_without_a_provider_is_an_error() {
    let fixture = ProjectFixture::builder("no provider")
        .config(test_config())
        .runner(FakeRunner::new())
        .build()
        .unwrap();
    let script = fixture.with_build_script("").unwrap();

    let err = fixture.script_model_for(&script).unwrap_err();
    assert!(err.to_string().contains("No model provider configured"), "got: {err}");
}

#[cfg(unix)]
mod command_provider {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use kfix_core::config::HarnessConfig;
    use kfix_fixture::{CommandModelProvider, ModelProvider};

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("query-model");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn parses_the_json_printed_by_the_command() {
        let tools = tempfile::tempdir().unwrap();
        let query = script(
            tools.path(),
            r#"echo "{\"classPath\": [\"$2/lib/a.jar\"], \"sourcePath\": [], \"script\": \"$4\"}""#,
        );
        let project = tempfile::tempdir().unwrap();

        let provider = CommandModelProvider::new(query.to_string_lossy(), Vec::new());
        let model = provider
            .model_for(project.path(), &project.path().join("build.gradle.kts"))
            .unwrap();

        assert_eq!(model.class_path, vec![project.path().join("lib/a.jar")]);
        assert!(model.source_path.is_empty());
        assert!(!model.has_exceptions());
    }

    #[test]
    fn failing_command_is_captured_as_exceptions() {
        let tools = tempfile::tempdir().unwrap();
        let query = script(tools.path(), "echo 'Unresolved reference: foo' >&2\nexit 3");
        let project = tempfile::tempdir().unwrap();

        let provider = CommandModelProvider::new(query.to_string_lossy(), Vec::new());
        let model = provider
            .model_for(project.path(), &project.path().join("build.gradle.kts"))
            .unwrap();

        assert!(model.class_path.is_empty());
        assert_eq!(model.exceptions, vec!["Unresolved reference: foo".to_string()]);
    }

    #[test]
    fn configured_leading_arguments_come_first() {
        let tools = tempfile::tempdir().unwrap();
        let query = script(
            tools.path(),
            r#"[ "$1" = "--mode" ] || exit 9
echo '{"classPath": [], "sourcePath": ["/src"]}'"#,
        );
        let project = tempfile::tempdir().unwrap();

        let mut config = HarnessConfig::default();
        config.model.command = vec![query.to_string_lossy().into_owned(), "--mode".into()];
        let provider = CommandModelProvider::from_config(&config).unwrap();
        let model = provider
            .model_for(project.path(), &project.path().join("build.gradle.kts"))
            .unwrap();

        assert_eq!(model.source_path, vec![PathBuf::from("/src")]);
    }

    #[test]
    fn no_command_means_no_provider() {
        assert!(CommandModelProvider::from_config(&HarnessConfig::default()).is_none());
    }
}
