use kfix_core::outcome::{parse_tasks, BuildResult, BuildStatus, TaskOutcome};

const OUTPUT: &str = "\
> Task :buildSrc:compileKotlin NO-SOURCE
> Task :compileKotlin
> Task :compileJava NO-SOURCE
> Task :processResources UP-TO-DATE
> Task :classes
> Task :test FAILED

FAILURE: Build failed with an exception.
";

#[test]
fn parse_tasks_reads_plain_console_lines() {
    let tasks = parse_tasks(OUTPUT);
    assert_eq!(tasks.len(), 6);
    assert_eq!(tasks[0].path, ":buildSrc:compileKotlin");
    assert_eq!(tasks[0].outcome, TaskOutcome::NoSource);
    assert_eq!(tasks[1].outcome, TaskOutcome::Success);
    assert_eq!(tasks[3].outcome, TaskOutcome::UpToDate);
    assert_eq!(tasks[5].outcome, TaskOutcome::Failed);
}

#[test]
fn parse_tasks_ignores_unrelated_lines() {
    let tasks = parse_tasks("> Configure project :\n> Task help\nBUILD SUCCESSFUL\n");
    assert!(tasks.is_empty());
}

#[test]
fn build_result_outcome_lookup() {
    let result = BuildResult::from_output(BuildStatus::Failure, OUTPUT.to_string());
    assert!(!result.is_success());
    assert_eq!(result.outcome_of(":compileKotlin"), Some(TaskOutcome::Success));
    assert_eq!(result.outcome_of(":jar"), None);
    assert_eq!(
        result.task_paths(TaskOutcome::NoSource),
        vec![":buildSrc:compileKotlin", ":compileJava"]
    );
}

#[test]
fn task_outcome_from_str_accepts_both_spellings() {
    assert_eq!("UP-TO-DATE".parse::<TaskOutcome>().unwrap(), TaskOutcome::UpToDate);
    assert_eq!("up_to_date".parse::<TaskOutcome>().unwrap(), TaskOutcome::UpToDate);
    assert_eq!("success".parse::<TaskOutcome>().unwrap(), TaskOutcome::Success);
    assert!("EXPLODED".parse::<TaskOutcome>().is_err());
}

#[test]
fn task_outcome_display_matches_test_kit_names() {
    assert_eq!(TaskOutcome::FromCache.to_string(), "FROM_CACHE");
    assert_eq!(BuildStatus::Failure.to_string(), "failed");
}
