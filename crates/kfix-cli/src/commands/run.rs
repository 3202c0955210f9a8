use std::path::{Path, PathBuf};
use std::time::Instant;

use miette::Result;

use kfix_core::config::{CiMode, HarnessConfig};
use kfix_fixture::scenario::{Scenario, ScenarioReport};
use kfix_fixture::{DaemonSettings, ProjectFixture};
use kfix_util::errors::FixtureError;
use kfix_util::progress::{spinner, status, status_error, status_info, status_warn};

pub fn exec(scenarios: &[PathBuf], ci: bool, verbose: bool) -> Result<()> {
    let config = super::load_config()?;
    let ci = if ci { CiMode::Ci } else { CiMode::detect() };

    let mut failed = 0usize;
    for path in scenarios {
        let started = Instant::now();
        match run_one(&config, ci, path) {
            Ok(report) => {
                status(
                    "Passed",
                    &format!(
                        "{} ({} checks, {:.1}s)",
                        report.name,
                        report.checks,
                        started.elapsed().as_secs_f64()
                    ),
                );
                if verbose {
                    if let Some(result) = &report.result {
                        println!("{}", result.output);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                status_error("Failed", &path.display().to_string());
                eprintln!("{e:?}");
            }
        }
    }

    status_info(
        "Finished",
        &format!("{} passed, {failed} failed", scenarios.len() - failed),
    );
    if failed > 0 {
        return Err(FixtureError::Generic {
            message: format!("{failed} of {} scenarios failed", scenarios.len()),
        }
        .into());
    }
    Ok(())
}

fn run_one(config: &HarnessConfig, ci: CiMode, path: &Path) -> Result<ScenarioReport> {
    let scenario = Scenario::load(path)?;
    status("Running", &scenario.name);

    let fixture = ProjectFixture::builder(scenario.name.as_str())
        .config(config.clone())
        .daemon(DaemonSettings::from_config(config))
        .ci(ci)
        .build()?;
    tracing::debug!(
        "Scenario `{}` provisioned under {}",
        scenario.name,
        fixture.fixture_root().base().display()
    );

    let pb = spinner(&format!("Building {}", scenario.name));
    let report = scenario.run(&fixture);
    pb.finish_and_clear();

    let report = report?;
    if let Err(e) = fixture.dispose() {
        status_warn("Warning", &format!("could not remove project of `{}`: {e}", report.name));
    }
    Ok(report)
}
