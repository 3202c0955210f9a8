use std::path::Path;

use miette::Result;

use kfix_core::properties::merge_properties_into;
use kfix_util::errors::FixtureError;
use kfix_util::progress::status;

pub fn exec(file: &Path, pairs: &[String]) -> Result<()> {
    let entries = pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| FixtureError::Config {
                    message: format!("Expected KEY=VALUE, got `{pair}`"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let merged = merge_properties_into(file, entries)?;
    status(
        "Merged",
        &format!(
            "{} entr{} into {} ({} total)",
            pairs.len(),
            if pairs.len() == 1 { "y" } else { "ies" },
            file.display(),
            merged.len()
        ),
    );
    Ok(())
}
