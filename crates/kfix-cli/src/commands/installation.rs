use miette::Result;

use kfix_util::progress::status_info;

pub fn exec() -> Result<()> {
    let config = super::load_config()?;
    let installation = config.installation()?;

    status_info("Installation", &installation.display().to_string());
    status_info("Registry", &config.daemon_registry().display().to_string());
    println!("{}", installation.display());
    Ok(())
}
