use miette::Result;

use kfix_core::config::CONFIG_FILE;
use kfix_util::fs::find_ancestor_with;

pub fn exec() -> Result<()> {
    let cwd = super::current_dir()?;
    match find_ancestor_with(&cwd, CONFIG_FILE) {
        Some(dir) => println!("# {}", dir.join(CONFIG_FILE).display()),
        None => println!("# no {CONFIG_FILE} found, using defaults"),
    }

    let config = super::load_config()?;
    print!("{}", config.to_toml()?);
    Ok(())
}
