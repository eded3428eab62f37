use anyhow::{Context, Result};
use std::io::Write;

use crate::api::crds_yaml;

pub fn print_crds(out: &mut impl Write) -> Result<()> {
    let yaml = crds_yaml().context("failed to render custom resource definitions")?;
    out.write_all(yaml.as_bytes())?;
    Ok(())
}
