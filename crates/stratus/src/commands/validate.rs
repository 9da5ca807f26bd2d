use crate::utils;
use colored::Colorize;
use std::path::Path;

pub fn handle(type_name: &str, file: &Path) -> anyhow::Result<()> {
    let descriptor = stratus_cloud_otc::resource_schemas()
        .into_iter()
        .chain(stratus_cloud_otc::data_source_schemas())
        .find(|d| d.name() == type_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown type: {}", type_name))?;

    println!(
        "Validating {} against {}...",
        file.display().to_string().cyan(),
        type_name.cyan()
    );

    let mut config = utils::read_attributes(file)?;
    descriptor.apply_defaults(&mut config);

    let errors = descriptor.validate(&config);
    if !errors.is_empty() {
        utils::print_validation_errors(&errors);
        anyhow::bail!("{} validation error(s)", errors.len());
    }

    println!("{}", "✓ Configuration is valid".green().bold());
    Ok(())
}
