use crate::utils;
use colored::Colorize;
use std::path::Path;
use stratus_cloud::{LocalState, Provider};

pub async fn handle(provider: &Provider, type_name: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let source = provider.data_source(type_name)?;

    let config = match file {
        Some(path) => utils::read_attributes(path)?,
        None => LocalState::new(),
    };

    let errors = source.descriptor().validate(&config);
    if !errors.is_empty() {
        utils::print_validation_errors(&errors);
        anyhow::bail!("{} validation error(s)", errors.len());
    }

    println!("{}", format!("Looking up {}...", type_name).blue());
    let state = source.read(&config).await?;

    println!("{}", "✓ Found".green().bold());
    utils::print_state(&state);
    Ok(())
}
