use crate::utils;
use colored::Colorize;
use stratus_cloud::{StateFile, StateStore};

pub async fn handle_list(store: &StateStore, type_name: Option<&str>) -> anyhow::Result<()> {
    let state = store.load().await?;

    let resources: Vec<_> = match type_name {
        Some(t) => state.of_type(t),
        None => state.resources.iter().collect(),
    };

    if resources.is_empty() {
        println!("{}", "No tracked resources".dimmed());
        return Ok(());
    }

    for (key, resource) in resources {
        let id = resource.state.id().unwrap_or("(none)");
        let status = resource.state.get_str("status").unwrap_or("-");
        println!(
            "{}  {}  {}  {}",
            key.cyan(),
            id,
            status,
            resource
                .updated_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed()
        );
    }
    Ok(())
}

pub async fn handle_show(store: &StateStore, type_name: &str, name: &str) -> anyhow::Result<()> {
    let state = store.load().await?;
    let key = StateFile::key(type_name, name);

    let resource = state
        .get_resource(&key)
        .ok_or_else(|| anyhow::anyhow!("{} is not tracked", key))?;

    println!("{}", key.cyan().bold());
    utils::print_state(&resource.state);
    Ok(())
}
