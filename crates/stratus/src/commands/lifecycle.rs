use crate::utils;
use anyhow::Context as _;
use colored::Colorize;
use std::path::Path;
use stratus_cloud::{
    CloudError, LocalState, Provider, ResourceHandler, StateFile, StateStore, StoredResource,
};

/// What every lifecycle command works against
pub struct Context<'a> {
    pub provider: &'a Provider,
    pub store: &'a StateStore,
    /// Provider region, recorded on resources that declare a region
    pub region: &'a str,
}

impl Context<'_> {
    fn handler(&self, type_name: &str) -> anyhow::Result<&dyn ResourceHandler> {
        Ok(self.provider.resource(type_name)?.as_ref())
    }

    fn with_region(&self, handler: &dyn ResourceHandler, config: &mut LocalState) {
        let unset = config.get_str("region").is_none_or(str::is_empty);
        if unset && handler.descriptor().get("region").is_some() {
            config.set("region", self.region);
        }
    }
}

fn tracked<'s>(state: &'s StateFile, key: &str) -> anyhow::Result<&'s StoredResource> {
    state
        .get_resource(key)
        .filter(|r| r.state.is_tracked())
        .ok_or_else(|| anyhow::anyhow!("{} is not tracked", key))
}

fn check(handler: &dyn ResourceHandler, config: &LocalState) -> anyhow::Result<()> {
    let errors = handler.validate(config);
    if !errors.is_empty() {
        utils::print_validation_errors(&errors);
        anyhow::bail!("{} validation error(s)", errors.len());
    }
    Ok(())
}

pub async fn create(ctx: &Context<'_>, type_name: &str, name: &str, file: &Path) -> anyhow::Result<()> {
    let handler = ctx.handler(type_name)?;
    let mut config = utils::read_attributes(file)?;
    ctx.with_region(handler, &mut config);
    check(handler, &config)?;

    let lock = ctx.store.acquire_lock().await?;
    let mut state = ctx.store.load().await?;
    let key = StateFile::key(type_name, name);

    if state
        .get_resource(&key)
        .is_some_and(|r| r.state.is_tracked())
    {
        anyhow::bail!("{} already exists; use update to change it", key);
    }

    println!("{}", format!("Creating {}...", key).blue());
    let result = handler
        .create(&mut config, &handler.default_timeouts())
        .await;

    // A timed-out create still produced a remote object
    if config.is_tracked() {
        state.set_resource(key.clone(), StoredResource::new(type_name, config.clone()));
        ctx.store.save(&state).await?;
    }
    lock.release().await?;

    result.with_context(|| format!("Failed to create {}", key))?;

    println!("{}", format!("✓ Created {}", key).green().bold());
    utils::print_state(&config);
    Ok(())
}

pub async fn read(ctx: &Context<'_>, type_name: &str, name: &str) -> anyhow::Result<()> {
    let handler = ctx.handler(type_name)?;
    let lock = ctx.store.acquire_lock().await?;
    let mut state = ctx.store.load().await?;
    let key = StateFile::key(type_name, name);

    let mut stored = tracked(&state, &key)?.clone();
    let mut current = stored.state.clone();
    handler
        .read(&mut current)
        .await
        .with_context(|| format!("Failed to read {}", key))?;

    if current.is_tracked() {
        stored.replace_state(current.clone());
        state.set_resource(key.clone(), stored);
        ctx.store.save(&state).await?;
        lock.release().await?;

        println!("{}", key.cyan().bold());
        utils::print_state(&current);
    } else {
        state.remove_resource(&key);
        ctx.store.save(&state).await?;
        lock.release().await?;

        println!(
            "{}",
            format!("{} no longer exists remotely; removed from state", key).yellow()
        );
    }
    Ok(())
}

pub async fn update(ctx: &Context<'_>, type_name: &str, name: &str, file: &Path) -> anyhow::Result<()> {
    let handler = ctx.handler(type_name)?;
    let lock = ctx.store.acquire_lock().await?;
    let mut state = ctx.store.load().await?;
    let key = StateFile::key(type_name, name);

    let mut stored = tracked(&state, &key)?.clone();
    let old = stored.state.clone();
    let mut desired = utils::read_attributes(file)?;
    if let Some(region) = old.get("region").filter(|_| desired.get("region").is_none()) {
        desired.set("region", region.clone());
    }
    check(handler, &desired)?;

    println!("{}", format!("Updating {}...", key).blue());
    let updated = match handler.update(&old, &desired).await {
        Ok(updated) => updated,
        Err(CloudError::ReplacementRequired { attributes, .. }) => {
            anyhow::bail!(
                "{} cannot change {} in place; delete and create it again",
                key,
                attributes.join(", ")
            );
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to update {}", key)),
    };

    if updated == old {
        println!("{}", "No changes".dimmed());
    } else {
        stored.replace_state(updated.clone());
        state.set_resource(key.clone(), stored);
        ctx.store.save(&state).await?;
        println!("{}", format!("✓ Updated {}", key).green().bold());
    }
    lock.release().await?;

    utils::print_state(&updated);
    Ok(())
}

pub async fn delete(ctx: &Context<'_>, type_name: &str, name: &str) -> anyhow::Result<()> {
    let handler = ctx.handler(type_name)?;
    let lock = ctx.store.acquire_lock().await?;
    let mut state = ctx.store.load().await?;
    let key = StateFile::key(type_name, name);

    let mut current = tracked(&state, &key)?.state.clone();

    println!("{}", format!("Deleting {}...", key).blue());
    let result = handler
        .delete(&mut current, &handler.default_timeouts())
        .await;

    if !current.is_tracked() {
        state.remove_resource(&key);
        ctx.store.save(&state).await?;
    }
    lock.release().await?;

    result.with_context(|| format!("Failed to delete {}", key))?;
    println!("{}", format!("✓ Deleted {}", key).green().bold());
    Ok(())
}

pub async fn import(ctx: &Context<'_>, type_name: &str, name: &str, id: &str) -> anyhow::Result<()> {
    let handler = ctx.handler(type_name)?;
    let lock = ctx.store.acquire_lock().await?;
    let mut state = ctx.store.load().await?;
    let key = StateFile::key(type_name, name);

    if state.get_resource(&key).is_some() {
        anyhow::bail!("{} is already tracked", key);
    }

    println!("{}", format!("Importing {} as {}...", id, key).blue());
    let mut imported = handler
        .import(id)
        .await
        .with_context(|| format!("Failed to import {}", id))?;
    ctx.with_region(handler, &mut imported);

    state.set_resource(key.clone(), StoredResource::new(type_name, imported.clone()));
    ctx.store.save(&state).await?;
    lock.release().await?;

    println!("{}", format!("✓ Imported {}", key).green().bold());
    utils::print_state(&imported);
    Ok(())
}
