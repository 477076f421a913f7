//! `campus tags ...`

use crate::cli::{StatusFilter, TagsCommands};
use anyhow::{Context, Result};
use campus_config::{CampusConfig, StorageConfig};
use campus_core::{
    NewTag, TagBackend, TagContext, TagId, TagQuery, TagService, TagStatus, TagUpdate, UserId,
};
use campus_sqlite::{SqliteConfig, SqliteTagBackend};
use serde_json::{json, Value};
use tracing::info;

/// SQLite settings for the configured storage
pub fn sqlite_config(storage: &StorageConfig) -> SqliteConfig {
    SqliteConfig {
        path: storage.path.clone(),
        wal_mode: storage.wal_mode,
        busy_timeout_ms: storage.busy_timeout_ms,
        cache_size: storage.cache_size,
        ..SqliteConfig::default()
    }
}

pub async fn execute(config: &CampusConfig, actor: Option<UserId>, cmd: TagsCommands) -> Result<()> {
    let backend = SqliteTagBackend::open(sqlite_config(&config.storage)).with_context(|| {
        format!("failed to open database {}", config.storage.path.display())
    })?;
    info!(db = %config.storage.path.display(), "Database ready");

    let service = TagService::new(backend);
    let output = run(&service, actor, cmd).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Run one subcommand and return its JSON result
pub async fn run<B: TagBackend>(
    service: &TagService<B>,
    actor: Option<UserId>,
    cmd: TagsCommands,
) -> Result<Value> {
    let output = match cmd {
        TagsCommands::Merge { target, sources } => {
            let sources: Vec<TagId> = sources.into_iter().map(TagId).collect();
            let outcome = service
                .merge_tags(TagId(target), &sources, actor)
                .await
                .with_context(|| format!("failed to merge into tag {}", target))?;
            serde_json::to_value(outcome)?
        }

        TagsCommands::Split {
            tag,
            names,
            keep_original,
            color,
        } => {
            let original = service
                .get_tag(TagId(tag))
                .await
                .with_context(|| format!("failed to load tag {}", tag))?;
            let outcome = service
                .split_tag(&original, names, keep_original, color, actor)
                .await
                .with_context(|| format!("failed to split tag {}", tag))?;
            serde_json::to_value(outcome)?
        }

        TagsCommands::Create {
            context,
            name,
            name_en,
            description,
            color,
            inactive,
        } => {
            let new_tag = NewTag {
                name_en,
                description,
                color,
                is_active: !inactive,
                ..NewTag::new(context, name)
            };
            let tag = service
                .create_tag(new_tag, actor)
                .await
                .context("failed to create tag")?;
            serde_json::to_value(tag)?
        }

        TagsCommands::Update {
            id,
            name,
            name_en,
            description,
            color,
            active,
        } => {
            let current = service
                .get_tag(TagId(id))
                .await
                .with_context(|| format!("failed to load tag {}", id))?;

            let mut update = TagUpdate::from_tag(&current);
            if let Some(name) = name {
                update.name = name;
            }
            if name_en.is_some() {
                update.name_en = name_en;
            }
            if description.is_some() {
                update.description = description;
            }
            if color.is_some() {
                update.color = color;
            }
            if let Some(active) = active {
                update.is_active = active;
            }

            let tag = service
                .update_tag(TagId(id), update, actor)
                .await
                .with_context(|| format!("failed to update tag {}", id))?;
            serde_json::to_value(tag)?
        }

        TagsCommands::Deactivate { id } => {
            let tag = service
                .deactivate_tag(TagId(id), actor)
                .await
                .with_context(|| format!("failed to deactivate tag {}", id))?;
            serde_json::to_value(tag)?
        }

        TagsCommands::Show { id } => {
            let tag = service.get_tag(TagId(id)).await?;
            serde_json::to_value(tag)?
        }

        TagsCommands::List {
            context,
            status,
            keyword,
            limit,
            offset,
        } => {
            let query = TagQuery {
                context: context.map(TagContext::from),
                status: match status {
                    StatusFilter::All => TagStatus::All,
                    StatusFilter::Active => TagStatus::Active,
                    StatusFilter::Inactive => TagStatus::Inactive,
                },
                keyword,
                limit,
                offset,
            };
            let rows = service.list_tags(query).await.context("failed to list tags")?;
            serde_json::to_value(rows)?
        }

        TagsCommands::Register { contexts, names } => {
            let contexts: Vec<TagContext> = contexts.into_iter().map(TagContext::from).collect();
            let created = service
                .register_names(names, &contexts)
                .await
                .context("failed to register tags")?;
            json!({ "created": created })
        }
    };

    Ok(output)
}
