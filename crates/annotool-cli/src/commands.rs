//! Execution of the operator subcommands.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use tracing::info;

use annotool_core::{
    logging, Capability, Error, FixedVideoInterface, ListQuery, Store, Tags, Video,
    VideoRepository,
};
use annotool_db::Database;
use annotool_engine::AnnotationService;

use crate::config::Config;
use crate::Commands;

/// Parse a `key=value` tag argument.
pub(crate) fn parse_tag(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", arg)),
    }
}

/// Build the list query for `list-categories`.
fn category_query(video: &Video, tags: Vec<(String, String)>, any: bool) -> ListQuery {
    let tags: Tags = tags.into_iter().collect();
    let query = ListQuery::children_of(video.resource.id);
    if any {
        query.with_tags_or(tags)
    } else {
        query.with_tags_and(tags)
    }
}

pub(crate) async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();
    let db = Database::connect_with_config(&config.database_url, config.pool.clone())
        .await
        .context("failed to connect to database")?;

    let op = match &command {
        Commands::Migrate => "migrate",
        Commands::SyncSeries { .. } => "sync_series",
        Commands::DeleteVideo { .. } => "delete_video",
        Commands::CloneCategory { .. } => "clone_category",
        Commands::CloneScale { .. } => "clone_scale",
        Commands::ListCategories { .. } => "list_categories",
    };

    if let Commands::Migrate = command {
        db.migrate().await.context("failed to run migrations")?;
        print_json(&serde_json::json!({ "migrated": true }))?;
        finished(op, start);
        return Ok(());
    }

    let service = AnnotationService::new(db, Arc::new(FixedVideoInterface::new(Capability::Admin)));
    let operator = service
        .resolve_user(&config.operator_ext_id, None, None)
        .await
        .context("failed to resolve operator user")?;

    match command {
        Commands::Migrate => {}
        Commands::SyncSeries { video, series } => {
            let video = find_video(&service, &video).await?;
            let categories = service
                .sync_series(&operator, video.resource.id, &series)
                .await?;
            print_json(&categories)?;
        }
        Commands::DeleteVideo { video } => {
            let video = find_video(&service, &video).await?;
            let deleted = service.delete_video(&operator, video.resource.id).await?;
            print_json(&deleted)?;
        }
        Commands::CloneCategory { video, template } => {
            let video = find_video(&service, &video).await?;
            let category = service
                .create_category_from_template(&operator, video.resource.id, template)
                .await?;
            print_json(&category)?;
        }
        Commands::CloneScale { video, template } => {
            let video = find_video(&service, &video).await?;
            let scale = service
                .create_scale_from_template(&operator, video.resource.id, template)
                .await?;
            print_json(&scale)?;
        }
        Commands::ListCategories {
            video,
            series,
            tags,
            any,
        } => {
            let video = find_video(&service, &video).await?;
            let query = category_query(&video, tags, any);
            let categories = service
                .list_categories(&operator, &query, series.as_deref())
                .await?;
            print_json(&categories)?;
        }
    }

    finished(op, start);
    Ok(())
}

async fn find_video(service: &AnnotationService<Database>, ext_id: &str) -> anyhow::Result<Video> {
    service
        .store()
        .videos()
        .find_by_ext_id(ext_id)
        .await?
        .ok_or_else(|| anyhow!(Error::NotFound(format!("video {}", ext_id))))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn finished(op: &str, start: Instant) {
    info!(
        subsystem = logging::SUBSYSTEM_CLI,
        component = logging::COMPONENT_COMMANDS,
        op,
        duration_ms = start.elapsed().as_millis() as u64,
        "Command finished"
    );
}
