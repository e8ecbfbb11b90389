//! Listing and exporting produced kits.

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::Subcommand,
    vigil_kit::{BlobStore, HistoryStore, MarketingHistoryItem},
};

use crate::app::App;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List kits, newest first.
    List {
        /// Show at most this many entries.
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write a kit's audio, image, and text to a directory and mark it downloaded.
    Export {
        id: String,
        #[arg(long)]
        out: PathBuf,
    },
}

pub async fn handle_history(app: &App, action: HistoryAction) -> anyhow::Result<()> {
    match action {
        HistoryAction::List { limit, json } => {
            let mut items = app.history.list().await?;
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No kits yet.");
            } else {
                for item in &items {
                    print_item(item);
                }
            }
        },
        HistoryAction::Export { id, out } => {
            let written = export_item(app.history.as_ref(), app.blobs.as_ref(), &id, &out).await?;
            for path in &written {
                println!("Wrote {}", path.display());
            }
        },
    }
    Ok(())
}

fn print_item(item: &MarketingHistoryItem) {
    let marker = if item.is_downloaded {
        "✓"
    } else {
        " "
    };
    println!(
        "  {marker} {} [{}/{}] {}",
        item.id,
        item.language.label(),
        item.job_type,
        item.title()
    );
}

/// Copy a kit's blobs and text to `out`, then flag it as downloaded.
pub async fn export_item(
    history: &dyn HistoryStore,
    blobs: &dyn BlobStore,
    id: &str,
    out: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let item = history
        .get(id)
        .await?
        .with_context(|| format!("no kit with id {id}"))?;
    tokio::fs::create_dir_all(out).await?;

    let mut written = Vec::with_capacity(3);
    for (key, extension) in [(&item.audio_blob_key, "wav"), (&item.image_blob_key, "png")] {
        let data = blobs
            .get(key)
            .await?
            .with_context(|| format!("blob {key} is missing"))?;
        let path = out.join(format!("{id}.{extension}"));
        tokio::fs::write(&path, &data).await?;
        written.push(path);
    }

    let text = out.join(format!("{id}.txt"));
    tokio::fs::write(&text, render_text(&item)).await?;
    written.push(text);

    history.mark_downloaded(id).await?;
    Ok(written)
}

fn render_text(item: &MarketingHistoryItem) -> String {
    let mut text = String::new();
    if let Some(post) = &item.social_post {
        text.push_str(&format!("{}\n\n{}\n\n", post.title, post.description));
        text.push_str(&hashtags(&post.hashtags));
    }
    if let Some(post) = &item.long_post {
        text.push_str(&format!(
            "{}\n\n{}\n\n{}\n\n",
            post.title, post.description, post.timestamps
        ));
        text.push_str(&hashtags(&post.hashtags));
        if !post.tags.is_empty() {
            text.push_str(&format!("\nTags: {}", post.tags.join(", ")));
        }
    }
    text.push_str(&format!("\n\n---\n\n{}\n", item.prayer_text));
    text
}

fn hashtags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("#{}", t.trim_start_matches('#')))
        .collect::<Vec<_>>()
        .join(" ")
}
