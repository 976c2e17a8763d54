use clap::{Parser, Subcommand};
use futures_util::future::try_join_all;
use skillshare_client::{
    config::Config,
    helper::feed_helpers::{FeedScope, FeedView},
    helper::media_helpers::{load_local_file, MediaPipeline},
    helper::reaction_helpers::REACTION_OPTIONS,
    helper::sanitization_helpers::to_plain_text,
    helper::search_helpers::SearchState,
    middleware::EnvCredential,
    models::{Notification, NotificationKind, PostView, Viewer},
    AppState,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const TOKEN_VAR: &str = "SKILLSHARE_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "skillshare_cli", author, version, about = "Terminal client for the SkillShare feed.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the feed, optionally only one author's posts.
    Feed {
        #[arg(long)]
        author: Option<String>,
    },
    /// Publish a post with text and/or media files.
    Post {
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long = "media", value_name = "FILE")]
        media: Vec<PathBuf>,
    },
    /// Edit one of your posts. New media replaces the old media.
    Edit {
        post_id: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long = "media", value_name = "FILE")]
        media: Vec<PathBuf>,
    },
    Delete {
        post_id: String,
    },
    /// React to a post (one of 👍 😂 ❤️ 😮 😢 😡).
    React {
        post_id: String,
        symbol: String,
    },
    Comment {
        post_id: String,
        text: String,
    },
    /// Search users. Each argument is fed in as one keystroke state,
    /// e.g. `search a ab abc`.
    Search {
        #[arg(required = true)]
        keystrokes: Vec<String>,
    },
}

fn viewer_from_env() -> Result<Viewer, String> {
    let user_id = env::var("SKILLSHARE_USER_ID")
        .map_err(|_| "SKILLSHARE_USER_ID is not set. Sign in first.".to_string())?;
    let user_name = env::var("SKILLSHARE_USER_NAME").unwrap_or_else(|_| "Anonymous".to_string());
    Ok(Viewer { user_id, user_name })
}

fn print_post(post: &PostView) {
    println!("── {} · {}", post.author_name, post.id);
    if let Some(created_at) = post.created_at {
        println!("   {}", created_at.format("%b %e, %H:%M"));
    }
    if let Some(content) = &post.content {
        println!("   {}", to_plain_text(content));
    }
    for media in &post.media {
        println!("   [{}] {}", media.kind.as_str(), media.url);
    }
    if !post.reaction_summary.is_empty() {
        let counts: Vec<String> = post
            .reaction_summary
            .counts
            .iter()
            .map(|(symbol, count)| format!("{} {}", symbol, count))
            .collect();
        let mine = post.my_reaction.as_deref().map(|r| format!(" (you: {})", r)).unwrap_or_default();
        println!("   {}{}", counts.join("  "), mine);
    }
    for comment in &post.comments {
        println!("   {}: {}", to_plain_text(&comment.user_name), to_plain_text(&comment.text));
    }
    if post.is_own {
        println!("   (yours: edit / delete)");
    }
}

fn print_notification(notification: &Notification) {
    match notification.kind {
        NotificationKind::Success => println!("✓ {}", notification.message),
        NotificationKind::Error => eprintln!("✗ {}", notification.message),
    }
}

fn print_feed(state: &AppState, viewer: &Viewer) {
    if let Some(alert) = state.feed.alert() {
        eprintln!("⚠ {}", alert.message);
    }
    match state.feed.view(viewer) {
        FeedView::NotLoaded => println!("The feed could not be loaded."),
        FeedView::Empty { message } => println!("{}", message),
        FeedView::Posts(posts) => posts.iter().for_each(print_post),
    }
}

/// Loads and stages files. Fails after printing the reasons if any file was
/// rejected, so nothing half-valid gets uploaded.
async fn stage_media(state: &AppState, paths: &[PathBuf]) -> Result<MediaPipeline, Box<dyn std::error::Error>> {
    let mut pipeline = state.media_pipeline();
    let files = try_join_all(paths.iter().map(|p| load_local_file(p))).await?;
    let outcome = pipeline.stage(files);
    if !outcome.rejected.is_empty() {
        for rejection in &outcome.rejected {
            eprintln!("✗ {}: {}", rejection.file_name, rejection.reason);
        }
        return Err(format!("{} file(s) rejected, nothing was uploaded", outcome.rejected.len()).into());
    }
    for attachment in pipeline.pending() {
        log::debug!("Staged {} ({} bytes) as {}", attachment.file.name, attachment.size, attachment.preview_url);
    }
    Ok(pipeline)
}

async fn wait_for_search(state: &AppState) -> SearchState {
    loop {
        let current = state.search.state();
        match current {
            SearchState::Scheduled { .. } | SearchState::Loading { .. } => {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            settled => return settled,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.env_file.as_deref())?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let scope = match &cli.command {
        Commands::Feed { author: Some(author) } => FeedScope::ByAuthor(author.clone()),
        _ => FeedScope::All,
    };
    let state = AppState::connect(config, scope, Arc::new(EnvCredential::new(TOKEN_VAR)))?;
    let viewer = viewer_from_env()?;

    match cli.command {
        Commands::Feed { .. } => {
            let _ = state.feed.refresh().await;
            print_feed(&state, &viewer);
        }
        Commands::Post { content, media } => {
            let mut pipeline = stage_media(&state, &media).await?;
            match state.posts.create(&viewer, &content, &mut pipeline).await {
                Ok(post) => {
                    print_notification(&Notification::success(format!("Posted {}", post.id)));
                    print_feed(&state, &viewer);
                }
                Err(e) => eprintln!("✗ {}", e.user_message()),
            }
        }
        Commands::Edit { post_id, content, media } => {
            let mut pipeline = stage_media(&state, &media).await?;
            match state.posts.update(&post_id, &content, &mut pipeline).await {
                Ok(_) => {
                    print_notification(&Notification::success(format!("Updated {}", post_id)));
                    print_feed(&state, &viewer);
                }
                Err(e) => eprintln!("✗ {}", e.user_message()),
            }
        }
        Commands::Delete { post_id } => match state.posts.delete(&post_id).await {
            Ok(()) => {
                print_notification(&Notification::success(format!("Deleted {}", post_id)));
                print_feed(&state, &viewer);
            }
            Err(e) => eprintln!("✗ {}", e.user_message()),
        },
        Commands::React { post_id, symbol } => {
            if !REACTION_OPTIONS.contains(&symbol.as_str()) {
                log::info!("'{}' is not one of the standard reactions", symbol);
            }
            match state.reactions.react(&post_id, &viewer.user_id, &symbol).await {
                Ok(()) => print_feed(&state, &viewer),
                Err(e) => {
                    if let Some(alert) = state.reactions.alert() {
                        print_notification(&alert);
                    } else {
                        eprintln!("✗ {}", e);
                    }
                }
            }
        }
        Commands::Comment { post_id, text } => {
            match state.comments.submit(&post_id, &viewer.user_id, &viewer.user_name, &text).await {
                Ok(()) => print_feed(&state, &viewer),
                Err(e) => eprintln!("✗ {}", e.user_message()),
            }
        }
        Commands::Search { keystrokes } => {
            for keystroke in &keystrokes {
                state.search.on_query_change(keystroke);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            match wait_for_search(&state).await {
                SearchState::Results { users, .. } => {
                    for user in users {
                        println!("{}  {}", user.id, to_plain_text(&user.name));
                    }
                }
                SearchState::NoResults { message, .. } => println!("{}", message),
                SearchState::NeedsQuery { message } => println!("{}", message),
                SearchState::Failed { alert, .. } => print_notification(&alert),
                SearchState::Idle | SearchState::Scheduled { .. } | SearchState::Loading { .. } => {}
            }
        }
    }

    Ok(())
}
