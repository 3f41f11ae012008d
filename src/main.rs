//! thinpost CLI
//!
//! Command-line client for the posts board:
//! - Log in through the platform's login page
//! - List and watch posts with their like counts
//! - Publish and like

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use thinpost::auth::{login_url, session_from_callback, SessionStore};
use thinpost::backend::{Backend, RemoteBackend};
use thinpost::config::{generate_default_config, Config};
use thinpost::error::BackendError;
use thinpost::models::{Like, Post, Record, Table};
use thinpost::query::{query, Query, QueryState};
use thinpost::view::{LikeButton, Navbar, NewPostForm, PostCard, PostList, LOADING_TEXT};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "thinpost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Posts with likes on a Thin Backend host")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Platform host, overriding the config
    #[arg(long, global = true)]
    pub host: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the platform login URL
    LoginUrl {
        /// Where the platform sends the browser after login
        #[arg(long, default_value = "http://localhost:3000/")]
        redirect: String,
    },

    /// Save the session from the URL the login page redirected to
    Login {
        /// Redirect URL (or just its query string) carrying userId and accessToken
        callback: String,
    },

    /// Show the logged in user
    Whoami,

    /// List posts, most recent first
    Posts,

    /// List posts and reprint on every change
    Watch,

    /// Publish a post
    Publish {
        /// Post body
        body: String,
    },

    /// Like a post
    Like {
        /// Post id
        post_id: Uuid,
    },

    /// End the session
    Logout,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(host) = cli.host {
        config.backend.host = host;
    }

    init_logging(&config);

    match cli.command {
        Commands::LoginUrl { redirect } => {
            println!("{}", login_url(&config.backend.host, &redirect));
        }

        Commands::Login { callback } => {
            let query_string = callback.split_once('?').map_or(callback.as_str(), |(_, q)| q);
            let Some(session) = session_from_callback(query_string)? else {
                bail!("No userId/accessToken in {}", callback);
            };
            let store = SessionStore::new(&config.session.file);
            store.save(&session)?;
            println!("Logged in as {} (session saved to {:?})", session.user_id, store.path());
        }

        Commands::Whoami => {
            let backend = connect(&config).await?;
            let user = backend.current_user().await?;
            match user {
                Some(user) => println!("{}", Navbar::new(Some(&user)).email()),
                None => println!("Unknown user {}", backend.session().user_id),
            }
        }

        Commands::Posts => {
            let backend = connect(&config).await?;
            let mut posts = backend.subscribe(PostList::query()).await?;
            let mut likes = backend.subscribe(all_likes()).await?;
            posts.ready().await?;
            likes.ready().await?;
            let list = PostList::from_state(&posts.state())?;
            print!("{}", render_posts(&list, &likes.state()));
        }

        Commands::Watch => {
            let backend = connect(&config).await?;
            let mut posts = backend.subscribe(PostList::query()).await?;
            let mut likes = backend.subscribe(all_likes()).await?;
            loop {
                let list = PostList::from_state(&posts.state())?;
                print!("{}", render_posts(&list, &likes.state()));
                tokio::select! {
                    changed = posts.changed() => changed?,
                    changed = likes.changed() => changed?,
                    _ = tokio::signal::ctrl_c() => break,
                }
                println!();
            }
        }

        Commands::Publish { body } => {
            let backend = connect(&config).await?;
            let mut form = NewPostForm::new();
            form.set_draft(body);
            match form.submit(&backend).await? {
                Some(post) => println!("Published {}", post.id),
                None => bail!("Nothing to publish"),
            }
        }

        Commands::Like { post_id } => {
            let backend = connect(&config).await?;
            let likes = backend.query(LikeButton::query(post_id)).await?;
            let Some(button) = LikeButton::from_state(post_id, &QueryState::Ready(likes)) else {
                bail!("Likes of {} unavailable", post_id);
            };
            button.activate(&backend).await?;
            println!("♡ {}", button.count() + 1);
        }

        Commands::Logout => {
            let backend = connect(&config).await?;
            let user = backend.current_user().await.unwrap_or_default();
            Navbar::new(user.as_ref()).logout(&backend).await?;
            println!("Logged out");
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            if let Some(path) = output {
                std::fs::write(&path, content)?;
                println!("Config written to {:?}", path);
            } else {
                print!("{}", content);
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("thinpost={}", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn connect(config: &Config) -> anyhow::Result<RemoteBackend> {
    match RemoteBackend::from_config(config).await {
        Err(BackendError::NotLoggedIn) => bail!(
            "Not logged in. Open the URL from `thinpost login-url`, then run `thinpost login <redirect url>`"
        ),
        result => result.with_context(|| format!("Failed to connect to {}", config.backend.host)),
    }
}

/// Every like; each post's count is taken from this one subscription
fn all_likes() -> Query {
    query(Like::NAME).build()
}

fn render_posts(list: &PostList, likes: &QueryState<Vec<Record>>) -> String {
    if list.is_loading() {
        return format!("{}\n", LOADING_TEXT);
    }
    if list.posts().is_empty() {
        return "No posts yet\n".to_string();
    }
    list.posts()
        .iter()
        .map(|post| render_post(post, likes))
        .collect()
}

fn render_post(post: &Post, likes: &QueryState<Vec<Record>>) -> String {
    let card = PostCard::new(post);
    let label = LikeButton::from_state(post.id, likes)
        .map(|button| button.label())
        .unwrap_or_default();
    format!("{}\n  {}  {}  [{}]\n", card.body, card.created_at, label, card.id)
}
