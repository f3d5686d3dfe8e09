use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use ctzn_types::RecordRef;

use ctzn::api::ApiClient;
use ctzn::config::Settings;
use ctzn::items::list_all_members;
use ctzn::logging::{self, LogConfig};
use ctzn::notifications::NotificationsState;
use ctzn::render::render_thread;
use ctzn::view::{LoadStatus, ThreadView};

const RENDER_WIDTH: usize = 80;

/// ctzn - read and reply to CTZN threads from the terminal
#[derive(Parser)]
#[command(name = "ctzn")]
#[command(version)]
struct Cli {
    /// Server URL to connect to
    #[arg(long, short, env = "CTZN_SERVER_URL")]
    server: Option<String>,

    /// Session token for authenticated requests
    #[arg(long, env = "CTZN_SESSION_TOKEN")]
    session_token: Option<String>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the thread containing a post
    Thread { author_id: String, url: String },
    /// Reply to a post and print the updated thread
    Reply {
        author_id: String,
        url: String,
        text: String,
    },
    /// Show the unread notification count
    Notifications {
        /// Mark notifications as read
        #[arg(long)]
        mark_read: bool,
    },
    /// List every member of a community
    Members { community_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is read before parsing so clap's env fallbacks can see it
    let _ = dotenv::dotenv();
    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load settings")?;
    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        settings.log_config()
    };
    logging::init_logging(&log_config)?;

    let server_url = cli.server.unwrap_or_else(|| settings.server_url.clone());
    let mut client = ApiClient::new(server_url);
    client.set_log_config(log_config.clone());
    let token = cli.session_token.or_else(|| settings.session_token.clone());
    if token.is_some() {
        client.set_session_token(token);
        match client.load_session().await {
            Ok(session) => log::info!("Session loaded for {}", session.user_id),
            Err(e) => log::warn!("Continuing signed out: {}", e),
        }
    }

    match cli.command {
        Command::Thread { author_id, url } => {
            let mut view = ThreadView::new(
                RecordRef::new(author_id, url),
                settings.max_reply_chars,
                log_config,
            );
            load_view(&mut view, &client).await?;
            print_view(&view);
        }
        Command::Reply {
            author_id,
            url,
            text,
        } => {
            let mut view = ThreadView::new(
                RecordRef::new(author_id, url),
                settings.max_reply_chars,
                log_config,
            );
            load_view(&mut view, &client).await?;
            view.refresh_capability(&client)
                .await
                .context("Failed to check reply permissions")?;
            view.start_reply()?;
            view.composer_mut().edit(text)?;
            let post = view.submit_reply(&client, &client).await?;
            println!("Reply published: {}", post.url);
            print_view(&view);
        }
        Command::Notifications { mark_read } => {
            let mut state = NotificationsState::default();
            state
                .load(&client, mark_read)
                .await
                .context("Failed to load notifications")?;
            println!("{}", state.title());
        }
        Command::Members { community_id } => {
            let members = list_all_members(&client, &community_id)
                .await
                .with_context(|| format!("Failed to list members of {}", community_id))?;
            for member in &members {
                println!("{}", member.value.user.user_id);
            }
            ctzn::log_debug!(log_config, "listed {} members", members.len());
        }
    }

    Ok(())
}

async fn load_view(view: &mut ThreadView, client: &ApiClient) -> Result<()> {
    view.load(client).await;
    if let LoadStatus::Failed(message) = view.status() {
        bail!("{}", message);
    }
    Ok(())
}

fn print_view(view: &ThreadView) {
    if let Some(groups) = view.groups() {
        for line in render_thread(groups, &Local::now(), RENDER_WIDTH) {
            println!("{}", line);
        }
    }
}
