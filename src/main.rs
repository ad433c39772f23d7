use analysis_workspace::chat::{
    ChatClient, ChatSession, Notification, NotificationLevel, Notifier, StreamOutcome,
};
use analysis_workspace::cli::Args;
use analysis_workspace::config::{load_config, normalize_base_url};
use analysis_workspace::logging::setup_logging;
use analysis_workspace::refresh::WorkspaceRefresher;
use analysis_workspace::sections::{display, trailing_text, SectionKind};
use analysis_workspace::session::{FileStatePersistence, SessionStore, Theme};
use analysis_workspace::workspace::WorkspaceClient;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => eprintln!("{}", notification.message),
            NotificationLevel::Error => eprintln!("Error: {}", notification.message),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    setup_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = &args.backend_url {
        config.backend_url = normalize_base_url(url)?;
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }

    let persistence = FileStatePersistence::new(config.state_dir()?);
    let mut store = SessionStore::load(Box::new(persistence));
    if args.no_auto_collapse && store.auto_collapse() {
        store.set_auto_collapse(false);
    }
    if let Some(theme) = args.theme {
        store.set_theme(theme);
    }
    // The accent palette is tuned for dark backgrounds
    let dark = store.theme() == Theme::Dark;

    let workspace = WorkspaceClient::new(&config);
    if let Err(e) = workspace.refresh_file_list(store.session_id()).await {
        warn!("Could not load workspace files: {}", e);
    }

    let mut session = ChatSession::new(
        ChatClient::new(&config),
        store,
        Arc::new(workspace.clone()),
        Arc::new(StderrNotifier),
        config.refresh_debounce(),
    )
    .with_workspace(workspace.clone());

    session.on_update(move |update| {
        for section in update.completed() {
            let style = display::metadata(section.kind);
            let accent = if dark { style.ansi } else { BOLD };
            println!("{}{} {}{}", accent, style.icon, style.label, RESET);
            println!("{}\n", section.body);
        }
    });

    let cancel = CancellationToken::new();
    let stop = session.stop_handle();
    let token = cancel.clone();
    let stopper = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
            stop.stop().await;
        }
    });

    let outcome = session.send_message(&args.message, &cancel).await;
    match outcome {
        StreamOutcome::Cancelled => {
            let _ = stopper.await;
        }
        _ => stopper.abort(),
    }

    let conversation = session.conversation();
    if let Some(index) = conversation.messages().len().checked_sub(1) {
        let keyed = conversation.sections_with_keys(index);
        if let Some(message) = conversation.get(index) {
            let sections: Vec<_> = keyed.iter().map(|(_, section)| section.clone()).collect();
            let tail = trailing_text(&message.content, &sections).trim();
            if !tail.is_empty() {
                println!("{}\n", tail);
            }
        }

        let produced_files = keyed
            .iter()
            .any(|(_, section)| section.kind == SectionKind::File);
        if produced_files && outcome == StreamOutcome::Completed {
            for file in workspace.files() {
                eprintln!("{}  {}", file.name, file.download_url);
            }
        }

        for (key, _) in &keyed {
            let state = if session.store().is_collapsed(key) {
                "collapsed"
            } else {
                "expanded"
            };
            eprintln!("{:<24} {}", key.to_string(), state);
        }
    }

    match outcome {
        StreamOutcome::Failed => Err(anyhow::anyhow!("Request failed")),
        _ => Ok(()),
    }
}
