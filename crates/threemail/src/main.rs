//! threemail - console client for 3Mail.

mod command;
mod render;

use std::io::Write;

use anyhow::Context;
use threemail_core::{ClientConfig, ComposeForm, Coordinator, View};
use threemail_identity::{BrowserAuthenticator, IdentityClient, KeyringSessionStore, SessionManager};
use threemail_store::HttpConnector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use command::Command;

type App = Coordinator<BrowserAuthenticator, KeyringSessionStore, HttpConnector>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "threemail=info,threemail_core=debug,threemail_identity=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting threemail");

    let config = ClientConfig::load().context("Could not load configuration")?;
    let client = IdentityClient::new(config.provider()?);
    let authenticator =
        BrowserAuthenticator::new(client, config.login_timeout()).with_port(config.callback_port);
    let sessions = SessionManager::new(authenticator, KeyringSessionStore::new());
    let connector = HttpConnector::new(&config.store_url).context("Invalid store URL")?;
    let mut app = Coordinator::new(sessions, connector);

    match app.start().await {
        Ok(true) => {
            print!("{}", render::identity(app.state()));
            print!("{}", render::message_list(app.state()));
        }
        Ok(false) => println!("Type login to sign in, help for commands."),
        Err(e) => {
            warn!("Could not restore session: {e}");
            println!("Could not restore your session. Type login to sign in.");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }

        if let Err(e) = run(&mut app, command).await {
            // The status line already tells the user what went wrong.
            if app.state().status().is_none() && app.state().alert().is_none() {
                println!("{e}");
            }
            info!("Command failed: {e}");
        }

        print!("{}", render::notices(app.state()));
        app.state_mut().dismiss_alert();
        app.state_mut().clear_status();
    }

    info!("Bye");
    Ok(())
}

/// Runs one command and prints its output.
async fn run(app: &mut App, command: Command) -> threemail_core::Result<()> {
    match command {
        Command::Login => {
            println!("Opening the browser to log in...");
            app.login().await?;
            print!("{}", render::identity(app.state()));
            print!("{}", render::message_list(app.state()));
        }
        Command::Logout => {
            if app.logout()? {
                println!("Logged out.");
            } else {
                println!("Not logged in.");
            }
        }
        Command::Whoami => print!("{}", render::identity(app.state())),
        Command::Inbox => show(app, View::Inbox).await?,
        Command::Unviewed => show(app, View::Unviewed).await?,
        Command::Sent => show(app, View::Sent).await?,
        Command::Search(query) => show(app, View::Search(query)).await?,
        Command::Send { to, subject, body } => {
            app.compose(ComposeForm::new(to, subject, body));
            app.send().await?;
        }
        Command::View(subject) => match app.open(&subject).await? {
            Some(message) => print!("{}", render::message(&message)),
            None => println!("No message with subject \"{subject}\" in this list."),
        },
        Command::Delete(subject) => {
            app.delete(&subject).await?;
            print!("{}", render::message_list(app.state()));
        }
        Command::DeleteAll => {
            app.delete_all().await?;
            print!("{}", render::message_list(app.state()));
        }
        Command::Alias(name) => app.claim_alias(&name).await?,
        Command::Counts => {
            app.refresh_counts().await?;
            print!("{}", render::counts(app.state()));
        }
        Command::Help => println!("{}", command::HELP),
        Command::Quit => {}
    }
    Ok(())
}

async fn show(app: &mut App, view: View) -> threemail_core::Result<()> {
    app.show(view).await?;
    print!("{}", render::message_list(app.state()));
    Ok(())
}
