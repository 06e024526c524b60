use anyhow::Result;
use clap::{Parser, Subcommand};
use herald::{resources, sounds, Notification, Notifier};
use serde::Serialize;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Post desktop notifications on behalf of an Alfred workflow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Post a notification
    Notify {
        /// Notification title
        #[arg(short, long, default_value = "")]
        title: String,
        /// Notification body text
        #[arg(short, long, default_value = "")]
        message: String,
        /// System sound to play (see `herald sounds`)
        #[arg(short, long)]
        sound: Option<String>,
        /// Give up on the helper after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List the available system sounds
    Sounds {
        /// Emit Alfred script-filter JSON
        #[arg(long)]
        json: bool,
    },
}

/// One script-filter row
#[derive(Serialize)]
struct FilterItem {
    title: &'static str,
    arg: &'static str,
    valid: bool,
}

#[derive(Serialize)]
struct FilterOutput {
    items: Vec<FilterItem>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Notify {
            title,
            message,
            sound,
            timeout,
        } => {
            let context = resources::context()?;
            resources::init_logging(context.debug);

            let mut notifier = Notifier::new(context);
            if let Some(secs) = timeout {
                notifier = notifier.with_timeout(Duration::from_secs(secs));
            }

            let mut notification = Notification::new(title, message);
            notification.sound = sound;

            let posted = notifier.post(&notification)?;
            if !posted {
                // Details are already in the log
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Sounds { json } => {
            if json {
                let items = sounds::SOUNDS
                    .into_iter()
                    .map(|name| FilterItem {
                        title: name,
                        arg: name,
                        valid: true,
                    })
                    .collect();
                println!("{}", serde_json::to_string(&FilterOutput { items })?);
            } else {
                for name in sounds::SOUNDS {
                    println!("{}", name);
                }
            }
            Ok(())
        }
    }
}
