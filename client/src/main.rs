// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use client::api::ApiClient;
use client::state::{self, Phase};
use client::updates::{self, UpdateStream};
use common::UpdateEvent;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SERVER_URL: &str = "http://localhost:5001";

/// A parsed line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Mark task `id` complete on behalf of `name`.
    Done(i64, String),
    Refresh,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("done") => {
            let id = words.next().and_then(|w| w.parse::<i64>().ok());
            let name = words.collect::<Vec<_>>().join(" ");
            match id {
                Some(id) if !name.is_empty() => Command::Done(id, name),
                _ => Command::Help,
            }
        }
        Some("refresh") => Command::Refresh,
        Some("quit") | Some("exit") => Command::Quit,
        _ => Command::Help,
    }
}

fn print_help() {
    println!("Commands: done <id> <your name> | refresh | quit");
}

/// Waits for the next push notification, or forever when the update
/// channel is down (manual 'refresh' still works).
async fn next_event(stream: &mut Option<UpdateStream>) -> Option<UpdateEvent> {
    match stream {
        Some(stream) => stream.next_event().await,
        None => std::future::pending().await,
    }
}

async fn refetch(api: &ApiClient) -> Phase {
    Phase::from_fetch(api.fetch_today().await.map_err(|e| e.to_string()))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let base_url =
        std::env::var("SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
    let api = ApiClient::new(&base_url);

    let mut phase = Phase::Loading;
    println!("{}", state::render(&phase));

    // The health probe, update channel and initial fetch have
    // independent lifecycles; start them concurrently.
    let (health, stream, fetched) = tokio::join!(
        api.health(),
        updates::connect(&base_url),
        api.fetch_today()
    );

    if let Err(e) = health {
        tracing::warn!("Task service health probe failed: {:?}", e);
    }

    let mut stream = match stream {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!("Live updates unavailable: {:?}", e);
            None
        }
    };

    phase = Phase::from_fetch(fetched.map_err(|e| e.to_string()));
    println!("{}", state::render(&phase));
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = next_event(&mut stream) => match event {
                Some(event) => {
                    // Coarse invalidation: any event means re-fetch the
                    // full list, never merge the payload.
                    tracing::debug!("Received {} for task {}.", event.event, event.task_id);
                    phase = refetch(&api).await;
                    println!("{}", state::render(&phase));
                }
                None => {
                    tracing::warn!("Update channel closed; use 'refresh' to reload.");
                    stream = None;
                }
            },
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                match parse_command(&line) {
                    Command::Done(task_id, name) => {
                        match api.complete_task(task_id, &name).await {
                            Ok(completion) => {
                                println!(
                                    "Task {} marked complete by {}.",
                                    completion.task_id, completion.completed_by
                                );
                                // The broadcast triggers the re-render;
                                // only fall back when it cannot arrive.
                                if stream.is_none() {
                                    phase = refetch(&api).await;
                                    println!("{}", state::render(&phase));
                                }
                            }
                            // A failed completion does not disturb the
                            // rest of the display.
                            Err(e) => eprintln!("Error: {e}"),
                        }
                    }
                    Command::Refresh => {
                        phase = refetch(&api).await;
                        println!("{}", state::render(&phase));
                    }
                    Command::Quit => break,
                    Command::Help => print_help(),
                }
            }
        }
    }
}
