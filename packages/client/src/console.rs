//! Terminal front end.
//!
//! A blocking rustyline thread feeds input lines into the async loop, which
//! multiplexes them with frames from the relay.

use std::path::Path;

use kakurega_server::infrastructure::dto::websocket::MessageColor;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    client::PeerClient,
    config::ClientConfig,
    error::ClientError,
    media::{DirectoryMediaSink, MediaSink, load_media},
    peer::{PeerEvent, PeerSession, PeerState},
};

const PROMPT: &str = "> ";

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Chat(&'a str),
    Media(&'a str),
    Quit,
    Usage(&'static str),
    Empty,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        if trimmed == "/quit" {
            return Command::Quit;
        }
        if let Some(rest) = trimmed.strip_prefix("/media") {
            let path = rest.trim();
            if path.is_empty() || !rest.starts_with(char::is_whitespace) {
                return Command::Usage("usage: /media <path>");
            }
            return Command::Media(path);
        }
        Command::Chat(line)
    }
}

/// Run an interactive session until `/quit`, end of input or disconnect
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let (line_tx, mut lines) = mpsc::channel::<String>(16);
    spawn_input_thread(line_tx);

    let username = match config.username {
        Some(username) => username,
        None => ask(&mut lines, "Enter your username:").await?,
    };
    let room = match config.room {
        Some(room) => room,
        None => ask(&mut lines, "Enter the chat room you want to join:").await?,
    };

    let key_bits = config.key_bits;
    let session =
        tokio::task::spawn_blocking(move || PeerSession::generate(username, room, key_bits))
            .await??;

    let sink = DirectoryMediaSink::new(config.media_dir);
    tracing::info!("Received media will be saved under {}", sink.dir().display());
    let mut client = PeerClient::join(&config.url, session).await?;
    let mut awaiting_username = false;

    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Ok(Some(event)) => {
                    awaiting_username |= matches!(event, PeerEvent::UsernameRejected { .. });
                    show(event, &sink).await;
                }
                Ok(None) => {
                    println!("Connection closed by the server.");
                    return Ok(());
                }
                Err(ClientError::Peer(e)) if !e.is_fatal() => {
                    tracing::warn!("{}", e);
                }
                Err(e) => return Err(e),
            },
            line = lines.recv() => {
                let Some(line) = line else {
                    return client.leave().await;
                };
                if awaiting_username {
                    let username = line.trim();
                    if username.is_empty() {
                        println!("Enter a different username:");
                        continue;
                    }
                    client.retry_join(username).await?;
                    awaiting_username = false;
                    continue;
                }
                match Command::parse(&line) {
                    Command::Quit => return client.leave().await,
                    Command::Empty => {}
                    Command::Usage(usage) => println!("{usage}"),
                    _ if client.session().state() != PeerState::Active => {
                        println!("Not in a room yet, please wait.");
                    }
                    Command::Chat(text) => client.send_chat(text).await?,
                    Command::Media(path) => match load_media(Path::new(path)).await {
                        Ok((filename, bytes)) => {
                            println!("Sending {filename}...");
                            client.send_media(&filename, &bytes).await?;
                        }
                        Err(e) => println!("Error reading file: {e}"),
                    },
                }
            }
        }
    }
}

async fn show(event: PeerEvent, sink: &impl MediaSink) {
    match event {
        PeerEvent::UsernameRejected { message, .. } => {
            println!("{}", paint(MessageColor::Red, &message));
            println!("Enter a different username:");
        }
        PeerEvent::Joined { message, .. } => println!("{}", paint(MessageColor::Green, &message)),
        PeerEvent::Notice { color, message } => println!("{}", paint(color, &message)),
        PeerEvent::MemberLeft { message, .. } => println!("{}", paint(MessageColor::Red, &message)),
        PeerEvent::Chat { username, text } => {
            println!("{}", paint(MessageColor::Blue, &format!("{username}: {text}")));
        }
        PeerEvent::Media {
            username,
            filename,
            bytes,
        } => {
            println!("Receiving {filename} from {username}...");
            match sink.store(&filename, &bytes).await {
                Ok(path) => println!(
                    "{}",
                    paint(
                        MessageColor::Green,
                        &format!("Media saved to {}", path.display())
                    )
                ),
                Err(e) => tracing::error!("Failed to save media: {}", e),
            }
        }
    }
}

fn paint(color: MessageColor, text: &str) -> String {
    let code = match color {
        MessageColor::Green => "32",
        MessageColor::Red => "31",
        MessageColor::Blue => "34",
    };
    format!("\x1b[{code}m{text}\x1b[0m")
}

async fn ask(lines: &mut mpsc::Receiver<String>, question: &str) -> Result<String, ClientError> {
    loop {
        println!("{question}");
        match lines.recv().await {
            Some(answer) if !answer.trim().is_empty() => return Ok(answer.trim().to_string()),
            Some(_) => {}
            None => return Err(ClientError::InputClosed),
        }
    }
}

fn spawn_input_thread(tx: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                tracing::error!("Failed to initialize line editor: {}", e);
                return;
            }
        };
        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Input error: {}", e);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        // テスト項目: 入力行がコマンドに解釈される
        // given (前提条件):
        let cases = [
            ("hello there", Command::Chat("hello there")),
            ("/media ./x.bin", Command::Media("./x.bin")),
            ("  /quit  ", Command::Quit),
            ("/media", Command::Usage("usage: /media <path>")),
            ("/mediax.bin", Command::Usage("usage: /media <path>")),
            ("   ", Command::Empty),
        ];

        for (line, expected) in cases {
            // when (操作):
            let command = Command::parse(line);

            // then (期待する結果):
            assert_eq!(command, expected, "line: {line:?}");
        }
    }

    #[test]
    fn test_paint_wraps_in_ansi_color() {
        // テスト項目: 色付き出力は ANSI エスケープで囲まれる
        // given (前提条件):
        let text = "bob has joined the chat room.";

        // when (操作):
        let painted = paint(MessageColor::Green, text);

        // then (期待する結果):
        assert_eq!(painted, "\x1b[32mbob has joined the chat room.\x1b[0m");
    }
}
