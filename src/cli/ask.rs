//! One-shot "ask" command

use std::error::Error;
use std::io::{self, Write};

use crate::api::Source;
use crate::cli::Context;
use crate::core::chat_service::ChatService;
use crate::core::stream_consumer::{StreamCallbacks, StreamMessage};

pub async fn run_ask(
    context: &Context,
    question: Vec<String>,
    no_stream: bool,
) -> Result<(), Box<dyn Error>> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        return Err("Usage: kbchat ask <question>".into());
    }

    let service = ChatService::new(context.client.clone());

    if no_stream {
        return match service.ask(&question).await {
            Ok(answer) => {
                println!("{}", answer.text);
                print_sources(answer.sources.as_deref());
                Ok(())
            }
            Err(err) => Err(ask_failure(context, &err.user_message())),
        };
    }

    let (callbacks, mut rx) = StreamCallbacks::channel();
    // The handle is not needed; the channel closes once the stream settles.
    let _handle = service.stream_ask(&question, callbacks);

    let mut stdout = io::stdout();
    let mut printed_any = false;
    while let Some(message) = rx.recv().await {
        match message {
            StreamMessage::Chunk(content) => {
                printed_any = true;
                write!(stdout, "{content}")?;
                stdout.flush()?;
            }
            StreamMessage::Complete(sources) => {
                println!();
                print_sources(sources.as_deref());
                break;
            }
            StreamMessage::Error(message) => {
                if printed_any {
                    println!();
                }
                return Err(ask_failure(context, &message));
            }
        }
    }
    Ok(())
}

fn ask_failure(context: &Context, message: &str) -> Box<dyn Error> {
    // A rejected token has already been purged by the request layer.
    if matches!(context.client.credentials().token(), Ok(None)) {
        format!("{message}\nYou are not logged in. Run 'kbchat login' first.").into()
    } else {
        message.into()
    }
}

fn print_sources(sources: Option<&[Source]>) {
    let Some(sources) = sources.filter(|sources| !sources.is_empty()) else {
        return;
    };
    println!();
    println!("Sources:");
    for line in format_sources(sources) {
        println!("  {line}");
    }
}

pub fn format_sources(sources: &[Source]) -> Vec<String> {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let mut line = format!("{}. [{}] {}", index + 1, source.kind.label(), source.title);
            if let Some(repo) = &source.repo {
                line.push_str(&format!(" ({repo})"));
            }
            if let Some(url) = &source.url {
                line.push_str(&format!(" <{url}>"));
            }
            line
        })
        .collect()
}
