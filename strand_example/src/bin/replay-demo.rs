use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use strand::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("Strand - Replay Demo");
    println!("====================\n");

    // 1. In-memory ledger and delta log
    let strand = StrandBuilder::new()
        .flush_window_ms(20)
        .refresh_interval(Duration::from_millis(15))
        .build()
        .await?;
    let ledger = strand.persist().ledger();

    let thread = ledger
        .create_thread(CreateThreadArgs {
            user_id: Some("user_123".to_string()),
            title: Some("Replay demo".to_string()),
            ..Default::default()
        })
        .await?;
    println!("1. Thread created: {}\n", thread.id);

    // 2. Echo the prompt locally, then commit it
    let prompt_text = "Tell me about Rust in one sentence.";
    let mut page = Vec::new();
    let mut echo = OptimisticEcho::new();
    let local = echo.send(&mut page, &thread.id, prompt_text);
    println!("2. Optimistic echo at order {}: {:?}", local.order, local.text);

    let prompt = ledger
        .save_message(&thread.id, SaveMessageArgs::prompt(prompt_text))
        .await?;
    let docs = ledger
        .list_messages(&thread.id, ListMessagesArgs::new(10).ascending())
        .await?
        .page;
    echo.reconcile(&mut page, &docs);
    println!("   Replaced by ledger message {}\n", page[0].id);

    // 3. Follow the thread while a generation streams in
    let subscription = strand.subscribe(&thread.id);
    let mut live = subscription.subscribe();
    let follower = tokio::spawn({
        let subscription = subscription.clone();
        let every = strand.refresh_interval();
        async move { subscription.follow(every).await }
    });
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while live.changed().await.is_ok() {
            let messages = live.borrow_and_update().clone();
            if let Some(message) = messages.first() {
                if message.text != last {
                    println!("   [{:?}] {}", message.status, message.text);
                    last = message.text.clone();
                }
            }
        }
    });

    println!("3. Streaming the answer...");
    let mut writer = strand
        .persist()
        .start_stream::<TextStreamPart>(StreamMessage::new(
            thread.id.as_str(),
            prompt.message.key().next_step(),
            Some(TEXT_STREAM_PART_FORMAT.to_string()),
        ))
        .await?;
    let stream_id = writer.stream_id().to_string();

    let words = "Rust is a systems language that trades a stricter compiler for memory safety without a garbage collector.";
    let parts = stream::iter(words.split_inclusive(' ').map(str::to_string).collect::<Vec<_>>())
        .then(|word| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            TextStreamPart::text(word)
        });
    writer.pipe(parts).await?;
    writer.finish().await?;

    // Let the follower catch the terminal batch.
    tokio::time::sleep(strand.refresh_interval() * 3).await;
    let streamed = subscription.messages();

    // 4. Commit the answer and drop the delta log
    strand
        .persist()
        .commit_stream(
            &stream_id,
            vec![MessageInput::from(Message::assistant(words))],
            SaveMessagesOptions {
                prompt_message_id: Some(prompt.message_id.clone()),
                ..Default::default()
            },
        )
        .await?;
    subscription.refresh().await?;
    subscription.close().await;
    follower.await??;
    printer.abort();

    println!("\n4. Final timeline:");
    for message in strand.timeline(&thread.id, streamed).await? {
        println!(
            "   {} {:?} ({:?}, {:?}): {}",
            message.key, message.role, message.source, message.status, message.text
        );
    }

    Ok(())
}
