mod page;

use std::time::Duration;

use codemirror_core::{config, spawn_bridge, BridgeError, ChannelRuntime, HostEvent};
use codemirror_editor::{EditorCall, Language, RemoteCall};

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    env_logger::init();
    log::info!("CodeMirror bridge demo starting...");

    let settings = config::load();
    let (runtime, requests) = ChannelRuntime::new();
    let (bridge, relay, mut host_events) =
        spawn_bridge(runtime, &settings, "{\n  \"hello\": \"world\"\n}");

    tokio::spawn(async move {
        while let Some(event) = host_events.recv().await {
            match event {
                HostEvent::LoadSucceeded => log::info!("host: editor loaded"),
                HostEvent::LoadFailed { reason } => log::error!("host: editor failed: {}", reason),
                HostEvent::ContentChanged { content } => {
                    log::info!("host: content changed ({} bytes)", content.len())
                }
            }
        }
    });

    // Everything before the page reports ready is queued.
    bridge.configure(settings.editor.clone());
    let language = Language::from_path("demo.json");
    log::info!("Editing as {}", language.display_name());
    bridge.notify(EditorCall::SetLanguage(language));
    bridge.set_content("{\n  \"hello\": \"bridge\"\n}");

    let typed = "{\"typed\": true}".to_string();
    let page = tokio::spawn(page::run(
        requests,
        relay,
        Duration::from_millis(20),
        Some(typed.clone()),
    ));
    bridge.wait_loaded().await?;

    // A burst of host writes reaches the page as one call.
    for chunk in ["{", "{}", "{\"a\"", "{\"a\": 1}"] {
        bridge.set_content(chunk);
    }

    // Once the page goes idle the user types; the binding follows without
    // echoing the edit back.
    let mut binding = bridge.watch_content();
    binding
        .wait_for(|content| *content == typed)
        .await
        .map_err(|_| BridgeError::Closed)?;

    let content = bridge.get_content().await?;
    let languages = bridge.call(RemoteCall::new("getSupportedLanguages")).await?;

    bridge.shutdown();
    let calls = page.await.unwrap_or_default();

    println!("CodeMirror bridge demo");
    println!();
    println!("Binding:       {}", bridge.content());
    println!("Page document: {}", content);
    println!("Languages:     {}", languages);
    println!("Calls evaluated by the page: {}", calls.len());
    for script in calls {
        println!("  {}", script);
    }
    Ok(())
}
