use anyhow::{Context, Result};
use std::path::Path;
use testdeck_core::artifact::NodeId;

use crate::app::App;
use crate::render;

/// Runs one request/response cycle and prints the log.
pub async fn run(
    app: &App,
    text: &str,
    select: Option<&str>,
    project: Option<&Path>,
    transcript: Option<&Path>,
) -> Result<()> {
    let session = app.open_session(project).await?;

    match select {
        Some(id) => {
            let id = NodeId::from(id);
            session.select(&id)?;
            session.submit(text, Some(&id))?;
        }
        None => {
            session.submit_with_selection(text)?;
        }
    }

    session.wait_idle().await;
    render::print_entries(session.entries().iter());

    if let Some(path) = transcript {
        let json = serde_json::to_string_pretty(&session.snapshot())?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Transcript written");
    }

    app.registry.remove(session.id()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use testdeck_core::config::RootConfig;

    fn quick_app() -> App {
        let mut config = RootConfig::default();
        config.engine.simulated_delay_ms = 10;
        App::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_ask_writes_transcript() {
        let app = quick_app();
        let dir = tempfile::tempdir().unwrap();
        let transcript = dir.path().join("session.json");

        run(&app, "add a login failure test", Some("3"), None, Some(&transcript))
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&transcript).unwrap()).unwrap();
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["content"], "add a login failure test");
        assert_eq!(json["status"], "idle");
        assert_eq!(json["selection"], "3");
        assert!(app.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_ask_rejects_unknown_selection() {
        let app = quick_app();
        let err = run(&app, "anything", Some("nope"), None, None).await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
