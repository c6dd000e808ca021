//! Signal handling and the stream driver shared by the `noshow` CLI and the server binary.

use noshow_core::{GenerationSettings, StreamWriter};
use std::future::Future;
use std::sync::mpsc;

/// Resolves on the first Ctrl-C or, on unix, SIGTERM.
///
/// A listener that cannot be installed is logged and never resolves, so the other one still
/// works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Seeds the dataset and runs the append loop on a blocking thread until `shutdown` resolves.
///
/// Shutdown is forwarded to the loop as a cancellation message, so the batch being written when
/// it arrives still completes. Returns early with the error if seeding fails.
pub async fn stream_until<F>(
    mut writer: StreamWriter,
    settings: GenerationSettings,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let (cancel_tx, cancel_rx) = mpsc::channel();
    let mut worker = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut session = writer.start_session(&settings)?;
        writer.run(&mut session, &cancel_rx);
        Ok(())
    });

    tokio::select! {
        result = &mut worker => {
            return result?;
        }
        _ = shutdown => {
            tracing::info!("shutdown requested; finishing the current batch");
            // The worker may already be gone; its result is reported below.
            let _ = cancel_tx.send(());
        }
    }

    worker.await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use noshow_core::Synthesizer;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn data_rows(path: &std::path::Path) -> usize {
        fs::read_to_string(path).unwrap().lines().count() - 1
    }

    #[tokio::test]
    async fn test_stream_until_shutdown_ends_on_whole_batch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stream.csv");
        let writer = StreamWriter::new(&path, Synthesizer::seeded(8).unwrap());
        let settings = GenerationSettings {
            seed_count: 10,
            batch_size: 5,
            interval: Duration::from_millis(20),
        };

        stream_until(
            writer,
            settings,
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await
        .unwrap();

        let rows = data_rows(&path);
        assert!(rows > 10);
        assert_eq!((rows - 10) % 5, 0);
    }

    #[tokio::test]
    async fn test_stream_until_reports_seed_failure_without_shutdown() {
        let temp = TempDir::new().unwrap();
        let writer = StreamWriter::new(
            temp.path().join("stream.csv"),
            Synthesizer::seeded(1).unwrap(),
        );
        let settings = GenerationSettings {
            seed_count: 10,
            batch_size: 0,
            interval: Duration::from_secs(1),
        };

        let result = stream_until(writer, settings, std::future::pending()).await;
        assert!(result.is_err());
    }
}
