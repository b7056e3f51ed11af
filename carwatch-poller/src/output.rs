//! Output backends for the read model.

use std::path::PathBuf;

use carwatch_types::FleetView;

/// Destination for fleet views.
#[derive(Debug)]
pub enum Output {
    /// Write views to a JSON file.
    ///
    /// The file is overwritten with each view.
    File(PathBuf),

    /// Send views through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(tokio::sync::mpsc::Sender<FleetView>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use carwatch_poller::Output;
    ///
    /// let output = Output::file("fleet.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use carwatch_poller::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive views
    /// // while let Some(view) = rx.recv().await {
    /// //     println!("{} vehicles", view.len());
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<FleetView>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Emit a view to this output.
    pub(crate) async fn emit(&self, view: &FleetView) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(view)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Channel(tx) => {
                // Best effort, never block the poller on a slow consumer
                let _ = tx.try_send(view.clone());
            }
        }
        Ok(())
    }
}
