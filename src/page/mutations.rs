use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub subtree: bool,
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
}

impl ObserveOptions {
    /// Everything under the document.
    pub fn document() -> Self {
        Self {
            subtree: true,
            child_list: true,
            attributes: true,
            character_data: true,
        }
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::document()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: usize,
}

#[derive(Debug, Clone)]
pub struct MutationObserver {
    sender: mpsc::Sender<MutationBatch>,
    options: ObserveOptions,
}

#[derive(Debug)]
pub struct MutationFeed {
    receiver: mpsc::Receiver<MutationBatch>,
}

pub fn observe(options: ObserveOptions, buffer: usize) -> (MutationObserver, MutationFeed) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    (
        MutationObserver { sender, options },
        MutationFeed { receiver },
    )
}

impl MutationObserver {
    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    /// Returns false when the batch was dropped.
    pub fn notify(&self, batch: MutationBatch) -> bool {
        self.sender.try_send(batch).is_ok()
    }
}

impl MutationFeed {
    pub async fn next(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }
}
