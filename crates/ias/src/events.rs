use tokio::sync::broadcast;

/// Notifications for display widgets hosting advert surfaces.
#[derive(Clone, Debug)]
pub enum IasEvent {
    /// A catalog (cached or freshly merged) is installed and readable.
    DataReady,
    /// An image for the given slot finished downloading or decoding.
    ImageReady { slot: u32 },
    /// A forced slot refresh wants widgets to redraw immediately.
    ForceChangeWanted { slot: u32 },
    Error { error: String, recoverable: bool },
}

#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<IasEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IasEvent> {
        self.tx.subscribe()
    }

    pub fn emit_data_ready(&self) {
        let _ = self.tx.send(IasEvent::DataReady);
    }

    pub fn emit_image_ready(&self, slot: u32) {
        let _ = self.tx.send(IasEvent::ImageReady { slot });
    }

    pub fn emit_force_change(&self, slot: u32) {
        let _ = self.tx.send(IasEvent::ForceChangeWanted { slot });
    }

    pub fn emit_error(&self, error: &str, recoverable: bool) {
        let _ = self.tx.send(IasEvent::Error {
            error: error.to_string(),
            recoverable,
        });
    }
}
