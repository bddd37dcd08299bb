use image::RgbaImage;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ImageLoadError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Load state of a lazily loaded image reference.
#[derive(Clone, Debug, Default)]
pub enum ImageState {
    #[default]
    Empty,
    Loading,
    Ready(Arc<RgbaImage>),
    Failed,
}

/// One background/logo image. Loading happens on a worker thread; drawing
/// code polls the slot every frame and skips the layer until it is ready.
/// A failed load stays failed until the reference changes or [`reload`] is
/// called.
///
/// [`reload`]: ImageSlot::reload
#[derive(Default)]
pub struct ImageSlot {
    reference: Option<String>,
    state: ImageState,
    pending: Option<Receiver<Result<RgbaImage, ImageLoadError>>>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn state(&self) -> &ImageState {
        &self.state
    }

    /// Point the slot at a new reference. Unchanged references keep their
    /// current state; an empty reference clears the slot.
    pub fn set_reference(&mut self, reference: Option<&str>) {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty());
        if reference == self.reference.as_deref() {
            return;
        }
        self.reference = reference.map(str::to_string);
        self.start();
    }

    /// Retry the current reference regardless of its state.
    pub fn reload(&mut self) {
        self.start();
    }

    fn start(&mut self) {
        // Dropping the old receiver orphans any in-flight load.
        self.pending = None;
        let Some(reference) = self.reference.clone() else {
            self.state = ImageState::Empty;
            return;
        };

        let (sender, receiver) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("image-loader".into())
            .spawn(move || {
                let _ = sender.send(load_image(&reference));
            });
        match spawned {
            Ok(_) => {
                self.state = ImageState::Loading;
                self.pending = Some(receiver);
            }
            Err(err) => {
                log::warn!("Failed to start image loader: {}", err);
                self.state = ImageState::Failed;
            }
        }
    }

    /// Collect a finished load, if any, and return the image when ready.
    pub fn poll(&mut self) -> Option<Arc<RgbaImage>> {
        if let Some(receiver) = &self.pending {
            match receiver.try_recv() {
                Ok(result) => self.finish(result),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.finish(Err(ImageLoadError::Io(std::io::Error::other(
                        "image loader exited without a result",
                    ))))
                }
            }
        }
        match &self.state {
            ImageState::Ready(image) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    /// Block until the in-flight load (if any) settles or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<Arc<RgbaImage>> {
        if let Some(receiver) = &self.pending {
            if let Ok(result) = receiver.recv_timeout(timeout) {
                self.finish(result);
            }
        }
        self.poll()
    }

    fn finish(&mut self, result: Result<RgbaImage, ImageLoadError>) {
        self.pending = None;
        let reference = self.reference.as_deref().unwrap_or_default();
        self.state = match result {
            Ok(image) => {
                log::debug!(
                    "Loaded image {} ({}x{})",
                    reference,
                    image.width(),
                    image.height()
                );
                ImageState::Ready(Arc::new(image))
            }
            Err(err) => {
                log::warn!("Image {} unavailable, layer skipped: {}", reference, err);
                ImageState::Failed
            }
        };
    }
}

/// Load and decode an image from a file path or an http(s) URL.
pub fn load_image(reference: &str) -> Result<RgbaImage, ImageLoadError> {
    let bytes = if reference.starts_with("http://") || reference.starts_with("https://") {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        client
            .get(reference)
            .send()?
            .error_for_status()?
            .bytes()?
            .to_vec()
    } else {
        let path = reference.strip_prefix("file://").unwrap_or(reference);
        std::fs::read(path)?
    };
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}
