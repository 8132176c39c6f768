use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use eframe::egui;

use crate::api::{ApiError, PhotoSource};

const THUMBNAIL_MAX_EDGE: u32 = 96;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error(transparent)]
    Fetch(#[from] ApiError),
    #[error("could not decode thumbnail: {0}")]
    Decode(#[from] image::ImageError),
}

pub struct DecodedImage {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

struct ThumbnailResponse {
    url: String,
    result: Result<DecodedImage, ThumbnailError>,
}

enum Slot {
    Pending,
    Ready(egui::TextureHandle),
    Failed,
}

#[derive(Default)]
struct PendingUrls {
    urls: VecDeque<String>,
    closed: bool,
}

// Workers take from the back, so the most recently requested URL goes first.
#[derive(Default)]
struct DownloadQueue {
    pending: Mutex<PendingUrls>,
    ready: Condvar,
}

impl DownloadQueue {
    fn push(&self, url: String) -> bool {
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        if pending.closed {
            return false;
        }
        pending.urls.push_back(url);
        self.ready.notify_one();
        true
    }

    fn next(&self) -> Option<String> {
        let mut pending = self.pending.lock().ok()?;
        loop {
            if pending.closed {
                return None;
            }
            if let Some(url) = pending.urls.pop_back() {
                return Some(url);
            }
            pending = self.ready.wait(pending).ok()?;
        }
    }

    fn close(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.closed = true;
            pending.urls.clear();
        }
        self.ready.notify_all();
    }
}

pub fn decode_thumbnail(bytes: &[u8]) -> Result<DecodedImage, ThumbnailError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width() > THUMBNAIL_MAX_EDGE || img.height() > THUMBNAIL_MAX_EDGE {
        img.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE)
    } else {
        img
    };
    let rgba = img.to_rgba8();
    Ok(DecodedImage {
        size: [rgba.width() as usize, rgba.height() as usize],
        rgba: rgba.into_raw(),
    })
}

/// Downloads thumbnails on a small pool of threads and keeps the resulting
/// textures keyed by URL.
pub struct ThumbnailCache {
    queue: Arc<DownloadQueue>,
    response_rx: Receiver<ThumbnailResponse>,
    slots: HashMap<String, Slot>,
    limit: usize,
}

impl ThumbnailCache {
    pub fn new<W>(source: Arc<dyn PhotoSource>, workers: usize, limit: usize, wake: W) -> Self
    where
        W: Fn() + Clone + Send + 'static,
    {
        let queue = Arc::new(DownloadQueue::default());
        let (response_tx, response_rx) = mpsc::channel::<ThumbnailResponse>();

        for _ in 0..workers.max(1) {
            let source = source.clone();
            let queue = queue.clone();
            let response_tx = response_tx.clone();
            let wake = wake.clone();
            thread::spawn(move || {
                while let Some(url) = queue.next() {
                    let result = source
                        .fetch_thumbnail(&url)
                        .map_err(ThumbnailError::from)
                        .and_then(|bytes| decode_thumbnail(&bytes));
                    if response_tx.send(ThumbnailResponse { url, result }).is_err() {
                        break;
                    }
                    wake();
                }
            });
        }

        Self {
            queue,
            response_rx,
            slots: HashMap::new(),
            limit: limit.max(1),
        }
    }

    pub fn apply_responses(&mut self, ctx: &egui::Context) {
        loop {
            match self.response_rx.try_recv() {
                Ok(ThumbnailResponse { url, result }) => {
                    let slot = match result {
                        Ok(decoded) => {
                            let color_image = egui::ColorImage::from_rgba_unmultiplied(
                                decoded.size,
                                decoded.rgba.as_slice(),
                            );
                            Slot::Ready(ctx.load_texture(
                                format!("thumb-{url}"),
                                color_image,
                                egui::TextureOptions::LINEAR,
                            ))
                        }
                        Err(err) => {
                            tracing::debug!(event = "photos.thumbnail.failed", url = %url, error = %err);
                            Slot::Failed
                        }
                    };
                    self.slots.insert(url, slot);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Drop queued downloads that are not in `wanted`. Downloads already
    /// running are left alone.
    pub fn retain_queued<'a>(&mut self, wanted: impl IntoIterator<Item = &'a str>) {
        let wanted: HashSet<&str> = wanted.into_iter().collect();
        let Ok(mut pending) = self.queue.pending.lock() else {
            return;
        };
        let slots = &mut self.slots;
        let before = pending.urls.len();
        pending.urls.retain(|url| {
            let keep = wanted.contains(url.as_str());
            if !keep {
                slots.remove(url);
            }
            keep
        });
        let dropped = before - pending.urls.len();
        if dropped > 0 {
            tracing::debug!(event = "photos.thumbnail.queue_pruned", dropped);
        }
    }

    pub fn get(&mut self, url: &str) -> Option<egui::TextureHandle> {
        match self.slots.get(url) {
            Some(Slot::Ready(texture)) => return Some(texture.clone()),
            Some(Slot::Pending) | Some(Slot::Failed) => return None,
            None => {}
        }

        if self.slots.len() >= self.limit {
            self.evict();
        }
        let slot = if self.queue.push(url.to_string()) {
            Slot::Pending
        } else {
            Slot::Failed
        };
        self.slots.insert(url.to_string(), slot);
        None
    }

    // Pending entries stay so their downloads are not requested twice.
    fn evict(&mut self) {
        let before = self.slots.len();
        self.slots.retain(|_, slot| matches!(slot, Slot::Pending));
        tracing::debug!(
            event = "photos.thumbnail.cache_evicted",
            removed = before - self.slots.len()
        );
    }
}

impl Drop for ThumbnailCache {
    fn drop(&mut self) {
        self.queue.close();
    }
}
