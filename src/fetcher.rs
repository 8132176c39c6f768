use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::api::PhotoSource;
use crate::state::{FetchRequest, FetchResponse};

// Queued requests collapse to the newest one.
pub fn spawn_fetch_worker<W>(
    source: Arc<dyn PhotoSource>,
    wake: W,
) -> (Sender<FetchRequest>, Receiver<FetchResponse>)
where
    W: Fn() + Send + 'static,
{
    let (request_tx, request_rx) = mpsc::channel::<FetchRequest>();
    let (response_tx, response_rx) = mpsc::channel::<FetchResponse>();
    thread::spawn(move || {
        while let Ok(mut request) = request_rx.recv() {
            while let Ok(newer) = request_rx.try_recv() {
                tracing::debug!(
                    event = "photos.fetch.superseded",
                    seq = request.seq,
                    newer = newer.seq,
                );
                request = newer;
            }

            tracing::debug!(event = "photos.fetch.started", seq = request.seq, query = %request.query);
            let result = source.fetch_photos(&request.query);

            if response_tx
                .send(FetchResponse {
                    seq: request.seq,
                    query: request.query,
                    result,
                })
                .is_err()
            {
                break;
            }
            wake();
        }
        tracing::debug!(event = "photos.fetch.worker_stopped");
    });

    (request_tx, response_rx)
}
