//! Server-Sent Events over a [`Subscription`].

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use domains::Complaint;
use futures_util::stream::{self, Stream, StreamExt};
use services::Subscription;
use tokio::sync::watch;

/// Turns each delivered snapshot into one event. A subscription failure is
/// sent as a final `error` event, after which the stream ends. The stream
/// also ends, dropping the subscription, when `shutdown` turns `true`.
pub(crate) fn snapshot_stream<F>(
    subscription: Subscription,
    shutdown: watch::Receiver<bool>,
    render: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    F: Fn(Vec<Complaint>) -> Result<Event, axum::Error> + Send + 'static,
{
    let events = stream::unfold((subscription, render), |(mut sub, render)| async move {
        let event = match sub.next().await? {
            Ok(snapshot) => render(snapshot).unwrap_or_else(|err| {
                tracing::error!(error = %err, "failed to serialize snapshot");
                error_event("internal server error")
            }),
            Err(err) => {
                tracing::warn!(error = %err, "live stream ended");
                error_event(&err.to_string())
            }
        };
        Some((Ok::<_, Infallible>(event), (sub, render)))
    });

    Sse::new(events.take_until(stopping(shutdown))).keep_alive(KeepAlive::default())
}

/// Resolves once `true` is published. A closed channel never resolves.
async fn stopping(mut shutdown: watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
    tracing::debug!("closing live stream for shutdown");
}

fn error_event(message: &str) -> Event {
    Event::default().event("error").data(message)
}
