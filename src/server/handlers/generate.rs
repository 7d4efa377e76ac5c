//! Server-Sent Event endpoints that run the dialogue pipeline.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;

use super::super::AppState;
use crate::models::{
    GenerationFormat, GenerationProgress, GenerationRequest, PodcastRequest, ReportRequest,
};

/// SSE event names for one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventNames {
    pub start: &'static str,
    pub progress: &'static str,
    pub complete: &'static str,
}

impl EventNames {
    pub const ERROR: &'static str = "error";
    pub const PING: &'static str = "ping";

    pub fn for_format(format: GenerationFormat) -> Self {
        match format {
            GenerationFormat::Report => Self {
                start: "generatingReport",
                progress: "investigationUpdate",
                complete: "reportComplete",
            },
            GenerationFormat::Podcast => Self {
                start: "generatingPodcast",
                progress: "progress",
                complete: "podcastComplete",
            },
        }
    }
}

fn json_event(name: &str, value: &impl Serialize) -> Event {
    let data = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}

/// `POST /api/report`
pub async fn generate_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    stream_generation(state, request.into())
}

/// `POST /api/podcast`
pub async fn generate_podcast(
    State(state): State<AppState>,
    Json(request): Json<PodcastRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    stream_generation(state, request.into())
}

/// Run one generation in its own task and relay it as named SSE events.
///
/// The stream ends after the terminal `*Complete` or `error` event. A client
/// that disconnects early does not cancel the run; its output still lands in
/// the cache.
fn stream_generation(
    state: AppState,
    request: GenerationRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let format = request.format();
    let names = EventNames::for_format(format);
    let ping_every = state.ping_interval;
    let generator = state.generator.clone();

    let (tx, mut rx) = mpsc::unbounded_channel::<GenerationProgress>();
    let mut run = tokio::spawn(async move {
        let progress = move |event: GenerationProgress| {
            let _ = tx.send(event);
        };
        generator.generate(&request, &progress).await
    });

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(json_event(
            names.start,
            &serde_json::json!({ "message": format!("Starting {}", format.programme_name()) }),
        ));

        let mut ping = tokio::time::interval(ping_every);
        // First tick completes immediately
        ping.tick().await;

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    yield Ok(json_event(names.progress, &event));
                }
                joined = &mut run => {
                    while let Ok(event) = rx.try_recv() {
                        yield Ok(json_event(names.progress, &event));
                    }
                    match joined {
                        Ok(result) if result.success => {
                            yield Ok(json_event(names.complete, &result));
                        }
                        Ok(result) => {
                            let error = result.error.unwrap_or_else(|| "Generation failed".to_string());
                            yield Ok(json_event(EventNames::ERROR, &serde_json::json!({ "error": error })));
                        }
                        Err(e) => {
                            tracing::error!("Generation task panicked: {}", e);
                            yield Ok(json_event(
                                EventNames::ERROR,
                                &serde_json::json!({ "error": "Generation task failed" }),
                            ));
                        }
                    }
                    break;
                }
                _ = ping.tick() => {
                    yield Ok(json_event(EventNames::PING, &serde_json::json!({ "ok": true })));
                }
            }
        }
    };

    Sse::new(stream)
}
