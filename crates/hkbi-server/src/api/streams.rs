//! Server-sent event streams.

use std::collections::VecDeque;
use std::time::Instant;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{Error, HttpResponse, Responder, get, web};
use futures_util::{Stream, stream::unfold};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, Interval, MissedTickBehavior};

use crate::events::BridgeEvent;
use crate::models::EventsQuery;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(15);

struct EventsStreamState {
    receiver: broadcast::Receiver<BridgeEvent>,
    aid: Option<u64>,
    interval: Interval,
    pending: VecDeque<Bytes>,
    last_ping: Instant,
}

fn sse_event(event: &str, data: &str) -> Bytes {
    let mut payload = String::new();
    payload.push_str("event: ");
    payload.push_str(event);
    payload.push('\n');
    for line in data.lines() {
        payload.push_str("data: ");
        payload.push_str(line);
        payload.push('\n');
    }
    payload.push('\n');
    Bytes::from(payload)
}

fn push_ping_if_needed(pending: &mut VecDeque<Bytes>, last_ping: &mut Instant) {
    if pending.is_empty() && last_ping.elapsed() >= PING_INTERVAL {
        *last_ping = Instant::now();
        pending.push_back(Bytes::from(": ping\n\n"));
    }
}

fn sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<Bytes, Error>> + 'static,
{
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .insert_header((header::CONNECTION, "keep-alive"))
        .streaming(stream)
}

fn encode(event: &BridgeEvent) -> Bytes {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "null".to_string());
    sse_event(event.name(), &json)
}

/// Current characteristic values, sent first so subscribers start in sync.
fn initial_events(state: &AppState, aid: Option<u64>) -> VecDeque<Bytes> {
    let mut pending = VecDeque::new();
    for accessory in state.accessories.list() {
        if aid.is_some_and(|aid| aid != accessory.aid) {
            continue;
        }
        pending.push_back(encode(&BridgeEvent::StreamingStatus {
            aid: accessory.aid,
            status: accessory.stream_management.streaming_status(),
        }));
        pending.push_back(encode(&BridgeEvent::Motion {
            aid: accessory.aid,
            detected: accessory.motion.detected(),
        }));
    }
    pending
}

#[utoipa::path(
    get,
    path = "/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Accessory event stream")
    )
)]
#[get("/events")]
/// Stream published accessory updates via server-sent events.
pub async fn events_stream(
    state: web::Data<AppState>,
    query: web::Query<EventsQuery>,
) -> impl Responder {
    let aid = query.aid;
    let pending = initial_events(&state, aid);

    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let receiver = state.events.subscribe();

    let stream = unfold(
        EventsStreamState {
            receiver,
            aid,
            interval,
            pending,
            last_ping: Instant::now(),
        },
        |mut ctx| async move {
            loop {
                if let Some(bytes) = ctx.pending.pop_front() {
                    return Some((Ok::<Bytes, Error>(bytes), ctx));
                }

                tokio::select! {
                    _ = ctx.interval.tick() => {}
                    result = ctx.receiver.recv() => match result {
                        Ok(event) => {
                            if ctx.aid.is_none_or(|aid| aid == event.aid()) {
                                ctx.pending.push_back(encode(&event));
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "event subscriber lagged");
                        }
                        Err(RecvError::Closed) => return None,
                    },
                }

                push_ping_if_needed(&mut ctx.pending, &mut ctx.last_ping);
            }
        },
    );

    sse_response(stream)
}
