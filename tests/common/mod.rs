#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::BoxFuture;
use switchyard::{handler_fn, Context, Handler, Middleware, Next, Response, Result};

/// Build a request with an empty body.
pub fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::get(uri).body(Bytes::new()).unwrap()
}

pub fn request(method: http::Method, uri: &str) -> http::Request<Bytes> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

/// Drain a response body into a string.
pub async fn body_text(response: Response) -> String {
    let (_, _, body) = response.into_parts();
    let bytes = body.collect().await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Shared, ordered event log.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Middleware that records `<name>:before` and `<name>:after` around `next`.
pub struct Tag {
    pub name: &'static str,
    pub recorder: Recorder,
}

impl Tag {
    pub fn new(name: &'static str, recorder: &Recorder) -> Arc<dyn Middleware> {
        Arc::new(Self {
            name,
            recorder: recorder.clone(),
        })
    }
}

impl Middleware for Tag {
    fn handle<'a>(&'a self, ctx: &'a mut Context, mut next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.recorder.push(format!("{}:before", self.name));
            next.run(ctx).await?;
            self.recorder.push(format!("{}:after", self.name));
            Ok(())
        })
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Handler that records `handler` and replies with a fixed text body.
pub fn recording_handler(recorder: &Recorder, body: &'static str) -> impl Handler {
    let recorder = recorder.clone();
    handler_fn(move |ctx| {
        let recorder = recorder.clone();
        Box::pin(async move {
            recorder.push("handler");
            ctx.text(body)
        })
    })
}

/// Handler that replies with the route parameters as JSON.
pub fn echo_params() -> impl Handler {
    handler_fn(|ctx| {
        Box::pin(async move {
            let params = ctx.params.clone();
            ctx.json(&params)
        })
    })
}
