//! A [`Client`] double that checks the outgoing request and replays a canned
//! response.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use eth2api::{Client, JsonCodec, ReqMethod, RequestDescriptor, ResponseHandle};
use serde::Serialize;

pub struct Spy {
    /// Path plus encoded query, as the request would put it after the host.
    expected_path: String,
    /// Set for POST requests.
    expected_body: Option<serde_json::Value>,
    code: u16,
    response: String,
    calls: AtomicUsize,
}

impl Spy {
    pub fn get(path: &str, code: u16, response: serde_json::Value) -> Self {
        Self {
            expected_path: path.to_string(),
            expected_body: None,
            code,
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn post(path: &str, body: serde_json::Value, code: u16, response: serde_json::Value) -> Self {
        Self {
            expected_body: Some(body),
            ..Self::get(path, code, response)
        }
    }

    /// Replace the canned body with raw text.
    pub fn raw(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Client for Spy {
    type Codec = JsonCodec;

    async fn request<B>(&self, req: RequestDescriptor<B>) -> ResponseHandle<JsonCodec>
    where
        B: Serialize + Send + Sync,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(req.url("").unwrap(), self.expected_path);
        match &self.expected_body {
            Some(expected) => {
                assert_eq!(req.method(), ReqMethod::Post);
                let got = serde_json::to_value(req.body().unwrap()).unwrap();
                assert_eq!(&got, expected);
            }
            None => assert_eq!(req.method(), ReqMethod::Get),
        }
        ResponseHandle::received(JsonCodec, self.code, Cursor::new(self.response.clone()))
    }
}
