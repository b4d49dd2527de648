use crate::{error::Error, util};
use async_trait::async_trait;
use hyper::{body, body::Bytes, header::HOST, Body, Request};
use url::Url;

/// What the capture service needs from an incoming request, independent of the HTTP framework.
#[async_trait]
pub trait InboundRequest: Send {
    fn method(&self) -> String;

    /// Absolute URL of the request.
    fn url(&self) -> Result<Url, Error>;

    /// Header pairs in arrival order. Names may repeat.
    fn headers(&self) -> Vec<(String, String)>;

    async fn read_body(&mut self) -> Result<Bytes, Error>;
}

#[async_trait]
impl InboundRequest for Request<Body> {
    fn method(&self) -> String {
        self.method().as_str().to_uppercase()
    }

    fn url(&self) -> Result<Url, Error> {
        let uri = self.uri();
        if uri.scheme().is_some() {
            return Ok(Url::parse(&uri.to_string())?);
        }

        let host = self
            .headers()
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("localhost");

        Ok(Url::parse(&format!("http://{}{}", host, uri))?)
    }

    fn headers(&self) -> Vec<(String, String)> {
        util::header_pairs(self.headers())
    }

    async fn read_body(&mut self) -> Result<Bytes, Error> {
        body::to_bytes(self.body_mut())
            .await
            .map_err(|_| Error::InvalidBody)
    }
}

/// Owned request for callers that are not hyper based.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl RawRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(method: S1, url: S2) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.push((name.into().to_lowercase(), value.into()));
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }
}

#[async_trait]
impl InboundRequest for RawRequest {
    fn method(&self) -> String {
        self.method.to_uppercase()
    }

    fn url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.url)?)
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.headers.clone()
    }

    async fn read_body(&mut self) -> Result<Bytes, Error> {
        Ok(std::mem::take(&mut self.body))
    }
}
