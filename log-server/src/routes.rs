use crate::{
    capture_service::CaptureService,
    configuration::StoreMode,
    data::join_path,
    error::Error,
    path_cache::WildcardQuery,
    util::{self, JSON_CONTENT_TYPE},
};
use hyper::{Body, Method, Request, Response, StatusCode};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

const CAPTURE_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
];

lazy_static! {
    static ref INBOUND_REGEX: Regex = Regex::new(r"^/i(?:/(?P<path>.*))?$").unwrap();
    static ref OUTBOUND_REGEX: Regex = Regex::new(r"^/o(?:/(?P<path>.*))?$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Clear,
    Db,
    Inbound(String),
    Outbound(String),
    NotFound,
}

impl Route {
    pub fn parse(path: &str) -> Self {
        match path {
            "/" => return Route::Root,
            "/_clear" => return Route::Clear,
            "/_db" => return Route::Db,
            _ => (),
        }

        if let Some(captures) = INBOUND_REGEX.captures(path) {
            return Route::Inbound(captured_path(&captures));
        }
        if let Some(captures) = OUTBOUND_REGEX.captures(path) {
            return Route::Outbound(captured_path(&captures));
        }

        Route::NotFound
    }
}

fn captured_path(captures: &regex::Captures) -> String {
    captures
        .name("path")
        .map(|path| path.as_str().trim_matches('/'))
        .unwrap_or("")
        .into()
}

pub async fn dispatch(
    service: &CaptureService,
    mut request: Request<Body>,
) -> Result<Response<Body>, Error> {
    let route = Route::parse(request.uri().path());
    let method = request.method().clone();

    match route {
        Route::Inbound(path) if CAPTURE_METHODS.contains(&method) => {
            capture(service, &path, &mut request).await
        }
        Route::Inbound(_) => method_not_allowed(),
        _ if method != Method::GET => method_not_allowed(),
        Route::Root => json_response(StatusCode::OK, &help()),
        Route::Clear => {
            service.clear()?;
            json_response(StatusCode::OK, &json!({ "/": "/", "message": "cleared" }))
        }
        Route::Db => json_response(
            StatusCode::OK,
            &json!({
                "/": "/",
                "request_cache": service.store_snapshot()?,
                "path_cache": service.path_cache_snapshot()?,
            }),
        ),
        Route::Outbound(path) => json_response(StatusCode::OK, &listing(service, &path)?),
        Route::NotFound => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn capture(
    service: &CaptureService,
    path: &str,
    request: &mut Request<Body>,
) -> Result<Response<Body>, Error> {
    let key = service.key_for(path);
    if service.mode() == StoreMode::Namespaced && key.namespace.is_empty() {
        return error_response(StatusCode::NOT_FOUND, "missing identifier");
    }

    let snapshot = service.capture_request(&key, request).await?;

    json_response(
        StatusCode::OK,
        &json!({
            "/": "/",
            "o": format!("/o/{}", key.full_path()),
            "ts": snapshot.timestamp,
        }),
    )
}

/// Body of `GET /o/...`: navigation links, known subpaths and the latest captures.
pub fn listing(service: &CaptureService, path: &str) -> Result<Value, Error> {
    let query = WildcardQuery::parse(path);
    let key = service.key_for(path);

    let subpaths = service
        .subpaths(path)?
        .into_iter()
        .map(|subpath| match &query {
            WildcardQuery::Children(prefix) => outbound_link(&join_path(prefix, &subpath)),
            _ => outbound_link(&subpath),
        })
        .collect::<Vec<_>>();

    let subtree = match &query {
        WildcardQuery::Exact(path) => join_path(path, "**"),
        wildcard => join_path(wildcard.prefix(), "**"),
    };

    let mut body = json!({
        "/": "/",
        "..": outbound_link(parent_path(path)),
        "*": subpaths,
        "**": outbound_link(&subtree),
        "requests": service.recent_requests(&key)?,
    });

    if service.mode() == StoreMode::Namespaced {
        if let WildcardQuery::Exact(_) = query {
            if path.is_empty() {
                body["ids"] = json!(service.identifiers()?);
            } else if key.path.is_empty() {
                body["paths"] = json!(service.paths_under(&key.namespace)?);
            }
        }
    }

    Ok(body)
}

fn help() -> Value {
    json!({
        "/": "/",
        "*": [
            "/i/test/path",
            "/o",
            "/o/**",
            "/_clear",
            "/_db",
        ],
        "description": "A simple server that logs requests. Send to /i/<id>/<path> and view at /o/<id>/<path>",
        "repo": "https://www.github.com/haynesgt/log-server",
    })
}

fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

fn outbound_link(path: &str) -> String {
    format!("/o/{}", path)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

pub fn error_response<S: AsRef<str>>(status: StatusCode, message: S) -> Result<Response<Body>, Error> {
    json_response(status, &json!({ "error": message.as_ref() }))
}

pub fn json_response(status: StatusCode, value: &Value) -> Result<Response<Body>, Error> {
    let mut response_builder = Response::builder().status(status);

    if let Some(header_map) = response_builder.headers_mut() {
        util::put_headers(header_map, vec![("content-type", JSON_CONTENT_TYPE)])?;
    }

    Ok(response_builder.body(serde_json::to_vec(value)?.into())?)
}
