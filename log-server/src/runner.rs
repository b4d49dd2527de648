use crate::{capture_service::CaptureService, error::Error, routes};
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{error, info, warn};

/// Serves the configured address until `shutdown` resolves, then writes the store one last time.
pub async fn run<F: Future<Output = ()> + Send + 'static>(
    service: Arc<CaptureService>,
    shutdown: F,
) -> Result<(), Error> {
    let addr = service.configuration().bind_address();
    let (_, server) = bind(service, addr, shutdown)?;
    server.await
}

/// Binds `addr` and serves in the background. Binding to port 0 picks a free port.
pub fn spawn(service: Arc<CaptureService>, addr: SocketAddr) -> Result<ServerHandle, Error> {
    let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = shutdown_receiver.await;
    };

    let (local_addr, server) = bind(service, addr, shutdown)?;
    let join_handle = tokio::spawn(server);

    Ok(ServerHandle {
        local_addr,
        shutdown: Some(shutdown_sender),
        join_handle,
    })
}

fn bind<F: Future<Output = ()> + Send + 'static>(
    service: Arc<CaptureService>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(SocketAddr, impl Future<Output = Result<(), Error>> + Send), Error> {
    let make_service_service = service.clone();
    let make_service = make_service_fn(move |_| {
        let service = make_service_service.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |request| {
                handle_request(service.clone(), request)
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);
    let local_addr = server.local_addr();
    info!(
        "Log server listening on http://{} in {} mode",
        local_addr,
        service.mode()
    );

    let graceful = server.with_graceful_shutdown(shutdown);
    let server = async move {
        let result = graceful.await;
        if let Err(e) = &result {
            error!("Log server error: {}", e);
        }

        info!("Log server stopped, writing the request cache");
        service.flush();

        result.map_err(Error::from)
    };

    Ok((local_addr, server))
}

async fn handle_request(
    service: Arc<CaptureService>,
    request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match routes::dispatch(&service, request).await {
        Ok(response) => Ok(response),
        Err(error) => {
            let status = if error.is_client_error() {
                warn!("Rejected {} {}: {}", method, path, error);
                StatusCode::BAD_REQUEST
            } else {
                error!("Failed to handle {} {}: {}", method, path, error);
                StatusCode::INTERNAL_SERVER_ERROR
            };

            Ok(routes::error_response(status, error.to_string()).unwrap_or_else(|_| {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = status;
                response
            }))
        }
    }
}

/// A server running on the tokio runtime.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<Result<(), Error>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests and the final save.
    pub async fn shutdown(mut self) -> Result<(), Error> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        self.join_handle.await?
    }
}
