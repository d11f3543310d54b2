//! Local HTTP server standing in for target sites and third-party APIs in tests.

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Serves `routes` keyed by request path (query strings ignored); anything
/// else is a 404.
pub async fn start_test_server(routes: Vec<(&str, Route)>) -> SocketAddr {
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let make_svc = make_service_fn(move |_conn| {
        let routes = routes.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let routes = routes.clone();
                async move {
                    let route = routes.get(req.uri().path()).cloned();
                    match route {
                        Some(route) => {
                            if let Some(delay) = route.delay {
                                tokio::time::sleep(delay).await;
                            }
                            Ok::<_, Infallible>(
                                Response::builder()
                                    .status(route.status)
                                    .body(Body::from(route.body))
                                    .unwrap(),
                            )
                        }
                        None => Ok(Response::builder()
                            .status(StatusCode::NOT_FOUND)
                            .body(Body::from("404"))
                            .unwrap()),
                    }
                }
            }))
        }
    });

    tokio::spawn(async move {
        Server::from_tcp(listener.into_std().unwrap())
            .unwrap()
            .serve(make_svc)
            .await
            .unwrap();
    });

    addr
}
