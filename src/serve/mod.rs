//! HTTP server.
//!
//! tiny_http accepts connections; each request is routed on a rayon worker
//! into a buffered [`HttpResponse`] and sent back in one piece.
//!
//! # Module Structure
//!
//! ```text
//! serve/
//! ├── lifecycle.rs   # port retry binding, Ctrl+C shutdown
//! ├── path.rs        # URL → route path → static file
//! ├── response.rs    # ResponseSink, Headers, HttpResponse
//! ├── intercept.rs   # ErrorInterceptingResponse
//! └── router.rs      # Router
//! ```

mod intercept;
mod lifecycle;
mod path;
mod response;
mod router;

pub use lifecycle::setup_shutdown_handler;
pub use response::{HttpResponse, ResponseSink};
pub use router::Router;

use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Method, Request, Server};

use crate::config::ServeConfig;
use crate::site::Site;
use crate::{debug, log};
use lifecycle::{bind_with_retry, is_shutdown, register_server};

/// Bind and serve until Ctrl+C.
pub fn serve(site: Arc<Site>, config: &ServeConfig) -> Result<()> {
    let (server, addr) = bind_with_retry(config.interface, config.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    log!("serve"; "{} listening on http://{}", site.info.title, addr);

    let router = Arc::new(Router::new(site));
    run_request_loop(&server, router, config.threads)?;

    log!("serve"; "stopped");
    Ok(())
}

fn run_request_loop(server: &Server, router: Arc<Router>, threads: usize) -> Result<()> {
    // Rendering and card lookups never block the accept loop
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("prose-http-{i}"))
        .build()
        .context("failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let router = Arc::clone(&router);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &router) {
                log!("serve"; "request error: {e}");
            }
        });
    }

    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, router: &Router) -> Result<()> {
    let method = request.method().clone();
    let head = method == Method::Head;

    match request.remote_addr() {
        Some(addr) => debug!("serve"; "{} {} from {}", method, request.url(), addr),
        None => debug!("serve"; "{} {}", method, request.url()),
    }

    let mut res = HttpResponse::new();
    if is_shutdown() {
        res.fail(503, "503 Service Unavailable");
    } else {
        router.handle(&method, request.url(), &mut res);
    }

    request.respond(res.into_response(head))?;
    Ok(())
}
