use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::server::{BerlinMcpServer, Response, ServerError};

/// Serve line-delimited JSON-RPC on stdin/stdout.
pub async fn serve_stdio(server: Arc<BerlinMcpServer>) -> Result<(), ServerError> {
    serve_lines(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Each request runs on its own task; a single writer emits responses as
/// they complete. A failed write ends the loop with that error.
async fn serve_lines<R, W>(
    server: Arc<BerlinMcpServer>,
    reader: R,
    writer: W,
) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Response>();
    let mut writer_task = tokio::spawn(write_responses(rx, writer));

    let mut lines = reader.lines();
    loop {
        tokio::select! {
            // the writer only finishes early when a write failed
            finished = &mut writer_task => {
                tracing::error!("output closed, stopping");
                return joined(finished);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let server = Arc::clone(&server);
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = server.handle_message(&line).await {
                        if tx.send(response).is_err() {
                            tracing::warn!("response dropped, output closed");
                        }
                    }
                });
            }
        }
    }

    tracing::info!("input closed, shutting down");
    drop(tx);
    joined(writer_task.await)
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<Response>,
    mut writer: W,
) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut payload = serde_json::to_vec(&response).map_err(ServerError::Serialization)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }
    Ok(())
}

fn joined(outcome: Result<Result<(), ServerError>, JoinError>) -> Result<(), ServerError> {
    outcome.map_err(|err| ServerError::Io(std::io::Error::other(err)))?
}

/// Serve JSON-RPC over HTTP at `POST /mcp`.
pub async fn serve_http(server: Arc<BerlinMcpServer>, bind_addr: &str) -> Result<(), ServerError> {
    let app = router(server);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on http://{bind_addr}/mcp");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(server: Arc<BerlinMcpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .with_state(server)
}

async fn handle_mcp(State(server): State<Arc<BerlinMcpServer>>, body: String) -> HttpResponse {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
