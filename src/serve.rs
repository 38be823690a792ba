use crate::error::MoverError;
use crate::mover::Mover;
use crate::request::Reply;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// One line of input.
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    op: String,
    #[serde(default)]
    args: Value,
}

/// One line of output.
#[derive(Debug, Serialize)]
struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    reply: Reply,
}

/// Answers newline-delimited JSON requests from `input` until it ends.
///
/// Requests run concurrently and replies are written in completion order,
/// echoing the request `id`. At end of input the loop waits for outstanding
/// requests and closes every session.
pub async fn serve<R, W>(mover: Arc<Mover>, input: R, mut output: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok::<_, io::Error>(())
    });

    let mut tasks = JoinSet::new();
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                tasks.spawn(respond(mover.clone(), line, tx.clone()));
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("request task failed: {e}");
                }
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("request task failed: {e}");
        }
    }
    mover.shutdown().await;

    drop(tx);
    writer.await.map_err(io::Error::other)??;
    Ok(())
}

/// Answers one request line and queues the encoded reply.
async fn respond(mover: Arc<Mover>, line: String, tx: mpsc::UnboundedSender<String>) {
    let response = match serde_json::from_str::<Request>(&line) {
        Ok(request) => Response {
            reply: mover.handle(&request.op, &request.args).await,
            id: request.id,
        },
        Err(e) => Response {
            id: None,
            reply: Reply::error(&MoverError::MalformedRequest(e.to_string())),
        },
    };

    match serde_json::to_string(&response) {
        Ok(encoded) => {
            if tx.send(encoded).is_err() {
                tracing::warn!("reply writer has stopped; reply dropped");
            }
        }
        Err(e) => tracing::error!("could not encode reply: {e}"),
    }
}
