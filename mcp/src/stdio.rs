//! Newline-delimited JSON-RPC over a byte stream.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::McpResult;
use crate::jsonrpc::{
    JsonRpcError, JsonRpcId, JsonRpcMessage, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR,
};
use crate::server::McpConnection;

/// Serve one connection until the reader hits EOF.
pub async fn serve<R, W>(mut conn: McpConnection, reader: R, mut writer: W) -> McpResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let val: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let resp = framing_error(PARSE_ERROR, "parse error", Some(e.to_string()));
                write_jsonrpc(&mut writer, &resp).await?;
                continue;
            }
        };

        if val.is_array() {
            let resp = framing_error(INVALID_REQUEST, "batching not supported", None);
            write_jsonrpc(&mut writer, &resp).await?;
            continue;
        }

        let msg: JsonRpcMessage = match serde_json::from_value(val) {
            Ok(m) => m,
            Err(e) => {
                let resp = framing_error(INVALID_REQUEST, "invalid request", Some(e.to_string()));
                write_jsonrpc(&mut writer, &resp).await?;
                continue;
            }
        };

        if let Some(resp) = conn.handle_message(msg).await {
            write_jsonrpc(&mut writer, &resp).await?;
        }
    }

    Ok(())
}

fn framing_error(code: i64, message: &str, detail: Option<String>) -> JsonRpcResponse {
    JsonRpcResponse::err(
        JsonRpcId::Null,
        JsonRpcError {
            code,
            message: message.to_string(),
            data: detail.map(|d| json!({ "detail": d })),
        },
    )
}

async fn write_jsonrpc<W: AsyncWrite + Unpin>(
    writer: &mut W,
    resp: &JsonRpcResponse,
) -> McpResult<()> {
    let out = serde_json::to_string(resp)?;
    writer.write_all(out.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
