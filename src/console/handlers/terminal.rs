// Copyright 2025 The Karmada Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pod 终端, WebSocket 与 exec 会话之间的桥接

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use k8s_openapi::api::core::v1 as corev1;
use kube::{
    Api,
    api::{AttachParams, AttachedProcess, TerminalSize},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::console::{
    error::Result,
    extract::ResourcePath,
    models::terminal::TerminalMessage,
    state::AppState,
};
use crate::context::Target;

/// 优先 bash, 不存在时退回 sh
const SHELL_COMMAND: [&str; 3] = [
    "/bin/sh",
    "-c",
    "TERM=xterm-256color; export TERM; [ -x /bin/bash ] && exec /bin/bash || exec /bin/sh",
];

const READ_BUFFER_SIZE: usize = 4096;

struct ShellTarget {
    target: Target,
    token: Option<String>,
    namespace: String,
    pod: String,
    container: String,
}

/// `GET .../pod/{namespace}/{name}/shell/{container}`
pub async fn shell(
    State(state): State<AppState>,
    rp: ResourcePath,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let shell = ShellTarget {
        namespace: rp.namespace()?.to_string(),
        pod: rp.name()?.to_string(),
        container: rp.param("container")?.to_string(),
        token: rp.token().map(str::to_string),
        target: rp.target,
    };

    Ok(ws.on_upgrade(move |socket| run_session(state, shell, socket)))
}

async fn run_session(state: AppState, shell: ShellTarget, socket: WebSocket) {
    let (mut sender, receiver) = socket.split();

    let attached = match exec(&state, &shell).await {
        Ok(attached) => attached,
        Err(e) => {
            warn!("exec into {}/{} failed: {}", shell.namespace, shell.pod, e);
            let _ = send(&mut sender, TerminalMessage::Toast { data: e.to_string() }).await;
            return;
        }
    };

    info!(
        "terminal opened for {}/{} container {} on {}",
        shell.namespace, shell.pod, shell.container, shell.target
    );
    bridge(attached, sender, receiver).await;
    debug!("terminal closed for {}/{}", shell.namespace, shell.pod);
}

async fn exec(state: &AppState, shell: &ShellTarget) -> Result<AttachedProcess> {
    let client = state.context.client(&shell.target, shell.token.as_deref())?;
    let api: Api<corev1::Pod> = Api::namespaced(client, &shell.namespace);
    let params = AttachParams::interactive_tty().container(shell.container.as_str());
    Ok(api.exec(&shell.pod, SHELL_COMMAND, &params).await?)
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: TerminalMessage) -> std::result::Result<(), axum::Error> {
    let text = serde_json::to_string(&msg).unwrap_or_default();
    sender.send(Message::Text(text.into())).await
}

/// 取出缓冲区中完整的 UTF-8 前缀, 截断的多字节字符留待下次读取
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(s) => s.len(),
        // 非法字节 (而非截断) 时整体有损转换
        Err(e) if e.error_len().is_some() => pending.len(),
        Err(e) => e.valid_up_to(),
    };
    let rest = pending.split_off(valid);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

async fn bridge(
    mut attached: AttachedProcess,
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: futures::stream::SplitStream<WebSocket>,
) {
    let (Some(mut stdin), Some(mut stdout)) = (attached.stdin(), attached.stdout()) else {
        let _ = send(&mut sender, TerminalMessage::Toast {
            data: "exec session has no stdio".to_string(),
        })
        .await;
        return;
    };
    let mut resize = attached.terminal_size();

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let data = take_utf8(&mut pending);
                    if !data.is_empty() && send(&mut sender, TerminalMessage::Stdout { data }).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = send(&mut sender, TerminalMessage::Toast { data: e.to_string() }).await;
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<TerminalMessage>(text.as_str()) {
                        Ok(TerminalMessage::Stdin { data }) => {
                            if let Err(e) = stdin.write_all(data.as_bytes()).await {
                                let _ = send(&mut sender, TerminalMessage::Toast { data: e.to_string() }).await;
                                break;
                            }
                        }
                        Ok(TerminalMessage::Resize { rows, cols }) => {
                            if let Some(tx) = resize.as_mut() {
                                let _ = tx.send(TerminalSize { width: cols, height: rows }).await;
                            }
                        }
                        Ok(other) => debug!("ignoring client frame {:?}", other),
                        Err(e) => debug!("malformed terminal frame: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("terminal websocket error: {}", e);
                    break;
                }
            },
        }
    }

    drop(stdin);
    attached.abort();
}
