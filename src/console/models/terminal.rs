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

use serde::{Deserialize, Serialize};

/// 终端 WebSocket 帧
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum TerminalMessage {
    /// 客户端输入
    Stdin { data: String },
    /// 客户端窗口大小变化
    Resize { rows: u16, cols: u16 },
    /// 容器输出
    Stdout { data: String },
    /// 错误提示
    Toast { data: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames() {
        let msg: TerminalMessage = serde_json::from_str(r#"{"op":"resize","rows":40,"cols":120}"#).unwrap();
        assert_eq!(msg, TerminalMessage::Resize { rows: 40, cols: 120 });

        let msg: TerminalMessage = serde_json::from_str(r#"{"op":"stdin","data":"ls\r"}"#).unwrap();
        assert_eq!(msg, TerminalMessage::Stdin { data: "ls\r".to_string() });

        let out = serde_json::to_string(&TerminalMessage::Toast {
            data: "container not found".to_string(),
        })
        .unwrap();
        assert_eq!(out, r#"{"op":"toast","data":"container not found"}"#);

        assert!(serde_json::from_str::<TerminalMessage>(r#"{"op":"bind"}"#).is_err());
    }
}
