// ABOUTME: checks sidefx scripts offline by splitting and decoding every block.
// ABOUTME: reports values the executor would reject, without performing any action.

use sidefx_common::{blocks, decode_action, Action, Protocol};

#[derive(Debug, serde::Serialize, PartialEq, Eq)]
pub struct LintReport {
    pub ok: bool,
    pub blocks: Vec<BlockVerdict>,
}

#[derive(Debug, serde::Serialize, PartialEq, Eq)]
pub struct BlockVerdict {
    pub index: usize,
    pub action: Option<String>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn has_warnings(&self) -> bool {
        self.blocks.iter().any(|b| !b.warnings.is_empty())
    }
}

pub fn lint_script(input: &str) -> LintReport {
    let verdicts: Vec<BlockVerdict> = blocks(input)
        .enumerate()
        .map(|(index, block)| match decode_action(&block) {
            Ok(action) => BlockVerdict {
                index,
                action: Some(action.kind().to_string()),
                error: None,
                warnings: action_warnings(&action),
            },
            Err(err) => BlockVerdict {
                index,
                action: None,
                error: Some(err.to_string()),
                warnings: vec![],
            },
        })
        .collect();

    LintReport {
        ok: verdicts.iter().all(|v| v.error.is_none()),
        blocks: verdicts,
    }
}

/// Problems visible without touching the system. Missing fields decode to
/// empty values, so most of these are typos in field names.
pub fn action_warnings(action: &Action) -> Vec<String> {
    let mut warnings = Vec::new();
    match action {
        Action::CreateFile(a) => empty_path(&a.path, &mut warnings),
        Action::ModifyFile(a) => empty_path(&a.path, &mut warnings),
        Action::DeleteFile(a) => empty_path(&a.path, &mut warnings),
        Action::RunCommand(a) => empty_path(&a.path, &mut warnings),
        Action::NetworkWrite(a) => {
            if let Err(err) = a.protocol.parse::<Protocol>() {
                warnings.push(err.to_string());
            }
            if a.host.trim().is_empty() {
                warnings.push("host is empty, the local system is dialed".to_string());
            }
            if a.port == 0 {
                warnings.push("port is 0".to_string());
            }
        }
    }
    warnings
}

fn empty_path(path: &str, warnings: &mut Vec<String>) {
    if path.is_empty() {
        warnings.push("path is empty".to_string());
    }
}
