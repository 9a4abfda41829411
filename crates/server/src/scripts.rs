use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::domain::Classification;
use thiserror::Error;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, warn};

pub const SEGMENT_SCRIPT: &str = "segment.py";
pub const CLASSIFY_SCRIPT: &str = "classify.py";
pub const PROCESS_MAT_SCRIPT: &str = "process_mat.py";
pub const GENERATE_PDF_SCRIPT: &str = "generate_pdf.py";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to start {script}: {source}")]
    Spawn {
        script: String,
        source: std::io::Error,
    },
    #[error("i/o error while running {script}: {source}")]
    Io {
        script: String,
        source: std::io::Error,
    },
    #[error("{script} exited with status {code:?}: {stderr}")]
    Exit {
        script: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{script} emitted invalid JSON: {source}")]
    InvalidOutput {
        script: String,
        source: serde_json::Error,
    },
    #[error("{script} reported an error: {message}")]
    Reported { script: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentOutput {
    pub mask_path: PathBuf,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyOutput {
    pub classification: Classification,
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaskConversionOutput {
    pub mask_path: PathBuf,
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportOutput {
    pub pdf_path: PathBuf,
}

/// Runs the external placeholder scripts. Each invocation is awaited to
/// completion; there is no timeout and no retry.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    scripts_dir: PathBuf,
    interpreter: Option<String>,
}

impl ScriptRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>, interpreter: Option<String>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            interpreter,
        }
    }

    pub async fn segment(&self, image: &Path, out: &Path) -> Result<SegmentOutput, ScriptError> {
        self.run_json(SEGMENT_SCRIPT, [image.as_os_str(), out.as_os_str()], None)
            .await
    }

    pub async fn classify(&self, image: &Path, mask: &Path) -> Result<ClassifyOutput, ScriptError> {
        self.run_json(CLASSIFY_SCRIPT, [image.as_os_str(), mask.as_os_str()], None)
            .await
    }

    pub async fn convert_mat_mask(
        &self,
        mat: &Path,
        out: &Path,
    ) -> Result<MaskConversionOutput, ScriptError> {
        self.run_json(PROCESS_MAT_SCRIPT, [mat.as_os_str(), out.as_os_str()], None)
            .await
    }

    pub async fn generate_report(
        &self,
        out: &Path,
        payload: &serde_json::Value,
    ) -> Result<ReportOutput, ScriptError> {
        let stdin = serde_json::to_vec(payload).map_err(|source| ScriptError::InvalidOutput {
            script: GENERATE_PDF_SCRIPT.to_string(),
            source,
        })?;
        self.run_json(GENERATE_PDF_SCRIPT, [out.as_os_str()], Some(&stdin))
            .await
    }

    async fn run_json<'a, T, I>(
        &self,
        script: &str,
        args: I,
        stdin: Option<&[u8]>,
    ) -> Result<T, ScriptError>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = &'a OsStr>,
    {
        let stdout = self.run(script, args, stdin).await?;
        parse_output(script, &stdout)
    }

    async fn run<'a, I>(
        &self,
        script: &str,
        args: I,
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, ScriptError>
    where
        I: IntoIterator<Item = &'a OsStr>,
    {
        let script_path = self.scripts_dir.join(script);
        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(&script_path);
                command
            }
            None => Command::new(&script_path),
        };
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(script, path = %script_path.display(), "running script");
        let mut child = command.spawn().map_err(|source| ScriptError::Spawn {
            script: script.to_string(),
            source,
        })?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input)
                    .await
                    .map_err(|source| ScriptError::Io {
                        script: script.to_string(),
                        source,
                    })?;
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ScriptError::Io {
                script: script.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(script, code = ?output.status.code(), %stderr, "script failed");
            return Err(ScriptError::Exit {
                script: script.to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

/// Scripts print a single JSON object; `{"error": ...}` means the script
/// refused its input.
pub(crate) fn parse_output<T: DeserializeOwned>(script: &str, stdout: &[u8]) -> Result<T, ScriptError> {
    let value: serde_json::Value =
        serde_json::from_slice(stdout).map_err(|source| ScriptError::InvalidOutput {
            script: script.to_string(),
            source,
        })?;

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ScriptError::Reported {
            script: script.to_string(),
            message,
        });
    }

    serde_json::from_value(value).map_err(|source| ScriptError::InvalidOutput {
        script: script.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/scripts_tests.rs"]
mod tests;
