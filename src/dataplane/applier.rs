//! Route application
//!
//! [`RouteMutator`] is the seam between route decisions and whatever
//! changes the host routing table. [`ScriptMutator`] runs an external
//! executable with the binding passed through the environment:
//!
//! | Variable     | Value                                   |
//! |--------------|-----------------------------------------|
//! | `PREFIX`     | network address, host bits cleared      |
//! | `PREFIX_LEN` | prefix length, decimal                  |
//! | `ROUTER`     | router's IPv6 source address            |
//! | `IFACE`      | interface the advertisement arrived on  |

use super::route_state::Binding;
use crate::error::ApplyError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Output of a successful application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutput {
    pub stdout: String,
}

/// Applies a route binding to the host
pub trait RouteMutator: Send {
    fn apply(
        &mut self,
        binding: &Binding,
    ) -> impl Future<Output = Result<ApplyOutput, ApplyError>> + Send;
}

/// Runs an executable once per binding
#[derive(Debug, Clone)]
pub struct ScriptMutator {
    script: PathBuf,
}

impl ScriptMutator {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl RouteMutator for ScriptMutator {
    async fn apply(&mut self, binding: &Binding) -> Result<ApplyOutput, ApplyError> {
        let output = Command::new(&self.script)
            .env("PREFIX", binding.prefix.to_string())
            .env("PREFIX_LEN", binding.prefix_length.to_string())
            .env("ROUTER", binding.router.to_string())
            .env("IFACE", &binding.interface)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ApplyError::Launch {
                script: self.script.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(ApplyOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        } else {
            Err(ApplyError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
