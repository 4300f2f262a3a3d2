// ABOUTME: routes a decoded action to the executor for its kind.
// ABOUTME: every executor either succeeds after logging or returns a fatal error.

pub mod exec;
pub mod files;
pub mod network;

use sidefx_common::Action;

use crate::errors::FatalError;

pub use exec::ExitCodePolicy;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    pub exit_code_policy: ExitCodePolicy,
}

pub async fn execute(action: &Action, options: &ExecOptions) -> Result<(), FatalError> {
    match action {
        Action::CreateFile(create) => files::create(create).await,
        Action::ModifyFile(modify) => files::modify(modify).await,
        Action::DeleteFile(delete) => files::delete(delete).await,
        Action::RunCommand(cmd) => exec::run(cmd, options.exit_code_policy).await.map(|_| ()),
        Action::NetworkWrite(net) => network::write(net).await.map(|_| ()),
    }
}
