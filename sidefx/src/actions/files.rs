// ABOUTME: implements the CreateFile, ModifyFile and DeleteFile actions.
// ABOUTME: each performs one filesystem call and logs what it did.

use sidefx_common::{CreateFileAction, DeleteFileAction, ModifyFileAction};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::errors::FatalError;

const CREATE_MODE: u32 = 0o644;

fn file_error<'a>(op: &'static str, path: &'a str) -> impl FnOnce(std::io::Error) -> FatalError + 'a {
    move |source| FatalError::File {
        op,
        path: path.to_string(),
        source,
    }
}

pub async fn create(create: &CreateFileAction) -> Result<(), FatalError> {
    if tokio::fs::File::open(&create.path).await.is_ok() {
        return Err(FatalError::FileExists {
            path: create.path.clone(),
        });
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(CREATE_MODE);

    let file = options
        .open(&create.path)
        .await
        .map_err(file_error("create", &create.path))?;
    drop(file);

    info!(action = "CreateFile", path = %create.path, "CreateFile");
    Ok(())
}

pub async fn modify(modify: &ModifyFileAction) -> Result<(), FatalError> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(&modify.path)
        .await
        .map_err(file_error("open", &modify.path))?;

    file.write_all(modify.content.as_bytes())
        .await
        .map_err(file_error("write", &modify.path))?;
    file.flush().await.map_err(file_error("write", &modify.path))?;

    info!(
        action = "ModifyFile",
        path = %modify.path,
        n_written = modify.content.len(),
        "ModifyFile"
    );
    Ok(())
}

pub async fn delete(delete: &DeleteFileAction) -> Result<(), FatalError> {
    tokio::fs::remove_file(&delete.path)
        .await
        .map_err(file_error("remove", &delete.path))?;

    info!(action = "DeleteFile", path = %delete.path, "DeleteFile");
    Ok(())
}
