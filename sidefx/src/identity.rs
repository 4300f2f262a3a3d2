// ABOUTME: resolves who is running the tool and from which executable.
// ABOUTME: logged at start so observed events can be matched to this process.

use std::ffi::CStr;

use crate::errors::FatalError;

const MAX_PASSWD_BUF: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub executable: String,
    pub pid: u32,
}

pub fn current() -> Result<Identity, FatalError> {
    Ok(Identity {
        user: current_user()?,
        executable: current_executable()?,
        pid: std::process::id(),
    })
}

pub fn current_user() -> Result<String, FatalError> {
    let uid = unsafe { libc::getuid() };
    match passwd_name(uid) {
        Ok(Some(name)) => Ok(name),
        // No passwd entry (e.g. arbitrary container uid): fall back to the environment.
        Ok(None) => std::env::var("USER").map_err(|_| FatalError::Identity {
            what: "current user",
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no passwd entry for uid {uid} and USER is unset"),
            ),
        }),
        Err(source) => Err(FatalError::Identity {
            what: "current user",
            source,
        }),
    }
}

pub fn current_executable() -> Result<String, FatalError> {
    std::env::current_exe()
        .map(|path| path.to_string_lossy().into_owned())
        .map_err(|source| FatalError::Identity {
            what: "current executable",
            source,
        })
}

fn passwd_name(uid: libc::uid_t) -> std::io::Result<Option<String>> {
    let mut buf: Vec<libc::c_char> = vec![0; 1024];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    loop {
        let rc = unsafe { libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result) };
        if rc == libc::ERANGE && buf.len() < MAX_PASSWD_BUF {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        if rc != 0 {
            return Err(std::io::Error::from_raw_os_error(rc));
        }
        break;
    }

    if result.is_null() || pwd.pw_name.is_null() {
        return Ok(None);
    }

    let name = unsafe { CStr::from_ptr(pwd.pw_name) };
    Ok(Some(name.to_string_lossy().into_owned()))
}
