//! Manifest reset and removal of generated build paths.

use std::fs;
use std::io;
use std::path::Path;

use crate::edit::Rewrite;
use crate::log::{OperationLog, Outcome};
use crate::safety::WorkspaceGuard;

pub const MANIFEST_FILE: &str = "mule-artifact.json";
pub const BUILD_DIR: &str = "target";
pub const IDE_FILES: [&str; 2] = [".classpath", ".project"];

/// Constant manifest written on every run, whatever was there before.
pub const MANIFEST_CONTENT: &str =
    "{\n  \"minMuleVersion\": \"4.9.0\",\n  \"javaSpecificationVersions\": [\"17\"]\n}";

/// Overwrite the manifest, then delete the build directory and IDE files.
/// Each step logs its own failure and the next one still runs.
pub fn clean(guard: &WorkspaceGuard, log: &mut OperationLog) {
    log.section("mule artifact");
    reset_manifest(guard, log);
    log.section("mule artifact done");

    log.section("cleaning build path");
    remove_build_dir(guard, log);
    for name in IDE_FILES {
        remove_file(guard, name, log);
    }
    log.section("cleaning build path done");
}

fn reset_manifest(guard: &WorkspaceGuard, log: &mut OperationLog) {
    let written = guard
        .resolve(MANIFEST_FILE)
        .map_err(|err| err.to_string())
        .and_then(|path| {
            Rewrite::overwrite(path, MANIFEST_CONTENT)
                .apply()
                .map_err(|err| err.to_string())
        });

    match written {
        Ok(_) => log.push(
            Outcome::Updated,
            "mule-artifact contents replaced successfully!",
        ),
        Err(message) => log.error(format!("An error occurred: {message}")),
    }
}

fn remove_build_dir(guard: &WorkspaceGuard, log: &mut OperationLog) {
    let path = match guard.resolve(BUILD_DIR) {
        Ok(path) => path,
        Err(err) => return log.error(format!("An error occurred: {err}")),
    };

    if !path.is_dir() {
        return log.push(
            Outcome::Absent,
            format!("Folder {} does not exist.", path.display()),
        );
    }
    match fs::remove_dir_all(&path) {
        Ok(()) => log.push(
            Outcome::Deleted,
            format!("Folder {} and its contents deleted successfully.", path.display()),
        ),
        Err(err) => log_delete_error(&path, &err, log),
    }
}

fn remove_file(guard: &WorkspaceGuard, name: &str, log: &mut OperationLog) {
    let path = match guard.resolve(name) {
        Ok(path) => path,
        Err(err) => return log.error(format!("An error occurred: {err}")),
    };

    if !path.is_file() {
        return log.push(
            Outcome::Absent,
            format!("File {} does not exist.", path.display()),
        );
    }
    match fs::remove_file(&path) {
        Ok(()) => log.push(
            Outcome::Deleted,
            format!("File {} deleted successfully.", path.display()),
        ),
        Err(err) => log_delete_error(&path, &err, log),
    }
}

fn log_delete_error(path: &Path, err: &io::Error, log: &mut OperationLog) {
    if err.kind() == io::ErrorKind::PermissionDenied {
        log.error(format!("Access denied. Unable to delete {}.", path.display()));
    } else {
        log.error(format!("An error occurred: {err}"));
    }
}
