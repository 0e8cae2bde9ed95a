// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! This crate provides common, functions for unit tests
use std::{
    env, fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// get the source project root path
pub fn get_project_root() -> io::Result<PathBuf> {
    let path = env::current_dir()?;
    let mut current_path = Some(path.as_path());

    while let Some(p) = current_path {
        let has_cargo = p.read_dir()?.any(|p| {
            if let Ok(entry) = p {
                entry.file_name().eq("Cargo.lock")
            } else {
                false
            }
        });

        if has_cargo {
            return Ok(p.into());
        }

        current_path = p.parent();
    }

    Err(io::Error::new(ErrorKind::NotFound, "NotFound"))
}

/// get the crate root path
pub fn get_crate_root() -> io::Result<PathBuf> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Ok(PathBuf::from(manifest_dir))
}

/// get the directory holding the unit fixtures shared by all tests
pub fn get_test_units_dir() -> io::Result<PathBuf> {
    let dir = get_crate_root()?
        .join("..")
        .join("..")
        .join("tests")
        .join("test_units");
    if !dir.is_dir() {
        return Err(io::Error::new(ErrorKind::NotFound, "test_units"));
    }
    dir.canonicalize()
}

/// write one unit file into dir and return its path
pub fn write_unit(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, body)?;
    Ok(path)
}
