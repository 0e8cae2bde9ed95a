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

//! The loaded unit set and the batch loader of a unit directory
use super::base::{unit_name_to_type, UnitType};
use super::entry::{load, Unit};
use crate::error::*;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use walkdir::WalkDir;

/// The units of one load batch, with socket and timer units linked to the service they activate.
#[derive(Debug, Default)]
pub struct UnitSet {
    units: Vec<Rc<Unit>>,
    index: HashMap<String, usize>,
    links: HashMap<String, String>,
}

impl UnitSet {
    /// Build the set and resolve the activation links. Duplicated names keep the first unit.
    pub fn new(units: Vec<Unit>) -> UnitSet {
        let mut set = UnitSet::default();
        for unit in units {
            if set.index.contains_key(unit.name()) {
                log::warn!("Duplicated unit {}, ignoring the later one", unit.name());
                continue;
            }
            set.index.insert(unit.name().to_string(), set.units.len());
            set.units.push(Rc::new(unit));
        }

        set.resolve_links();
        set
    }

    fn resolve_links(&mut self) {
        for unit in self.units.iter() {
            let target = match unit.unit_type() {
                UnitType::Socket => self.resolve_socket(unit),
                UnitType::Timer => self.resolve_timer(unit),
                _ => continue,
            };

            match target {
                Some(service) => {
                    log::debug!("{} activates {}", unit.name(), service);
                    self.links.insert(unit.name().to_string(), service);
                }
                None => log::warn!("{} does not activate any service", unit.name()),
            }
        }
    }

    fn is_service(&self, name: &str) -> bool {
        self.get(name)
            .map_or(false, |u| u.unit_type() == UnitType::Service)
    }

    fn sibling_service(&self, unit: &Unit) -> Option<String> {
        let name = format!("{}{}", unit.base_name(), UnitType::Service.suffix());
        if self.is_service(&name) {
            return Some(name);
        }
        None
    }

    fn resolve_socket(&self, socket: &Unit) -> Option<String> {
        let claims: Vec<&Rc<Unit>> = self
            .of_type(UnitType::Service)
            .filter(|s| s.socket() == Some(socket.name()))
            .collect();

        match claims.len() {
            0 => self.sibling_service(socket),
            1 => Some(claims[0].name().to_string()),
            _ => {
                log::warn!(
                    "{} is claimed by {} services, leaving it unlinked",
                    socket.name(),
                    claims.len()
                );
                None
            }
        }
    }

    fn resolve_timer(&self, timer: &Unit) -> Option<String> {
        match timer.timer_unit() {
            Some(name) if self.is_service(name) => Some(name.to_string()),
            Some(name) => {
                log::warn!("{}: Unit={} is not a loaded service", timer.name(), name);
                None
            }
            None => self.sibling_service(timer),
        }
    }

    /// get the unit by name
    pub fn get(&self, name: &str) -> Option<Rc<Unit>> {
        self.index.get(name).map(|i| self.units[*i].clone())
    }

    /// the service activated by the socket or timer unit
    pub fn target_of(&self, name: &str) -> Option<Rc<Unit>> {
        self.links.get(name).and_then(|s| self.get(s))
    }

    /// all units in load order
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Unit>> {
        self.units.iter()
    }

    /// all units of the type in load order
    pub fn of_type(&self, unit_type: UnitType) -> impl Iterator<Item = &Rc<Unit>> {
        self.units
            .iter()
            .filter(move |u| u.unit_type() == unit_type)
    }

    ///
    pub fn len(&self) -> usize {
        self.units.len()
    }

    ///
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// The outcome of loading a unit directory: the units that loaded and the failures that were skipped.
#[derive(Debug)]
pub struct LoadBatch {
    /// the loaded units
    pub units: UnitSet,
    /// one entry per skipped file, the capacity stop included
    pub errors: Vec<LoadError>,
}

/// Load every service, socket and timer file in dir, at most capacity of them.
///
/// Files are visited in name order. Individual failures are reported in the batch, only an
/// unreadable directory fails the call.
pub fn load_all(dir: &Path, capacity: usize) -> Result<LoadBatch> {
    if let Err(e) = std::fs::read_dir(dir) {
        return Err(LoadError::NotFound {
            path: dir.to_path_buf(),
            source: e,
        });
    }

    let mut units = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("Failed to read an entry of {:?}: {}", dir, e);
                errors.push(LoadError::ReadDir {
                    path: dir.to_path_buf(),
                    source: e,
                });
                continue;
            }
        };

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if path.is_dir() || unit_name_to_type(&name) == UnitType::Unknown {
            log::debug!("Skipping {:?}, not a unit file", path);
            continue;
        }

        if units.len() >= capacity {
            log::warn!(
                "Unit limit {} reached, not loading {:?} and the following units",
                capacity,
                path
            );
            errors.push(LoadError::Capacity {
                max: capacity,
                path: path.to_path_buf(),
            });
            break;
        }

        match load(path) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                log::error!("Failed to load {:?}: {}", path, e);
                errors.push(e);
            }
        }
    }

    log::info!("Loaded {} units from {:?}", units.len(), dir);
    Ok(LoadBatch {
        units: UnitSet::new(units),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use libtests::write_unit;

    fn unit(name: &str, content: &str) -> Unit {
        Unit::parse(name, content)
    }

    #[test]
    fn test_load_all_classifies() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(dir.path(), "a.service", "ExecStart=/bin/true\n").unwrap();
        write_unit(dir.path(), "b.socket", "ListenStream=/tmp/b.sock\n").unwrap();
        write_unit(dir.path(), "c.timer", "OnBootSec=2\n").unwrap();
        write_unit(dir.path(), "d.txt", "Description=ignored\n").unwrap();
        std::fs::create_dir(dir.path().join("e.service")).unwrap();

        let batch = load_all(dir.path(), 16).unwrap();
        assert!(batch.errors.is_empty());
        let names: Vec<&str> = batch.units.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["a.service", "b.socket", "c.timer"]);
        assert!(batch.units.get("d.txt").is_none());
    }

    #[test]
    fn test_load_all_capacity() {
        let dir = tempfile::tempdir().unwrap();
        write_unit(dir.path(), "a.service", "ExecStart=/bin/a\n").unwrap();
        write_unit(dir.path(), "b.service", "ExecStart=/bin/b\n").unwrap();
        write_unit(dir.path(), "c.service", "ExecStart=/bin/c\n").unwrap();

        let batch = load_all(dir.path(), 2).unwrap();
        assert_eq!(batch.units.len(), 2);
        assert_eq!(batch.units.get("a.service").unwrap().exec_start(), "/bin/a");
        assert_eq!(batch.units.get("b.service").unwrap().exec_start(), "/bin/b");
        assert_eq!(batch.errors.len(), 1);
        assert!(matches!(batch.errors[0], LoadError::Capacity { max: 2, .. }));
    }

    #[test]
    fn test_load_all_missing_dir() {
        let err = load_all(Path::new("/nonexistent/units"), 4).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_link_by_name() {
        let set = UnitSet::new(vec![
            unit("echo.service", "ExecStart=/bin/cat\n"),
            unit("echobar.service", "ExecStart=/bin/cat\n"),
            unit("echo.socket", "ListenStream=/tmp/echo.sock\n"),
            unit("echo.timer", "OnBootSec=1\n"),
        ]);
        assert_eq!(set.target_of("echo.socket").unwrap().name(), "echo.service");
        assert_eq!(set.target_of("echo.timer").unwrap().name(), "echo.service");
        assert!(set.target_of("echo.service").is_none());
    }

    #[test]
    fn test_link_no_prefix_match() {
        let set = UnitSet::new(vec![
            unit("foobar.service", "ExecStart=/bin/cat\n"),
            unit("foo.socket", "ListenStream=/tmp/foo.sock\n"),
        ]);
        assert!(set.target_of("foo.socket").is_none());
    }

    #[test]
    fn test_link_by_socket_directive() {
        let set = UnitSet::new(vec![
            unit("web.service", "ExecStart=/bin/cat\nSocket=http.socket\n"),
            unit("http.service", "ExecStart=/bin/true\n"),
            unit("http.socket", "ListenStream=8080\n"),
        ]);
        assert_eq!(set.target_of("http.socket").unwrap().name(), "web.service");
    }

    #[test]
    fn test_link_ambiguous() {
        let set = UnitSet::new(vec![
            unit("a.service", "ExecStart=/bin/cat\nSocket=s.socket\n"),
            unit("b.service", "ExecStart=/bin/cat\nSocket=s.socket\n"),
            unit("s.service", "ExecStart=/bin/cat\n"),
            unit("s.socket", "ListenStream=8080\n"),
        ]);
        assert!(set.target_of("s.socket").is_none());
    }

    #[test]
    fn test_link_timer_unit_directive() {
        let set = UnitSet::new(vec![
            unit("backup.service", "ExecStart=/bin/true\n"),
            unit("nightly.timer", "OnBootSec=5\nUnit=backup.service\n"),
            unit("broken.timer", "OnBootSec=5\nUnit=missing.service\n"),
            unit("broken.service", "ExecStart=/bin/true\n"),
        ]);
        assert_eq!(
            set.target_of("nightly.timer").unwrap().name(),
            "backup.service"
        );
        /* an explicit link never falls back to the name */
        assert!(set.target_of("broken.timer").is_none());
    }

    #[test]
    fn test_duplicated_names() {
        let set = UnitSet::new(vec![
            unit("a.service", "ExecStart=/bin/first\n"),
            unit("a.service", "ExecStart=/bin/second\n"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a.service").unwrap().exec_start(), "/bin/first");
        assert_eq!(set.of_type(UnitType::Service).count(), 1);
        assert_eq!(set.of_type(UnitType::Timer).count(), 0);
    }
}
