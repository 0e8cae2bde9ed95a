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

//! coreinitd bin

use basic::logger;
use clap::Parser;
use coreinit::error::*;
use coreinit::manager::config::ManagerConfig;
use coreinit::Manager;
use libc::{prctl, PR_SET_CHILD_SUBREAPER};

/// parse program arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(long, short)]
    /// The configuration file, /etc/coreinit/system.conf by default.
    config: Option<String>,

    #[clap(long)]
    /// Load units from this directory instead of the configured UnitDir.
    unit_dir: Option<String>,

    #[clap(long)]
    /// Print the supervised services before exiting.
    status_on_exit: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ManagerConfig::new(args.config.as_deref());
    if let Some(dir) = args.unit_dir {
        config.UnitDir = dir;
    }

    logger::init_log(
        "coreinitd",
        config.log_level(),
        logger::parse_targets(&config.LogTarget),
    );
    log::info!("coreinitd running, units in {}", config.UnitDir);

    set_child_reaper();

    let manager = Manager::new(config);
    manager.startup()?;

    let ret = manager.main_loop();
    log::info!("coreinitd end its main loop with result: {:?}", ret);

    manager.shutdown();
    if args.status_on_exit {
        for status in manager.status() {
            println!("{}", status);
        }
    }

    ret
}

fn set_child_reaper() {
    let ret = unsafe { prctl(PR_SET_CHILD_SUBREAPER, 1, 0, 0, 0) };

    if ret < 0 {
        log::warn!("failed to set child reaper, errno: {}", ret);
    }
}
