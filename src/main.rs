// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use allocgraph::config::{Config, NAME, VERSION};
use allocgraph::logger::Logger;

use log::{error, info};

fn main() {
    let config = Config::new();

    Logger::new()
        .label(NAME)
        .level(config.logging())
        .init()
        .expect("Failed to initialize logger");

    info!("{} {} initializing...", NAME, VERSION);
    config.print();

    if let Err(e) = allocgraph::run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}
