// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::logger::Level;

use clap::{App, Arg, ArgMatches};
use log::info;
use serde_derive::*;

use std::io::Read;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

fn default_baseline() -> String {
    "results_maxcapacity.csv".to_string()
}

fn default_candidate() -> String {
    "results_new_maxcapacity.csv".to_string()
}

fn default_output() -> String {
    "comparison_results.png".to_string()
}

// 16x12 inches at 300 DPI
fn default_width() -> usize {
    4800
}

fn default_height() -> usize {
    3600
}

fn default_services() -> Vec<String> {
    vec![
        "connected_vehicles".to_string(),
        "augmented_reality".to_string(),
        "video_analysis".to_string(),
    ]
}

fn default_logging_level() -> Level {
    Level::Info
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_baseline")]
    baseline: String,
    #[serde(default = "default_candidate")]
    candidate: String,
    #[serde(default = "default_output")]
    output: String,
    #[serde(default = "default_width")]
    width: usize,
    #[serde(default = "default_height")]
    height: usize,
    #[serde(default = "default_services")]
    services: Vec<String>,
    #[serde(default = "default_logging_level")]
    logging: Level,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            baseline: default_baseline(),
            candidate: default_candidate(),
            output: default_output(),
            width: default_width(),
            height: default_height(),
            services: default_services(),
            logging: default_logging_level(),
        }
    }
}

impl Config {
    /// Parses the command line, loading the TOML config file first if one
    /// was given. Command line values override file values.
    pub fn new() -> Config {
        let matches = App::new(NAME)
            .version(VERSION)
            .about("Generates comparison charts from resource allocation simulation results")
            .arg(
                Arg::with_name("config")
                    .long("config")
                    .value_name("FILE")
                    .help("TOML config file")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("baseline")
                    .long("baseline")
                    .value_name("FILE")
                    .help("CSV results for the baseline allocation strategy")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("candidate")
                    .long("candidate")
                    .value_name("FILE")
                    .help("CSV results for the new allocation strategy")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("output")
                    .long("output")
                    .value_name("FILE")
                    .help("Path for the rendered comparison PNG")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("width")
                    .long("width")
                    .value_name("Pixels")
                    .help("Width of the rendered figure")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("height")
                    .long("height")
                    .value_name("Pixels")
                    .help("Height of the rendered figure")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .long("verbose")
                    .help("Increase verbosity by one level. Can be used more than once")
                    .multiple(true),
            )
            .get_matches();

        let mut config = if let Some(file) = matches.value_of("config") {
            Config::load_from_file(file)
        } else {
            Default::default()
        };

        if let Some(baseline) = matches.value_of("baseline") {
            config.baseline = baseline.to_string();
        }

        if let Some(candidate) = matches.value_of("candidate") {
            config.candidate = candidate.to_string();
        }

        if let Some(output) = matches.value_of("output") {
            config.output = output.to_string();
        }

        if let Some(width) = parse_numeric_arg(&matches, "width") {
            config.width = width;
        }

        if let Some(height) = parse_numeric_arg(&matches, "height") {
            config.height = height;
        }

        match matches.occurrences_of("verbose") {
            0 => {}
            1 => config.logging = Level::Debug,
            _ => config.logging = Level::Trace,
        }

        config
    }

    fn load_from_file(file: &str) -> Config {
        let mut file = std::fs::File::open(file).unwrap_or_else(|e| {
            println!("ERROR: failed to open config file: {}", e);
            std::process::exit(1);
        });
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap_or_else(|e| {
            println!("ERROR: failed to read config file: {}", e);
            std::process::exit(1);
        });
        toml::from_str(&content).unwrap_or_else(|e| {
            println!("ERROR: failed to parse config file: {}", e);
            std::process::exit(1);
        })
    }

    pub fn baseline(&self) -> String {
        self.baseline.clone()
    }

    pub fn set_baseline(&mut self, baseline: String) {
        self.baseline = baseline;
    }

    pub fn candidate(&self) -> String {
        self.candidate.clone()
    }

    pub fn set_candidate(&mut self, candidate: String) {
        self.candidate = candidate;
    }

    pub fn output(&self) -> String {
        self.output.clone()
    }

    pub fn set_output(&mut self, output: String) {
        self.output = output;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
    }

    pub fn services(&self) -> Vec<String> {
        self.services.clone()
    }

    pub fn set_services(&mut self, services: Vec<String>) {
        self.services = services;
    }

    pub fn logging(&self) -> Level {
        self.logging
    }

    pub fn print(&self) {
        info!("-----");
        info!("Config: Baseline: {}", self.baseline);
        info!("Config: Candidate: {}", self.candidate);
        info!("Config: Output: {} ({}x{})", self.output, self.width, self.height);
        info!("Config: Services: {}", self.services.join(", "));
    }
}

fn parse_numeric_arg(matches: &ArgMatches, key: &str) -> Option<usize> {
    matches.value_of(key).map(|f| {
        f.parse().unwrap_or_else(|_| {
            println!("ERROR: could not parse {}", key);
            std::process::exit(1);
        })
    })
}
