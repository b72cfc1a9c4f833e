use std::fs;

use serde::Deserialize;
use argh::FromArgs;

use crate::solver::{PathParams, RouteParams};

/// A two-level Max-Min Ant System route solver for geographic graphs
#[derive(FromArgs)]
pub struct Arguments {
    /// path to the graph json file
    #[argh(positional)]
    pub graph: String,
    /// node id the tour starts and ends at
    #[argh(positional)]
    pub source: usize,
    /// waypoint node ids the tour must visit
    #[argh(positional)]
    pub waypoints: Vec<usize>,
    /// path to configuration file
    #[argh(option, short='c')]
    pub config: Option<String>,
    /// override random seed
    #[argh(option, short='s')]
    pub seed: Option<u64>,
    /// override outer-loop time budget in seconds
    #[argh(option, short='t')]
    pub max_time: Option<f64>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub seed: u64,
    pub path: PathParams,
    pub route: RouteParams,
}

impl Config {
    pub fn load_file(path: &str) -> Config {
        let text = fs::read_to_string(path)
            .expect("Failed to read config yaml file");
        serde_yaml::from_str(&text)
            .expect("Failed to parse config yaml file")
    }
    pub fn override_from_args(&mut self, args: &Arguments) {
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if let Some(max_time) = args.max_time {
            self.route.max_time = num::clamp(max_time, 0.0, f64::MAX);
        }
    }
}
