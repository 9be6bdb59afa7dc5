//! Logging for simulation runs. This is diagnostic output about what the framework is doing
//! (replicates starting, seeds, noise multipliers), not model output, which goes to reports.
//!
//! The five logging macros `error!`, `warn!`, `info!`, `debug!` and `trace!` are re-exported from
//! the `log` crate. Logging is _disabled_ by default and can be switched on from code:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only messages with priority at least `level`
//!  - `set_log_level_from_verbosity(verbose)`: maps a simulation's `verbose` parameter to a level
//!
//! Per-module filters are configured with `set_module_filter()` / `set_module_filters()` and
//! removed with `remove_module_filter()`:
//!
//! ```rust
//! use epiabm::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! // Enable `info` messages globally, but show every replicate being dispatched.
//! set_log_level(LevelFilter::Info);
//! set_module_filter("epiabm::batch", LevelFilter::Trace);
//! ```
//!
//! The command-line runner accepts the same configuration as a string such as
//! `info,epiabm::replicate=debug`; see [`parse_log_spec`].
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::error::EpiError;

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// A level filter for all log messages whose target starts with `module`.
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Tracks the global level and the per-module filters, and holds the handle to the installed
/// logger. Only the singleton behind the free functions below should exist.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Level for targets without a module filter. `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::new(),
            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    pub(in crate::log) fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration changed.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().level == level {
                    return false;
                }
                entry.get_mut().level = level;
            }
            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    pub(in crate::log) fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    pub(in crate::log) fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// The level matching a simulation's `verbose` parameter: warnings only at 0, progress at 1 and
/// per-parameter detail from 2.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn set_log_level_from_verbosity(verbose: u8) {
    set_log_level(level_for_verbosity(verbose));
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    set_module_filters(&[(module_path, level_filter)]);
}

/// Removes the filter for the given module path; the global level applies to it again.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

/// Sets the level filters for a set of modules in one go.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

/// A parsed log specification: an optional global level and per-module levels.
#[derive(Debug, Default, PartialEq)]
pub struct LogSpec {
    pub global: Option<LevelFilter>,
    pub modules: Vec<(String, LevelFilter)>,
}

fn parse_level(raw: &str) -> Result<LevelFilter, EpiError> {
    LevelFilter::from_str(raw.trim()).map_err(|_| {
        EpiError::Other(format!(
            "Invalid log level {raw:?}; expected one of off, error, warn, info, debug, trace"
        ))
    })
}

/// Parses a comma-separated specification such as `info,epiabm::batch=trace`. A bare level
/// sets the global level; `module=level` sets a module filter.
///
/// # Errors
///
/// Fails on an unrecognized level name.
pub fn parse_log_spec(spec: &str) -> Result<LogSpec, EpiError> {
    let mut parsed = LogSpec::default();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((module, level)) => parsed
                .modules
                .push((module.trim().to_string(), parse_level(level)?)),
            None => parsed.global = Some(parse_level(part)?),
        }
    }
    Ok(parsed)
}

/// Installs a parsed specification.
pub fn apply_log_spec(spec: &LogSpec) {
    if let Some(level) = spec.global {
        set_log_level(level);
    }
    let filters: Vec<(&str, LevelFilter)> = spec
        .modules
        .iter()
        .map(|(module, level)| (module.as_str(), *level))
        .collect();
    set_module_filters(&filters);
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
