//! # battery-soh: Battery Cycling Corpus to State-of-Health Features
//!
//! Two offline stages over a corpus of battery cycling recordings:
//!
//! 1. **Extraction** turns each battery's raw record into one padded table per
//!    charge/discharge/impedance cycle plus a corpus-wide metadata index.
//! 2. **Health estimation** integrates current over every discharge cycle to
//!    get its capacity, derives SoC and SoH, and averages each cycle into a
//!    fixed number of bins for a flat training table.
//!
//! ## Design Principles
//!
//! - **Explicit state**: the corpus-wide cycle identifier is a value threaded
//!   through extraction, never a global
//! - **Outcomes over exceptions**: every skipped cycle or rejected group is a
//!   named outcome in a batch report
//! - **All or nothing per cycle**: a cycle contributes exactly `num_bins` rows
//!   or none
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use battery_soh::config::PipelineConfig;
//! use battery_soh::pipeline::{build_health_dataset, extract_corpus};
//! use battery_soh::record::JsonDirSource;
//! use battery_soh::table::CycleIdCounter;
//!
//! let config = PipelineConfig::default();
//! let layout = config.layout();
//!
//! let mut counter = CycleIdCounter::resume(layout.metadata_path())?;
//! let source = JsonDirSource::new(&config.raw_dir);
//! let extracted = extract_corpus(&source, &layout, &mut counter)?;
//! println!("{} cycles serialized", extracted.serialized_count());
//!
//! let (report, _artifact) = build_health_dataset(&layout, &config.health, &layout.health_path())?;
//! println!("{} cycles accepted", report.accepted_count());
//! # Ok::<(), battery_soh::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod health;
pub mod metadata;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod storage;
pub mod table;

pub use error::{Error, Result};
