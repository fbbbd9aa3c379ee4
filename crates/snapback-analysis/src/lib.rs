//! `snapback-analysis` — the Analysis Router (§4.6), Upstream Client
//! (§4.7), Local Analyzer Facade and baseline detectors (§4.8), and the
//! dependency-change analyzer used by `check_dependencies`.

pub mod advisories;
pub mod breaker;
pub mod dependency_change;
pub mod detectors;
pub mod facade;
pub mod retry;
pub mod router;
pub mod upstream;

pub use dependency_change::{diff_dependencies, ChangeKind, DependencyChange};
pub use facade::LocalAnalyzer;
pub use router::{AnalysisRouter, UserContext};
pub use upstream::UpstreamClient;
