pub mod bench;
pub mod compare;
pub mod context;
pub mod dedup;
pub mod engine;
pub mod explain;
pub mod orchestrator;
pub mod prompt;
pub mod report;

pub use bench::{run_benchmark, BenchmarkReport, FactSheet};
pub use compare::{Comparison, ComparisonHarness, PathOutput};
pub use engine::{QueryOptions, RagEngine};
pub use explain::Explanation;
pub use orchestrator::{PreparedIngest, Retriever};
pub use report::{IngestReport, QueryReport, StatsReport, Status};
