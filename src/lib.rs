//! TasteGraph: similarity graphs and taste communities from listening data
//!
//! Users' liked-song sets are compared pairwise with Jaccard similarity; pairs
//! above a threshold become weighted edges, and a union-find structure groups
//! users connected through those edges into communities. The remaining modules
//! load the CSV dataset and render the graphs as PNG plots.

pub mod bipartite;
pub mod cli;
pub mod community;
pub mod data;
pub mod error;
pub mod layout;
pub mod similarity;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use community::{partition_memberships, Community, CommunityPartitioner, PartitionState};
pub use data::{load_dataset, Dataset};
pub use error::{GraphError, GraphResult};
pub use similarity::{compute_edges, jaccard, MembershipSet, SimilarityEdge};
pub use viz::{generate_visualization_report, PlotSettings};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
