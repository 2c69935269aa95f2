//! Command-line interface definitions and argument parsing

use crate::similarity::validate_threshold;
use crate::viz::PlotSettings;
use clap::Parser;
use std::path::PathBuf;

/// Render interaction graphs and taste communities from listening data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding users.csv, songs.csv, artists.csv and the interaction CSVs
    #[arg(short, long, default_value = "datasets")]
    pub data_dir: PathBuf,

    /// Directory the PNG plots are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Minimum Jaccard similarity for an edge in the similarity graph
    #[arg(short = 's', long, default_value = "0.2")]
    pub similarity_threshold: f64,

    /// Minimum Jaccard similarity for two users to share a community
    #[arg(short = 'c', long, default_value = "0.3")]
    pub community_threshold: f64,

    /// Users shown in the user-song bipartite graph
    #[arg(long, default_value = "10")]
    pub max_users: usize,

    /// Songs shown in the user-song bipartite graph
    #[arg(long, default_value = "20")]
    pub max_songs: usize,

    /// Users shown in the user-artist bipartite graph
    #[arg(long, default_value = "12")]
    pub max_artist_users: usize,

    /// Artists shown in the user-artist bipartite graph
    #[arg(long, default_value = "15")]
    pub max_artists: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Check both thresholds before any data is read
    pub fn validate(&self) -> crate::Result<()> {
        validate_threshold(self.similarity_threshold)?;
        validate_threshold(self.community_threshold)?;
        Ok(())
    }

    pub fn plot_settings(&self) -> PlotSettings {
        PlotSettings {
            similarity_threshold: self.similarity_threshold,
            community_threshold: self.community_threshold,
            max_song_users: self.max_users,
            max_songs: self.max_songs,
            max_artist_users: self.max_artist_users,
            max_artists: self.max_artists,
            ..PlotSettings::default()
        }
    }
}
