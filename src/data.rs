//! Dataset loading from CSV using Polars

use crate::similarity::MembershipSet;
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Song feature columns, in the order they appear in `SongTable::features`
pub const FEATURE_COLUMNS: [&str; 4] = ["bpm", "energy", "danceability", "valence"];

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub artist_id: String,
    pub artist_name: String,
    pub genre: String,
}

/// Song metadata with numeric features as a matrix
#[derive(Debug, Clone)]
pub struct SongTable {
    pub song_ids: Vec<String>,
    pub titles: Vec<String>,
    pub artist_ids: Vec<String>,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    /// (n_songs, 4) matrix of `FEATURE_COLUMNS`
    pub features: Array2<f64>,
}

impl SongTable {
    pub fn len(&self) -> usize {
        self.song_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.song_ids.is_empty()
    }

    /// Title for a song id, if known
    pub fn title_of(&self, song_id: &str) -> Option<&str> {
        self.song_ids
            .iter()
            .position(|id| id == song_id)
            .map(|i| self.titles[i].as_str())
    }

    /// Column index of a named feature
    pub fn feature_index(name: &str) -> Option<usize> {
        FEATURE_COLUMNS.iter().position(|&column| column == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongInteraction {
    pub user_id: String,
    pub song_id: String,
    pub liked: bool,
    pub play_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistInteraction {
    pub user_id: String,
    pub artist_id: String,
    pub play_count: i64,
}

/// Everything read from a dataset directory
#[derive(Debug, Clone)]
pub struct Dataset {
    pub users: Vec<User>,
    pub artists: Vec<Artist>,
    pub songs: SongTable,
    pub song_interactions: Vec<SongInteraction>,
    pub artist_interactions: Vec<ArtistInteraction>,
}

impl Dataset {
    /// Liked-song sets per user, the input of the similarity core
    pub fn liked_songs(&self) -> MembershipSet<String, String> {
        liked_memberships(&self.song_interactions)
    }
}

/// Load all five CSV files from `dir`
///
/// # Arguments
/// * `dir` - Directory holding `users.csv`, `songs.csv`, `artists.csv`,
///   `user_song_interactions.csv` and `user_artist_interactions.csv`
pub fn load_dataset(dir: &Path) -> crate::Result<Dataset> {
    let dataset = Dataset {
        users: load_users(&dir.join("users.csv"))?,
        artists: load_artists(&dir.join("artists.csv"))?,
        songs: load_songs(&dir.join("songs.csv"))?,
        song_interactions: load_song_interactions(&dir.join("user_song_interactions.csv"))?,
        artist_interactions: load_artist_interactions(&dir.join("user_artist_interactions.csv"))?,
    };

    info!(
        users = dataset.users.len(),
        artists = dataset.artists.len(),
        songs = dataset.songs.len(),
        song_interactions = dataset.song_interactions.len(),
        artist_interactions = dataset.artist_interactions.len(),
        "dataset loaded"
    );

    Ok(dataset)
}

pub fn load_users(path: &Path) -> crate::Result<Vec<User>> {
    let df = scan_csv(path, [text("user_id"), text("username")], &["user_id"])?;

    let users = string_column(&df, "user_id")?
        .into_iter()
        .zip(string_column(&df, "username")?)
        .map(|(user_id, username)| User { user_id, username })
        .collect();

    Ok(users)
}

pub fn load_artists(path: &Path) -> crate::Result<Vec<Artist>> {
    let df = scan_csv(
        path,
        [text("artist_id"), text("artist_name"), text("genre")],
        &["artist_id"],
    )?;

    let artists = string_column(&df, "artist_id")?
        .into_iter()
        .zip(string_column(&df, "artist_name")?)
        .zip(string_column(&df, "genre")?)
        .map(|((artist_id, artist_name), genre)| Artist {
            artist_id,
            artist_name,
            genre,
        })
        .collect();

    Ok(artists)
}

pub fn load_songs(path: &Path) -> crate::Result<SongTable> {
    let mut columns = vec![
        text("song_id"),
        text("title"),
        text("artist_id"),
        text("genre"),
        text("mood"),
    ];
    columns.extend(FEATURE_COLUMNS.iter().map(|&name| number(name)));
    let df = scan_csv(path, columns, &["song_id"])?;

    let n_songs = df.height();
    let feature_values = FEATURE_COLUMNS
        .iter()
        .map(|&name| float_column(&df, name))
        .collect::<crate::Result<Vec<_>>>()?;

    let mut raw = Vec::with_capacity(n_songs * FEATURE_COLUMNS.len());
    for row in 0..n_songs {
        raw.extend(feature_values.iter().map(|column| column[row]));
    }
    let features = Array2::from_shape_vec((n_songs, FEATURE_COLUMNS.len()), raw)?;

    Ok(SongTable {
        song_ids: string_column(&df, "song_id")?,
        titles: string_column(&df, "title")?,
        artist_ids: string_column(&df, "artist_id")?,
        genres: string_column(&df, "genre")?,
        moods: string_column(&df, "mood")?,
        features,
    })
}

pub fn load_song_interactions(path: &Path) -> crate::Result<Vec<SongInteraction>> {
    let df = scan_csv(
        path,
        [text("user_id"), text("song_id"), text("liked"), count("play_count")],
        &["user_id", "song_id"],
    )?;

    let interactions = string_column(&df, "user_id")?
        .into_iter()
        .zip(string_column(&df, "song_id")?)
        .zip(string_column(&df, "liked")?)
        .zip(int_column(&df, "play_count")?)
        .map(|(((user_id, song_id), liked), play_count)| SongInteraction {
            user_id,
            song_id,
            liked: parse_flag(&liked),
            play_count,
        })
        .collect();

    Ok(interactions)
}

pub fn load_artist_interactions(path: &Path) -> crate::Result<Vec<ArtistInteraction>> {
    let df = scan_csv(
        path,
        [text("user_id"), text("artist_id"), count("play_count")],
        &["user_id", "artist_id"],
    )?;

    let interactions = string_column(&df, "user_id")?
        .into_iter()
        .zip(string_column(&df, "artist_id")?)
        .zip(int_column(&df, "play_count")?)
        .map(|((user_id, artist_id), play_count)| ArtistInteraction {
            user_id,
            artist_id,
            play_count,
        })
        .collect();

    Ok(interactions)
}

/// Liked-song sets per user, in first-like order
pub fn liked_memberships(interactions: &[SongInteraction]) -> MembershipSet<String, String> {
    MembershipSet::from_interactions(
        interactions
            .iter()
            .map(|i| (i.user_id.clone(), i.song_id.clone(), i.liked)),
    )
}

/// Accepts `true`, `True` and `1` as a positive flag
fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "True" | "1")
}

fn text(name: &str) -> Expr {
    col(name).cast(DataType::String)
}

fn number(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

fn count(name: &str) -> Expr {
    col(name).cast(DataType::Int64)
}

/// Scan a CSV file lazily, casting the selected columns and dropping rows
/// whose `ids` columns are null
fn scan_csv(path: &Path, columns: impl AsRef<[Expr]>, ids: &[&str]) -> crate::Result<DataFrame> {
    if !path.exists() {
        anyhow::bail!("Dataset file not found: {}", path.display());
    }

    let df = LazyCsvReader::new(path)
        .finish()?
        .select(columns)
        .drop_nulls(Some(ids.iter().map(|&name| col(name)).collect()))
        .collect()?;

    debug!(path = %path.display(), rows = df.height(), "scanned csv");
    Ok(df)
}

pub(crate) fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<String>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or_default().trim().to_string())
        .collect())
}

pub(crate) fn float_column(df: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    Ok(df
        .column(name)?
        .f64()?
        .into_iter()
        .map(|value| value.unwrap_or(0.0))
        .collect())
}

pub(crate) fn int_column(df: &DataFrame, name: &str) -> crate::Result<Vec<i64>> {
    Ok(df
        .column(name)?
        .i64()?
        .into_iter()
        .map(|value| value.unwrap_or(0))
        .collect())
}
