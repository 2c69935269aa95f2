//! User-item bipartite graphs trimmed to a readable size for plotting

use crate::data::{float_column, int_column, string_column, ArtistInteraction, SongInteraction, User};
use polars::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct BipartiteEdge {
    /// Index into `BipartiteGraph::left`
    pub left: usize,
    /// Index into `BipartiteGraph::right`
    pub right: usize,
    pub weight: f64,
}

/// Users on the left, items on the right
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BipartiteGraph {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub edges: Vec<BipartiteEdge>,
}

impl BipartiteGraph {
    pub fn max_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).fold(0.0, f64::max)
    }

    /// Link `(user, item, weight)` rows; a repeated pair keeps the last weight
    fn from_links(
        left: Vec<String>,
        right: Vec<String>,
        users: &[String],
        items: &[String],
        weights: &[f64],
    ) -> Self {
        let edges = {
            let left_index = index_of(&left);
            let right_index = index_of(&right);
            let mut slots: HashMap<(usize, usize), usize> = HashMap::new();
            let mut edges: Vec<BipartiteEdge> = Vec::new();

            for ((user, item), &weight) in users.iter().zip(items).zip(weights) {
                let (Some(&l), Some(&r)) =
                    (left_index.get(user.as_str()), right_index.get(item.as_str()))
                else {
                    continue;
                };
                match slots.get(&(l, r)) {
                    Some(&slot) => edges[slot].weight = weight,
                    None => {
                        slots.insert((l, r), edges.len());
                        edges.push(BipartiteEdge { left: l, right: r, weight });
                    }
                }
            }
            edges
        };

        Self { left, right, edges }
    }
}

/// First `max_users` users against their `max_songs` most interacted songs.
///
/// Only liked interactions become edges, weighted by play count. Every
/// interaction (liked or not) counts toward picking the top songs.
pub fn user_song_graph(
    users: &[User],
    interactions: &[SongInteraction],
    max_users: usize,
    max_songs: usize,
) -> crate::Result<BipartiteGraph> {
    let left = first_user_ids(users, max_users);

    let frame = df!(
        "user_id" => interactions.iter().map(|i| i.user_id.as_str()).collect::<Vec<_>>(),
        "song_id" => interactions.iter().map(|i| i.song_id.as_str()).collect::<Vec<_>>(),
        "liked" => interactions.iter().map(|i| i.liked).collect::<Vec<_>>(),
        "play_count" => interactions.iter().map(|i| i.play_count).collect::<Vec<_>>(),
    )?
    .lazy()
    .filter(member_of("user_id", &left));

    let right = top_items(frame.clone(), "song_id", max_songs)?;

    let liked = frame
        .filter(col("liked").and(member_of("song_id", &right)))
        .collect()?;
    let weights: Vec<f64> = int_column(&liked, "play_count")?
        .into_iter()
        .map(|plays| plays as f64)
        .collect();

    Ok(BipartiteGraph::from_links(
        left,
        right,
        &string_column(&liked, "user_id")?,
        &string_column(&liked, "song_id")?,
        &weights,
    ))
}

/// First `max_users` users against their `max_artists` most listened artists.
///
/// Edge weights are play counts divided by each user's largest play count
/// among the kept artists, so every user's strongest link has weight 1.0.
pub fn user_artist_graph(
    users: &[User],
    interactions: &[ArtistInteraction],
    max_users: usize,
    max_artists: usize,
) -> crate::Result<BipartiteGraph> {
    let left = first_user_ids(users, max_users);

    let frame = df!(
        "user_id" => interactions.iter().map(|i| i.user_id.as_str()).collect::<Vec<_>>(),
        "artist_id" => interactions.iter().map(|i| i.artist_id.as_str()).collect::<Vec<_>>(),
        "play_count" => interactions.iter().map(|i| i.play_count).collect::<Vec<_>>(),
    )?
    .lazy()
    .filter(member_of("user_id", &left));

    let right = top_items(frame.clone(), "artist_id", max_artists)?;

    let kept = frame.filter(member_of("artist_id", &right));
    let max_plays = kept
        .clone()
        .group_by([col("user_id")])
        .agg([col("play_count").max().alias("max_plays")]);

    let divisor = when(col("max_plays").gt(lit(0)))
        .then(col("max_plays"))
        .otherwise(lit(1))
        .cast(DataType::Float64);

    let weighted = kept
        .left_join(max_plays, col("user_id"), col("user_id"))
        .with_column((col("play_count").cast(DataType::Float64) / divisor).alias("weight"))
        .collect()?;

    Ok(BipartiteGraph::from_links(
        left,
        right,
        &string_column(&weighted, "user_id")?,
        &string_column(&weighted, "artist_id")?,
        &float_column(&weighted, "weight")?,
    ))
}

/// `limit` most frequent values of `column`, ties keeping first appearance
fn top_items(frame: LazyFrame, column: &str, limit: usize) -> crate::Result<Vec<String>> {
    let counts = frame
        .group_by_stable([col(column)])
        .agg([len().alias("interactions")])
        .sort(
            ["interactions"],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(limit as IdxSize)
        .collect()?;

    string_column(&counts, column)
}

fn member_of(column: &str, values: &[String]) -> Expr {
    col(column).is_in(lit(Series::new("members", values)))
}

fn first_user_ids(users: &[User], max_users: usize) -> Vec<String> {
    users
        .iter()
        .take(max_users)
        .map(|u| u.user_id.clone())
        .collect()
}

fn index_of(ids: &[String]) -> HashMap<&str, usize> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect()
}
