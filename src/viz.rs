//! Visualization functions using Plotters for interaction graphs and communities

use crate::bipartite::{self, BipartiteGraph};
use crate::community::{partition_memberships, CommunityPartitioner};
use crate::data::{Dataset, SongTable};
use crate::layout::{self, Point};
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const USER_SONG_FILE: &str = "user_song_bipartite.png";
const SIMILARITY_FILE: &str = "user_similarity_graph.png";
const USER_ARTIST_FILE: &str = "user_artist_bipartite.png";
const COMMUNITIES_FILE: &str = "taste_communities.png";
const SCATTER_FILE: &str = "song_feature_scatter.png";

const CANVAS: (u32, u32) = (1600, 1200);
const LABEL_FONT: (&str, u32) = ("sans-serif", 14);

const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
const LIGHT_CORAL: RGBColor = RGBColor(240, 128, 128);
const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
const GRAY: RGBColor = RGBColor(128, 128, 128);
const PURPLE: RGBColor = RGBColor(128, 0, 128);

/// Knobs for the plot set
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    /// Minimum Jaccard score for the similarity graph
    pub similarity_threshold: f64,
    /// Minimum Jaccard score for community membership
    pub community_threshold: f64,
    pub max_song_users: usize,
    pub max_songs: usize,
    pub max_artist_users: usize,
    pub max_artists: usize,
    /// Number of songs labelled in the feature scatter
    pub scatter_labels: usize,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.2,
            community_threshold: 0.3,
            max_song_users: 10,
            max_songs: 20,
            max_artist_users: 12,
            max_artists: 15,
            scatter_labels: 15,
        }
    }
}

struct Node {
    position: Point,
    label: String,
    color: RGBColor,
    radius: u32,
}

struct Link {
    from: Point,
    to: Point,
    width: u32,
    color: RGBColor,
}

/// Nodes drawn as one series, optionally named in the legend
struct NodeGroup {
    name: Option<String>,
    nodes: Vec<Node>,
}

/// Render every plot into `output_dir`, returning the files written
pub fn generate_visualization_report(
    dataset: &Dataset,
    settings: &PlotSettings,
    output_dir: &Path,
) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let path = output_dir.join(USER_SONG_FILE);
    let graph = bipartite::user_song_graph(
        &dataset.users,
        &dataset.song_interactions,
        settings.max_song_users,
        settings.max_songs,
    )?;
    create_user_song_bipartite(&graph, &dataset.songs, &path)?;
    written.push(path);

    let liked = dataset.liked_songs();

    let path = output_dir.join(SIMILARITY_FILE);
    let similarity = partition_memberships(&liked, settings.similarity_threshold)?;
    if create_similarity_graph(&similarity, &path)? {
        written.push(path);
    }

    let path = output_dir.join(USER_ARTIST_FILE);
    let graph = bipartite::user_artist_graph(
        &dataset.users,
        &dataset.artist_interactions,
        settings.max_artist_users,
        settings.max_artists,
    )?;
    let artist_names: HashMap<&str, &str> = dataset
        .artists
        .iter()
        .map(|a| (a.artist_id.as_str(), a.artist_name.as_str()))
        .collect();
    create_user_artist_bipartite(&graph, &artist_names, &path)?;
    written.push(path);

    let path = output_dir.join(COMMUNITIES_FILE);
    let communities = partition_memberships(&liked, settings.community_threshold)?;
    create_community_visualization(&communities, &path)?;
    print_community_statistics(&communities);
    written.push(path);

    let path = output_dir.join(SCATTER_FILE);
    if create_feature_scatter(&dataset.songs, settings.scatter_labels, &path)? {
        written.push(path);
    }

    Ok(written)
}

/// Users in a left column, songs in a right column, liked links weighted by play count
pub fn create_user_song_bipartite(
    graph: &BipartiteGraph,
    songs: &SongTable,
    output_path: &Path,
) -> crate::Result<()> {
    let (user_points, song_points) = layout::two_column(graph.left.len(), graph.right.len(), 2.0, 1.5);

    let users = NodeGroup {
        name: Some("Users".to_string()),
        nodes: column_nodes(&graph.left, &user_points, LIGHT_BLUE, 16, |id| id.to_string()),
    };
    let songs_group = NodeGroup {
        name: Some("Songs".to_string()),
        nodes: column_nodes(&graph.right, &song_points, LIGHT_CORAL, 14, |id| {
            songs
                .title_of(id)
                .map(|title| truncate_label(title, 15))
                .unwrap_or_else(|| id.to_string())
        }),
    };

    let max_weight = graph.max_weight().max(1.0);
    let links = bipartite_links(graph, &user_points, &song_points, GRAY, |w| 3.0 * w / max_weight);

    render_network(
        output_path,
        "User-Song Bipartite Graph (Users left, Songs right)",
        &[users, songs_group],
        &links,
    )
}

/// Users against artists, link width from per-user normalized play counts
pub fn create_user_artist_bipartite(
    graph: &BipartiteGraph,
    artist_names: &HashMap<&str, &str>,
    output_path: &Path,
) -> crate::Result<()> {
    let (user_points, artist_points) = layout::two_column(graph.left.len(), graph.right.len(), 2.0, 2.0);

    let users = NodeGroup {
        name: Some("Users".to_string()),
        nodes: column_nodes(&graph.left, &user_points, SKY_BLUE, 16, |id| id.to_string()),
    };
    let artists = NodeGroup {
        name: Some("Artists".to_string()),
        nodes: column_nodes(&graph.right, &artist_points, LIGHT_GREEN, 16, |id| {
            artist_names
                .get(id)
                .map(|name| name.chars().take(12).collect())
                .unwrap_or_else(|| id.to_string())
        }),
    };

    let links = bipartite_links(graph, &user_points, &artist_points, PURPLE, |w| 4.0 * w);

    render_network(
        output_path,
        "User-Artist Bipartite Graph (Edge width = normalized play count)",
        &[users, artists],
        &links,
    )
}

/// User-user similarity graph, nodes colored by degree.
///
/// Returns `false` without writing anything when no pair passed the threshold.
pub fn create_similarity_graph(
    partitioner: &CommunityPartitioner<String>,
    output_path: &Path,
) -> crate::Result<bool> {
    if partitioner.edges().is_empty() {
        warn!("no similarities found above threshold, skipping similarity graph");
        return Ok(false);
    }

    let entities = partitioner.entities();
    let points = layout::circular(entities.len(), 10.0);
    let position: HashMap<&str, Point> = entities
        .iter()
        .map(String::as_str)
        .zip(points.iter().copied())
        .collect();

    let degrees = entities
        .iter()
        .map(|e| partitioner.degree(e))
        .collect::<Result<Vec<_>, _>>()?;
    let max_degree = degrees.iter().copied().max().unwrap_or(0).max(1);

    let nodes = entities
        .iter()
        .zip(points.iter())
        .zip(degrees.iter())
        .map(|((entity, &point), &degree)| Node {
            position: point,
            label: entity.clone(),
            color: heat_color(degree as f64 / max_degree as f64),
            radius: 14,
        })
        .collect();

    let links: Vec<Link> = partitioner
        .edges()
        .iter()
        .map(|edge| Link {
            from: position[edge.source.as_str()],
            to: position[edge.target.as_str()],
            width: stroke(5.0 * edge.weight),
            color: GRAY,
        })
        .collect();

    render_network(
        output_path,
        "User-User Similarity Graph (Edge width = Jaccard similarity)",
        &[NodeGroup { name: None, nodes }],
        &links,
    )?;

    Ok(true)
}

/// Nodes grouped and colored by their union-find community
pub fn create_community_visualization(
    partitioner: &CommunityPartitioner<String>,
    output_path: &Path,
) -> crate::Result<()> {
    let communities = partitioner.all_communities();
    let sizes: Vec<usize> = communities.iter().map(|c| c.members.len()).collect();
    let placements = layout::grouped_circular(&sizes);

    let mut position: HashMap<&str, Point> = HashMap::new();
    let mut nodes = Vec::with_capacity(partitioner.entities().len());

    for (idx, (community, points)) in communities.iter().zip(&placements).enumerate() {
        let color = palette_color(idx);
        for (member, &point) in community.members.iter().zip(points) {
            position.insert(member.as_str(), point);
            nodes.push(Node {
                position: point,
                label: member.clone(),
                color,
                radius: 16,
            });
        }
    }

    let links: Vec<Link> = partitioner
        .edges()
        .iter()
        .map(|edge| Link {
            from: position[edge.source.as_str()],
            to: position[edge.target.as_str()],
            width: stroke(3.0 * edge.weight),
            color: GRAY,
        })
        .collect();

    let title = format!(
        "Taste Communities (Union-Find): {} communities formed",
        communities.len()
    );

    render_network(output_path, &title, &[NodeGroup { name: None, nodes }], &links)
}

/// Energy against danceability, one colored series per genre.
///
/// Returns `false` without writing anything when there are no songs.
pub fn create_feature_scatter(
    songs: &SongTable,
    label_count: usize,
    output_path: &Path,
) -> crate::Result<bool> {
    if songs.is_empty() {
        warn!("no songs loaded, skipping feature scatter");
        return Ok(false);
    }

    let energy = songs.features.column(1).to_vec();
    let danceability = songs.features.column(2).to_vec();
    let points: Vec<Point> = energy.iter().copied().zip(danceability.iter().copied()).collect();
    let (x_range, y_range) = layout::padded_bounds(&points, 0.05);

    let mut genres: Vec<&str> = Vec::new();
    for genre in &songs.genres {
        if !genres.contains(&genre.as_str()) {
            genres.push(genre);
        }
    }

    let root = BitMapBackend::new(output_path, (1400, 1000)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Song Feature Space: Energy vs Danceability by Genre", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Energy")
        .y_desc("Danceability")
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    for (idx, genre) in genres.iter().enumerate() {
        let color = palette_color(idx);
        let genre_points = points
            .iter()
            .zip(&songs.genres)
            .filter(|(_, g)| g.as_str() == *genre)
            .map(|(&p, _)| Circle::new(p, 8, color.mix(0.7).filled()));

        chart
            .draw_series(genre_points)?
            .label(genre.to_string())
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    chart.draw_series(
        points
            .iter()
            .zip(&songs.titles)
            .take(label_count)
            .map(|(&p, title)| Text::new(truncate_label(title, 15), p, LABEL_FONT.into_font())),
    )?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!(path = %output_path.display(), "feature scatter saved");

    Ok(true)
}

/// Print community statistics to console
pub fn print_community_statistics(partitioner: &CommunityPartitioner<String>) {
    let communities = partitioner.all_communities();
    let total = partitioner.entities().len();

    println!("\n=== Taste Communities ===");
    println!("Users: {}", total);
    println!("Accepted similarity edges: {}", partitioner.edges().len());
    println!("Communities: {}", communities.len());

    for community in &communities {
        let percentage = (community.members.len() as f64 / total.max(1) as f64) * 100.0;
        println!(
            "  {:>8}: {} users ({:.1}%)",
            community.representative,
            community.members.len(),
            percentage
        );
    }
}

fn render_network(
    output_path: &Path,
    title: &str,
    groups: &[NodeGroup],
    links: &[Link],
) -> crate::Result<()> {
    let points: Vec<Point> = groups
        .iter()
        .flat_map(|g| g.nodes.iter().map(|n| n.position))
        .collect();
    let (x_range, y_range) = layout::padded_bounds(&points, 1.0);

    let root = BitMapBackend::new(output_path, CANVAS).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(20)
        .build_cartesian_2d(x_range, y_range)?;

    chart.draw_series(links.iter().map(|link| {
        PathElement::new(vec![link.from, link.to], link.color.mix(0.4).stroke_width(link.width))
    }))?;

    let mut has_legend = false;
    for group in groups {
        let series = chart.draw_series(
            group
                .nodes
                .iter()
                .map(|node| Circle::new(node.position, node.radius, node.color.mix(0.9).filled())),
        )?;

        if let (Some(name), Some(first)) = (&group.name, group.nodes.first()) {
            let color = first.color;
            series
                .label(name.clone())
                .legend(move |(x, y)| Circle::new((x, y), 6, color.filled()));
            has_legend = true;
        }
    }

    chart.draw_series(groups.iter().flat_map(|g| &g.nodes).map(|node| {
        Text::new(node.label.clone(), node.position, LABEL_FONT.into_font())
    }))?;

    if has_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    info!(path = %output_path.display(), "graph saved");

    Ok(())
}

fn column_nodes(
    ids: &[String],
    points: &[Point],
    color: RGBColor,
    radius: u32,
    label: impl Fn(&str) -> String,
) -> Vec<Node> {
    ids.iter()
        .zip(points)
        .map(|(id, &position)| Node {
            position,
            label: label(id),
            color,
            radius,
        })
        .collect()
}

fn bipartite_links(
    graph: &BipartiteGraph,
    left: &[Point],
    right: &[Point],
    color: RGBColor,
    width: impl Fn(f64) -> f64,
) -> Vec<Link> {
    graph
        .edges
        .iter()
        .map(|edge| Link {
            from: left[edge.left],
            to: right[edge.right],
            width: stroke(width(edge.weight)),
            color,
        })
        .collect()
}

/// Pixel stroke width, never thinner than one pixel
fn stroke(width: f64) -> u32 {
    (width.round() as u32).max(1)
}

/// Yellow-to-red ramp for `t` in `[0, 1]`
fn heat_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |from: u8, to: u8| (from as f64 + (to as f64 - from as f64) * t).round() as u8;
    RGBColor(lerp(255, 189), lerp(237, 0), lerp(160, 38))
}

fn palette_color(idx: usize) -> RGBColor {
    let (r, g, b) = Palette99::pick(idx).to_backend_color().rgb;
    RGBColor(r, g, b)
}

/// Shorten to `max` characters, appending `...` when cut
fn truncate_label(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Artist, ArtistInteraction, SongInteraction, User};
    use crate::similarity::MembershipSet;
    use tempfile::tempdir;

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Short", 15), "Short");
        assert_eq!(
            truncate_label("A Very Long Song Title", 15),
            "A Very Long Son..."
        );
    }

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(0.0), RGBColor(255, 237, 160));
        assert_eq!(heat_color(1.0), RGBColor(189, 0, 38));
        assert_eq!(heat_color(7.0), heat_color(1.0));
    }

    #[test]
    fn test_stroke_minimum() {
        assert_eq!(stroke(0.1), 1);
        assert_eq!(stroke(2.6), 3);
    }

    #[test]
    fn test_similarity_graph_skipped_without_edges() {
        let memberships: MembershipSet<String, String> = [
            ("U1".to_string(), vec!["S1".to_string()]),
            ("U2".to_string(), vec!["S2".to_string()]),
        ]
        .into_iter()
        .collect();
        let partitioner = partition_memberships(&memberships, 0.2).unwrap();

        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(SIMILARITY_FILE);

        let drawn = create_similarity_graph(&partitioner, &output_path).unwrap();
        assert!(!drawn);
        assert!(!output_path.exists());
    }

    fn empty_songs() -> SongTable {
        SongTable {
            song_ids: Vec::new(),
            titles: Vec::new(),
            artist_ids: Vec::new(),
            genres: Vec::new(),
            moods: Vec::new(),
            features: ndarray::Array2::zeros((0, 4)),
        }
    }

    fn create_test_data() -> Dataset {
        let users = ["U1", "U2", "U3"]
            .iter()
            .map(|id| User {
                user_id: id.to_string(),
                username: format!("listener_{id}"),
            })
            .collect();

        let artists = vec![
            Artist {
                artist_id: "A1".to_string(),
                artist_name: "Night Drive Collective".to_string(),
                genre: "Synthwave".to_string(),
            },
            Artist {
                artist_id: "A2".to_string(),
                artist_name: "Quartet".to_string(),
                genre: "Classical".to_string(),
            },
        ];

        let songs = SongTable {
            song_ids: vec!["S1".into(), "S2".into(), "S3".into(), "S9".into()],
            titles: vec![
                "Neon Skyline".into(),
                "Midnight Arcade Forever".into(),
                "Chrome Hearts".into(),
                "Adagio in Grey".into(),
            ],
            artist_ids: vec!["A1".into(), "A1".into(), "A1".into(), "A2".into()],
            genres: vec!["Synthwave".into(), "Synthwave".into(), "Synthwave".into(), "Classical".into()],
            moods: vec!["Upbeat".into(), "Energetic".into(), "Moody".into(), "Calm".into()],
            features: ndarray::Array2::from_shape_vec(
                (4, 4),
                vec![
                    118.0, 0.82, 0.74, 0.61, //
                    124.0, 0.88, 0.79, 0.55, //
                    110.0, 0.70, 0.66, 0.48, //
                    60.0, 0.12, 0.18, 0.25,
                ],
            )
            .unwrap(),
        };

        let listen = |user: &str, song: &str, liked: bool, plays: i64| SongInteraction {
            user_id: user.to_string(),
            song_id: song.to_string(),
            liked,
            play_count: plays,
        };
        let song_interactions = vec![
            listen("U1", "S1", true, 14),
            listen("U1", "S2", true, 9),
            listen("U2", "S2", true, 21),
            listen("U2", "S3", true, 5),
            listen("U3", "S9", true, 3),
            listen("U3", "S1", false, 1),
        ];

        let plays = |user: &str, artist: &str, count: i64| ArtistInteraction {
            user_id: user.to_string(),
            artist_id: artist.to_string(),
            play_count: count,
        };
        let artist_interactions = vec![plays("U1", "A1", 23), plays("U2", "A1", 26), plays("U3", "A2", 3)];

        Dataset {
            users,
            artists,
            songs,
            song_interactions,
            artist_interactions,
        }
    }

    #[test]
    fn test_create_user_song_bipartite() {
        let dataset = create_test_data();
        let graph = bipartite::user_song_graph(&dataset.users, &dataset.song_interactions, 10, 20).unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(USER_SONG_FILE);

        let result = create_user_song_bipartite(&graph, &dataset.songs, &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_create_user_artist_bipartite() {
        let dataset = create_test_data();
        let graph =
            bipartite::user_artist_graph(&dataset.users, &dataset.artist_interactions, 12, 15).unwrap();
        let names: HashMap<&str, &str> = dataset
            .artists
            .iter()
            .map(|a| (a.artist_id.as_str(), a.artist_name.as_str()))
            .collect();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(USER_ARTIST_FILE);

        let result = create_user_artist_bipartite(&graph, &names, &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_create_similarity_graph() {
        let dataset = create_test_data();
        let partitioner = partition_memberships(&dataset.liked_songs(), 0.2).unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(SIMILARITY_FILE);

        let drawn = create_similarity_graph(&partitioner, &output_path).unwrap();
        assert!(drawn);
        assert!(output_path.exists());
    }

    #[test]
    fn test_create_community_visualization() {
        let dataset = create_test_data();
        let partitioner = partition_memberships(&dataset.liked_songs(), 0.3).unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(COMMUNITIES_FILE);

        let result = create_community_visualization(&partitioner, &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_create_feature_scatter() {
        let dataset = create_test_data();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(SCATTER_FILE);

        let drawn = create_feature_scatter(&dataset.songs, 15, &output_path).unwrap();
        assert!(drawn);
        assert!(output_path.exists());
    }

    #[test]
    fn test_feature_scatter_skipped_without_songs() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join(SCATTER_FILE);

        let drawn = create_feature_scatter(&empty_songs(), 15, &output_path).unwrap();
        assert!(!drawn);
        assert!(!output_path.exists());
    }

    #[test]
    fn test_generate_visualization_report() {
        let dataset = create_test_data();
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("plots");

        let written = generate_visualization_report(&dataset, &PlotSettings::default(), &output_dir).unwrap();
        assert_eq!(written.len(), 5);
        assert!(written.iter().all(|path| path.exists()));
    }

    #[test]
    fn test_report_without_songs_still_succeeds() {
        let mut dataset = create_test_data();
        dataset.songs = empty_songs();
        let temp_dir = tempdir().unwrap();

        let written = generate_visualization_report(&dataset, &PlotSettings::default(), temp_dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(!temp_dir.path().join(SCATTER_FILE).exists());
    }
}
