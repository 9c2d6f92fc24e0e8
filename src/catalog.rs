//! Anime catalog job: genre statistics over a JSON catalog
//!
//! This is a client of the engine, not part of it. It supplies the input
//! loader, the map and reduce functions, and the report formatting used by
//! the command-line binary.
//!
//! Records travel through the engine as `"Name|Rating|Genre1,Genre2"`
//! lines. The map function emits `(genre, "Name:Rating")` for every genre and
//! the reduce function turns a genre's values into `"count|avg|names"`.

use crate::error::{MapReduceError, MapReduceResult};
use crate::mapreduce::KeyValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One catalog entry as stored in the input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeRecord {
    pub name: String,
    pub rating: f64,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl AnimeRecord {
    /// Encode as a map input line
    pub fn to_input_line(&self) -> String {
        format!("{}|{:.1}|{}", self.name, self.rating, self.genres.join(","))
    }
}

/// Parse a JSON array of catalog entries
pub fn parse_records(json: &str) -> Result<Vec<AnimeRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Load a catalog file and encode every entry as a map input line
pub fn load_inputs(path: impl AsRef<Path>) -> MapReduceResult<Vec<String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| load_failed(path, e))?;
    let records = parse_records(&contents).map_err(|e| load_failed(path, e))?;
    debug!("Loaded {} records from {}", records.len(), path.display());

    Ok(records.iter().map(AnimeRecord::to_input_line).collect())
}

fn load_failed<E>(path: &Path, source: E) -> MapReduceError
where
    E: std::error::Error + Send + Sync + 'static,
{
    MapReduceError::InputLoadFailed {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

/// Map function: one `(genre, "Name:Rating")` pair per non-empty genre
///
/// Lines that do not have exactly three `|`-separated fields produce nothing.
pub fn genre_map(_document_id: &str, data: &str) -> Vec<KeyValue> {
    let parts: Vec<&str> = data.split('|').collect();
    let [name, rating, genres] = parts.as_slice() else {
        return Vec::new();
    };
    let value = format!("{}:{}", name.trim(), rating.trim());

    genres
        .trim()
        .split(',')
        .map(|genre| genre.trim().to_lowercase())
        .filter(|genre| !genre.is_empty())
        .map(|genre| KeyValue::new(genre, value.clone()))
        .collect()
}

/// Reduce function: `"count|average|name1,name2"` over parsable values
pub fn genre_reduce(_genre: &str, values: &[String]) -> String {
    let entries: Vec<(&str, f64)> = values
        .iter()
        .filter_map(|value| {
            let parts: Vec<&str> = value.split(':').collect();
            match parts.as_slice() {
                [name, rating] => rating.parse::<f64>().ok().map(|r| (*name, r)),
                _ => None,
            }
        })
        .collect();

    if entries.is_empty() {
        return format!("{}|{:.2}|", 0, 0.0);
    }

    let sum: f64 = entries.iter().map(|(_, rating)| rating).sum();
    let average = sum / entries.len() as f64;
    let names: Vec<&str> = entries.iter().map(|(name, _)| *name).collect();
    format!("{}|{:.2}|{}", entries.len(), average, names.join(","))
}

/// Aggregated statistics for one genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreSummary {
    pub genre: String,
    pub count: usize,
    pub avg_rating: f64,
    pub anime: Vec<String>,
}

impl GenreSummary {
    /// Parse one reduce output line, `"genre count|avg|names"`
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 3 {
            return None;
        }

        let head = parts[0].trim();
        let (genre, count) = head.rsplit_once(' ')?;
        let count = count.trim().parse().ok()?;
        let avg_rating = parts[1].trim().parse().ok()?;
        let anime = parts[2]
            .trim()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            genre: genre.trim().to_string(),
            count,
            avg_rating,
            anime,
        })
    }
}

/// Parse every partition blob into genre summaries sorted by genre
pub fn summarize<S: AsRef<str>>(outputs: &[S]) -> Vec<GenreSummary> {
    let mut summaries: Vec<GenreSummary> = outputs
        .iter()
        .flat_map(|blob| blob.as_ref().trim().lines())
        .filter(|line| !line.is_empty())
        .filter_map(GenreSummary::parse_line)
        .collect();
    summaries.sort_by(|a, b| a.genre.cmp(&b.genre));
    for summary in &mut summaries {
        summary.anime.sort();
    }
    summaries
}

/// Render summaries one per line for display
pub fn format_report(summaries: &[GenreSummary]) -> String {
    summaries
        .iter()
        .map(|s| {
            format!(
                "{}: {} anime, avg rating {:.2} - {}",
                s.genre,
                s.count,
                s.avg_rating,
                s.anime.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
