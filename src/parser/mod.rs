//! Filename and path parsing: turns a path into a best-effort guess at the
//! media it names. Pure and synchronous — no catalog or filesystem access.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::catalog::entities::media_item::MediaType;

/// Result of parsing one path. `type_` drives whether the matcher creates a
/// movie, TV episode, or unknown item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMedia {
	pub media_type: MediaType,
	pub title: Option<String>,
	pub year: Option<i32>,
	pub season: Option<i32>,
	pub episode: Option<i32>,
}

const VIDEO_EXTENSIONS: &[&str] = &[
	"mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "ts", "m2ts", "vob",
];

static TV_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
	vec![
		// S01E02, s01e02
		Regex::new(r"(?i)^(.+?)[.\s_-]+S(\d{1,2})E(\d{1,2})").unwrap(),
		// 1x02, 01x02
		Regex::new(r"(?i)^(.+?)[.\s_-]+(\d{1,2})x(\d{1,2})").unwrap(),
		// Season 1 Episode 2
		Regex::new(r"(?i)^(.+?)[.\s_-]+Season\s*(\d{1,2})\s*Episode\s*(\d{1,2})").unwrap(),
		// S01.E02, S01-E02
		Regex::new(r"(?i)^(.+?)[.\s_-]+S(\d{1,2})[.\s_-]*E(\d{1,2})").unwrap(),
	]
});

static MOVIE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
	vec![
		// Movie Name (2020)
		Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap(),
		// Movie.Name.2020
		Regex::new(r"^(.+?)[.\s_-]+(\d{4})(?:[.\s_-]|$)").unwrap(),
	]
});

static SEASON_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^season\s*(\d+)").unwrap());
static STRIP_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^.]+$").unwrap());
static DOT_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._]").unwrap());

fn clean_title(title: &str) -> String {
	let spaced = DOT_UNDERSCORE.replace_all(title, " ");
	let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
	title_case(collapsed.trim())
}

/// Capitalize the first letter of each whitespace-separated word, matching
/// Python's `str.title()` closely enough for filename titles.
fn title_case(s: &str) -> String {
	s.split(' ')
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

/// Parse a bare filename (no directory component considered).
pub fn parse_filename(filename: &str) -> ParsedMedia {
	let name = STRIP_EXT.replace(filename, "");

	for pattern in TV_PATTERNS.iter() {
		if let Some(caps) = pattern.captures(&name) {
			let title = clean_title(&caps[1]);
			let season: i32 = caps[2].parse().unwrap_or(0);
			let episode: i32 = caps[3].parse().unwrap_or(0);
			return ParsedMedia {
				media_type: MediaType::TvEpisode,
				title: Some(title),
				season: Some(season),
				episode: Some(episode),
				..Default::default()
			};
		}
	}

	for pattern in MOVIE_PATTERNS.iter() {
		if let Some(caps) = pattern.captures(&name) {
			let title = clean_title(&caps[1]);
			if let Ok(year) = caps[2].parse::<i32>() {
				if (1900..=2100).contains(&year) {
					return ParsedMedia {
						media_type: MediaType::Movie,
						title: Some(title),
						year: Some(year),
						..Default::default()
					};
				}
			}
		}
	}

	ParsedMedia {
		media_type: MediaType::Unknown,
		title: Some(clean_title(&name)),
		..Default::default()
	}
}

/// Parse a full path, falling back to parent-directory hints (a `Season N`
/// folder) when the filename alone doesn't resolve to a known type.
pub fn parse_path(filepath: &str) -> ParsedMedia {
	let path = Path::new(filepath);
	let filename = path
		.file_name()
		.map(|f| f.to_string_lossy().into_owned())
		.unwrap_or_default();

	let mut result = parse_filename(&filename);

	if result.media_type == MediaType::Unknown {
		if let Some(parent) = path.parent() {
			if let Some(parent_name) = parent.file_name().map(|p| p.to_string_lossy().to_lowercase())
			{
				if let Some(caps) = SEASON_DIR.captures(&parent_name) {
					if let Ok(season) = caps[1].parse::<i32>() {
						result.season = Some(season);
						result.media_type = MediaType::TvEpisode;
						if let Some(grandparent) = parent.parent().and_then(|p| p.file_name()) {
							result.title = Some(clean_title(&grandparent.to_string_lossy()));
						}
					}
				}
			}
		}
	}

	result
}

/// Extension-based video file check — the matcher only links video files
/// into media items.
pub fn is_video_file(filepath: &str) -> bool {
	Path::new(filepath)
		.extension()
		.map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str()))
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_standard_tv_pattern() {
		let parsed = parse_filename("Breaking.Bad.S01E02.720p.mkv");
		assert_eq!(parsed.media_type, MediaType::TvEpisode);
		assert_eq!(parsed.title.as_deref(), Some("Breaking Bad"));
		assert_eq!(parsed.season, Some(1));
		assert_eq!(parsed.episode, Some(2));
	}

	#[test]
	fn parses_alternate_episode_pattern() {
		let parsed = parse_filename("The.Office.1x02.mkv");
		assert_eq!(parsed.media_type, MediaType::TvEpisode);
		assert_eq!(parsed.season, Some(1));
		assert_eq!(parsed.episode, Some(2));
	}

	#[test]
	fn parses_movie_with_year_in_parens() {
		let parsed = parse_filename("The Matrix (1999).mp4");
		assert_eq!(parsed.media_type, MediaType::Movie);
		assert_eq!(parsed.title.as_deref(), Some("The Matrix"));
		assert_eq!(parsed.year, Some(1999));
	}

	#[test]
	fn parses_movie_with_dotted_year() {
		let parsed = parse_filename("Inception.2010.1080p.BluRay.mkv");
		assert_eq!(parsed.media_type, MediaType::Movie);
		assert_eq!(parsed.title.as_deref(), Some("Inception"));
		assert_eq!(parsed.year, Some(2010));
	}

	#[test]
	fn rejects_year_outside_sane_range() {
		let parsed = parse_filename("Console.9999.Archive.mkv");
		assert_eq!(parsed.media_type, MediaType::Unknown);
	}

	#[test]
	fn falls_back_to_unknown_with_cleaned_title() {
		let parsed = parse_filename("random_home_video.mp4");
		assert_eq!(parsed.media_type, MediaType::Unknown);
		assert_eq!(parsed.title.as_deref(), Some("Random Home Video"));
	}

	#[test]
	fn infers_season_from_parent_directory() {
		let parsed = parse_path("/media/TV/The Wire/Season 3/episode04.mkv");
		assert_eq!(parsed.media_type, MediaType::TvEpisode);
		assert_eq!(parsed.season, Some(3));
		assert_eq!(parsed.title.as_deref(), Some("The Wire"));
	}

	#[test]
	fn recognizes_video_extensions_case_insensitively() {
		assert!(is_video_file("movie.MKV"));
		assert!(is_video_file("clip.mp4"));
		assert!(!is_video_file("poster.jpg"));
		assert!(!is_video_file("no_extension"));
	}
}
