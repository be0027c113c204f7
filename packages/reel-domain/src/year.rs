/// Closed year range extracted from query text. Both bounds are inclusive;
/// "before 1995" stores an end of 1994.
///
/// A range whose start exceeds its end (e.g. "after 2050 before 2000") is
/// kept exactly as extracted with `contradictory` set. Downstream filtering
/// skips contradictory ranges instead of guessing the intended bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct YearRange {
	pub start: Option<i32>,
	pub end: Option<i32>,
	pub contradictory: bool,
}

const MIN_YEAR: i32 = 1888;
const MAX_YEAR: i32 = 2100;

impl YearRange {
	pub fn contains(&self, year: i32) -> bool {
		if let Some(start) = self.start
			&& year < start
		{
			return false;
		}
		if let Some(end) = self.end
			&& year > end
		{
			return false;
		}

		true
	}
}

/// Extracts the first year constraint of each kind from `text` and returns
/// the text with the consumed words removed. The first mention wins per
/// bound; a later mention of the same bound is left in the text untouched.
pub fn extract_years(text: &str) -> (String, Option<YearRange>) {
	let words: Vec<&str> = text.split_whitespace().collect();
	let mut consumed = vec![false; words.len()];
	let mut start: Option<i32> = None;
	let mut end: Option<i32> = None;

	let mut idx = 0;

	while idx < words.len() {
		let word = words[idx];

		match word {
			"after" | "since" | "from" =>
				if start.is_none()
					&& let Some(year) = words.get(idx + 1).and_then(|next| parse_year(next))
				{
					start = Some(year);
					consumed[idx] = true;
					consumed[idx + 1] = true;
					idx += 2;

					continue;
				},
			"before" =>
				if end.is_none()
					&& let Some(year) = words.get(idx + 1).and_then(|next| parse_year(next))
				{
					end = Some(year - 1);
					consumed[idx] = true;
					consumed[idx + 1] = true;
					idx += 2;

					continue;
				},
			_ => {
				if start.is_none()
					&& end.is_none()
					&& let Some((decade_start, decade_end)) = parse_decade(word)
				{
					start = Some(decade_start);
					end = Some(decade_end);
					consumed[idx] = true;
					idx += 1;

					continue;
				}
				if start.is_none()
					&& end.is_none()
					&& let Some((range_start, range_end)) = parse_range(word)
				{
					start = Some(range_start);
					end = Some(range_end);
					consumed[idx] = true;
					idx += 1;

					continue;
				}
				if start.is_none()
					&& end.is_none()
					&& let Some(year) = parse_year(word)
				{
					start = Some(year);
					end = Some(year);
					consumed[idx] = true;
					idx += 1;

					continue;
				}
			},
		}

		idx += 1;
	}

	if start.is_none() && end.is_none() {
		return (text.to_string(), None);
	}

	let contradictory = matches!((start, end), (Some(s), Some(e)) if s > e);
	let remaining: Vec<&str> = words
		.iter()
		.zip(consumed.iter())
		.filter(|(_, used)| !**used)
		.map(|(word, _)| *word)
		.collect();

	(remaining.join(" "), Some(YearRange { start, end, contradictory }))
}

fn parse_year(word: &str) -> Option<i32> {
	if word.len() != 4 || !word.bytes().all(|byte| byte.is_ascii_digit()) {
		return None;
	}

	let year: i32 = word.parse().ok()?;

	(MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}

fn parse_decade(word: &str) -> Option<(i32, i32)> {
	let base = word.strip_suffix('s')?;
	let year = parse_year(base)?;

	(year % 10 == 0).then_some((year, year + 9))
}

fn parse_range(word: &str) -> Option<(i32, i32)> {
	let (left, right) = word.split_once('-')?;
	let start = parse_year(left)?;
	let end = parse_year(right)?;

	Some((start, end))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_decade() {
		let (rest, range) = extract_years("action 1990s");

		assert_eq!(rest, "action");
		assert_eq!(range, Some(YearRange { start: Some(1990), end: Some(1999), contradictory: false }));
	}

	#[test]
	fn extracts_open_bounds() {
		let (rest, range) = extract_years("thriller after 2000");

		assert_eq!(rest, "thriller");
		assert_eq!(range, Some(YearRange { start: Some(2000), end: None, contradictory: false }));

		let (rest, range) = extract_years("drama before 1995");

		assert_eq!(rest, "drama");
		assert_eq!(range, Some(YearRange { start: None, end: Some(1994), contradictory: false }));
	}

	#[test]
	fn extracts_explicit_range() {
		let (_, range) = extract_years("comedy 1990-2000");

		assert_eq!(range, Some(YearRange { start: Some(1990), end: Some(2000), contradictory: false }));
	}

	#[test]
	fn bare_year_is_exact() {
		let (rest, range) = extract_years("movies 1995");

		assert_eq!(rest, "movies");
		assert_eq!(range, Some(YearRange { start: Some(1995), end: Some(1995), contradictory: false }));
	}

	#[test]
	fn contradictory_range_is_flagged_not_corrected() {
		let (_, range) = extract_years("after 2050 before 2000");
		let range = range.expect("range should be extracted");

		assert_eq!(range.start, Some(2050));
		assert_eq!(range.end, Some(1999));
		assert!(range.contradictory);
	}

	#[test]
	fn non_year_numbers_pass_through() {
		let (rest, range) = extract_years("se7en 300");

		assert_eq!(rest, "se7en 300");
		assert_eq!(range, None);
	}
}
