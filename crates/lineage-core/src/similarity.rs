//! String primitives shared by the detectors.
//!
//! Everything here is deterministic and explainable: no phonetic encodings,
//! no learned weights. Normalised forms are grouping keys only and are never
//! written back to the graph.

/// Lower-case and collapse internal whitespace.
pub fn normalize_name(value: Option<&str>) -> String {
  value
    .unwrap_or_default()
    .split_whitespace()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join(" ")
}

/// `"given surname"` in normalised form.
pub fn normalize_full_name(given: Option<&str>, surname: Option<&str>) -> String {
  let given = normalize_name(given);
  let surname = normalize_name(surname);
  match (given.is_empty(), surname.is_empty()) {
    (true, _) => surname,
    (_, true) => given,
    _ => format!("{given} {surname}"),
  }
}

/// Normalised-ratio similarity in `[0, 1]`. Empty input scores zero.
pub fn similarity(a: &str, b: &str) -> f64 {
  if a.is_empty() || b.is_empty() {
    return 0.0;
  }
  strsim::normalized_levenshtein(a, b)
}

/// Word-level abbreviations expanded by [`normalize_place`].
const PLACE_ABBREVIATIONS: &[(&str, &str)] = &[
  ("st", "street"),
  ("mt", "mount"),
  ("ft", "fort"),
  ("co", "county"),
  ("twp", "township"),
  ("mass", "massachusetts"),
];

/// Grouping key for a place string.
///
/// Lower-cases, turns `;` and `|` into segment separators, strips other
/// punctuation, expands common abbreviations word by word, and re-joins
/// non-empty segments with `", "`.
pub fn normalize_place(value: Option<&str>) -> String {
  let Some(value) = value else { return String::new() };

  let lowered: String = value
    .to_lowercase()
    .chars()
    .map(|c| match c {
      ';' | '|' | ',' => ',',
      c if c.is_ascii_alphanumeric() => c,
      c if c.is_alphanumeric() => c,
      _ => ' ',
    })
    .collect();

  lowered
    .split(',')
    .map(|segment| {
      segment
        .split_whitespace()
        .map(|word| {
          PLACE_ABBREVIATIONS
            .iter()
            .find(|(abbr, _)| *abbr == word)
            .map_or(word, |(_, full)| full)
        })
        .collect::<Vec<_>>()
        .join(" ")
    })
    .filter(|segment| !segment.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

/// Grouping key for a media filename: lower-cased stem with punctuation
/// collapsed to single spaces.
pub fn normalize_filename(value: &str) -> String {
  let base = value
    .rsplit(|c: char| c == '/' || c == '\\')
    .next()
    .unwrap_or(value);
  let stem = match base.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 => stem,
    _ => base,
  };
  stem
    .to_lowercase()
    .split(|c: char| !c.is_alphanumeric())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// First plausible genealogical year (1500–2099) appearing as a run of
/// exactly four digits.
pub fn extract_year(value: Option<&str>) -> Option<i32> {
  let value = value?;
  value
    .split(|c: char| !c.is_ascii_digit())
    .filter(|run| run.len() == 4)
    .filter_map(|run| run.parse::<i32>().ok())
    .find(|year| (1500..=2099).contains(year))
}

/// Capitalise the first letter of every word-part, lower-casing the rest.
/// Hyphens and apostrophes start a new part (`o'brien` → `O'Brien`).
pub fn title_case(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  let mut at_start = true;
  for c in value.chars() {
    if c.is_alphabetic() {
      if at_start {
        out.extend(c.to_uppercase());
      } else {
        out.extend(c.to_lowercase());
      }
      at_start = false;
    } else {
      out.push(c);
      at_start = true;
    }
  }
  out
}

pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_are_lowercased_and_collapsed() {
    assert_eq!(normalize_name(Some("  John   PAUL ")), "john paul");
    assert_eq!(normalize_name(None), "");
    assert_eq!(normalize_full_name(None, Some("Sample")), "sample");
  }

  #[test]
  fn near_names_score_high() {
    let sim = similarity("john sample", "jon sample");
    assert!(sim > 0.9, "{sim}");
    assert_eq!(similarity("", "jon"), 0.0);
    assert!(similarity("john", "mary") < 0.5);
  }

  #[test]
  fn place_keys_expand_abbreviations() {
    assert_eq!(normalize_place(Some("Boston, Mass.")), "boston, massachusetts");
    assert_eq!(
      normalize_place(Some("boston; massachusetts")),
      "boston, massachusetts"
    );
    assert_eq!(normalize_place(Some("St. Louis,,  MO")), "street louis, mo");
    assert_eq!(normalize_place(None), "");
  }

  #[test]
  fn filename_key_drops_extension_and_punctuation() {
    assert_eq!(normalize_filename("photos/Grandma_1920.JPG"), "grandma 1920");
    assert_eq!(normalize_filename("grandma-1920.png"), "grandma 1920");
  }

  #[test]
  fn years_are_four_digit_runs_in_range() {
    assert_eq!(extract_year(Some("ABT 1881")), Some(1881));
    assert_eq!(extract_year(Some("3/4/1881")), Some(1881));
    assert_eq!(extract_year(Some("12345")), None);
    assert_eq!(extract_year(Some("1066")), None);
    assert_eq!(extract_year(None), None);
  }

  #[test]
  fn title_case_handles_compound_names() {
    assert_eq!(title_case("JOHN"), "John");
    assert_eq!(title_case("o'brien-smith"), "O'Brien-Smith");
    assert_eq!(title_case("mary ann"), "Mary Ann");
  }
}
