//! Fuzzy Search Engine.
//!
//! Scores storypoints against a free-text query with the skim fuzzy matcher
//! over their title and description. The query is split on whitespace; every
//! token has to match at least one field, and an item's score is the sum of
//! each token's best weighted field score.
//!
//! The corpus must already be restricted to one company. Nothing here looks
//! at `company_id`.

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use serde::Deserialize;

use crate::storypoint::Storypoint;

/// Tunables for [`search`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
  pub title_weight:       f64,
  pub description_weight: f64,
  /// Items scoring below this are dropped.
  pub min_score:          f64,
  pub limit:              Option<usize>,
}

impl Default for SearchOptions {
  fn default() -> Self {
    Self {
      title_weight:       1.0,
      description_weight: 0.5,
      min_score:          1.0,
      limit:              None,
    }
  }
}

/// A storypoint and its match score. Higher is better.
#[derive(Debug, Clone)]
pub struct RankedMatch<'a> {
  pub storypoint: &'a Storypoint,
  pub score:      f64,
}

/// Return the storypoints in `corpus` that match `query`, best match first.
///
/// A blank query matches nothing. Equal scores keep corpus order.
pub fn search<'a>(
  corpus: &'a [Storypoint],
  query: &str,
  options: &SearchOptions,
) -> Vec<RankedMatch<'a>> {
  let tokens: Vec<&str> = query.split_whitespace().collect();
  if tokens.is_empty() {
    return Vec::new();
  }

  let matcher = SkimMatcherV2::default().ignore_case();

  let mut matches: Vec<RankedMatch<'a>> = corpus
    .iter()
    .filter_map(|sp| {
      let score = score_item(&matcher, sp, &tokens, options)?;
      (score >= options.min_score).then_some(RankedMatch { storypoint: sp, score })
    })
    .collect();

  matches.sort_by(|a, b| b.score.total_cmp(&a.score));
  if let Some(limit) = options.limit {
    matches.truncate(limit);
  }
  matches
}

fn score_item(
  matcher: &SkimMatcherV2,
  sp: &Storypoint,
  tokens: &[&str],
  options: &SearchOptions,
) -> Option<f64> {
  let fields = [
    (sp.title.as_str(), options.title_weight),
    (sp.description.as_str(), options.description_weight),
  ];

  tokens.iter().try_fold(0.0, |total, token| {
    let best = fields
      .iter()
      .filter_map(|(text, weight)| {
        matcher
          .fuzzy_match(text, token)
          .map(|s| s as f64 * weight)
      })
      .reduce(f64::max)?;
    Some(total + best)
  })
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::geo::Coords;

  fn sp(title: &str, description: &str) -> Storypoint {
    Storypoint {
      id:          Uuid::new_v4(),
      company_id:  Uuid::nil(),
      created_by:  Uuid::nil(),
      coords:      Coords::new(0.0, 0.0).unwrap(),
      title:       title.into(),
      description: description.into(),
      history:     vec![],
      file_ids:    vec![],
      created_at:  Utc::now(),
    }
  }

  fn titles<'a>(ms: &[RankedMatch<'a>]) -> Vec<&'a str> {
    ms.iter().map(|m| m.storypoint.title.as_str()).collect()
  }

  #[test]
  fn blank_query_matches_nothing() {
    let corpus = [sp("Alpha Base", ""), sp("Beta Camp", "")];
    let opts = SearchOptions::default();
    assert!(search(&corpus, "", &opts).is_empty());
    assert!(search(&corpus, "   ", &opts).is_empty());
  }

  #[test]
  fn unrelated_items_are_excluded() {
    let corpus = [sp("Alpha Base", "north ridge"), sp("Lighthouse", "harbour")];
    let result = search(&corpus, "alpha", &SearchOptions::default());
    assert_eq!(titles(&result), ["Alpha Base"]);
  }

  #[test]
  fn partial_terms_match() {
    let corpus = [sp("Old Mill", "grain storage by the river")];
    let result = search(&corpus, "rvr", &SearchOptions::default());
    assert_eq!(result.len(), 1);
  }

  #[test]
  fn case_is_ignored() {
    let corpus = [sp("Alpha Base", "")];
    assert_eq!(search(&corpus, "ALPHA", &SearchOptions::default()).len(), 1);
  }

  #[test]
  fn every_token_must_match() {
    let corpus = [sp("Alpha Base", ""), sp("Alpha Ridge", "")];
    let result = search(&corpus, "alpha base", &SearchOptions::default());
    assert_eq!(titles(&result), ["Alpha Base"]);
  }

  #[test]
  fn tighter_match_ranks_first() {
    let corpus = [
      sp("Bridge over the mill race", ""),
      sp("Mill", ""),
    ];
    let result = search(&corpus, "mill", &SearchOptions::default());
    assert_eq!(result.len(), 2);
    assert!(result[0].score >= result[1].score);
    assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
  }

  #[test]
  fn title_outweighs_description() {
    let corpus = [sp("Quarry", "beacon tower"), sp("Beacon", "quarry road")];
    let result = search(&corpus, "beacon", &SearchOptions::default());
    assert_eq!(titles(&result), ["Beacon", "Quarry"]);
  }

  #[test]
  fn equal_scores_keep_corpus_order() {
    let corpus = [sp("Camp", "one"), sp("Camp", "two"), sp("Camp", "three")];
    let result = search(&corpus, "camp", &SearchOptions::default());
    let descs: Vec<_> = result.iter().map(|m| m.storypoint.description.as_str()).collect();
    assert_eq!(descs, ["one", "two", "three"]);
  }

  #[test]
  fn threshold_and_limit_apply() {
    let corpus = [sp("Camp", ""), sp("Camp", ""), sp("Camp", "")];
    let limited = SearchOptions { limit: Some(2), ..Default::default() };
    assert_eq!(search(&corpus, "camp", &limited).len(), 2);

    let strict = SearchOptions { min_score: f64::MAX, ..Default::default() };
    assert!(search(&corpus, "camp", &strict).is_empty());
  }
}
