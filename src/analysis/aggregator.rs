//! Answer aggregation and statistics.
//!
//! This module turns raw per-response answer maps into per-question count
//! distributions. Everything here is a pure function of its inputs.

use crate::models::{
    scale_label, AnswerValue, Bucket, Distribution, Question, QuestionType, Survey, SurveyResponse,
};
use std::collections::HashMap;
use tracing::debug;

/// Aggregate every quantitative question of a survey, in display order.
///
/// `responses` is the full response set of that survey.
pub fn aggregate_survey(survey: &Survey, responses: &[SurveyResponse]) -> Vec<Distribution> {
    survey
        .quantitative_questions()
        .filter_map(|q| distribution(q, responses))
        .collect()
}

/// Count the answers given to one question.
///
/// Returns `None` for free-text questions, which are never aggregated.
/// Choice labels keep the order of their first appearance; scale labels are
/// sorted by ascending numeric value.
pub fn distribution(question: &Question, responses: &[SurveyResponse]) -> Option<Distribution> {
    if !question.kind.is_quantitative() {
        return None;
    }

    let mut counter = Counter::default();
    let mut respondents = 0;

    for response in responses {
        let Some(answer) = response.answers.get(&question.id) else {
            continue;
        };

        match (question.kind, answer) {
            (QuestionType::Radio, AnswerValue::Text(label)) => {
                counter.bump(label.clone(), None);
            }
            (QuestionType::Scale, AnswerValue::Number(value)) => {
                counter.bump(scale_label(*value), Some(*value));
            }
            (QuestionType::Checkbox, AnswerValue::Labels(labels)) => {
                for label in labels {
                    counter.bump(label.clone(), None);
                }
            }
            (kind, other) => {
                debug!(
                    "Skipping {} answer to {} question {} in response {}",
                    other.shape(),
                    kind,
                    question.id,
                    response.id
                );
                continue;
            }
        }

        respondents += 1;
    }

    let mut buckets = counter.buckets;
    if question.kind == QuestionType::Scale {
        buckets.sort_by(|a, b| a.1.total_cmp(&b.1));
    }

    Some(Distribution {
        question_id: question.id.clone(),
        question_text: question.text.clone(),
        kind: question.kind,
        buckets: buckets.into_iter().map(|(bucket, _)| bucket).collect(),
        respondents,
    })
}

/// Insertion-ordered label counter. Scale buckets remember their value for sorting.
#[derive(Default)]
struct Counter {
    buckets: Vec<(Bucket, f64)>,
    index: HashMap<String, usize>,
}

impl Counter {
    fn bump(&mut self, label: String, value: Option<f64>) {
        if let Some(&i) = self.index.get(&label) {
            self.buckets[i].0.count += 1;
            return;
        }
        self.index.insert(label.clone(), self.buckets.len());
        self.buckets
            .push((Bucket { label, count: 1 }, value.unwrap_or(0.0)));
    }
}

/// The most frequent label of a distribution (first one wins on ties).
pub fn most_common(dist: &Distribution) -> Option<&Bucket> {
    dist.buckets
        .iter()
        .fold(None, |best: Option<&Bucket>, b| match best {
            Some(top) if top.count >= b.count => Some(top),
            _ => Some(b),
        })
}

/// Mean of a scale question's answers, weighted by count.
pub fn scale_mean(dist: &Distribution) -> Option<f64> {
    if dist.kind != QuestionType::Scale || dist.respondents == 0 {
        return None;
    }
    let sum: f64 = dist
        .buckets
        .iter()
        .filter_map(|b| b.label.parse::<f64>().ok().map(|v| v * b.count as f64))
        .sum();
    Some(sum / dist.respondents as f64)
}

/// Share of respondents (percent) for each bucket.
pub fn respondent_shares(dist: &Distribution) -> Vec<(String, f64)> {
    if dist.respondents == 0 {
        return Vec::new();
    }
    dist.buckets
        .iter()
        .map(|b| {
            (
                b.label.clone(),
                b.count as f64 / dist.respondents as f64 * 100.0,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn question(id: &str, kind: QuestionType, options: &[&str]) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            kind,
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn response(id: &str, answers: Vec<(&str, AnswerValue)>) -> SurveyResponse {
        SurveyResponse {
            id: id.to_string(),
            survey_id: "s".to_string(),
            submitted_at: Utc::now(),
            answers: answers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn labels(items: &[&str]) -> AnswerValue {
        AnswerValue::Labels(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_scale_sorted_ascending() {
        let q = question("rate", QuestionType::Scale, &[]);
        let responses = vec![
            response("r1", vec![("rate", AnswerValue::Number(8.0))]),
            response("r2", vec![("rate", AnswerValue::Number(6.0))]),
            response("r3", vec![("rate", AnswerValue::Number(7.0))]),
        ];

        let dist = distribution(&q, &responses).unwrap();
        let got: Vec<_> = dist
            .buckets
            .iter()
            .map(|b| (b.label.as_str(), b.count))
            .collect();
        assert_eq!(got, vec![("6", 1), ("7", 1), ("8", 1)]);
        assert_eq!(dist.total(), 3);
    }

    #[test]
    fn test_scale_sorts_numerically_not_lexically() {
        let q = question("rate", QuestionType::Scale, &[]);
        let responses = vec![
            response("r1", vec![("rate", AnswerValue::Number(10.0))]),
            response("r2", vec![("rate", AnswerValue::Number(9.0))]),
            response("r3", vec![("rate", AnswerValue::Number(2.5))]),
            response("r4", vec![("rate", AnswerValue::Number(10.0))]),
        ];

        let dist = distribution(&q, &responses).unwrap();
        let order: Vec<_> = dist.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(order, vec!["2.5", "9", "10"]);
        assert_eq!(dist.count("10"), Some(2));
    }

    #[test]
    fn test_multi_choice_counts_each_selection() {
        let q = question("likes", QuestionType::Checkbox, &["Clean", "Fast"]);
        let responses = vec![
            response("r1", vec![("likes", labels(&["Clean", "Fast"]))]),
            response("r2", vec![("likes", labels(&["Fast"]))]),
        ];

        let dist = distribution(&q, &responses).unwrap();
        assert_eq!(dist.count("Clean"), Some(1));
        assert_eq!(dist.count("Fast"), Some(2));
        assert_eq!(dist.total(), 3);
        assert_eq!(dist.respondents, 2);
    }

    #[test]
    fn test_single_choice_keeps_first_appearance_order() {
        let q = question("freq", QuestionType::Radio, &["Daily", "Weekly", "Rarely"]);
        let responses = vec![
            response("r1", vec![("freq", AnswerValue::Text("Weekly".to_string()))]),
            response("r2", vec![("freq", AnswerValue::Text("Daily".to_string()))]),
            response("r3", vec![("freq", AnswerValue::Text("Weekly".to_string()))]),
            response("r4", vec![]),
        ];

        let dist = distribution(&q, &responses).unwrap();
        let order: Vec<_> = dist.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(order, vec!["Weekly", "Daily"]);
        assert_eq!(dist.total(), dist.respondents);
        assert_eq!(dist.respondents, 3);
    }

    #[test]
    fn test_unanswered_question_is_empty_distribution() {
        let q = question("freq", QuestionType::Radio, &["Daily"]);
        let responses = vec![response("r1", vec![])];

        let dist = distribution(&q, &responses).unwrap();
        assert!(dist.is_empty());
        assert_eq!(dist.respondents, 0);
    }

    #[test]
    fn test_free_text_is_never_aggregated() {
        let q = question("why", QuestionType::Text, &[]);
        let responses = vec![response(
            "r1",
            vec![("why", AnswerValue::Text("Because".to_string()))],
        )];
        assert!(distribution(&q, &responses).is_none());
    }

    #[test]
    fn test_mismatched_shape_is_skipped() {
        let q = question("rate", QuestionType::Scale, &[]);
        let responses = vec![
            response("r1", vec![("rate", AnswerValue::Text("high".to_string()))]),
            response("r2", vec![("rate", AnswerValue::Number(4.0))]),
        ];

        let dist = distribution(&q, &responses).unwrap();
        assert_eq!(dist.respondents, 1);
        assert_eq!(dist.count("4"), Some(1));
    }

    #[test]
    fn test_aggregate_survey_skips_text_questions() {
        let survey = Survey {
            id: "s".to_string(),
            title: "t".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            questions: vec![
                question("a", QuestionType::Radio, &["x"]),
                question("b", QuestionType::Text, &[]),
                question("c", QuestionType::Scale, &[]),
            ],
        };

        let dists = aggregate_survey(&survey, &[]);
        let ids: Vec<_> = dists.iter().map(|d| d.question_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_statistics_helpers() {
        let q = question("rate", QuestionType::Scale, &[]);
        let responses = vec![
            response("r1", vec![("rate", AnswerValue::Number(8.0))]),
            response("r2", vec![("rate", AnswerValue::Number(6.0))]),
            response("r3", vec![("rate", AnswerValue::Number(8.0))]),
            response("r4", vec![("rate", AnswerValue::Number(2.0))]),
        ];
        let dist = distribution(&q, &responses).unwrap();

        assert_eq!(most_common(&dist).map(|b| b.label.as_str()), Some("8"));
        assert_eq!(scale_mean(&dist), Some(6.0));

        let shares = respondent_shares(&dist);
        assert_eq!(shares.last(), Some(&("8".to_string(), 50.0)));
    }
}
