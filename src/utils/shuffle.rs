use crate::models::quiz::{AcceptedQuestion, QuestionCandidate};
use rand::seq::SliceRandom;
use rand::Rng;

/// Permute the options so the correct position carries no signal from
/// generation order, then recompute `correct_index`.
pub fn shuffle_answers(candidate: &QuestionCandidate) -> AcceptedQuestion {
    shuffle_answers_with(candidate, &mut rand::thread_rng())
}

pub fn shuffle_answers_with<R: Rng + ?Sized>(
    candidate: &QuestionCandidate,
    rng: &mut R,
) -> AcceptedQuestion {
    let mut options = candidate.options.clone();
    options.shuffle(rng);

    let correct_index = options.iter().position(|o| o.is_correct).unwrap_or(0);

    AcceptedQuestion {
        question: candidate.question.clone(),
        options: options.into_iter().map(|o| o.text).collect(),
        correct_index,
        explanation: candidate.explanation.clone(),
        citation: candidate.citation.clone(),
    }
}
