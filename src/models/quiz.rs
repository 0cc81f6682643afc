use serde::{Deserialize, Serialize};

/// Grounding reference text a quiz is generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// One search hit from the encyclopedia, before re-ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCandidate {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// An unverified generated question. Exactly one option is flagged correct
/// once it has passed through `QuestionCandidate::normalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCandidate {
    pub question: String,
    pub options: Vec<OptionCandidate>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub citation: String,
}

impl QuestionCandidate {
    /// Text of the option flagged correct.
    pub fn correct_text(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.is_correct)
            .map(|o| o.text.as_str())
    }

    pub fn distractors(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|o| !o.is_correct)
            .map(|o| o.text.as_str())
    }

    /// Repairs the option list in place and reports whether the candidate is
    /// structurally usable.
    ///
    /// Blank options are dropped and duplicate texts collapsed (a correct flag
    /// on a duplicate carries over to the kept copy). With no correct flag the
    /// first option becomes correct; with several, only the first is kept.
    pub fn normalize(&mut self) -> bool {
        self.question = self.question.trim().to_string();
        if self.question.is_empty() {
            return false;
        }

        let mut kept: Vec<OptionCandidate> = Vec::with_capacity(self.options.len());
        for opt in self.options.drain(..) {
            let text = opt.text.trim().to_string();
            if text.is_empty() {
                continue;
            }
            match kept.iter_mut().find(|k| k.text == text) {
                Some(existing) => existing.is_correct |= opt.is_correct,
                None => kept.push(OptionCandidate {
                    text,
                    is_correct: opt.is_correct,
                }),
            }
        }
        self.options = kept;

        if self.options.len() < 2 {
            return false;
        }

        let mut seen_correct = false;
        for opt in self.options.iter_mut() {
            if opt.is_correct {
                if seen_correct {
                    opt.is_correct = false;
                }
                seen_correct = true;
            }
        }
        if !seen_correct {
            self.options[0].is_correct = true;
        }
        true
    }
}

/// The three independent verdicts gathered for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub confident: bool,
    pub pass: bool,
    pub predicted_answer: String,
}

impl ValidationVerdict {
    /// Whether the blind solver's answer overlaps the known correct text.
    pub fn solver_agrees(&self, correct: &str) -> bool {
        let predicted = self.predicted_answer.trim();
        let correct = correct.trim();
        if predicted.is_empty() || correct.is_empty() {
            return false;
        }
        predicted.contains(correct) || correct.contains(predicted)
    }

    /// Majority of the three checks, with the judge allowed to accept alone.
    pub fn accepts(&self, correct: &str) -> bool {
        let solver = self.solver_agrees(correct);
        let votes = [self.confident, self.pass, solver]
            .iter()
            .filter(|v| **v)
            .count();
        self.pass || votes >= 2
    }
}

/// Final question shape returned to callers, options already shuffled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
    pub citation: String,
}

impl AcceptedQuestion {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}
