use crate::models::quiz::{OptionCandidate, QuestionCandidate, SourceDocument};
use crate::utils::text::{first_sentence, truncate_chars};

const SUMMARY_MAX_CHARS: usize = 80;
const HINT_CHARS: usize = 20;

/// Questions built from the document alone, for when no model output
/// survived. Every question has four distinct options with the first correct;
/// callers shuffle them like any other candidate.
pub fn synthesize_questions(source: &SourceDocument, count: usize) -> Vec<QuestionCandidate> {
    let title = source.title.trim();
    let content = source.content.trim();

    let builders: [fn(&str, &str, &str) -> Option<QuestionCandidate>; 5] = [
        summary_question,
        topic_question,
        length_question,
        first_letter_question,
        category_question,
    ];

    builders
        .iter()
        .filter_map(|build| build(title, content, &source.url))
        .take(count)
        .collect()
}

fn candidate(question: String, correct: String, distractors: [&str; 3], explanation: String, url: &str) -> QuestionCandidate {
    let mut options = vec![OptionCandidate {
        text: correct,
        is_correct: true,
    }];
    options.extend(distractors.iter().map(|d| OptionCandidate {
        text: d.to_string(),
        is_correct: false,
    }));
    QuestionCandidate {
        question,
        options,
        explanation: format!("{} (Source: {})", explanation, url),
        citation: url.to_string(),
    }
}

fn summary_question(title: &str, content: &str, url: &str) -> Option<QuestionCandidate> {
    let sentence = first_sentence(content);
    if sentence.is_empty() {
        return None;
    }
    let summary = if sentence.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}...", truncate_chars(sentence, SUMMARY_MAX_CHARS))
    } else {
        sentence.to_string()
    };
    Some(candidate(
        format!("Which statement about \"{}\" is correct?", title),
        summary.clone(),
        [
            "The term comes from 19th-century French literature.",
            "It is a fictional concept that does not exist.",
            "No detailed records of it have survived.",
        ],
        format!("The encyclopedia summary says: \"{}\".", summary),
        url,
    ))
}

fn topic_question(title: &str, content: &str, url: &str) -> Option<QuestionCandidate> {
    if title.is_empty() {
        return None;
    }
    let distractors = ["Unknown", "Something else", "A secret"];
    if distractors.contains(&title) {
        return None;
    }
    Some(candidate(
        format!(
            "What is the subject of this quiz? (Hint: {}...)",
            truncate_chars(content, HINT_CHARS)
        ),
        title.to_string(),
        distractors,
        format!("This quiz is about \"{}\".", title),
        url,
    ))
}

fn length_question(title: &str, content: &str, url: &str) -> Option<QuestionCandidate> {
    let length = content.chars().count();
    if length < 10 {
        return None;
    }
    Some(candidate(
        format!("Roughly how long is the encyclopedia article on \"{}\"?", title),
        format!("About {} characters", length),
        [
            "Fewer than 10 characters",
            "Exactly one character",
            "More than 100 million characters",
        ],
        format!("The article is about {} characters long.", length),
        url,
    ))
}

fn first_letter_question(title: &str, _content: &str, url: &str) -> Option<QuestionCandidate> {
    let first = title.chars().next()?.to_string();
    let distractors: Vec<&str> = ["Q", "Z", "X", "J"]
        .into_iter()
        .filter(|d| !d.eq_ignore_ascii_case(&first))
        .take(3)
        .collect();
    Some(candidate(
        format!("What is the first character of \"{}\"?", title),
        first.clone(),
        [distractors[0], distractors[1], distractors[2]],
        format!("\"{}\" starts with \"{}\".", title, first),
        url,
    ))
}

fn category_question(title: &str, _content: &str, url: &str) -> Option<QuestionCandidate> {
    if title.is_empty() {
        return None;
    }
    Some(candidate(
        format!("Which category does \"{}\" most likely belong to?", title),
        "General knowledge".to_string(),
        ["Classified files", "Predictions of the future", "A personal diary"],
        format!("\"{}\" is covered by general reference works.", title),
        url,
    ))
}
