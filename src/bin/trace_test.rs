// Minimal decoding harness: decodes the ideal gesture for each test word
// and prints the ranked guesses.
// Run with: cargo run --bin trace_test
use ime_core::{trace_for_word, DictionaryIndex, KeyLayout, Matcher, ShiftState};

fn main() {
    let layout = KeyLayout::english();
    let words: Vec<(String, u8)> = [
        ("and", 255),
        ("hello", 150),
        ("help", 140),
        ("here", 180),
        ("the", 255),
        ("then", 190),
        ("there", 200),
        ("this", 240),
        ("when", 170),
        ("world", 120),
    ]
    .iter()
    .map(|(w, f)| (w.to_string(), *f))
    .collect();
    let index = DictionaryIndex::from_word_lists(Vec::new(), words);
    let matcher = Matcher::new(&index);

    let test_cases = ["the", "there", "hello", "world", "when"];
    for word in test_cases {
        let trace = trace_for_word(word, &layout);
        let guesses = matcher.guess_word(&trace, ShiftState::Off, 5);
        let rendered: Vec<&str> = guesses.iter().flatten().map(String::as_str).collect();
        println!("{} ({} points) => {:?}", word, trace.len(), rendered);
    }
}
