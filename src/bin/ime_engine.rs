use crossterm::style::Stylize;
use ime_core::persistence::{self, write_corpus};
use ime_core::{trace_for_word, ImeEngine, KeyLayout, Matcher, ShiftState};
use std::fs::File;
use std::io::{stdin, stdout, Write};
use std::path::{Path, PathBuf};

// A small starter vocabulary for running the simulator without a corpus
// file, sorted the way a corpus ships.
const DEMO_WORDS: &[(&str, u8)] = &[
    ("about", 200),
    ("and", 255),
    ("brown", 80),
    ("fox", 70),
    ("gesture", 60),
    ("have", 210),
    ("hello", 150),
    ("help", 140),
    ("here", 180),
    ("jumped", 50),
    ("keyboard", 90),
    ("quick", 110),
    ("that", 230),
    ("the", 255),
    ("then", 190),
    ("there", 200),
    ("this", 240),
    ("trace", 40),
    ("when", 170),
    ("with", 220),
    ("word", 130),
    ("world", 120),
];

fn user_dictionary_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("glide-smart-ime");
    path.push("user_dictionary.bin");
    path
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut layout = KeyLayout::english();
    let mut corpus_path: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--layout" => {
                let path = args.next().ok_or("--layout needs a file path")?;
                layout = persistence::load_layout(Path::new(&path))?;
            }
            "--dump-layout" => {
                let path = args.next().ok_or("--dump-layout needs a file path")?;
                persistence::save_layout(&layout, Path::new(&path))?;
                println!("wrote layout config to {path}");
                return Ok(());
            }
            other => corpus_path = Some(other.to_string()),
        }
    }

    let mut engine = match &corpus_path {
        Some(path) => ImeEngine::with_corpus(layout, File::open(path)?),
        None => {
            let demo: Vec<(String, u8)> = DEMO_WORDS
                .iter()
                .map(|(w, f)| (w.to_string(), *f))
                .collect();
            let mut corpus = Vec::new();
            write_corpus(&mut corpus, &demo)?;
            ImeEngine::with_corpus(layout, &corpus[..])
        }
    };
    if let Err(err) = engine.attach_user_dictionary(user_dictionary_path()) {
        eprintln!("could not load the user dictionary: {err}");
    }

    let mut shift = ShiftState::Off;
    loop {
        print_ui(&engine, shift, corpus_path.as_deref());
        let mut input = String::new();
        stdin().read_line(&mut input)?;
        let cmd = input.trim();

        match cmd {
            "exit" => break,
            "" => {}
            ":s" => {
                shift = match shift {
                    ShiftState::Off => ShiftState::Shift,
                    ShiftState::Shift => ShiftState::CapsLock,
                    ShiftState::CapsLock => ShiftState::Off,
                };
            }
            s if s.starts_with(":p ") => {
                let prefix = s[3..].trim();
                let completions = engine.completions_for_prefix(prefix);
                println!("\nCompletions for '{prefix}':");
                for word in completions.iter().flatten() {
                    println!("  {word}");
                }
                pause()?;
            }
            s if s.starts_with(":a ") => {
                let mut parts = s[3..].split_whitespace();
                let word = parts.next().unwrap_or("");
                let frequency: i64 = parts.next().and_then(|f| f.parse().ok()).unwrap_or(128);
                if word.is_empty() {
                    continue;
                }
                match engine.add_user_word(word, frequency) {
                    Ok(()) => println!("\nAdded '{word}' with frequency {frequency}."),
                    Err(err) => eprintln!("\nCould not save '{word}': {err}"),
                }
                pause()?;
            }
            word => {
                let trace = trace_for_word(word, engine.layout());
                if trace.len() < 2 {
                    println!("\n'{word}' does not cross enough keys to make a gesture.");
                    pause()?;
                    continue;
                }
                let index = engine.index_snapshot();
                let guesses = Matcher::new(&index).guess_word(&trace, shift, 5);
                println!(
                    "\nGesture over '{word}' ({} trace points) decodes to:",
                    trace.len()
                );
                for (i, guess) in guesses.iter().enumerate() {
                    match guess {
                        Some(guess) => println!("  {}: {}", i + 1, guess.clone().bold()),
                        None => println!("  {}: -", i + 1),
                    }
                }
                pause()?;
            }
        }
    }
    Ok(())
}

fn print_ui(engine: &ImeEngine, shift: ShiftState, corpus_path: Option<&str>) {
    print!("\x1B[2J\x1B[1;1H");
    println!("{}", "Glide Smart IME Simulator".bold().dark_green());
    println!("---------------------------------------------------------------");
    println!(
        "Dictionary: {} words ({})",
        engine.index_snapshot().len(),
        corpus_path.unwrap_or("built-in demo list")
    );
    println!("Shift: {:?}   (cycle with ':s')", shift);
    println!();
    println!("Type a word to decode it as a gesture over its keys.");
    println!("':p <prefix>' lists completions, ':a <word> [freq]' adds a word,");
    println!("'exit' quits.");
    print!("\n> ");
    let _ = stdout().flush();
}

fn pause() -> std::io::Result<()> {
    print!("\n[Enter] to continue ");
    stdout().flush()?;
    let mut line = String::new();
    stdin().read_line(&mut line)?;
    Ok(())
}
