//! Mock input-method engine for integration testing
//!
//! Speaks the same line protocol as the real engine: an optional prefix
//! line, pinyin lines answered with a candidate listing, numeric lines that
//! choose a candidate and print the accumulated sentence, and `quit`.
//!
//! A few reserved inputs misbehave on purpose: `hang` stops responding,
//! `crash` exits with code 3 and `garble` commits text nobody expects.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

/// Sentences at least this long trigger the over-long diagnostic
const PHRASE_LIMIT: usize = 16;

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut state = MockState::new();
    prompt(&mut writer, "prefix:");

    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };

        match state.process_line(line.trim_end_matches('\r')) {
            Reply::Output(chunks) => {
                for chunk in chunks {
                    prompt(&mut writer, &chunk);
                }
            }
            Reply::Quit => break,
            Reply::Hang => loop {
                std::thread::sleep(Duration::from_secs(3600));
            },
            Reply::Crash(code) => std::process::exit(code),
        }
    }
}

fn prompt<W: Write>(writer: &mut W, text: &str) {
    writer.write_all(text.as_bytes()).ok();
    writer.flush().ok();
}

enum Reply {
    Output(Vec<String>),
    Quit,
    Hang,
    Crash(i32),
}

struct MockState {
    dictionary: HashMap<&'static str, Vec<&'static str>>,
    sentence: String,
    candidates: Vec<String>,
    /// No pinyin has been read yet, so a non-pinyin line is the prefix
    awaiting_prefix: bool,
}

impl MockState {
    fn new() -> Self {
        let dictionary = HashMap::from([
            ("nihao", vec!["你好", "你", "尼"]),
            ("women", vec!["我们", "我"]),
            ("woaini", vec!["我爱你", "我"]),
            ("zhongguorenmin", vec!["中国人民", "中国"]),
            ("henqinlao", vec!["很勤劳", "很"]),
            ("jintian", vec!["今天", "金田"]),
            ("tianqi", vec!["天气", "天启"]),
            ("henhao", vec!["很好", "很"]),
            ("beijing", vec!["北京", "背景"]),
            ("zaijian", vec!["再见", "在建"]),
            (
                "changchangdejuzi",
                vec!["这是一个非常非常长的句子用来测试", "常常"],
            ),
        ]);

        Self {
            dictionary,
            sentence: String::new(),
            candidates: Vec::new(),
            awaiting_prefix: true,
        }
    }

    fn process_line(&mut self, line: &str) -> Reply {
        if line == "quit" {
            return Reply::Quit;
        }

        if self.awaiting_prefix && (line.is_empty() || !line.is_ascii()) {
            self.awaiting_prefix = false;
            self.sentence = line.to_string();
            return Reply::Output(vec!["pinyin:".to_string()]);
        }

        if let Ok(index) = line.parse::<usize>() {
            return Reply::Output(self.choose(index));
        }

        match line {
            "hang" => Reply::Hang,
            "crash" => Reply::Crash(3),
            _ => {
                self.awaiting_prefix = false;
                Reply::Output(self.lookup(line))
            }
        }
    }

    fn lookup(&mut self, pinyin: &str) -> Vec<String> {
        self.candidates = match pinyin {
            "garble" => vec!["乱码".to_string()],
            _ => match self.dictionary.get(pinyin) {
                Some(words) => words.iter().map(|w| w.to_string()).collect(),
                None => vec![pinyin.to_string()],
            },
        };

        let listing: String = self
            .candidates
            .iter()
            .enumerate()
            .map(|(i, word)| format!("{}:{}(1)\t", i, word))
            .collect();

        vec![format!("{}\n", listing), "choose:".to_string()]
    }

    fn choose(&mut self, index: usize) -> Vec<String> {
        let Some(word) = self.candidates.get(index) else {
            eprintln!("invalid choice {}", index);
            return vec!["choose:".to_string()];
        };

        self.sentence.push_str(word);

        let mut out = Vec::new();
        if self.sentence.chars().count() >= PHRASE_LIMIT {
            out.push("phrase too long\n".to_string());
        }
        out.push(format!("sentence:{}\n", self.sentence));
        out.push("prefix:".to_string());
        out
    }
}
