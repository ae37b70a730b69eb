//! Shell command tokenizer.
//!
//! Splits a raw command string into pipeline segments, chain operators and
//! redirections, with POSIX-like quoting: single quotes are literal, double
//! quotes are literal apart from the `$VAR` text they carry through, and a
//! backslash escapes the next character. This models just enough shell to
//! classify safely; anything it cannot interpret is a [`ParseError`], which
//! callers must treat as a shell trick.

use crate::error::ParseError;

/// Operator chaining two pipeline segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    /// `|` (also `|&`)
    Pipe,
    /// `&&`
    AndIf,
    /// `||`
    OrIf,
    /// `;` (a lone `&` separates the same way)
    Seq,
}

/// A single command in a pipeline: program word plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Dequoted word tokens; never empty.
    pub words: Vec<String>,
}

impl Segment {
    /// The program word, as written (no normalisation).
    pub fn program(&self) -> &str {
        &self.words[0]
    }

    /// Arguments after the program word.
    pub fn args(&self) -> &[String] {
        &self.words[1..]
    }
}

/// Tokenized command line.
///
/// Invariant: `operators.len() == segments.len() - 1`; `operators[i]` sits
/// between `segments[i]` and `segments[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub segments: Vec<Segment>,
    pub operators: Vec<ChainOp>,
    /// A redirection targeted something other than a safe pseudo-file.
    pub writes_files: bool,
}

/// Tokenize a raw command string.
pub fn tokenize(command: &str) -> Result<CommandLine, ParseError> {
    Tokenizer::new(command).run()
}

/// Normalise a program word for table lookups: strip a leading backslash
/// (alias-bypass trick), drop leading path components, lowercase.
pub fn normalized_program(word: &str) -> String {
    let word = word.strip_prefix('\\').unwrap_or(word);
    let base = word.rsplit(['/', '\\']).next().unwrap_or(word);
    base.to_lowercase()
}

/// Redirection targets that never count as file writes.
fn is_safe_pseudo_file(target: &str) -> bool {
    target == "/dev/null"
        || target == "/dev/stdout"
        || target == "/dev/stderr"
        || target.starts_with("/dev/fd/")
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    segments: Vec<Segment>,
    operators: Vec<ChainOp>,
    current: Vec<String>,
    writes_files: bool,
}

impl Tokenizer {
    fn new(command: &str) -> Self {
        Self {
            chars: command.chars().collect(),
            pos: 0,
            segments: Vec::new(),
            operators: Vec::new(),
            current: Vec::new(),
            writes_files: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn run(mut self) -> Result<CommandLine, ParseError> {
        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else { break };
            match c {
                // Comment at token position runs to end of line.
                '#' => break,
                ';' => {
                    self.pos += 1;
                    self.end_segment(ChainOp::Seq)?;
                }
                '|' => {
                    self.pos += 1;
                    if self.peek() == Some('|') {
                        self.pos += 1;
                        self.end_segment(ChainOp::OrIf)?;
                    } else {
                        // `|&` pipes stderr too; same boundary as `|`.
                        if self.peek() == Some('&') {
                            self.pos += 1;
                        }
                        self.end_segment(ChainOp::Pipe)?;
                    }
                }
                '&' => {
                    self.pos += 1;
                    match self.peek() {
                        Some('&') => {
                            self.pos += 1;
                            self.end_segment(ChainOp::AndIf)?;
                        }
                        Some('>') => {
                            // `&>` / `&>>` redirect stdout and stderr.
                            self.pos += 1;
                            if self.peek() == Some('>') {
                                self.pos += 1;
                            }
                            self.consume_redirect_target(false)?;
                        }
                        _ => self.end_segment(ChainOp::Seq)?,
                    }
                }
                '>' | '<' => self.redirection()?,
                _ => self.word()?,
            }
        }
        self.finish()
    }

    fn word(&mut self) -> Result<(), ParseError> {
        let (text, quoted) = self.read_word()?;
        // An unquoted run of digits glued to `>` or `<` is a file
        // descriptor prefix (`2>err.log`), not an argument.
        if !quoted
            && !text.is_empty()
            && text.chars().all(|c| c.is_ascii_digit())
            && matches!(self.peek(), Some('>' | '<'))
        {
            return self.redirection();
        }
        self.current.push(text);
        Ok(())
    }

    fn redirection(&mut self) -> Result<(), ParseError> {
        let mut dup_candidate = false;
        match self.next() {
            Some('>') => match self.peek() {
                // `>>` append, `>|` clobber: file targets.
                Some('>' | '|') => {
                    self.pos += 1;
                }
                Some('&') => {
                    self.pos += 1;
                    dup_candidate = true;
                }
                _ => {}
            },
            Some('<') => match self.peek() {
                // Heredocs are not modelled.
                Some('<') => return Err(ParseError::UnsupportedSyntax),
                Some('&') => {
                    self.pos += 1;
                    dup_candidate = true;
                }
                // `<>` opens read-write.
                Some('>') => {
                    self.pos += 1;
                }
                _ => {}
            },
            _ => unreachable!("redirection entered off a redirect char"),
        }
        self.consume_redirect_target(dup_candidate)
    }

    fn consume_redirect_target(&mut self, dup_candidate: bool) -> Result<(), ParseError> {
        self.skip_spaces();
        if matches!(self.peek(), None | Some(';' | '|' | '&' | '<' | '>' | '#')) {
            return Err(ParseError::MissingRedirectTarget);
        }
        let (target, quoted) = self.read_word()?;
        if target.is_empty() {
            return Err(ParseError::MissingRedirectTarget);
        }
        // `>&1`, `2>&1`, `>&-`: duplicating or closing a descriptor is not
        // a file write.
        if dup_candidate && !quoted && (target == "-" || target.chars().all(|c| c.is_ascii_digit()))
        {
            return Ok(());
        }
        if !is_safe_pseudo_file(&target) {
            self.writes_files = true;
        }
        Ok(())
    }

    fn read_word(&mut self) -> Result<(String, bool), ParseError> {
        let mut out = String::new();
        let mut quoted = false;
        loop {
            let Some(c) = self.peek() else { break };
            match c {
                c if c.is_whitespace() => break,
                ';' | '|' | '&' | '<' | '>' => break,
                '\'' => {
                    quoted = true;
                    self.pos += 1;
                    loop {
                        match self.next() {
                            Some('\'') => break,
                            Some(ch) => out.push(ch),
                            None => return Err(ParseError::UnterminatedQuote),
                        }
                    }
                }
                '"' => {
                    quoted = true;
                    self.pos += 1;
                    loop {
                        match self.next() {
                            Some('"') => break,
                            Some('\\') => match self.next() {
                                Some(ch) => out.push(ch),
                                None => return Err(ParseError::UnterminatedQuote),
                            },
                            Some(ch) => out.push(ch),
                            None => return Err(ParseError::UnterminatedQuote),
                        }
                    }
                }
                '\\' => {
                    self.pos += 1;
                    match self.next() {
                        Some(ch) => out.push(ch),
                        None => return Err(ParseError::TrailingBackslash),
                    }
                }
                _ => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok((out, quoted))
    }

    fn end_segment(&mut self, op: ChainOp) -> Result<(), ParseError> {
        if self.current.is_empty() {
            return Err(ParseError::DanglingOperator);
        }
        self.segments.push(Segment {
            words: std::mem::take(&mut self.current),
        });
        self.operators.push(op);
        Ok(())
    }

    fn finish(mut self) -> Result<CommandLine, ParseError> {
        if !self.current.is_empty() {
            self.segments.push(Segment {
                words: std::mem::take(&mut self.current),
            });
        } else if let Some(op) = self.operators.last() {
            // A trailing `;` or `&` is fine; a dangling pipe or and/or
            // chain is not.
            if *op == ChainOp::Seq {
                self.operators.pop();
            } else {
                return Err(ParseError::DanglingOperator);
            }
        }
        if self.segments.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
        Ok(CommandLine {
            segments: self.segments,
            operators: self.operators,
            writes_files: self.writes_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &CommandLine, i: usize) -> Vec<&str> {
        line.segments[i].words.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_simple_words() {
        let line = tokenize("ls -la /tmp").unwrap();
        assert_eq!(line.segments.len(), 1);
        assert_eq!(words(&line, 0), ["ls", "-la", "/tmp"]);
        assert!(!line.writes_files);
    }

    #[test]
    fn test_quoting() {
        let line = tokenize(r#"echo "hello world" 'a b' esc\ aped"#).unwrap();
        assert_eq!(words(&line, 0), ["echo", "hello world", "a b", "esc aped"]);
    }

    #[test]
    fn test_empty_quoted_word_is_kept() {
        let line = tokenize("grep '' file").unwrap();
        assert_eq!(words(&line, 0), ["grep", "", "file"]);
    }

    #[test]
    fn test_operators_split_segments() {
        let line = tokenize("cat f | grep x && ls || pwd ; echo done").unwrap();
        assert_eq!(line.segments.len(), 5);
        assert_eq!(
            line.operators,
            [ChainOp::Pipe, ChainOp::AndIf, ChainOp::OrIf, ChainOp::Seq]
        );
    }

    #[test]
    fn test_lone_ampersand_separates() {
        let line = tokenize("sleep 5 & echo done").unwrap();
        assert_eq!(line.segments.len(), 2);
        assert_eq!(line.operators, [ChainOp::Seq]);

        let line = tokenize("sleep 5 &").unwrap();
        assert_eq!(line.segments.len(), 1);
        assert!(line.operators.is_empty());
    }

    #[test]
    fn test_operators_without_spaces() {
        let line = tokenize("cat f|grep x&&ls").unwrap();
        assert_eq!(line.segments.len(), 3);
        assert_eq!(line.operators, [ChainOp::Pipe, ChainOp::AndIf]);
    }

    #[test]
    fn test_redirection_to_file_marks_write() {
        assert!(tokenize("echo hi > out.txt").unwrap().writes_files);
        assert!(tokenize("echo hi >> out.txt").unwrap().writes_files);
        assert!(tokenize("echo hi >| out.txt").unwrap().writes_files);
        assert!(tokenize("cmd &> log.txt").unwrap().writes_files);
        assert!(tokenize("sort < data.txt").unwrap().writes_files);
    }

    #[test]
    fn test_redirection_to_pseudo_files_is_not_a_write() {
        assert!(!tokenize("echo hi > /dev/null").unwrap().writes_files);
        assert!(!tokenize("echo hi > /dev/stdout").unwrap().writes_files);
        assert!(!tokenize("echo hi 2> /dev/stderr").unwrap().writes_files);
        assert!(!tokenize("echo hi > /dev/fd/3").unwrap().writes_files);
    }

    #[test]
    fn test_fd_duplication_is_not_a_write() {
        assert!(!tokenize("cmd 2>&1").unwrap().writes_files);
        assert!(!tokenize("cmd >&2").unwrap().writes_files);
        assert!(!tokenize("cmd 2>&-").unwrap().writes_files);
        // The redirect target did not become an argument either.
        let line = tokenize("cmd 2>&1").unwrap();
        assert_eq!(words(&line, 0), ["cmd"]);
    }

    #[test]
    fn test_fd_prefix_requires_adjacency() {
        // `echo 2 > f` prints "2"; the digit stays an argument.
        let line = tokenize("echo 2 > /dev/null").unwrap();
        assert_eq!(words(&line, 0), ["echo", "2"]);

        let line = tokenize("echo 2>/dev/null").unwrap();
        assert_eq!(words(&line, 0), ["echo"]);
    }

    #[test]
    fn test_comment_is_ignored() {
        let line = tokenize("ls -la # list everything").unwrap();
        assert_eq!(words(&line, 0), ["ls", "-la"]);

        // Mid-word `#` is literal.
        let line = tokenize("echo a#b").unwrap();
        assert_eq!(words(&line, 0), ["echo", "a#b"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(tokenize(""), Err(ParseError::EmptyCommand));
        assert_eq!(tokenize("   "), Err(ParseError::EmptyCommand));
        assert_eq!(tokenize("# just a comment"), Err(ParseError::EmptyCommand));
        assert_eq!(tokenize("echo 'oops"), Err(ParseError::UnterminatedQuote));
        assert_eq!(tokenize("echo \"oops"), Err(ParseError::UnterminatedQuote));
        assert_eq!(tokenize("echo oops\\"), Err(ParseError::TrailingBackslash));
        assert_eq!(tokenize("echo >"), Err(ParseError::MissingRedirectTarget));
        assert_eq!(tokenize("ls | | cat"), Err(ParseError::DanglingOperator));
        assert_eq!(tokenize("ls |"), Err(ParseError::DanglingOperator));
        assert_eq!(tokenize("&& ls"), Err(ParseError::DanglingOperator));
        assert_eq!(
            tokenize("cat << EOF"),
            Err(ParseError::UnsupportedSyntax)
        );
    }

    #[test]
    fn test_normalized_program() {
        assert_eq!(normalized_program("/usr/bin/ls"), "ls");
        assert_eq!(normalized_program("\\ls"), "ls");
        assert_eq!(normalized_program("GIT"), "git");
        assert_eq!(normalized_program("ls"), "ls");
    }

    #[test]
    fn test_escaped_program_is_dequoted() {
        let line = tokenize("\\ls -la").unwrap();
        assert_eq!(words(&line, 0), ["ls", "-la"]);
    }
}
