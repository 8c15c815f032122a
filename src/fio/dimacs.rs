//! # Parsing DIMACS CNF and WCNF Files
//!
//! Streaming parser for the DIMACS CNF format and the pre-2022 DIMACS WCNF format. The header is
//! parsed eagerly when the [`Parser`] is created, the clauses are then produced lazily by
//! iterating over the parser.
//!
//! The body is treated as a stream of whitespace separated tokens: a clause may span several
//! lines and several clauses may share a line. Comment lines (starting with `c`) and blank lines
//! are accepted anywhere.
//!
//! ## References
//!
//! - [DIMACS CNF](http://www.satcompetition.org/2011/format-benchmarks2011.html)
//! - [DIMACS WCNF pre22](https://maxsat-evaluations.github.io/2017/rules.html#input)

use std::{
    convert::TryFrom,
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{i32, multispace0, multispace1, space1, u32, u64},
    combinator::{all_consuming, eof, map, map_res, opt, peek},
    sequence::{preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::types::{Cost, Lit, WClause};

/// Errors occuring within the DIMACS parsing module
#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened
    #[error("failed to open file: {}", path.display())]
    Open {
        /// The path that was attempted to open
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: io::Error,
    },
    /// IO error reading the input
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The input ended before a p-line was found
    #[error("missing `p cnf` or `p wcnf` header")]
    MissingHeader,
    /// The first line that is neither empty nor a comment is not a valid p-line
    #[error("unexpected line {line_num}: {line}")]
    UnexpectedLine {
        /// The 1-based line number
        line_num: usize,
        /// The offending line
        line: String,
    },
    /// Invalid literal in a clause
    #[error("invalid literal in line {line_num}: {token}")]
    Lit {
        /// The 1-based line number
        line_num: usize,
        /// The offending token
        token: String,
    },
    /// Invalid clause weight
    #[error("invalid weight in line {line_num}: {token}")]
    Weight {
        /// The 1-based line number
        line_num: usize,
        /// The offending token
        token: String,
    },
    /// The input ended before all clauses announced in the header were read
    #[error("input ended after {found} of {expected} clauses")]
    MissingClauses {
        /// The number of clauses announced in the header
        expected: usize,
        /// The number of complete clauses read
        found: usize,
    },
}

/// The flavour of the input file, as determined by the p-line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// `p cnf <n_vars> <n_clauses>`: all clauses are hard
    Cnf,
    /// `p wcnf <n_vars> <n_clauses> [<top>]`: every clause starts with a weight, clauses with
    /// weight `top` are hard. Without a top value, all clauses are soft.
    Wcnf {
        /// The weight marking hard clauses
        top: Option<u64>,
    },
}

/// The data in a p-line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// The number of variables declared in the header
    pub n_vars: u32,
    /// The number of clauses declared in the header
    pub n_clauses: usize,
    /// The file format
    pub format: Format,
}

impl Header {
    /// Checks whether the clauses in the file carry weights
    #[must_use]
    pub fn is_weighted(&self) -> bool {
        matches!(self.format, Format::Wcnf { .. })
    }

    /// Gets the weight of hard clauses, if the file declares one
    #[must_use]
    pub fn top(&self) -> Option<u64> {
        match self.format {
            Format::Cnf => None,
            Format::Wcnf { top } => top,
        }
    }

    /// Classifies a clause weight. Without weights every clause is hard, with weights exactly
    /// the clauses weighted `top` are.
    #[must_use]
    pub fn cost(&self, weight: Option<u64>) -> Cost {
        match (self.format, weight) {
            (Format::Cnf, _) | (_, None) => Cost::Hard,
            (Format::Wcnf { top }, Some(w)) if top == Some(w) => Cost::Hard,
            (Format::Wcnf { .. }, Some(w)) => Cost::Soft(w),
        }
    }
}

/// Streaming DIMACS CNF/WCNF parser, yielding exactly as many clauses as the header declares
#[derive(Debug)]
pub struct Parser<R> {
    header: Header,
    /// Where input data is coming from
    reader: R,
    /// The current line
    buffer: String,
    /// How much of the current line has been consumed
    pos: usize,
    /// The current line number
    line_num: usize,
    /// The number of clauses produced so far
    n_parsed: usize,
    /// Set after an error was returned
    failed: bool,
}

impl Parser<Box<dyn BufRead>> {
    /// Opens a (possibly compressed) file and parses its header
    ///
    /// # Errors
    ///
    /// If the file cannot be opened or the header is invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let reader =
            super::open_compressed_uncompressed_read(path).map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Parser::new(reader)
    }
}

impl<R: BufRead> Parser<R> {
    /// Creates a parser from a reader, consuming everything up to and including the p-line
    ///
    /// # Errors
    ///
    /// If reading fails, the input ends before a p-line, or the first line that is neither
    /// empty nor a comment is not a valid p-line.
    pub fn new(mut reader: R) -> Result<Self, Error> {
        let mut buffer = String::new();
        let mut line_num = 0;
        let header = loop {
            buffer.clear();
            if reader.read_line(&mut buffer)? == 0 {
                return Err(Error::MissingHeader);
            }
            line_num += 1;
            let trimmed = buffer.trim();
            if trimmed.is_empty() || trimmed.starts_with('c') {
                continue;
            }
            match all_consuming(p_line)(trimmed) {
                Ok((_, header)) => break header,
                Err(_) => {
                    return Err(Error::UnexpectedLine {
                        line_num,
                        line: trimmed.to_owned(),
                    })
                }
            }
        };
        buffer.clear();
        Ok(Parser {
            header,
            reader,
            buffer,
            pos: 0,
            line_num,
            n_parsed: 0,
            failed: false,
        })
    }

    /// Gets the parsed header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Gets the number of clauses produced so far
    pub fn n_parsed(&self) -> usize {
        self.n_parsed
    }

    /// Makes sure that the unconsumed part of the buffer contains a token. Returns `false` if
    /// the input ended first.
    fn fill(&mut self) -> Result<bool, Error> {
        loop {
            if !self.buffer[self.pos..].trim().is_empty() {
                return Ok(true);
            }
            self.buffer.clear();
            self.pos = 0;
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(false);
            }
            self.line_num += 1;
            if self.buffer.trim_start().starts_with('c') {
                self.buffer.clear();
            }
        }
    }

    /// Applies a token parser to the unconsumed input. On failure, returns the offending token.
    fn token<O, P>(&mut self, mut parser: P) -> Result<O, String>
    where
        P: FnMut(&str) -> IResult<&str, O>,
    {
        let rest = &self.buffer[self.pos..];
        match parser(rest) {
            Ok((remaining, out)) => {
                self.pos = self.buffer.len() - remaining.len();
                Ok(out)
            }
            Err(_) => Err(rest.split_whitespace().next().unwrap_or_default().to_owned()),
        }
    }

    fn missing_clauses(&self) -> Error {
        Error::MissingClauses {
            expected: self.header.n_clauses,
            found: self.n_parsed,
        }
    }

    fn parse_clause(&mut self) -> Result<WClause, Error> {
        let weight = if self.header.is_weighted() {
            if !self.fill()? {
                return Err(self.missing_clauses());
            }
            let line_num = self.line_num;
            Some(
                self.token(weight)
                    .map_err(|token| Error::Weight { line_num, token })?,
            )
        } else {
            None
        };
        let mut lits = Vec::new();
        loop {
            if !self.fill()? {
                return Err(self.missing_clauses());
            }
            let line_num = self.line_num;
            let val = self
                .token(literal)
                .map_err(|token| Error::Lit { line_num, token })?;
            if val == 0 {
                break;
            }
            lits.push(Lit::from_dimacs(val).map_err(|_| Error::Lit {
                line_num,
                token: val.to_string(),
            })?);
        }
        Ok(WClause::new(self.header.cost(weight), lits))
    }
}

impl<R: BufRead> Iterator for Parser<R> {
    type Item = Result<WClause, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.n_parsed >= self.header.n_clauses {
            return None;
        }
        match self.parse_clause() {
            Ok(clause) => {
                self.n_parsed += 1;
                if self.n_parsed == self.header.n_clauses && matches!(self.fill(), Ok(true)) {
                    tracing::debug!(
                        line = self.line_num,
                        "ignoring input after the last declared clause"
                    );
                }
                Some(Ok(clause))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, Some(self.header.n_clauses - self.n_parsed))
    }
}

/// Parses a p-line, without leading or trailing whitespace
fn p_line(input: &str) -> IResult<&str, Header> {
    preceded(terminated(tag("p"), space1), alt((cnf_header, wcnf_header)))(input)
}

fn cnf_header(input: &str) -> IResult<&str, Header> {
    map(
        tuple((tag("cnf"), space1, u32, space1, n_clauses)),
        |(_, _, n_vars, _, n_clauses)| Header {
            n_vars,
            n_clauses,
            format: Format::Cnf,
        },
    )(input)
}

fn wcnf_header(input: &str) -> IResult<&str, Header> {
    map(
        tuple((
            tag("wcnf"),
            space1,
            u32,
            space1,
            n_clauses,
            opt(preceded(space1, u64)),
        )),
        |(_, _, n_vars, _, n_clauses, top)| Header {
            n_vars,
            n_clauses,
            format: Format::Wcnf { top },
        },
    )(input)
}

fn n_clauses(input: &str) -> IResult<&str, usize> {
    map_res(u64, usize::try_from)(input)
}

/// A token has to be followed by whitespace or the end of the input
fn token_end(input: &str) -> IResult<&str, &str> {
    peek(alt((multispace1, eof)))(input)
}

/// Nuclear parser for a clause weight
fn weight(input: &str) -> IResult<&str, u64> {
    preceded(multispace0, terminated(u64, token_end))(input)
}

/// Nuclear parser for a literal, including the terminating `0`
fn literal(input: &str) -> IResult<&str, i32> {
    preceded(multispace0, terminated(i32, token_end))(input)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{literal, p_line, weight, Error, Format, Header, Parser};
    use crate::{types::Cost, wclause};

    fn parse(input: &str) -> Result<(Header, Vec<crate::types::WClause>), Error> {
        let parser = Parser::new(Cursor::new(input))?;
        let header = *parser.header();
        let clauses = parser.collect::<Result<Vec<_>, _>>()?;
        Ok((header, clauses))
    }

    #[test]
    fn parse_p_line_pass() {
        assert_eq!(
            p_line("p cnf 23 42"),
            Ok((
                "",
                Header {
                    n_vars: 23,
                    n_clauses: 42,
                    format: Format::Cnf
                }
            ))
        );
        assert_eq!(
            p_line("p wcnf 23 42 52"),
            Ok((
                "",
                Header {
                    n_vars: 23,
                    n_clauses: 42,
                    format: Format::Wcnf { top: Some(52) }
                }
            ))
        );
        assert_eq!(
            p_line("p  wcnf\t23 42"),
            Ok((
                "",
                Header {
                    n_vars: 23,
                    n_clauses: 42,
                    format: Format::Wcnf { top: None }
                }
            ))
        );
    }

    #[test]
    fn parse_p_line_fail() {
        assert!(p_line("a cnf 23 42").is_err());
        assert!(p_line("p abc 23 42 52").is_err());
        assert!(p_line("p cnf ab").is_err());
        assert!(p_line("p wcnf ab").is_err());
        assert!(p_line("p cnf -3 4").is_err());
    }

    #[test]
    fn parse_weight_pass() {
        assert_eq!(weight("15 "), Ok((" ", 15)));
        assert_eq!(weight("  42 63"), Ok((" 63", 42)));
        assert_eq!(weight("0"), Ok(("", 0)));
    }

    #[test]
    fn parse_weight_fail() {
        assert!(weight("-2 ").is_err());
        assert!(weight("abc ").is_err());
        assert!(weight("12abc ").is_err());
    }

    #[test]
    fn parse_literal() {
        assert_eq!(literal("15 "), Ok((" ", 15)));
        assert_eq!(literal("-42\n"), Ok(("\n", -42)));
        assert_eq!(literal(" 0"), Ok(("", 0)));
        assert!(literal("0test").is_err());
        assert!(literal("x1").is_err());
    }

    #[test]
    fn cnf_all_hard() {
        let (header, clauses) = parse("c comment\np cnf 2 2\n1 2 0\n-1 -2 0\n").unwrap();
        assert_eq!(header.format, Format::Cnf);
        assert_eq!(header.n_vars, 2);
        assert_eq!(
            clauses,
            vec![wclause!(Cost::Hard; 1, 2), wclause!(Cost::Hard; -1, -2)]
        );
    }

    #[test]
    fn wcnf_top_classification() {
        let (header, clauses) = parse("p wcnf 1 2 10\n10 1 0\n5 -1 0\n").unwrap();
        assert_eq!(header.top(), Some(10));
        assert_eq!(
            clauses,
            vec![wclause!(Cost::Hard; 1), wclause!(Cost::Soft(5); -1)]
        );
    }

    #[test]
    fn wcnf_without_top() {
        let (_, clauses) = parse("p wcnf 2 1\n10 1 2 0\n").unwrap();
        assert_eq!(clauses, vec![wclause!(Cost::Soft(10); 1, 2)]);
    }

    #[test]
    fn clauses_span_lines() {
        let (_, clauses) = parse("p cnf 3 3\n1 2\n-3 0 2 0\nc in between\n\n 3\n 0\n").unwrap();
        assert_eq!(
            clauses,
            vec![
                wclause!(Cost::Hard; 1, 2, -3),
                wclause!(Cost::Hard; 2),
                wclause!(Cost::Hard; 3),
            ]
        );
    }

    #[test]
    fn empty_clause() {
        let (_, clauses) = parse("p wcnf 1 2 9\n9 0\n3 0\n").unwrap();
        assert_eq!(
            clauses,
            vec![wclause!(Cost::Hard;), wclause!(Cost::Soft(3);)]
        );
    }

    #[test]
    fn stops_after_declared_clauses() {
        let (_, clauses) = parse("p cnf 2 1\n1 0\n2 0\n%\n0\n").unwrap();
        assert_eq!(clauses, vec![wclause!(Cost::Hard; 1)]);
    }

    #[test]
    fn missing_header() {
        assert!(matches!(
            Parser::new(Cursor::new("c only comments\n\n")),
            Err(Error::MissingHeader)
        ));
    }

    #[test]
    fn unexpected_line() {
        match Parser::new(Cursor::new("c test\n1 2 0\np cnf 2 1\n")) {
            Err(Error::UnexpectedLine { line_num, line }) => {
                assert_eq!(line_num, 2);
                assert_eq!(line, "1 2 0");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            Parser::new(Cursor::new("p cnf 2 1 7\n1 0\n")),
            Err(Error::UnexpectedLine { line_num: 1, .. })
        ));
        assert!(matches!(
            Parser::new(Cursor::new("p wcnf 2 1 7 8\n1 0\n")),
            Err(Error::UnexpectedLine { line_num: 1, .. })
        ));
    }

    #[test]
    fn invalid_literal() {
        match parse("p cnf 3 2\n1 2 0\n-3 four 0\n") {
            Err(Error::Lit { line_num, token }) => {
                assert_eq!(line_num, 3);
                assert_eq!(token, "four");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn invalid_weight() {
        assert!(matches!(
            parse("p wcnf 3 1 4\n-2 1 0\n"),
            Err(Error::Weight { line_num: 2, .. })
        ));
    }

    #[test]
    fn premature_end() {
        match parse("p cnf 3 3\n1 2 0\n-3") {
            Err(Error::MissingClauses { expected, found }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn fused_after_error() {
        let mut parser = Parser::new(Cursor::new("p cnf 1 3\n1 0\nx 0\n1 0\n")).unwrap();
        assert!(matches!(parser.next(), Some(Ok(_))));
        assert!(matches!(parser.next(), Some(Err(Error::Lit { .. }))));
        assert!(parser.next().is_none());
        assert_eq!(parser.n_parsed(), 1);
    }

    #[test]
    fn open_missing_file() {
        match Parser::open("this/file/does/not/exist.wcnf") {
            Err(err @ Error::Open { .. }) => {
                assert!(format!("{err}").contains("this/file/does/not/exist.wcnf"));
            }
            other => panic!("unexpected result: {:?}", other.map(|p| *p.header())),
        }
    }
}
