//! Nom-based IRC line tokenizer.
//!
//! Splits one raw line into borrowed tags, prefix, command and parameter
//! slices. Interpretation (numeric lookup, prefix splitting) happens in
//! [`Message::parse`](super::Message::parse).

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_until(" ")),
    )(input)
}

fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// Parse a complete IRC line into its components.
///
/// ```text
/// [@tags] [:prefix] <command> [params...] [:trailing]
/// ```
pub fn parse_line(input: &str) -> ParseResult<&str, RawLine<'_>> {
    let (input, tags) = context("parsing optional tags", opt(parse_tags))(input)?;
    let (input, _) = space0(input)?;

    let (input, prefix) = context("parsing optional prefix", opt(parse_prefix))(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = context("parsing required command", parse_command)(input)?;

    let mut params: Vec<&str> = Vec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        rest = rest.trim_start_matches(' ');

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            rest = "";
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        if end == 0 {
            break;
        }
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    Ok((
        rest,
        RawLine {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

/// A tokenized line with borrowed string slices.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command word or numeric, as sent.
    pub command: &'a str,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
}

impl<'a> RawLine<'a> {
    /// Tokenize `input`, which must already have its line terminator removed.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        if input.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        match parse_line(input) {
            Ok((_remaining, line)) => Ok(line),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let mut position = input.len();
                let mut ctx = "parsing line";

                for (error_input, kind) in &e.errors {
                    position = input.len() - error_input.len();
                    if let VerboseErrorKind::Context(c) = kind {
                        ctx = *c;
                        break;
                    }
                }

                Err(MessageParseError::ParseContext {
                    position,
                    context: ctx.to_string(),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::InvalidCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let line = RawLine::parse("PING").unwrap();
        assert_eq!(line.command, "PING");
        assert!(line.tags.is_none());
        assert!(line.prefix.is_none());
        assert!(line.params.is_empty());
    }

    #[test]
    fn test_parse_with_prefix() {
        let line = RawLine::parse(":nick!user@host PRIVMSG #channel :Hello there").unwrap();
        assert_eq!(line.prefix, Some("nick!user@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#channel", "Hello there"]);
    }

    #[test]
    fn test_parse_with_tags() {
        let line = RawLine::parse("@time=2023-01-01T00:00:00Z :nick PRIVMSG #ch :Hi").unwrap();
        assert_eq!(line.tags, Some("time=2023-01-01T00:00:00Z"));
        assert_eq!(line.params, vec!["#ch", "Hi"]);
    }

    #[test]
    fn test_parse_isupport_line() {
        let line = RawLine::parse(
            ":irc.example.net 005 me CHANTYPES=# PREFIX=(ov)@+ :are supported by this server",
        )
        .unwrap();
        assert_eq!(line.command, "005");
        assert_eq!(
            line.params,
            vec!["me", "CHANTYPES=#", "PREFIX=(ov)@+", "are supported by this server"]
        );
    }

    #[test]
    fn test_parse_collapses_double_spaces() {
        let line = RawLine::parse("MODE #chan  +o  nick").unwrap();
        assert_eq!(line.params, vec!["#chan", "+o", "nick"]);
    }

    #[test]
    fn test_parse_empty_trailing() {
        let line = RawLine::parse("PRIVMSG #channel :").unwrap();
        assert_eq!(line.params, vec!["#channel", ""]);
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(RawLine::parse(""), Err(MessageParseError::EmptyMessage));
        assert!(matches!(
            RawLine::parse(":prefix.only"),
            Err(MessageParseError::ParseContext { .. })
        ));
    }
}
