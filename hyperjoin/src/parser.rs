/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Text formats for hypergraphs.
//!
//! A hypergraph is a comma separated list of atoms, optionally closed by a
//! full stop: `R(x,y), S(y,z).` A rule puts a head atom in front of such a
//! body, either on its own first line or followed by `:-`; the head's
//! variables become the output vertices.

use crate::error::{HyperjoinError, Result};
use crate::hypergraph::Hypergraph;
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, opt},
    error::Error as NomError,
    multi::{separated_list0, separated_list1},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

/// `name(var, ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom<'a> {
    pub name: &'a str,
    pub vars: Vec<&'a str>,
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

pub fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '\'' | '$' | '@'))(input)
}

fn atom_with<'a>(
    allow_empty: bool,
) -> impl FnMut(&'a str) -> IResult<&'a str, Atom<'a>> {
    move |input: &'a str| {
        let (input, name) = ws(identifier)(input)?;
        let (input, _) = char('(')(input)?;
        let (input, vars) = if allow_empty {
            separated_list0(char(','), ws(identifier))(input)?
        } else {
            separated_list1(char(','), ws(identifier))(input)?
        };
        let (input, _) = ws(char(')'))(input)?;
        Ok((input, Atom { name, vars }))
    }
}

pub fn parse_atom(input: &str) -> IResult<&str, Atom<'_>> {
    atom_with(false)(input)
}

pub fn parse_body(input: &str) -> IResult<&str, Vec<Atom<'_>>> {
    terminated(
        separated_list1(char(','), parse_atom),
        tuple((opt(char('.')), multispace0)),
    )(input)
}

pub fn parse_rule(input: &str) -> IResult<&str, (Atom<'_>, Vec<Atom<'_>>)> {
    tuple((atom_with(true), preceded(opt(ws(tag(":-"))), parse_body)))(input)
}

/// Renders a nom error with the line and column it occurred at
pub fn format_parse_error(input: &str, err: nom::Err<NomError<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let error_description = match e.code {
                nom::error::ErrorKind::Char => ". Expected a specific character",
                nom::error::ErrorKind::TakeWhile1 => ". Expected a name",
                nom::error::ErrorKind::Eof => ". Unexpected trailing input",
                _ => "",
            };

            let offset = input.len() - e.input.len();
            let mut line_no = 1;
            let mut col_no = 1;
            for (i, c) in input.char_indices() {
                if i >= offset {
                    break;
                }
                if c == '\n' {
                    line_no += 1;
                    col_no = 1;
                } else {
                    col_no += 1;
                }
            }

            let error_line = input.lines().nth(line_no - 1).unwrap_or("[end of input]");
            format!(
                "Syntax error at line {}, column {}{}:\n{}\n{}^ Here",
                line_no,
                col_no,
                error_description,
                error_line,
                " ".repeat(col_no - 1)
            )
        }
        nom::Err::Incomplete(_) => {
            "Incomplete input: the parser needs more input to complete parsing".to_string()
        }
    }
}

fn build(body: &[Atom<'_>]) -> Result<Hypergraph> {
    let edges: Vec<(&str, &[&str])> = body.iter().map(|a| (a.name, a.vars.as_slice())).collect();
    Hypergraph::from_edges(&edges)
}

impl Hypergraph {
    /// Parses `R(x,y), S(y,z).`
    pub fn parse(text: &str) -> Result<Self> {
        let (_, body) = all_consuming(ws(parse_body))(text)
            .map_err(|e| HyperjoinError::Parse(format_parse_error(text, e)))?;
        build(&body)
    }

    /// Parses a rule: a head atom followed by its body. The head's variables
    /// are the output vertices.
    pub fn from_rule(text: &str) -> Result<Self> {
        let (_, (head, body)) = all_consuming(ws(parse_rule))(text)
            .map_err(|e| HyperjoinError::Parse(format_parse_error(text, e)))?;
        log::debug!("Rule head {} over {} body atoms", head.name, body.len());
        build(&body)?.with_output(&head.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hypergraph() {
        let hg = Hypergraph::parse("E1(a, b), E2(b,c),\n E3(c ,a).").unwrap();
        assert_eq!(hg.edges().len(), 3);
        assert_eq!(hg.vertices().len(), 3);
        assert_eq!(hg.to_string(), "E1(a,b), E2(b,c), E3(c,a).");
    }

    #[test]
    fn test_full_stop_is_optional() {
        assert!(Hypergraph::parse("R(x,y)").is_ok());
    }

    #[test]
    fn test_parse_rule_with_head_line() {
        let hg = Hypergraph::from_rule("ans(x,z)\nR(x,y), S(y,z).\n").unwrap();
        let names = hg.vertex_names(hg.output()).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"x".to_string()) && names.contains(&"z".to_string()));
    }

    #[test]
    fn test_parse_rule_with_arrow() {
        let hg = Hypergraph::from_rule("ans() :- R(x,y), S(y,z).").unwrap();
        assert!(hg.output().is_empty());
        assert_eq!(hg.edges().len(), 2);
    }

    #[test]
    fn test_head_variables_must_occur_in_body() {
        assert!(matches!(
            Hypergraph::from_rule("ans(w)\nR(x,y)."),
            Err(HyperjoinError::UnknownVertex(v)) if v == "w"
        ));
    }

    #[test]
    fn test_syntax_error_points_at_position() {
        match Hypergraph::parse("R(x,y), S(y z).") {
            Err(HyperjoinError::Parse(msg)) => assert!(msg.contains("line 1"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }
}
