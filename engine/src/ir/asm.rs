//! Line-oriented textual form of a method.
//!
//! One instruction per line; `:name` on its own line starts a labeled block;
//! `;` begins a comment. Conditional branches name their true-case label and
//! fall through to the next line otherwise. A method that ends without a
//! terminator gets an implicit `return-void`.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::ir::adapter::instruction::Inst;
use crate::ir::adapter::method::{Block, Method};

/// A terminator with targets still in symbolic form
enum TermSpec {
    Goto {
        target: String,
    },
    Branch {
        cond: String,
        lhs: u32,
        rhs: Option<u32>,
        then_case: String,
        else_case: usize,
    },
    Switch {
        cond: u32,
        cases: Vec<(i64, String)>,
        default: String,
    },
    Return {
        val: Option<u32>,
    },
    Unreachable,
}

/// A block under construction
struct PendingBlock {
    id: usize,
    body: Vec<Inst>,
}

struct Parser {
    blocks: Vec<(usize, Vec<Inst>, TermSpec)>,
    labels: BTreeMap<String, usize>,
    /// parameter registers, declared by their load-param instructions
    params: Vec<u32>,
    current: Option<PendingBlock>,
    next_id: usize,
}

fn parse_prefixed(token: &str, prefix: char, what: &str) -> EngineResult<u32> {
    token
        .strip_prefix(prefix)
        .and_then(|rest| rest.parse().ok())
        .ok_or_else(|| EngineError::ParseError(format!("expect {}, found: {}", what, token)))
}

fn parse_reg(token: &str) -> EngineResult<u32> {
    parse_prefixed(token, 'v', "a register")
}

fn parse_field(token: &str) -> EngineResult<u32> {
    parse_prefixed(token, 'f', "a field")
}

fn parse_label(token: &str) -> EngineResult<String> {
    token
        .strip_prefix(':')
        .map(|rest| rest.to_string())
        .ok_or_else(|| EngineError::ParseError(format!("expect a label, found: {}", token)))
}

fn parse_literal<T: std::str::FromStr>(token: &str) -> EngineResult<T> {
    token
        .parse()
        .map_err(|_| EngineError::ParseError(format!("expect an integer, found: {}", token)))
}

fn expect_arity(tokens: &[&str], arity: usize) -> EngineResult<()> {
    if tokens.len() != arity + 1 {
        return Err(EngineError::ParseError(format!(
            "wrong number of operands for {}",
            tokens[0]
        )));
    }
    Ok(())
}

impl Parser {
    fn new() -> Self {
        Self {
            blocks: vec![],
            labels: BTreeMap::new(),
            params: vec![],
            current: None,
            next_id: 0,
        }
    }

    /// The block currently open, opening an anonymous one if necessary
    fn open(&mut self) -> &mut PendingBlock {
        if self.current.is_none() {
            let id = self.next_id;
            self.next_id += 1;
            self.current = Some(PendingBlock { id, body: vec![] });
        }
        self.current.as_mut().unwrap()
    }

    fn close(&mut self, term: TermSpec) {
        let block = self.current.take().expect("no block to close");
        self.blocks.push((block.id, block.body, term));
    }

    fn define_label(&mut self, name: String) -> EngineResult<()> {
        // a label names the open block if nothing has landed in it yet,
        // otherwise it closes the block with a fall-through jump
        let fall_through = matches!(&self.current, Some(block) if !block.body.is_empty());
        if fall_through {
            self.close(TermSpec::Goto {
                target: name.clone(),
            });
        }
        let id = self.open().id;
        if self.labels.insert(name.clone(), id).is_some() {
            return Err(EngineError::ParseError(format!(
                "duplicated label: {}",
                name
            )));
        }
        Ok(())
    }

    fn feed(&mut self, line: &str) -> EngineResult<()> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let mnemonic = tokens[0];

        if let Some(rest) = mnemonic.strip_prefix(':') {
            expect_arity(&tokens, 0)?;
            return self.define_label(rest.to_string());
        }

        // two-way branches close the block and fall through to a fresh one
        if let Some(suffix) = mnemonic.strip_prefix("if-") {
            return self.feed_branch(suffix, &tokens);
        }

        match mnemonic {
            "nop" => {
                expect_arity(&tokens, 0)?;
                self.open().body.push(Inst::Nop);
            }
            "const" | "const-wide" => {
                expect_arity(&tokens, 2)?;
                let inst = Inst::Const {
                    dst: parse_reg(tokens[1])?,
                    value: parse_literal(tokens[2])?,
                };
                self.open().body.push(inst);
            }
            "move" | "move-wide" => {
                expect_arity(&tokens, 2)?;
                let inst = Inst::Move {
                    dst: parse_reg(tokens[1])?,
                    src: parse_reg(tokens[2])?,
                };
                self.open().body.push(inst);
            }
            "move-result" | "move-result-wide" => {
                expect_arity(&tokens, 1)?;
                let inst = Inst::MoveResult {
                    dst: parse_reg(tokens[1])?,
                };
                self.open().body.push(inst);
            }
            "load-param" | "load-param-wide" => {
                expect_arity(&tokens, 1)?;
                let dst = parse_reg(tokens[1])?;
                if !self.params.contains(&dst) {
                    self.params.push(dst);
                }
                self.open().body.push(Inst::LoadParam { dst });
            }
            "cmp-long" => {
                expect_arity(&tokens, 3)?;
                let inst = Inst::CmpLong {
                    dst: parse_reg(tokens[1])?,
                    lhs: parse_reg(tokens[2])?,
                    rhs: parse_reg(tokens[3])?,
                };
                self.open().body.push(inst);
            }
            "invoke-static" => {
                if tokens.len() < 2 {
                    return Err(EngineError::ParseError(
                        "invoke-static needs a callee".into(),
                    ));
                }
                let args = tokens[2..]
                    .iter()
                    .map(|t| parse_reg(t))
                    .collect::<EngineResult<_>>()?;
                let inst = Inst::Invoke {
                    callee: tokens[1].to_string(),
                    args,
                };
                self.open().body.push(inst);
            }
            "sget" => {
                expect_arity(&tokens, 2)?;
                let inst = Inst::StaticGet {
                    dst: parse_reg(tokens[1])?,
                    field: parse_field(tokens[2])?,
                };
                self.open().body.push(inst);
            }
            "sput" => {
                expect_arity(&tokens, 2)?;
                let inst = Inst::StaticPut {
                    src: parse_reg(tokens[1])?,
                    field: parse_field(tokens[2])?,
                };
                self.open().body.push(inst);
            }
            "goto" => {
                expect_arity(&tokens, 1)?;
                let target = parse_label(tokens[1])?;
                self.open();
                self.close(TermSpec::Goto { target });
            }
            "return-void" => {
                expect_arity(&tokens, 0)?;
                self.open();
                self.close(TermSpec::Return { val: None });
            }
            "return" | "return-wide" => {
                expect_arity(&tokens, 1)?;
                let val = Some(parse_reg(tokens[1])?);
                self.open();
                self.close(TermSpec::Return { val });
            }
            "unreachable" => {
                expect_arity(&tokens, 0)?;
                self.open();
                self.close(TermSpec::Unreachable);
            }
            "switch" => {
                return self.feed_switch(&tokens);
            }
            _ => {
                return self.feed_arith(mnemonic, &tokens);
            }
        }
        Ok(())
    }

    fn feed_branch(&mut self, suffix: &str, tokens: &[&str]) -> EngineResult<()> {
        let (cond, zero_form) = match suffix.strip_suffix('z') {
            Some(cond) if suffix.len() == 3 => (cond, true),
            _ => (suffix, false),
        };
        let (lhs, rhs, then_case) = if zero_form {
            expect_arity(tokens, 2)?;
            (parse_reg(tokens[1])?, None, parse_label(tokens[2])?)
        } else {
            expect_arity(tokens, 3)?;
            (
                parse_reg(tokens[1])?,
                Some(parse_reg(tokens[2])?),
                parse_label(tokens[3])?,
            )
        };
        let cond = cond.to_string();
        self.open();
        // the else-arm is the fall-through block opened right behind
        let else_case = self.next_id;
        self.close(TermSpec::Branch {
            cond,
            lhs,
            rhs,
            then_case,
            else_case,
        });
        self.open();
        Ok(())
    }

    fn feed_switch(&mut self, tokens: &[&str]) -> EngineResult<()> {
        let cond = parse_reg(
            tokens
                .get(1)
                .ok_or_else(|| EngineError::ParseError("switch needs a scrutinee".into()))?,
        )?;
        let mut cases = vec![];
        let mut rest = &tokens[2..];
        loop {
            match rest {
                ["default", target] => {
                    let default = parse_label(target)?;
                    self.open();
                    self.close(TermSpec::Switch {
                        cond,
                        cases,
                        default,
                    });
                    return Ok(());
                }
                [value, target, tail @ ..] => {
                    cases.push((parse_literal(value)?, parse_label(target)?));
                    rest = tail;
                }
                _ => {
                    return Err(EngineError::ParseError(
                        "switch must end with a default target".into(),
                    ));
                }
            }
        }
    }

    fn feed_arith(&mut self, mnemonic: &str, tokens: &[&str]) -> EngineResult<()> {
        let (op, form) = mnemonic.split_once("-int").ok_or_else(|| {
            EngineError::ParseError(format!("unknown mnemonic: {}", mnemonic))
        })?;
        // rsub has no register-register form; everything else needs /lit
        let literal = op == "rsub" || form.starts_with("/lit");
        expect_arity(tokens, 3)?;
        let inst = if literal {
            Inst::LitOp {
                op: op.to_string(),
                dst: parse_reg(tokens[1])?,
                src: parse_reg(tokens[2])?,
                lit: parse_literal(tokens[3])?,
            }
        } else {
            Inst::BinOp {
                op: op.to_string(),
                dst: parse_reg(tokens[1])?,
                lhs: parse_reg(tokens[2])?,
                rhs: parse_reg(tokens[3])?,
            }
        };
        self.open().body.push(inst);
        Ok(())
    }

    fn finish(mut self, name: &str) -> EngineResult<Method> {
        // implicit return when the text falls off the end
        if self.current.is_some() {
            self.close(TermSpec::Return { val: None });
        }

        let resolve = |label: &str| -> EngineResult<usize> {
            self.labels
                .get(label)
                .copied()
                .ok_or_else(|| EngineError::ParseError(format!("undefined label: {}", label)))
        };

        let mut blocks = vec![];
        for (label, body, term) in &self.blocks {
            let terminator = match term {
                TermSpec::Goto { target } => Inst::Goto {
                    target: resolve(target)?,
                },
                TermSpec::Branch {
                    cond,
                    lhs,
                    rhs,
                    then_case,
                    else_case,
                } => Inst::Branch {
                    cond: cond.clone(),
                    lhs: *lhs,
                    rhs: *rhs,
                    then_case: resolve(then_case)?,
                    else_case: *else_case,
                },
                TermSpec::Switch {
                    cond,
                    cases,
                    default,
                } => Inst::Switch {
                    cond: *cond,
                    cases: cases
                        .iter()
                        .map(|(v, t)| Ok((*v, resolve(t)?)))
                        .collect::<EngineResult<_>>()?,
                    default: resolve(default)?,
                },
                TermSpec::Return { val } => Inst::Return { val: *val },
                TermSpec::Unreachable => Inst::Unreachable,
            };
            blocks.push(Block {
                label: *label,
                body: body.clone(),
                terminator,
            });
        }
        Ok(Method {
            name: name.to_string(),
            params: self.params.clone(),
            blocks,
        })
    }
}

/// Parse the textual form into the raw wire representation
pub fn parse_method(name: &str, text: &str) -> EngineResult<Method> {
    let mut parser = Parser::new();
    for line in text.lines() {
        let line = line.split(';').next().unwrap().trim();
        if line.is_empty() {
            continue;
        }
        parser.feed(line)?;
    }
    parser.finish(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_split_at_labels_and_branches() {
        let method = parse_method(
            "split",
            r"
            const v0 0
            if-eqz v0 :done
            const v0 1
            :done
            return-void
            ",
        )
        .unwrap();
        assert_eq!(method.blocks.len(), 3);

        // the branch falls through into the middle block
        let Inst::Branch {
            then_case,
            else_case,
            ..
        } = &method.blocks[0].terminator
        else {
            panic!("expect a branch terminator");
        };
        assert_eq!(*then_case, method.blocks[2].label);
        assert_eq!(*else_case, method.blocks[1].label);

        // the middle block falls through into the labeled one
        let Inst::Goto { target } = &method.blocks[1].terminator else {
            panic!("expect a fall-through goto");
        };
        assert_eq!(*target, method.blocks[2].label);
    }

    #[test]
    fn branch_to_immediate_next_collapses_both_arms() {
        let method = parse_method(
            "degenerate",
            r"
            load-param v0
            if-eqz v0 :next
            :next
            return-void
            ",
        )
        .unwrap();
        assert_eq!(method.blocks.len(), 2);
        assert_eq!(method.params, vec![0]);
        let Inst::Branch {
            then_case,
            else_case,
            ..
        } = &method.blocks[0].terminator
        else {
            panic!("expect a branch terminator");
        };
        assert_eq!(then_case, else_case);
    }

    #[test]
    fn trailing_code_gets_an_implicit_return() {
        let method = parse_method("implicit", "const v0 2").unwrap();
        assert_eq!(method.blocks.len(), 1);
        assert!(matches!(
            method.blocks[0].terminator,
            Inst::Return { val: None }
        ));
    }

    #[test]
    fn undefined_labels_are_rejected() {
        assert!(parse_method("bad", "goto :nowhere").is_err());
    }

    #[test]
    fn duplicated_labels_are_rejected() {
        let result = parse_method(
            "bad",
            r"
            :here
            const v0 0
            :here
            return-void
            ",
        );
        assert!(result.is_err());
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let method = parse_method(
            "comments",
            r"
            ; a full-line comment

            const v0 0 ; a trailing comment
            return-void
            ",
        )
        .unwrap();
        assert_eq!(method.blocks.len(), 1);
        assert_eq!(method.blocks[0].body.len(), 1);
    }
}
